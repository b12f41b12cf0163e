// SOON staking: persisted account records.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::error::StakingError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Layout version written into every record created by this build.
pub const CURRENT_VERSION: u8 = 1;

/// 365 days. Leap seconds and leap days are not modelled.
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

pub const BASIS_POINTS_DENOMINATOR: u64 = 10_000;

/// 10_000 % APY. Anything above is treated as an input error.
pub const MAX_APY_BASIS_POINTS: u64 = 1_000_000;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// First byte of every record; guards against passing one record type where
/// another is expected.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    Uninitialized,
    Config,
    User,
}

/// Program-wide singleton at `["config"]`.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub kind: AccountKind,
    pub version: u8,
    pub admin: Pubkey,
    pub apy_basis_points: u64,
    pub stake_token_mint: Pubkey,
    pub reward_token_mint: Pubkey,
    /// Escrow token account for staked principal.
    pub stake_vault: Pubkey,
    pub reward_vault: Pubkey,
    /// Sum of every `UserAccount::staked_amount`.
    pub total_staked: u64,
    /// Running sum of `apy_basis_points * seconds`.
    pub reward_index: u128,
    pub last_index_update: i64,
    pub is_paused: bool,
    pub bump: u8,
    pub stake_vault_bump: u8,
    pub reward_vault_bump: u8,
    pub _reserved: [u8; 32],
}

impl Config {
    // 1 + 1 + 32 + 8 + 32 + 32 + 32 + 32 + 8 + 16 + 8 + 1 + 1 + 1 + 1 + 32 = 238
    pub const SIZE: usize = 238;

    pub fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        check_header(data, AccountKind::Config)?;
        Self::deserialize(&mut &data[..]).map_err(|_| ProgramError::InvalidAccountData)
    }

    pub fn pack(&self, dst: &mut [u8]) -> Result<(), ProgramError> {
        self.serialize(&mut &mut dst[..])
            .map_err(|_| ProgramError::AccountDataTooSmall)
    }
}

/// Per-depositor record at `["user", owner]`.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct UserAccount {
    pub kind: AccountKind,
    pub version: u8,
    pub owner: Pubkey,
    pub staked_amount: u64,
    /// Settled reward not yet claimed.
    pub accrued_rewards: u64,
    /// `Config::reward_index` at the last settlement.
    pub reward_index_paid: u128,
    pub last_accrual_timestamp: i64,
    pub bump: u8,
    pub _reserved: [u8; 32],
}

impl UserAccount {
    // 1 + 1 + 32 + 8 + 8 + 16 + 8 + 1 + 32 = 107
    pub const SIZE: usize = 107;

    pub fn new(owner: Pubkey, bump: u8, now: i64) -> Self {
        Self {
            kind: AccountKind::User,
            version: CURRENT_VERSION,
            owner,
            staked_amount: 0,
            accrued_rewards: 0,
            reward_index_paid: 0,
            last_accrual_timestamp: now,
            bump,
            _reserved: [0u8; 32],
        }
    }

    pub fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        check_header(data, AccountKind::User)?;
        Self::deserialize(&mut &data[..]).map_err(|_| ProgramError::InvalidAccountData)
    }

    pub fn pack(&self, dst: &mut [u8]) -> Result<(), ProgramError> {
        self.serialize(&mut &mut dst[..])
            .map_err(|_| ProgramError::AccountDataTooSmall)
    }
}

/// Empty or zeroed data means the record was never written.
pub fn is_uninitialized(data: &[u8]) -> bool {
    data.first().map_or(true, |b| *b == AccountKind::Uninitialized as u8)
}

fn check_header(data: &[u8], expected: AccountKind) -> Result<(), ProgramError> {
    if is_uninitialized(data) {
        return Err(StakingError::UninitializedAccount.into());
    }
    if data[0] != expected as u8 {
        return Err(StakingError::AccountMismatch.into());
    }
    match data.get(1) {
        Some(v) if (1..=CURRENT_VERSION).contains(v) => Ok(()),
        _ => Err(StakingError::UnsupportedVersion.into()),
    }
}
