// SOON staking: state machine.
// Every operation works on copies of the records it touches and writes them
// back only after all checks and the custody transfer succeeded, so an error
// leaves `Config` and `UserAccount` exactly as they were. Nothing here knows
// about `AccountInfo`; the processor supplies the records, a custody adapter
// and a clock.

use solana_program::{entrypoint::ProgramResult, program_error::ProgramError, pubkey::Pubkey};

use crate::error::StakingError;
use crate::pda;
use crate::state::{
    is_uninitialized, AccountKind, Config, UserAccount, BASIS_POINTS_DENOMINATOR,
    CURRENT_VERSION, MAX_APY_BASIS_POINTS, SECONDS_PER_YEAR,
};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Ledger that actually holds the tokens.
pub trait TokenCustody {
    /// Balance of `account`, which must hold `mint`.
    fn balance(&self, account: &Pubkey, mint: &Pubkey) -> Result<u64, ProgramError>;

    /// Move `amount` of `mint` from `from` to `to`. Fails with
    /// `InsufficientFunds` or `AccountMismatch`.
    fn transfer(&mut self, from: &Pubkey, to: &Pubkey, amount: u64, mint: &Pubkey)
        -> ProgramResult;
}

pub trait ClockSource {
    /// Current unix time in seconds.
    fn unix_timestamp(&self) -> Result<i64, ProgramError>;
}

// ---------------------------------------------------------------------------
// Reward math
// ---------------------------------------------------------------------------

/// Reward owed on `staked_amount` for an index delta of
/// `apy_basis_points * seconds`, truncated toward zero.
pub fn reward_for_index_delta(staked_amount: u64, index_delta: u128) -> Result<u64, ProgramError> {
    let denominator = (BASIS_POINTS_DENOMINATOR as u128) * (SECONDS_PER_YEAR as u128);
    let reward = (staked_amount as u128)
        .checked_mul(index_delta)
        .ok_or(StakingError::ArithmeticOverflow)?
        / denominator;
    u64::try_from(reward).map_err(|_| StakingError::ArithmeticOverflow.into())
}

/// `staked * apy_bps * elapsed / (10_000 * SECONDS_PER_YEAR)`. Zero for
/// non-positive `elapsed`.
pub fn pending_reward(
    staked_amount: u64,
    apy_basis_points: u64,
    elapsed: i64,
) -> Result<u64, ProgramError> {
    if elapsed <= 0 {
        return Ok(0);
    }
    let index_delta = (apy_basis_points as u128)
        .checked_mul(elapsed as u128)
        .ok_or(StakingError::ArithmeticOverflow)?;
    reward_for_index_delta(staked_amount, index_delta)
}

/// Advance the global reward index to `now` at the current rate. A clock
/// that went backwards accrues nothing and leaves the checkpoint in place.
pub fn accrue_index(config: &mut Config, now: i64) -> ProgramResult {
    if now <= config.last_index_update {
        return Ok(());
    }
    let elapsed = now
        .checked_sub(config.last_index_update)
        .ok_or(StakingError::ArithmeticOverflow)?;
    let delta = (config.apy_basis_points as u128)
        .checked_mul(elapsed as u128)
        .ok_or(StakingError::ArithmeticOverflow)?;
    config.reward_index = config
        .reward_index
        .checked_add(delta)
        .ok_or(StakingError::ArithmeticOverflow)?;
    config.last_index_update = now;
    Ok(())
}

/// Fold everything `user` earned since its last checkpoint into
/// `accrued_rewards`. Every mutating user operation calls this first.
pub fn settle(config: &mut Config, user: &mut UserAccount, now: i64) -> ProgramResult {
    accrue_index(config, now)?;

    let delta = config
        .reward_index
        .checked_sub(user.reward_index_paid)
        .ok_or(StakingError::ArithmeticOverflow)?;
    let earned = reward_for_index_delta(user.staked_amount, delta)?;

    user.accrued_rewards = user
        .accrued_rewards
        .checked_add(earned)
        .ok_or(StakingError::ArithmeticOverflow)?;
    user.reward_index_paid = config.reward_index;
    user.last_accrual_timestamp = user.last_accrual_timestamp.max(now);
    Ok(())
}

/// Claimable reward as of `now` without mutating anything.
pub fn claimable_rewards(config: &Config, user: &UserAccount, now: i64) -> Result<u64, ProgramError> {
    let mut config = config.clone();
    let mut user = user.clone();
    settle(&mut config, &mut user, now)?;
    Ok(user.accrued_rewards)
}

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

fn validate_apy(apy_basis_points: u64) -> ProgramResult {
    if apy_basis_points > MAX_APY_BASIS_POINTS {
        return Err(StakingError::InvalidParameter.into());
    }
    Ok(())
}

fn ensure_active(config: &Config) -> ProgramResult {
    if config.is_paused {
        return Err(StakingError::ProgramPaused.into());
    }
    Ok(())
}

fn ensure_admin(config: &Config, signer: &Pubkey) -> ProgramResult {
    if config.admin != *signer {
        return Err(StakingError::Unauthorized.into());
    }
    Ok(())
}

/// Holder accounts supplied by a signer may never be one of the vaults.
fn ensure_external(config: &Config, token_account: &Pubkey) -> ProgramResult {
    if *token_account == config.stake_vault || *token_account == config.reward_vault {
        return Err(StakingError::AccountMismatch.into());
    }
    Ok(())
}

fn ensure_owner(user: &UserAccount, signer: &Pubkey) -> ProgramResult {
    if user.owner != *signer {
        return Err(StakingError::Unauthorized.into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

pub struct ContractParams {
    pub apy_basis_points: u64,
    pub stake_token_mint: Pubkey,
    pub reward_token_mint: Pubkey,
}

/// Build the Config record. `current` is whatever the Config address holds
/// right now; any record there means the contract was already initialized.
pub fn initialize_contract(
    program_id: &Pubkey,
    current: &[u8],
    admin: &Pubkey,
    params: &ContractParams,
    clock: &impl ClockSource,
) -> Result<Config, ProgramError> {
    if !is_uninitialized(current) {
        return Err(StakingError::AlreadyInitialized.into());
    }
    validate_apy(params.apy_basis_points)?;
    if params.stake_token_mint == Pubkey::default() || params.reward_token_mint == Pubkey::default()
    {
        return Err(StakingError::InvalidParameter.into());
    }

    let (_, bump) = pda::find_config_address(program_id);
    let (stake_vault, stake_vault_bump) = pda::find_stake_vault_address(program_id);
    let (reward_vault, reward_vault_bump) = pda::find_reward_vault_address(program_id);
    let now = clock.unix_timestamp()?;

    Ok(Config {
        kind: AccountKind::Config,
        version: CURRENT_VERSION,
        admin: *admin,
        apy_basis_points: params.apy_basis_points,
        stake_token_mint: params.stake_token_mint,
        reward_token_mint: params.reward_token_mint,
        stake_vault,
        reward_vault,
        total_staked: 0,
        reward_index: 0,
        last_index_update: now,
        is_paused: false,
        bump,
        stake_vault_bump,
        reward_vault_bump,
        _reserved: [0u8; 32],
    })
}

/// Build a fresh UserAccount for `owner`. An existing record yields
/// `AlreadyInitialized` and is never overwritten.
pub fn initialize_user(
    program_id: &Pubkey,
    current: &[u8],
    owner: &Pubkey,
    clock: &impl ClockSource,
) -> Result<UserAccount, ProgramError> {
    if !is_uninitialized(current) {
        return Err(StakingError::AlreadyInitialized.into());
    }
    let (_, bump) = pda::find_user_address(owner, program_id);
    Ok(UserAccount::new(*owner, bump, clock.unix_timestamp()?))
}

pub fn stake(
    config: &mut Config,
    user: &mut UserAccount,
    owner: &Pubkey,
    owner_token_account: &Pubkey,
    amount: u64,
    custody: &mut impl TokenCustody,
    clock: &impl ClockSource,
) -> ProgramResult {
    if amount == 0 {
        return Err(StakingError::InvalidParameter.into());
    }
    ensure_active(config)?;
    ensure_owner(user, owner)?;
    ensure_external(config, owner_token_account)?;

    let now = clock.unix_timestamp()?;
    let mut next_config = config.clone();
    let mut next_user = user.clone();
    settle(&mut next_config, &mut next_user, now)?;

    next_user.staked_amount = next_user
        .staked_amount
        .checked_add(amount)
        .ok_or(StakingError::ArithmeticOverflow)?;
    next_config.total_staked = next_config
        .total_staked
        .checked_add(amount)
        .ok_or(StakingError::ArithmeticOverflow)?;

    if custody.balance(owner_token_account, &config.stake_token_mint)? < amount {
        return Err(StakingError::InsufficientFunds.into());
    }
    custody.transfer(
        owner_token_account,
        &config.stake_vault,
        amount,
        &config.stake_token_mint,
    )?;

    *config = next_config;
    *user = next_user;
    Ok(())
}

pub fn unstake(
    config: &mut Config,
    user: &mut UserAccount,
    owner: &Pubkey,
    owner_token_account: &Pubkey,
    amount: u64,
    custody: &mut impl TokenCustody,
    clock: &impl ClockSource,
) -> ProgramResult {
    if amount == 0 {
        return Err(StakingError::InvalidParameter.into());
    }
    ensure_active(config)?;
    ensure_owner(user, owner)?;
    ensure_external(config, owner_token_account)?;

    let now = clock.unix_timestamp()?;
    let mut next_config = config.clone();
    let mut next_user = user.clone();
    settle(&mut next_config, &mut next_user, now)?;

    if amount > next_user.staked_amount {
        return Err(StakingError::InsufficientFunds.into());
    }
    next_user.staked_amount -= amount;
    next_config.total_staked = next_config
        .total_staked
        .checked_sub(amount)
        .ok_or(StakingError::ArithmeticOverflow)?;

    custody.transfer(
        &config.stake_vault,
        owner_token_account,
        amount,
        &config.stake_token_mint,
    )?;

    *config = next_config;
    *user = next_user;
    Ok(())
}

/// Pay out everything settled so far. Returns the amount transferred.
pub fn claim_rewards(
    config: &mut Config,
    user: &mut UserAccount,
    owner: &Pubkey,
    owner_reward_account: &Pubkey,
    custody: &mut impl TokenCustody,
    clock: &impl ClockSource,
) -> Result<u64, ProgramError> {
    ensure_active(config)?;
    ensure_owner(user, owner)?;
    ensure_external(config, owner_reward_account)?;

    let now = clock.unix_timestamp()?;
    let mut next_config = config.clone();
    let mut next_user = user.clone();
    settle(&mut next_config, &mut next_user, now)?;

    let amount = next_user.accrued_rewards;
    if amount == 0 {
        return Err(StakingError::NoRewardsToClaim.into());
    }
    if custody.balance(&config.reward_vault, &config.reward_token_mint)? < amount {
        return Err(StakingError::InsufficientFunds.into());
    }
    next_user.accrued_rewards = 0;

    custody.transfer(
        &config.reward_vault,
        owner_reward_account,
        amount,
        &config.reward_token_mint,
    )?;

    *config = next_config;
    *user = next_user;
    Ok(amount)
}

/// Change the rate. Time before `now` is priced at the old rate.
pub fn set_apy(
    config: &mut Config,
    admin: &Pubkey,
    apy_basis_points: u64,
    clock: &impl ClockSource,
) -> ProgramResult {
    ensure_admin(config, admin)?;
    validate_apy(apy_basis_points)?;

    let mut next = config.clone();
    accrue_index(&mut next, clock.unix_timestamp()?)?;
    next.apy_basis_points = apy_basis_points;

    *config = next;
    Ok(())
}

pub fn set_paused(config: &mut Config, admin: &Pubkey, paused: bool) -> ProgramResult {
    ensure_admin(config, admin)?;
    config.is_paused = paused;
    Ok(())
}

pub fn fund_rewards(
    config: &Config,
    admin: &Pubkey,
    admin_token_account: &Pubkey,
    amount: u64,
    custody: &mut impl TokenCustody,
) -> ProgramResult {
    ensure_admin(config, admin)?;
    ensure_external(config, admin_token_account)?;
    if amount == 0 {
        return Err(StakingError::InvalidParameter.into());
    }
    if custody.balance(admin_token_account, &config.reward_token_mint)? < amount {
        return Err(StakingError::InsufficientFunds.into());
    }
    custody.transfer(
        admin_token_account,
        &config.reward_vault,
        amount,
        &config.reward_token_mint,
    )
}
