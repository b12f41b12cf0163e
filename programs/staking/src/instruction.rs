// SOON staking: instruction encoding and builders.
// Wire format: byte 0 is the discriminator, the rest is the Borsh-encoded
// argument struct (absent for argument-less instructions).

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::pda;

// ── Discriminators ──────────────────────────────────────────────────────────

pub const IX_INITIALIZE_CONTRACT: u8 = 0;
pub const IX_INITIALIZE_USER: u8 = 1;
pub const IX_STAKE: u8 = 2;
pub const IX_UNSTAKE: u8 = 3;
pub const IX_CLAIM_REWARDS: u8 = 4;
pub const IX_FUND_REWARDS: u8 = 5;
pub const IX_SET_APY: u8 = 6;
pub const IX_PAUSE: u8 = 7;
pub const IX_UNPAUSE: u8 = 8;

// ── Payloads ────────────────────────────────────────────────────────────────

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq)]
pub struct ApyArgs {
    pub apy_basis_points: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq)]
pub struct AmountArgs {
    pub amount: u64,
}

fn encode<T: BorshSerialize>(discriminator: u8, args: &T) -> Result<Vec<u8>, ProgramError> {
    let mut data = vec![discriminator];
    args.serialize(&mut data)?;
    Ok(data)
}

// ── Builders ────────────────────────────────────────────────────────────────

/// Accounts:
///   0. `[signer, writable]` admin (payer)
///   1. `[writable]` config PDA
///   2. `[]` stake token mint
///   3. `[]` reward token mint
///   4. `[writable]` stake vault PDA
///   5. `[writable]` reward vault PDA
///   6. `[]` token program
///   7. `[]` system program
pub fn initialize_contract(
    program_id: &Pubkey,
    admin: &Pubkey,
    stake_token_mint: &Pubkey,
    reward_token_mint: &Pubkey,
    apy_basis_points: u64,
) -> Result<Instruction, ProgramError> {
    let (config, _) = pda::find_config_address(program_id);
    let (stake_vault, _) = pda::find_stake_vault_address(program_id);
    let (reward_vault, _) = pda::find_reward_vault_address(program_id);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*admin, true),
            AccountMeta::new(config, false),
            AccountMeta::new_readonly(*stake_token_mint, false),
            AccountMeta::new_readonly(*reward_token_mint, false),
            AccountMeta::new(stake_vault, false),
            AccountMeta::new(reward_vault, false),
            AccountMeta::new_readonly(spl_token::ID, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
        data: encode(IX_INITIALIZE_CONTRACT, &ApyArgs { apy_basis_points })?,
    })
}

/// Accounts:
///   0. `[signer, writable]` owner (payer)
///   1. `[writable]` user PDA (seeds: ["user", owner])
///   2. `[]` system program
pub fn initialize_user(program_id: &Pubkey, owner: &Pubkey) -> Instruction {
    let (user, _) = pda::find_user_address(owner, program_id);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*owner, true),
            AccountMeta::new(user, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
        data: vec![IX_INITIALIZE_USER],
    }
}

fn principal_instruction(
    program_id: &Pubkey,
    discriminator: u8,
    owner: &Pubkey,
    owner_stake_token_account: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let (user, _) = pda::find_user_address(owner, program_id);
    let (config, _) = pda::find_config_address(program_id);
    let (stake_vault, _) = pda::find_stake_vault_address(program_id);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(user, false),
            AccountMeta::new(config, false),
            AccountMeta::new(*owner_stake_token_account, false),
            AccountMeta::new(stake_vault, false),
            AccountMeta::new_readonly(spl_token::ID, false),
        ],
        data: encode(discriminator, &AmountArgs { amount })?,
    })
}

/// Accounts:
///   0. `[signer]` owner
///   1. `[writable]` user PDA
///   2. `[writable]` config PDA
///   3. `[writable]` owner's stake token account
///   4. `[writable]` stake vault PDA
///   5. `[]` token program
pub fn stake(
    program_id: &Pubkey,
    owner: &Pubkey,
    owner_stake_token_account: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    principal_instruction(program_id, IX_STAKE, owner, owner_stake_token_account, amount)
}

/// Same accounts as [`stake`].
pub fn unstake(
    program_id: &Pubkey,
    owner: &Pubkey,
    owner_stake_token_account: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    principal_instruction(program_id, IX_UNSTAKE, owner, owner_stake_token_account, amount)
}

/// Accounts:
///   0. `[signer]` owner
///   1. `[writable]` user PDA
///   2. `[writable]` config PDA
///   3. `[writable]` owner's reward token account
///   4. `[writable]` reward vault PDA
///   5. `[]` token program
pub fn claim_rewards(
    program_id: &Pubkey,
    owner: &Pubkey,
    owner_reward_token_account: &Pubkey,
) -> Instruction {
    let (user, _) = pda::find_user_address(owner, program_id);
    let (config, _) = pda::find_config_address(program_id);
    let (reward_vault, _) = pda::find_reward_vault_address(program_id);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(user, false),
            AccountMeta::new(config, false),
            AccountMeta::new(*owner_reward_token_account, false),
            AccountMeta::new(reward_vault, false),
            AccountMeta::new_readonly(spl_token::ID, false),
        ],
        data: vec![IX_CLAIM_REWARDS],
    }
}

/// Accounts:
///   0. `[signer]` admin
///   1. `[]` config PDA
///   2. `[writable]` admin's reward token account
///   3. `[writable]` reward vault PDA
///   4. `[]` token program
pub fn fund_rewards(
    program_id: &Pubkey,
    admin: &Pubkey,
    admin_reward_token_account: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let (config, _) = pda::find_config_address(program_id);
    let (reward_vault, _) = pda::find_reward_vault_address(program_id);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*admin, true),
            AccountMeta::new_readonly(config, false),
            AccountMeta::new(*admin_reward_token_account, false),
            AccountMeta::new(reward_vault, false),
            AccountMeta::new_readonly(spl_token::ID, false),
        ],
        data: encode(IX_FUND_REWARDS, &AmountArgs { amount })?,
    })
}

fn admin_instruction(program_id: &Pubkey, admin: &Pubkey, data: Vec<u8>) -> Instruction {
    let (config, _) = pda::find_config_address(program_id);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*admin, true),
            AccountMeta::new(config, false),
        ],
        data,
    }
}

/// Accounts:
///   0. `[signer]` admin
///   1. `[writable]` config PDA
pub fn set_apy(
    program_id: &Pubkey,
    admin: &Pubkey,
    apy_basis_points: u64,
) -> Result<Instruction, ProgramError> {
    let data = encode(IX_SET_APY, &ApyArgs { apy_basis_points })?;
    Ok(admin_instruction(program_id, admin, data))
}

/// Same accounts as [`set_apy`].
pub fn pause(program_id: &Pubkey, admin: &Pubkey) -> Instruction {
    admin_instruction(program_id, admin, vec![IX_PAUSE])
}

/// Same accounts as [`set_apy`].
pub fn unpause(program_id: &Pubkey, admin: &Pubkey) -> Instruction {
    admin_instruction(program_id, admin, vec![IX_UNPAUSE])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stake_wire_format() {
        let pid = crate::id();
        let owner = Pubkey::new_unique();
        let ata = Pubkey::new_unique();
        let ix = stake(&pid, &owner, &ata, 1_000_000_000).unwrap();

        assert_eq!(ix.data[0], IX_STAKE);
        assert_eq!(&ix.data[1..], &1_000_000_000u64.to_le_bytes());
        assert_eq!(ix.accounts[1].pubkey, pda::find_user_address(&owner, &pid).0);
        assert!(ix.accounts[0].is_signer);
        assert!(!ix.accounts[0].is_writable);
    }

    #[test]
    fn test_args_decode() {
        let ix = set_apy(&crate::id(), &Pubkey::new_unique(), 1_000).unwrap();
        let args = ApyArgs::try_from_slice(&ix.data[1..]).unwrap();
        assert_eq!(args.apy_basis_points, 1_000);
    }

    #[test]
    fn test_argless_instructions_are_one_byte() {
        let pid = crate::id();
        let key = Pubkey::new_unique();
        assert_eq!(initialize_user(&pid, &key).data, vec![IX_INITIALIZE_USER]);
        assert_eq!(claim_rewards(&pid, &key, &key).data, vec![IX_CLAIM_REWARDS]);
        assert_eq!(pause(&pid, &key).data, vec![IX_PAUSE]);
        assert_eq!(unpause(&pid, &key).data, vec![IX_UNPAUSE]);
    }
}
