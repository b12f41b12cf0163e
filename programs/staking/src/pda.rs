// SOON staking: program derived addresses.
// The program and every caller derive addresses with these helpers, so the
// seed constants below are part of the on-chain contract.

use solana_program::pubkey::Pubkey;

pub const CONFIG_SEED: &[u8] = b"config";
pub const USER_SEED: &[u8] = b"user";
pub const STAKE_VAULT_SEED: &[u8] = b"escrow";
pub const REWARD_VAULT_SEED: &[u8] = b"reward_vault";

pub fn derive(seeds: &[&[u8]], program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(seeds, program_id)
}

pub fn find_config_address(program_id: &Pubkey) -> (Pubkey, u8) {
    derive(&[CONFIG_SEED], program_id)
}

pub fn find_user_address(owner: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    derive(&[USER_SEED, owner.as_ref()], program_id)
}

/// Escrow token account holding all staked principal.
pub fn find_stake_vault_address(program_id: &Pubkey) -> (Pubkey, u8) {
    derive(&[STAKE_VAULT_SEED], program_id)
}

pub fn find_reward_vault_address(program_id: &Pubkey) -> (Pubkey, u8) {
    derive(&[REWARD_VAULT_SEED], program_id)
}
