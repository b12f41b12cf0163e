// SOON staking: instruction processor.
// Validates accounts, loads records, runs the engine against SPL Token custody
// and the Clock sysvar, then writes the records back.

use borsh::BorshDeserialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction, system_program,
    sysvar::Sysvar,
};
use spl_token::state::{Account as TokenAccount, Mint};

use crate::engine::{self, ClockSource, ContractParams, TokenCustody};
use crate::error::StakingError;
use crate::instruction::{
    AmountArgs, ApyArgs, IX_CLAIM_REWARDS, IX_FUND_REWARDS, IX_INITIALIZE_CONTRACT,
    IX_INITIALIZE_USER, IX_PAUSE, IX_SET_APY, IX_STAKE, IX_UNPAUSE, IX_UNSTAKE,
};
use crate::pda::{self, CONFIG_SEED, REWARD_VAULT_SEED, STAKE_VAULT_SEED, USER_SEED};
use crate::state::{Config, UserAccount};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    if instruction_data.is_empty() {
        return Err(ProgramError::InvalidInstructionData);
    }

    let (discriminator, data) = instruction_data.split_at(1);

    match discriminator[0] {
        IX_INITIALIZE_CONTRACT => process_initialize_contract(program_id, accounts, data),
        IX_INITIALIZE_USER => process_initialize_user(program_id, accounts),
        IX_STAKE => process_stake(program_id, accounts, data),
        IX_UNSTAKE => process_unstake(program_id, accounts, data),
        IX_CLAIM_REWARDS => process_claim_rewards(program_id, accounts),
        IX_FUND_REWARDS => process_fund_rewards(program_id, accounts, data),
        IX_SET_APY => process_set_apy(program_id, accounts, data),
        IX_PAUSE => process_set_paused(program_id, accounts, true),
        IX_UNPAUSE => process_set_paused(program_id, accounts, false),
        _ => Err(StakingError::InvalidInstruction.into()),
    }
}

// ---------------------------------------------------------------------------
// Runtime adapters
// ---------------------------------------------------------------------------

/// Clock backed by the `Clock` sysvar.
pub struct SysvarClock;

impl ClockSource for SysvarClock {
    fn unix_timestamp(&self) -> Result<i64, ProgramError> {
        Ok(Clock::get()?.unix_timestamp)
    }
}

/// Custody over the two SPL token accounts an instruction touches.
///
/// The Config PDA signs only outflows from `payout_vault`, the one vault the
/// instruction pays out of. Every other outflow is signed by `signer`, who
/// must own the source token account.
pub struct SplTokenCustody<'a, 'info> {
    token_program: &'a AccountInfo<'info>,
    config: &'a AccountInfo<'info>,
    config_bump: u8,
    signer: &'a AccountInfo<'info>,
    token_accounts: [&'a AccountInfo<'info>; 2],
    payout_vault: Option<Pubkey>,
}

impl<'a, 'info> SplTokenCustody<'a, 'info> {
    pub fn new(
        token_program: &'a AccountInfo<'info>,
        config: &'a AccountInfo<'info>,
        config_bump: u8,
        signer: &'a AccountInfo<'info>,
        token_accounts: [&'a AccountInfo<'info>; 2],
        payout_vault: Option<Pubkey>,
    ) -> Self {
        Self { token_program, config, config_bump, signer, token_accounts, payout_vault }
    }

    fn authority_for(
        &self,
        from: &Pubkey,
        source: &TokenAccount,
    ) -> Result<&'a AccountInfo<'info>, ProgramError> {
        if source.owner == *self.config.key {
            if self.payout_vault.as_ref() != Some(from) {
                msg!("Refusing to move tokens out of program account {}", from);
                return Err(StakingError::AccountMismatch.into());
            }
            return Ok(self.config);
        }
        if self.payout_vault.as_ref() == Some(from) || source.owner != *self.signer.key {
            msg!("Token account {} is not owned by the signer", from);
            return Err(StakingError::AccountMismatch.into());
        }
        Ok(self.signer)
    }

    fn find(&self, key: &Pubkey) -> Result<&'a AccountInfo<'info>, ProgramError> {
        self.token_accounts
            .iter()
            .copied()
            .find(|info| info.key == key)
            .ok_or_else(|| StakingError::AccountMismatch.into())
    }

    fn read(&self, key: &Pubkey, mint: &Pubkey) -> Result<TokenAccount, ProgramError> {
        let info = self.find(key)?;
        if info.owner != &spl_token::ID {
            return Err(StakingError::AccountMismatch.into());
        }
        let account = TokenAccount::unpack(&info.data.borrow())?;
        if account.mint != *mint {
            msg!("Token account {} holds mint {}, expected {}", key, account.mint, mint);
            return Err(StakingError::AccountMismatch.into());
        }
        Ok(account)
    }
}

impl<'a, 'info> TokenCustody for SplTokenCustody<'a, 'info> {
    fn balance(&self, account: &Pubkey, mint: &Pubkey) -> Result<u64, ProgramError> {
        Ok(self.read(account, mint)?.amount)
    }

    fn transfer(&mut self, from: &Pubkey, to: &Pubkey, amount: u64, mint: &Pubkey) -> ProgramResult {
        let source = self.read(from, mint)?;
        self.read(to, mint)?;
        if source.amount < amount {
            return Err(StakingError::InsufficientFunds.into());
        }

        let authority = self.authority_for(from, &source)?;

        let ix = spl_token::instruction::transfer(
            self.token_program.key,
            from,
            to,
            authority.key,
            &[],
            amount,
        )?;
        let infos = [
            self.find(from)?.clone(),
            self.find(to)?.clone(),
            authority.clone(),
            self.token_program.clone(),
        ];

        if authority.key == self.config.key {
            invoke_signed(&ix, &infos, &[&[CONFIG_SEED, &[self.config_bump]]])
        } else {
            invoke(&ix, &infos)
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn assert_signer(account: &AccountInfo) -> ProgramResult {
    if !account.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }
    Ok(())
}

fn assert_writable(account: &AccountInfo) -> ProgramResult {
    if !account.is_writable {
        return Err(ProgramError::InvalidAccountData);
    }
    Ok(())
}

fn assert_owned_by(account: &AccountInfo, owner: &Pubkey) -> ProgramResult {
    if account.owner != owner {
        return Err(ProgramError::IllegalOwner);
    }
    Ok(())
}

fn assert_address(account: &AccountInfo, expected: &Pubkey) -> ProgramResult {
    if account.key != expected {
        return Err(ProgramError::InvalidSeeds);
    }
    Ok(())
}

fn assert_token_program(account: &AccountInfo) -> ProgramResult {
    if *account.key != spl_token::ID {
        return Err(ProgramError::IncorrectProgramId);
    }
    Ok(())
}

fn assert_system_program(account: &AccountInfo) -> ProgramResult {
    if *account.key != system_program::ID {
        return Err(ProgramError::IncorrectProgramId);
    }
    Ok(())
}

/// Create a PDA-addressed account. Works when the address was already sent
/// lamports by someone else, where `create_account` would fail.
fn create_pda_account<'a>(
    payer: &AccountInfo<'a>,
    space: usize,
    owner: &Pubkey,
    system_program: &AccountInfo<'a>,
    new_account: &AccountInfo<'a>,
    seeds: &[&[u8]],
) -> ProgramResult {
    let required = Rent::get()?.minimum_balance(space);
    let current = new_account.lamports();

    if current == 0 {
        return invoke_signed(
            &system_instruction::create_account(
                payer.key,
                new_account.key,
                required,
                space as u64,
                owner,
            ),
            &[payer.clone(), new_account.clone(), system_program.clone()],
            &[seeds],
        );
    }

    let top_up = required.saturating_sub(current);
    if top_up > 0 {
        invoke(
            &system_instruction::transfer(payer.key, new_account.key, top_up),
            &[payer.clone(), new_account.clone(), system_program.clone()],
        )?;
    }
    invoke_signed(
        &system_instruction::allocate(new_account.key, space as u64),
        &[new_account.clone(), system_program.clone()],
        &[seeds],
    )?;
    invoke_signed(
        &system_instruction::assign(new_account.key, owner),
        &[new_account.clone(), system_program.clone()],
        &[seeds],
    )
}

/// Create a PDA token account whose token authority is the Config PDA.
#[allow(clippy::too_many_arguments)]
fn create_vault<'a>(
    payer: &AccountInfo<'a>,
    vault: &AccountInfo<'a>,
    mint: &AccountInfo<'a>,
    config_key: &Pubkey,
    token_program: &AccountInfo<'a>,
    system_program: &AccountInfo<'a>,
    seed: &[u8],
    bump: u8,
) -> ProgramResult {
    create_pda_account(
        payer,
        TokenAccount::LEN,
        &spl_token::ID,
        system_program,
        vault,
        &[seed, &[bump]],
    )?;
    invoke(
        &spl_token::instruction::initialize_account3(
            token_program.key,
            vault.key,
            mint.key,
            config_key,
        )?,
        &[vault.clone(), mint.clone(), token_program.clone()],
    )
}

fn assert_mint(account: &AccountInfo) -> ProgramResult {
    if account.owner != &spl_token::ID {
        msg!("Mint {} is not owned by the token program", account.key);
        return Err(StakingError::InvalidParameter.into());
    }
    Mint::unpack(&account.data.borrow()).map_err(|_| StakingError::InvalidParameter)?;
    Ok(())
}

fn load_config(program_id: &Pubkey, account: &AccountInfo) -> Result<Config, ProgramError> {
    let (config_pda, _) = pda::find_config_address(program_id);
    assert_address(account, &config_pda)?;
    if account.data_is_empty() {
        return Err(StakingError::UninitializedAccount.into());
    }
    assert_owned_by(account, program_id)?;
    Config::unpack(&account.data.borrow())
}

fn load_user(
    program_id: &Pubkey,
    account: &AccountInfo,
    owner: &Pubkey,
) -> Result<UserAccount, ProgramError> {
    let (user_pda, _) = pda::find_user_address(owner, program_id);
    assert_address(account, &user_pda)?;
    if account.data_is_empty() {
        return Err(StakingError::UninitializedAccount.into());
    }
    assert_owned_by(account, program_id)?;
    UserAccount::unpack(&account.data.borrow())
}

fn amount_args(data: &[u8]) -> Result<u64, ProgramError> {
    AmountArgs::try_from_slice(data)
        .map(|args| args.amount)
        .map_err(|_| ProgramError::InvalidInstructionData)
}

fn apy_args(data: &[u8]) -> Result<u64, ProgramError> {
    ApyArgs::try_from_slice(data)
        .map(|args| args.apy_basis_points)
        .map_err(|_| ProgramError::InvalidInstructionData)
}

// ---------------------------------------------------------------------------
// Instruction: InitializeContract
// ---------------------------------------------------------------------------
// Accounts:
//   0. [signer, writable] admin (payer)
//   1. [writable] config PDA
//   2. []         stake token mint
//   3. []         reward token mint
//   4. [writable] stake vault PDA
//   5. [writable] reward vault PDA
//   6. []         token program
//   7. []         system program

fn process_initialize_contract(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    let apy_basis_points = apy_args(data)?;

    let account_iter = &mut accounts.iter();
    let admin = next_account_info(account_iter)?;
    let config_account = next_account_info(account_iter)?;
    let stake_mint = next_account_info(account_iter)?;
    let reward_mint = next_account_info(account_iter)?;
    let stake_vault = next_account_info(account_iter)?;
    let reward_vault = next_account_info(account_iter)?;
    let token_program = next_account_info(account_iter)?;
    let system_program = next_account_info(account_iter)?;

    assert_signer(admin)?;
    assert_writable(admin)?;
    assert_writable(config_account)?;
    assert_writable(stake_vault)?;
    assert_writable(reward_vault)?;
    assert_token_program(token_program)?;
    assert_system_program(system_program)?;

    let (config_pda, _) = pda::find_config_address(program_id);
    assert_address(config_account, &config_pda)?;

    let params = ContractParams {
        apy_basis_points,
        stake_token_mint: *stake_mint.key,
        reward_token_mint: *reward_mint.key,
    };
    let config = engine::initialize_contract(
        program_id,
        &config_account.data.borrow(),
        admin.key,
        &params,
        &SysvarClock,
    )?;

    assert_mint(stake_mint)?;
    assert_mint(reward_mint)?;
    assert_address(stake_vault, &config.stake_vault)?;
    assert_address(reward_vault, &config.reward_vault)?;

    create_pda_account(
        admin,
        Config::SIZE,
        program_id,
        system_program,
        config_account,
        &[CONFIG_SEED, &[config.bump]],
    )?;
    create_vault(
        admin,
        stake_vault,
        stake_mint,
        config_account.key,
        token_program,
        system_program,
        STAKE_VAULT_SEED,
        config.stake_vault_bump,
    )?;
    create_vault(
        admin,
        reward_vault,
        reward_mint,
        config_account.key,
        token_program,
        system_program,
        REWARD_VAULT_SEED,
        config.reward_vault_bump,
    )?;

    config.pack(&mut config_account.data.borrow_mut())?;

    msg!(
        "EVENT:ContractInitialized:{{\"admin\":\"{}\",\"apy_basis_points\":{},\"stake_mint\":\"{}\",\"reward_mint\":\"{}\"}}",
        admin.key,
        config.apy_basis_points,
        config.stake_token_mint,
        config.reward_token_mint,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: InitializeUser
// ---------------------------------------------------------------------------
// Accounts:
//   0. [signer, writable] owner (payer)
//   1. [writable] user PDA
//   2. []         system program

fn process_initialize_user(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
    let account_iter = &mut accounts.iter();
    let owner = next_account_info(account_iter)?;
    let user_account = next_account_info(account_iter)?;
    let system_program = next_account_info(account_iter)?;

    assert_signer(owner)?;
    assert_writable(owner)?;
    assert_writable(user_account)?;
    assert_system_program(system_program)?;

    let (user_pda, _) = pda::find_user_address(owner.key, program_id);
    assert_address(user_account, &user_pda)?;

    let user = engine::initialize_user(
        program_id,
        &user_account.data.borrow(),
        owner.key,
        &SysvarClock,
    )?;

    create_pda_account(
        owner,
        UserAccount::SIZE,
        program_id,
        system_program,
        user_account,
        &[USER_SEED, owner.key.as_ref(), &[user.bump]],
    )?;
    user.pack(&mut user_account.data.borrow_mut())?;

    msg!(
        "EVENT:UserInitialized:{{\"owner\":\"{}\",\"user\":\"{}\"}}",
        owner.key,
        user_account.key,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: Stake / Unstake
// ---------------------------------------------------------------------------
// Accounts:
//   0. [signer]   owner
//   1. [writable] user PDA
//   2. [writable] config PDA
//   3. [writable] owner's stake token account
//   4. [writable] stake vault PDA
//   5. []         token program

fn process_stake(program_id: &Pubkey, accounts: &[AccountInfo], data: &[u8]) -> ProgramResult {
    process_principal(program_id, accounts, data, true)
}

fn process_unstake(program_id: &Pubkey, accounts: &[AccountInfo], data: &[u8]) -> ProgramResult {
    process_principal(program_id, accounts, data, false)
}

fn process_principal(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
    deposit: bool,
) -> ProgramResult {
    let amount = amount_args(data)?;

    let account_iter = &mut accounts.iter();
    let owner = next_account_info(account_iter)?;
    let user_account = next_account_info(account_iter)?;
    let config_account = next_account_info(account_iter)?;
    let owner_token = next_account_info(account_iter)?;
    let stake_vault = next_account_info(account_iter)?;
    let token_program = next_account_info(account_iter)?;

    assert_signer(owner)?;
    assert_writable(user_account)?;
    assert_writable(config_account)?;
    assert_writable(owner_token)?;
    assert_writable(stake_vault)?;
    assert_token_program(token_program)?;

    let mut config = load_config(program_id, config_account)?;
    let mut user = load_user(program_id, user_account, owner.key)?;
    if *stake_vault.key != config.stake_vault {
        return Err(StakingError::AccountMismatch.into());
    }

    let mut custody = SplTokenCustody::new(
        token_program,
        config_account,
        config.bump,
        owner,
        [owner_token, stake_vault],
        if deposit { None } else { Some(config.stake_vault) },
    );

    if deposit {
        engine::stake(
            &mut config,
            &mut user,
            owner.key,
            owner_token.key,
            amount,
            &mut custody,
            &SysvarClock,
        )?;
    } else {
        engine::unstake(
            &mut config,
            &mut user,
            owner.key,
            owner_token.key,
            amount,
            &mut custody,
            &SysvarClock,
        )?;
    }

    user.pack(&mut user_account.data.borrow_mut())?;
    config.pack(&mut config_account.data.borrow_mut())?;

    msg!(
        "EVENT:{}:{{\"owner\":\"{}\",\"amount\":{},\"staked\":{},\"accrued_rewards\":{},\"total_staked\":{}}}",
        if deposit { "Staked" } else { "Unstaked" },
        owner.key,
        amount,
        user.staked_amount,
        user.accrued_rewards,
        config.total_staked,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: ClaimRewards
// ---------------------------------------------------------------------------
// Accounts:
//   0. [signer]   owner
//   1. [writable] user PDA
//   2. [writable] config PDA
//   3. [writable] owner's reward token account
//   4. [writable] reward vault PDA
//   5. []         token program

fn process_claim_rewards(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
    let account_iter = &mut accounts.iter();
    let owner = next_account_info(account_iter)?;
    let user_account = next_account_info(account_iter)?;
    let config_account = next_account_info(account_iter)?;
    let owner_reward_token = next_account_info(account_iter)?;
    let reward_vault = next_account_info(account_iter)?;
    let token_program = next_account_info(account_iter)?;

    assert_signer(owner)?;
    assert_writable(user_account)?;
    assert_writable(config_account)?;
    assert_writable(owner_reward_token)?;
    assert_writable(reward_vault)?;
    assert_token_program(token_program)?;

    let mut config = load_config(program_id, config_account)?;
    let mut user = load_user(program_id, user_account, owner.key)?;
    if *reward_vault.key != config.reward_vault {
        return Err(StakingError::AccountMismatch.into());
    }

    let mut custody = SplTokenCustody::new(
        token_program,
        config_account,
        config.bump,
        owner,
        [owner_reward_token, reward_vault],
        Some(config.reward_vault),
    );
    let claimed = engine::claim_rewards(
        &mut config,
        &mut user,
        owner.key,
        owner_reward_token.key,
        &mut custody,
        &SysvarClock,
    )?;

    user.pack(&mut user_account.data.borrow_mut())?;
    config.pack(&mut config_account.data.borrow_mut())?;

    msg!(
        "EVENT:RewardsClaimed:{{\"owner\":\"{}\",\"amount\":{}}}",
        owner.key,
        claimed,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: FundRewards
// ---------------------------------------------------------------------------
// Accounts:
//   0. [signer]   admin
//   1. []         config PDA
//   2. [writable] admin's reward token account
//   3. [writable] reward vault PDA
//   4. []         token program

fn process_fund_rewards(program_id: &Pubkey, accounts: &[AccountInfo], data: &[u8]) -> ProgramResult {
    let amount = amount_args(data)?;

    let account_iter = &mut accounts.iter();
    let admin = next_account_info(account_iter)?;
    let config_account = next_account_info(account_iter)?;
    let admin_token = next_account_info(account_iter)?;
    let reward_vault = next_account_info(account_iter)?;
    let token_program = next_account_info(account_iter)?;

    assert_signer(admin)?;
    assert_writable(admin_token)?;
    assert_writable(reward_vault)?;
    assert_token_program(token_program)?;

    let config = load_config(program_id, config_account)?;
    if *reward_vault.key != config.reward_vault {
        return Err(StakingError::AccountMismatch.into());
    }

    let mut custody = SplTokenCustody::new(
        token_program,
        config_account,
        config.bump,
        admin,
        [admin_token, reward_vault],
        None,
    );
    engine::fund_rewards(&config, admin.key, admin_token.key, amount, &mut custody)?;

    msg!(
        "EVENT:RewardsFunded:{{\"admin\":\"{}\",\"amount\":{}}}",
        admin.key,
        amount,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: SetApy / Pause / Unpause
// ---------------------------------------------------------------------------
// Accounts:
//   0. [signer]   admin
//   1. [writable] config PDA

fn admin_accounts<'a, 'info>(
    accounts: &'a [AccountInfo<'info>],
) -> Result<(&'a AccountInfo<'info>, &'a AccountInfo<'info>), ProgramError> {
    let account_iter = &mut accounts.iter();
    let admin = next_account_info(account_iter)?;
    let config_account = next_account_info(account_iter)?;

    assert_signer(admin)?;
    assert_writable(config_account)?;
    Ok((admin, config_account))
}

fn process_set_apy(program_id: &Pubkey, accounts: &[AccountInfo], data: &[u8]) -> ProgramResult {
    let apy_basis_points = apy_args(data)?;
    let (admin, config_account) = admin_accounts(accounts)?;

    let mut config = load_config(program_id, config_account)?;
    let previous = config.apy_basis_points;
    engine::set_apy(&mut config, admin.key, apy_basis_points, &SysvarClock)?;
    config.pack(&mut config_account.data.borrow_mut())?;

    msg!(
        "EVENT:ApyUpdated:{{\"admin\":\"{}\",\"previous\":{},\"apy_basis_points\":{}}}",
        admin.key,
        previous,
        apy_basis_points,
    );

    Ok(())
}

fn process_set_paused(program_id: &Pubkey, accounts: &[AccountInfo], paused: bool) -> ProgramResult {
    let (admin, config_account) = admin_accounts(accounts)?;

    let mut config = load_config(program_id, config_account)?;
    engine::set_paused(&mut config, admin.key, paused)?;
    config.pack(&mut config_account.data.borrow_mut())?;

    if paused {
        msg!("EVENT:StakingPaused:{{\"admin\":\"{}\"}}", admin.key);
    } else {
        msg!("EVENT:StakingUnpaused:{{\"admin\":\"{}\"}}", admin.key);
    }

    Ok(())
}
