// SOON staking: program errors.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use solana_program::program_error::ProgramError;
use thiserror::Error;

/// Custom error codes surfaced as `ProgramError::Custom(code)`.
///
/// Discriminants are part of the program's public contract: callers decode
/// them with [`StakingError::from_program_error`], so never reorder variants.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum StakingError {
    #[error("Invalid instruction discriminator")]
    InvalidInstruction = 0,
    #[error("Account already initialized")]
    AlreadyInitialized = 1,
    #[error("Account not initialized")]
    UninitializedAccount = 2,
    #[error("Invalid parameter")]
    InvalidParameter = 3,
    #[error("Insufficient funds")]
    InsufficientFunds = 4,
    #[error("Arithmetic overflow")]
    ArithmeticOverflow = 5,
    #[error("Account mismatch (wrong mint, owner or vault)")]
    AccountMismatch = 6,
    #[error("Unauthorized signer")]
    Unauthorized = 7,
    #[error("Program is paused")]
    ProgramPaused = 8,
    #[error("No rewards to claim")]
    NoRewardsToClaim = 9,
    #[error("Unsupported account layout version")]
    UnsupportedVersion = 10,
}

impl From<StakingError> for ProgramError {
    fn from(e: StakingError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl StakingError {
    /// Recover the typed error from a program error returned by this program.
    pub fn from_program_error(err: &ProgramError) -> Option<Self> {
        match err {
            ProgramError::Custom(code) => Self::from_u32(*code),
            _ => None,
        }
    }

    /// `initialize_user` on an existing account reports `AlreadyInitialized`;
    /// callers that only want the account to exist treat it as success.
    pub fn is_already_initialized(err: &ProgramError) -> bool {
        Self::from_program_error(err) == Some(StakingError::AlreadyInitialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(ProgramError::from(StakingError::InvalidInstruction), ProgramError::Custom(0));
        assert_eq!(ProgramError::from(StakingError::AlreadyInitialized), ProgramError::Custom(1));
        assert_eq!(ProgramError::from(StakingError::InsufficientFunds), ProgramError::Custom(4));
        assert_eq!(ProgramError::from(StakingError::UnsupportedVersion), ProgramError::Custom(10));
    }

    #[test]
    fn test_decode_custom_code() {
        let err: ProgramError = StakingError::Unauthorized.into();
        assert_eq!(StakingError::from_program_error(&err), Some(StakingError::Unauthorized));
        assert_eq!(StakingError::from_program_error(&ProgramError::Custom(999)), None);
        assert_eq!(
            StakingError::from_program_error(&ProgramError::MissingRequiredSignature),
            None
        );
    }

    #[test]
    fn test_already_initialized_is_recognised() {
        assert!(StakingError::is_already_initialized(&StakingError::AlreadyInitialized.into()));
        assert!(!StakingError::is_already_initialized(&StakingError::InsufficientFunds.into()));
        assert!(!StakingError::is_already_initialized(&ProgramError::AccountAlreadyInitialized));
    }
}
