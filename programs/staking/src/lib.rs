// SOON staking program.
// Users escrow an SPL token with the program and earn a second SPL token at a
// fixed annual rate, settled lazily whenever their position is touched.

pub mod engine;
pub mod error;
pub mod instruction;
pub mod pda;
pub mod processor;
pub mod state;

pub use processor::process_instruction;

solana_program::declare_id!("66rNZNDufxtoJwGEFkQ9T6rm3P1Ex5Wd4V7MF6os1SVG");

#[cfg(not(feature = "no-entrypoint"))]
solana_program::entrypoint!(process_instruction);
