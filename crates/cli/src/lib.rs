//! vault-env: run a command with secrets from Vault in its environment
//!
//! [`VaultEnv`] ties the pieces together. It resolves the configured
//! secrets, starts the command, and in watch mode restarts it whenever the
//! merged environment changes.

pub mod runner;

pub use runner::{KillHandle, VaultEnv};
