//! Core domain types, errors, and constants for `vault-env`.
//!
//! ## Key Components
//!
//! - **`errors`**: The primary `Error` enum and `Result` alias shared by every
//!   crate in the workspace.
//! - **`types`**: `EnvironmentVariables`, the declarative `SecretSpec`, and the
//!   `Signal` names the supervisor understands.
//! - **`constants`**: Defaults and well-known environment variable names.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result, ResultExt},
    types::*,
};
