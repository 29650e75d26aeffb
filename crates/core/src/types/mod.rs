//! Core domain types for `vault-env`.
//!
//! - **`environment`**: the merged environment handed to the child
//! - **`secret`**: declarative secret specifications
//! - **`signal`**: named POSIX signals

pub mod environment;
pub mod secret;
pub mod signal;

pub use environment::*;
pub use secret::*;
pub use signal::*;
