//! Shared utilities and pure functions for vault-env
//!
//! Logging setup, secret redaction for log output, human readable durations
//! and the fixed-backoff retry policy used by watch mode.

pub mod duration;
pub mod redact;
pub mod resilience;
pub mod tracing;

pub use duration::*;
pub use redact::*;
pub use resilience::*;
