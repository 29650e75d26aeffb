//! Configuration loading for vault-env
//!
//! The JSON file is read into a [`ConfigFile`], then resolved into an
//! immutable [`Config`]: templates rendered, defaults applied, the
//! command line overrides in [`RuntimeOptions`] taken into account.

pub mod config;
pub mod file;
pub mod loader;

pub use config::{Config, RuntimeOptions};
pub use file::{ConfigFile, RetryFile};
pub use loader::ConfigLoader;
