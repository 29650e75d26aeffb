use std::path::PathBuf;

/// Result type alias for vault-env operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for vault-env operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A template could not be compiled
    #[error("invalid template '{template}': {message}")]
    TemplateSyntax { template: String, message: String },

    /// `env(name)` was called for an unset variable while rendering
    #[error("Environment variable \"{variable}\" must be set.")]
    MissingEnvironmentVariable { variable: String },

    /// A template referenced something the render context does not provide
    #[error("failed to render template '{template}': {message}")]
    TemplateRender { template: String, message: String },

    /// The secret store rejected or failed a request
    #[error("secret store request {method} {uri} failed: {message}")]
    Store {
        method: String,
        uri: String,
        message: String,
    },

    /// A secret could not be fetched during a resolution pass
    #[error("failed to fetch secret '{path}': {source}")]
    SecretFetch {
        path: String,
        #[source]
        source: Box<Error>,
    },

    /// Watch mode gave up on a secret
    #[error("exceeded maximum number of retry attempts ({attempts}) for secret '{path}': {source}")]
    RetryExhausted {
        path: String,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    /// The target command could not be started
    #[error("failed to spawn '{command}': {message}")]
    Spawn { command: String, message: String },

    /// The already running child faulted
    #[error("child process '{command}' failed: {message}")]
    ChildProcess { command: String, message: String },

    /// Unknown signal name or failed delivery
    #[error("signal {signal}: {message}")]
    Signal { signal: String, message: String },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}
