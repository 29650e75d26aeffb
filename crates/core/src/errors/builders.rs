//! Builder methods for creating errors with context

use super::types::Error;
use std::path::PathBuf;

impl Error {
    /// Create a template syntax error
    #[must_use]
    pub fn template_syntax(template: impl Into<String>, message: impl Into<String>) -> Self {
        Error::TemplateSyntax {
            template: template.into(),
            message: message.into(),
        }
    }

    /// Create an error for an unset `env(name)` lookup
    #[must_use]
    pub fn missing_environment_variable(variable: impl Into<String>) -> Self {
        Error::MissingEnvironmentVariable {
            variable: variable.into(),
        }
    }

    /// Create a template render error
    #[must_use]
    pub fn template_render(template: impl Into<String>, message: impl Into<String>) -> Self {
        Error::TemplateRender {
            template: template.into(),
            message: message.into(),
        }
    }

    /// Create a secret store error
    #[must_use]
    pub fn store(
        method: impl Into<String>,
        uri: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Store {
            method: method.into(),
            uri: uri.into(),
            message: message.into(),
        }
    }

    /// Wrap a failure while fetching the secret at `path`
    #[must_use]
    pub fn secret_fetch(path: impl Into<String>, source: Error) -> Self {
        Error::SecretFetch {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Create a retry exhaustion error
    #[must_use]
    pub fn retry_exhausted(path: impl Into<String>, attempts: u32, source: Error) -> Self {
        Error::RetryExhausted {
            path: path.into(),
            attempts,
            source: Box::new(source),
        }
    }

    /// Create a spawn error
    #[must_use]
    pub fn spawn(command: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Spawn {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a child process error
    #[must_use]
    pub fn child_process(command: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ChildProcess {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a signal error
    #[must_use]
    pub fn signal(signal: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Signal {
            signal: signal.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a file system error
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Whether this error happened while rendering or compiling a template.
    ///
    /// Template failures abort the whole resolution pass; they are never
    /// retried by the watcher.
    #[must_use]
    pub fn is_template_error(&self) -> bool {
        match self {
            Error::TemplateSyntax { .. }
            | Error::MissingEnvironmentVariable { .. }
            | Error::TemplateRender { .. } => true,
            Error::SecretFetch { source, .. } => source.is_template_error(),
            _ => false,
        }
    }

    /// Whether this is the terminal watch-mode error
    #[must_use]
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, Error::RetryExhausted { .. })
    }
}
