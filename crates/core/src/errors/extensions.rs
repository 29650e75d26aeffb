//! Extension traits for attaching vault-env context to results

use super::types::{Error, Result};

pub trait ResultExt<T> {
    /// Turn any convertible error into a configuration error prefixed
    /// with `message`
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Attribute a store failure to the secret at `path`
    fn for_secret(self, path: &str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::configuration(format!("{}: {}", message.into(), e.into())))
    }

    fn for_secret(self, path: &str) -> Result<T> {
        self.map_err(|e| Error::secret_fetch(path, e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_becomes_configuration_error() {
        let result: std::result::Result<(), serde_json::Error> =
            serde_json::from_str::<()>("{").map(|_| ());

        let err = result.context("invalid vault section").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("invalid vault section"));
    }

    #[test]
    fn test_for_secret_names_path() {
        let result: Result<()> = Err(Error::store("GET", "/v1/secret/a", "sealed"));

        let err = result.for_secret("secret/a").unwrap_err();
        assert!(matches!(err, Error::SecretFetch { ref path, .. } if path == "secret/a"));
    }
}
