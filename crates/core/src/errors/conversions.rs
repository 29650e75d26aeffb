//! Conversions from library errors

use super::types::Error;
use std::path::PathBuf;

/// I/O errors without a known path; prefer [`Error::file_system`]
impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::FileSystem {
            path: PathBuf::new(),
            operation: "io".to_string(),
            source,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Error::Json {
            message: source.to_string(),
            source,
        }
    }
}
