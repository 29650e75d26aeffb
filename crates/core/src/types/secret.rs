//! Declarative secret specifications as written in the configuration file

use serde::{Deserialize, Serialize};

/// One entry of the `secrets` list.
///
/// `path` and `format` are templates. The presence of `key` and `folder`
/// decides how fetched data becomes environment variables:
///
/// - `key` set: a single variable named `key`, its value rendered from `format`
///   with every fetched field in scope.
/// - neither: one variable per fetched field, named by rendering `format`
///   with `key` bound to the field name.
/// - `folder: true`: like the previous case, for every child of the listed
///   path, with `folder` bound to the child name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretSpec {
    pub path: String,
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub folder: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upcase: Option<bool>,
}

impl SecretSpec {
    /// Spec producing one variable per fetched field
    #[must_use]
    pub fn expanded(path: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format: format.into(),
            key: None,
            folder: false,
            upcase: None,
        }
    }

    /// Spec producing a single variable named `key`
    #[must_use]
    pub fn keyed(
        path: impl Into<String>,
        key: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::expanded(path, format)
        }
    }

    /// Spec expanding every child of a folder
    #[must_use]
    pub fn folder(path: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            folder: true,
            ..Self::expanded(path, format)
        }
    }

    #[must_use]
    pub fn with_upcase(mut self, upcase: bool) -> Self {
        self.upcase = Some(upcase);
        self
    }

    /// Whether generated names are upper-cased; `true` unless disabled
    #[must_use]
    pub fn upcase(&self) -> bool {
        self.upcase.unwrap_or(true)
    }
}
