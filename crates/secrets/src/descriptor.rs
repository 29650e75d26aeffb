//! Resolved secret descriptors.
//!
//! A [`SecretSpec`] is resolved exactly once, when configuration loads: the
//! path is rendered and the `format` template compiled. What remains is a
//! [`ResolvedSecret`] that knows how to turn fetched data into variables.

use crate::template::{value_to_string, KeyContext, Template, TemplateEngine};
use serde_json::Value;
use vault_env_core::{EnvironmentVariables, Result, SecretSpec};

/// Fields of a secret as returned by the store
pub type SecretData = serde_json::Map<String, Value>;

/// How fetched data becomes environment variables
#[derive(Debug, Clone)]
pub enum SecretStrategy {
    /// A single variable called `name`, rendered with all fields in scope
    Keyed { name: String, value: Template },
    /// One variable per field, the name rendered with `key` bound
    Expanded { name: Template, upcase: bool },
    /// Expanded over every child of a listed folder, with `folder` bound
    Folder { name: Template, upcase: bool },
}

#[derive(Debug, Clone)]
pub struct ResolvedSecret {
    path: String,
    strategy: SecretStrategy,
}

impl ResolvedSecret {
    /// Render the path and compile the format of `spec`.
    ///
    /// `key` takes precedence when a spec sets both `key` and `folder`.
    pub fn resolve(spec: &SecretSpec, engine: &TemplateEngine) -> Result<Self> {
        let path = engine.render_str(&spec.path)?;
        let format = engine.compile(&spec.format)?;

        let strategy = match (&spec.key, spec.folder) {
            (Some(key), folder) => {
                if folder {
                    tracing::warn!(
                        target: "descriptor",
                        path = %path,
                        "Both key and folder are set; using key"
                    );
                }
                SecretStrategy::Keyed {
                    name: key.clone(),
                    value: format,
                }
            }
            (None, true) => SecretStrategy::Folder {
                name: format,
                upcase: spec.upcase(),
            },
            (None, false) => SecretStrategy::Expanded {
                name: format,
                upcase: spec.upcase(),
            },
        };

        Ok(Self { path, strategy })
    }

    /// Resolve a list of specs, stopping at the first failure
    pub fn resolve_all(specs: &[SecretSpec], engine: &TemplateEngine) -> Result<Vec<Self>> {
        specs.iter().map(|spec| Self::resolve(spec, engine)).collect()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn strategy(&self) -> &SecretStrategy {
        &self.strategy
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.strategy, SecretStrategy::Folder { .. })
    }

    /// Store path of a child returned by listing this folder
    pub fn child_path(&self, child: &str) -> String {
        format!(
            "{}/{}",
            self.path.trim_end_matches('/'),
            child.trim_start_matches('/')
        )
    }

    /// Variables for one fetched secret.
    ///
    /// A folder strategy applied to a single secret behaves like the
    /// expanded strategy with `folder` left unset.
    pub fn format(&self, data: &SecretData) -> Result<EnvironmentVariables> {
        match &self.strategy {
            SecretStrategy::Keyed { name, value } => {
                let mut env = EnvironmentVariables::new();
                env.insert(name.clone(), value.render(data)?);
                Ok(env)
            }
            SecretStrategy::Expanded { name, upcase } | SecretStrategy::Folder { name, upcase } => {
                expand(name, *upcase, data, None)
            }
        }
    }

    /// Variables for every child of a folder, merged in listing order
    pub fn format_folder(&self, children: &[(String, SecretData)]) -> Result<EnvironmentVariables> {
        let mut env = EnvironmentVariables::new();
        for (child, data) in children {
            let part = match &self.strategy {
                SecretStrategy::Folder { name, upcase } | SecretStrategy::Expanded { name, upcase } => {
                    expand(name, *upcase, data, Some(child.trim_end_matches('/')))?
                }
                SecretStrategy::Keyed { .. } => self.format(data)?,
            };
            env.merge(part);
        }
        Ok(env)
    }
}

fn expand(
    name: &Template,
    upcase: bool,
    data: &SecretData,
    folder: Option<&str>,
) -> Result<EnvironmentVariables> {
    let mut env = EnvironmentVariables::new();
    for (key, value) in data {
        let rendered = name.render(&KeyContext { key, folder })?;
        let rendered = if upcase {
            rendered.to_uppercase()
        } else {
            rendered
        };
        env.insert(rendered, value_to_string(value));
    }
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;
    use vault_env_core::Error;

    fn engine() -> TemplateEngine {
        let env: HashMap<String, String> = [("STAGE".to_string(), "staging".to_string())]
            .into_iter()
            .collect();
        TemplateEngine::new(Arc::new(env))
    }

    fn data(value: Value) -> SecretData {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn env(pairs: &[(&str, &str)]) -> EnvironmentVariables {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_expanded_upcases_names() {
        let secret =
            ResolvedSecret::resolve(&SecretSpec::expanded("secret/db", "DB_<%= key %>"), &engine())
                .unwrap();
        let out = secret
            .format(&data(json!({"user": "app", "password": "p@ss"})))
            .unwrap();
        assert_eq!(out, env(&[("DB_PASSWORD", "p@ss"), ("DB_USER", "app")]));
    }

    #[test]
    fn test_expanded_without_upcase() {
        let spec = SecretSpec::expanded("secret/db", "db_<%= key %>").with_upcase(false);
        let secret = ResolvedSecret::resolve(&spec, &engine()).unwrap();
        let out = secret.format(&data(json!({"user": "app"}))).unwrap();
        assert_eq!(out, env(&[("db_user", "app")]));
    }

    #[test]
    fn test_keyed_name_is_verbatim() {
        let spec = SecretSpec::keyed(
            "secret/db",
            "database_url",
            "postgres://<%= user %>:<%= password %>@db:5432",
        );
        let secret = ResolvedSecret::resolve(&spec, &engine()).unwrap();
        let out = secret
            .format(&data(json!({"user": "app", "password": "p@ss word"})))
            .unwrap();
        assert_eq!(out, env(&[("database_url", "postgres://app:p@ss word@db:5432")]));
    }

    #[test]
    fn test_keyed_unknown_field_fails() {
        let spec = SecretSpec::keyed("secret/db", "URL", "<%= missing %>");
        let secret = ResolvedSecret::resolve(&spec, &engine()).unwrap();
        let err = secret.format(&data(json!({"user": "app"}))).unwrap_err();
        assert!(err.is_template_error());
    }

    #[test]
    fn test_key_wins_over_folder() {
        let mut spec = SecretSpec::keyed("secret/app", "TOKEN", "<%= token %>");
        spec.folder = true;
        let secret = ResolvedSecret::resolve(&spec, &engine()).unwrap();
        assert!(!secret.is_folder());
        assert!(matches!(secret.strategy(), SecretStrategy::Keyed { .. }));
    }

    #[test]
    fn test_folder_children() {
        let secret = ResolvedSecret::resolve(
            &SecretSpec::folder("secret/services/", "<%= folder %>:<%= key %>"),
            &engine(),
        )
        .unwrap();
        assert!(secret.is_folder());
        assert_eq!(secret.child_path("rmq"), "secret/services/rmq");

        let children = vec![
            ("rmq".to_string(), data(json!({"username": "u"}))),
            ("newrelic".to_string(), data(json!({"apikey": "k"}))),
        ];
        let out = secret.format_folder(&children).unwrap();
        assert_eq!(out, env(&[("NEWRELIC:APIKEY", "k"), ("RMQ:USERNAME", "u")]));
    }

    #[test]
    fn test_path_is_rendered_once() {
        let secret = ResolvedSecret::resolve(
            &SecretSpec::expanded("secret/<%= env('STAGE') %>/mysql", "<%= key %>"),
            &engine(),
        )
        .unwrap();
        assert_eq!(secret.path(), "secret/staging/mysql");
    }

    #[test]
    fn test_missing_env_in_path() {
        let err = ResolvedSecret::resolve(
            &SecretSpec::expanded("secret/<%= env('X') %>/mysql", "<%= key %>"),
            &engine(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Environment variable \"X\" must be set.");
    }

    #[test]
    fn test_invalid_format_fails_at_resolve() {
        let err = ResolvedSecret::resolve(&SecretSpec::expanded("secret/a", "<%= key"), &engine())
            .unwrap_err();
        assert!(matches!(err, Error::TemplateSyntax { .. }));
    }

    #[test]
    fn test_empty_data_gives_empty_mapping() {
        let secret =
            ResolvedSecret::resolve(&SecretSpec::expanded("secret/a", "<%= key %>"), &engine())
                .unwrap();
        assert!(secret.format(&SecretData::new()).unwrap().is_empty());
    }

    #[test]
    fn test_non_string_values() {
        let secret =
            ResolvedSecret::resolve(&SecretSpec::expanded("secret/a", "<%= key %>"), &engine())
                .unwrap();
        let out = secret
            .format(&data(json!({"port": 5432, "debug": false, "tags": ["a", "b"], "none": null})))
            .unwrap();
        assert_eq!(
            out,
            env(&[
                ("DEBUG", "false"),
                ("NONE", ""),
                ("PORT", "5432"),
                ("TAGS", "[\"a\",\"b\"]"),
            ])
        );
    }
}
