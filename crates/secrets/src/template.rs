//! Templates for secret paths, variable names and values.
//!
//! Two marker styles are accepted: `<%= expr %>` and `${expr}`. An
//! expression is either a variable taken from the render context (`key`,
//! `folder`, or a fetched field for keyed secrets) or `env('NAME')`, which
//! reads through the [`EnvLookup`] handed to the [`TemplateEngine`].

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use vault_env_core::{Error, Result};

lazy_static! {
    static ref MARKER_REGEX: Regex = Regex::new(r"<%=([\s\S]+?)%>|\$\{([^}]*)\}").unwrap();
    static ref IDENT_REGEX: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
    static ref ENV_CALL_REGEX: Regex =
        Regex::new(r#"^env\(\s*(?:'([^']*)'|"([^"]*)")\s*\)$"#).unwrap();
}

/// Read-only access to environment variables for `env(name)`
pub trait EnvLookup: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the environment of the current process
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvLookup for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// How a context answers for a variable name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding<'a> {
    Bound(Cow<'a, str>),
    /// Known name without a value; renders as the empty string
    Unset,
    Unknown,
}

/// Variables visible to a template while rendering
pub trait TemplateContext {
    fn binding(&self, name: &str) -> Binding<'_>;
}

/// Context without any variables, used for store paths
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

impl TemplateContext for NoContext {
    fn binding(&self, _name: &str) -> Binding<'_> {
        Binding::Unknown
    }
}

/// Context for naming variables after fetched fields
#[derive(Debug, Clone, Copy)]
pub struct KeyContext<'a> {
    pub key: &'a str,
    pub folder: Option<&'a str>,
}

impl TemplateContext for KeyContext<'_> {
    fn binding(&self, name: &str) -> Binding<'_> {
        match name {
            "key" => Binding::Bound(Cow::Borrowed(self.key)),
            "folder" => match self.folder {
                Some(folder) => Binding::Bound(Cow::Borrowed(folder)),
                None => Binding::Unset,
            },
            _ => Binding::Unknown,
        }
    }
}

/// Keyed secrets render their value with every fetched field in scope
impl TemplateContext for serde_json::Map<String, Value> {
    fn binding(&self, name: &str) -> Binding<'_> {
        match self.get(name) {
            Some(value) => Binding::Bound(value_to_string(value)),
            None => Binding::Unknown,
        }
    }
}

/// Textual form of a fetched value as it ends up in the environment
pub fn value_to_string(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Null => Cow::Borrowed(""),
        Value::Bool(b) => Cow::Owned(b.to_string()),
        Value::Number(n) => Cow::Owned(n.to_string()),
        other => Cow::Owned(other.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
    Env(String),
}

/// Compiles templates that share one environment lookup
#[derive(Clone)]
pub struct TemplateEngine {
    env: Arc<dyn EnvLookup>,
}

impl TemplateEngine {
    pub fn new(env: Arc<dyn EnvLookup>) -> Self {
        Self { env }
    }

    /// Engine reading the real process environment
    pub fn from_process_env() -> Self {
        Self::new(Arc::new(ProcessEnv))
    }

    pub fn compile(&self, source: &str) -> Result<Template> {
        Ok(Template {
            source: source.to_string(),
            segments: parse(source)?,
            env: Arc::clone(&self.env),
        })
    }

    /// Compile and render without context in one go
    pub fn render_str(&self, source: &str) -> Result<String> {
        self.compile(source)?.render(&NoContext)
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::from_process_env()
    }
}

impl fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateEngine").finish_non_exhaustive()
    }
}

/// A compiled template
#[derive(Clone)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
    env: Arc<dyn EnvLookup>,
}

impl Template {
    pub fn render(&self, context: &dyn TemplateContext) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => match context.binding(name) {
                    Binding::Bound(value) => out.push_str(&value),
                    Binding::Unset => {}
                    Binding::Unknown => {
                        return Err(Error::template_render(
                            &self.source,
                            format!("{name} is not defined"),
                        ))
                    }
                },
                Segment::Env(name) => match self.env.var(name) {
                    Some(value) => out.push_str(&value),
                    None => return Err(Error::missing_environment_variable(name)),
                },
            }
        }

        Ok(out)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

fn parse(source: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in MARKER_REGEX.captures_iter(source) {
        let Some(whole) = caps.get(0) else { continue };
        push_literal(source, &source[last..whole.start()], &mut segments)?;

        let expr = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str().trim());
        segments.push(parse_expression(source, expr)?);
        last = whole.end();
    }

    push_literal(source, &source[last..], &mut segments)?;
    Ok(segments)
}

fn push_literal(source: &str, text: &str, segments: &mut Vec<Segment>) -> Result<()> {
    if text.contains("<%") {
        return Err(Error::template_syntax(
            source,
            "unterminated or unsupported '<%' marker, only '<%= expr %>' is allowed",
        ));
    }
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
    Ok(())
}

fn parse_expression(source: &str, expr: &str) -> Result<Segment> {
    if let Some(caps) = ENV_CALL_REGEX.captures(expr) {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str());
        if name.is_empty() {
            return Err(Error::template_syntax(source, "env() needs a variable name"));
        }
        return Ok(Segment::Env(name.to_string()));
    }

    if IDENT_REGEX.is_match(expr) {
        return Ok(Segment::Variable(expr.to_string()));
    }

    Err(Error::template_syntax(
        source,
        format!("unsupported expression '{expr}'"),
    ))
}
