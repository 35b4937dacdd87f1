//! Template resolution using minijinja.
//!
//! Configuration fields such as bucket names and folders are templates that
//! get rendered against a release context before use:
//!
//! ```json
//! {
//!   "bucket": "{{ project_name }}-releases",
//!   "folder": "{{ project_name }}/{{ tag }}"
//! }
//! ```
//!
//! Consumers depend on the [`Template`] trait so that the rendering engine can
//! be swapped out (tests use a plain map lookup, for example).

use minijinja::{Environment, UndefinedBehavior, Value};
use serde::Serialize;

/// Failure to render a template.
#[derive(Debug, thiserror::Error)]
#[error("failed to apply template '{pattern}': {message}")]
pub struct TemplateError {
  pub pattern: String,
  pub message: String,
}

/// Expands placeholders in a pattern against a release context.
pub trait Template: Send + Sync {
  fn apply(&self, pattern: &str) -> Result<String, TemplateError>;
}

/// A [`Template`] backed by minijinja and a fixed context.
///
/// Undefined variables are errors rather than empty strings, so a typo in a
/// bucket template fails the run instead of uploading to the wrong place.
pub struct ContextTemplate {
  env: Environment<'static>,
  context: Value,
}

impl ContextTemplate {
  /// Create a template resolver over any serializable context.
  pub fn new<S: Serialize>(context: &S) -> Self {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    Self {
      env,
      context: Value::from_serialize(context),
    }
  }

  /// Create a template resolver over a JSON object.
  pub fn from_json(context: serde_json::Value) -> Self {
    Self::new(&context)
  }
}

impl Template for ContextTemplate {
  fn apply(&self, pattern: &str) -> Result<String, TemplateError> {
    // Most fields carry no placeholders at all.
    if !pattern.contains("{{") && !pattern.contains("{%") {
      return Ok(pattern.to_string());
    }
    self
      .env
      .render_str(pattern, self.context.clone())
      .map_err(|e| TemplateError {
        pattern: pattern.to_string(),
        message: e.to_string(),
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn template() -> ContextTemplate {
    ContextTemplate::from_json(json!({
      "project_name": "stowage",
      "tag": "v1.2.0",
      "env": { "REGION": "eu-west-1" }
    }))
  }

  #[test]
  fn test_apply_literal() {
    assert_eq!(template().apply("releases").unwrap(), "releases");
  }

  #[test]
  fn test_apply_renders_variables() {
    let rendered = template().apply("{{ project_name }}/{{ tag }}").unwrap();
    assert_eq!(rendered, "stowage/v1.2.0");
  }

  #[test]
  fn test_apply_nested_field() {
    assert_eq!(template().apply("{{ env.REGION }}").unwrap(), "eu-west-1");
  }

  #[test]
  fn test_apply_undefined_variable_fails() {
    let err = template().apply("{{ nope }}").unwrap_err();
    assert_eq!(err.pattern, "{{ nope }}");
  }

  #[test]
  fn test_apply_syntax_error_fails() {
    assert!(template().apply("{{ project_name ").is_err());
  }
}
