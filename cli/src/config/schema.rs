//! Configuration schema for typed-middleware
//!
//! A complete [`GeneratorConfig`] is assembled from defaults plus any number
//! of partial [`ConfigLayer`]s read from disk, later layers overriding
//! earlier ones one field at a time.

use serde::{Deserialize, Serialize};
use typed_middleware::Conventions;

/// Effective generator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GeneratorConfig {
    /// Naming conventions linking capabilities to implementations
    #[serde(default)]
    pub conventions: Conventions,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Where and how generated code is written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Appended to the source file stem: `app.rs` → `app_middleware.rs`
    pub suffix: String,

    /// Path generated code uses to reach the runtime types
    pub runtime_crate: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: "_middleware".to_string(),
            runtime_crate: "typed_middleware".to_string(),
        }
    }
}

/// One configuration file; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(default)]
    pub conventions: ConventionsLayer,
    #[serde(default)]
    pub output: OutputLayer,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConventionsLayer {
    pub implementation_suffix: Option<String>,
    pub invocation_method: Option<String>,
    pub request_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputLayer {
    pub suffix: Option<String>,
    pub runtime_crate: Option<String>,
}

fn apply(target: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *target = value;
    }
}

impl GeneratorConfig {
    /// Override every field the layer sets
    pub fn merge(&mut self, layer: ConfigLayer) {
        let conventions = &mut self.conventions;
        apply(
            &mut conventions.implementation_suffix,
            layer.conventions.implementation_suffix,
        );
        apply(
            &mut conventions.invocation_method,
            layer.conventions.invocation_method,
        );
        apply(&mut conventions.request_type, layer.conventions.request_type);

        apply(&mut self.output.suffix, layer.output.suffix);
        apply(&mut self.output.runtime_crate, layer.output.runtime_crate);
    }

    /// Validate the configuration for common errors
    ///
    /// Returns Ok(()) if valid, or Err with a list of error messages
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.conventions.implementation_suffix.is_empty() {
            errors.push(
                "conventions.implementation_suffix cannot be empty: a capability would be its own implementation"
                    .to_string(),
            );
        } else if !is_identifier_tail(&self.conventions.implementation_suffix) {
            errors.push(format!(
                "conventions.implementation_suffix '{}' must contain only alphanumeric characters or underscores",
                self.conventions.implementation_suffix
            ));
        }

        if !is_identifier(&self.conventions.invocation_method) {
            errors.push(format!(
                "conventions.invocation_method '{}' is not a valid method name",
                self.conventions.invocation_method
            ));
        }

        if !is_path(&self.conventions.request_type) {
            errors.push(format!(
                "conventions.request_type '{}' is not a type path",
                self.conventions.request_type
            ));
        }

        if self.output.suffix.is_empty() {
            errors.push(
                "output.suffix cannot be empty: generated code would overwrite its source"
                    .to_string(),
            );
        } else if self.output.suffix.contains(['/', '\\']) {
            errors.push(format!(
                "output.suffix '{}' cannot contain path separators",
                self.output.suffix
            ));
        }

        if !is_path(&self.output.runtime_crate) {
            errors.push(format!(
                "output.runtime_crate '{}' is not a crate path",
                self.output.runtime_crate
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn is_identifier_tail(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn is_identifier(s: &str) -> bool {
    s.chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && is_identifier_tail(s)
}

/// `ident(::ident)*`, optionally with a leading `::`
fn is_path(s: &str) -> bool {
    let s = s.strip_prefix("::").unwrap_or(s);
    !s.is_empty() && s.split("::").all(is_identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GeneratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.output.suffix, "_middleware");
        assert_eq!(config.conventions.implementation_suffix, "Middleware");
    }

    #[test]
    fn test_merge_overrides_only_set_fields() {
        let mut config = GeneratorConfig::default();
        let layer: ConfigLayer = toml::from_str(
            r#"
[conventions]
invocation_method = "handle"

[output]
suffix = "_stack"
"#,
        )
        .unwrap();

        config.merge(layer);
        assert_eq!(config.conventions.invocation_method, "handle");
        assert_eq!(config.conventions.implementation_suffix, "Middleware");
        assert_eq!(config.output.suffix, "_stack");
        assert_eq!(config.output.runtime_crate, "typed_middleware");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result: Result<ConfigLayer, _> = toml::from_str("[output]\nsufix = \"_x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_collects_every_problem() {
        let mut config = GeneratorConfig::default();
        config.conventions.implementation_suffix = String::new();
        config.conventions.invocation_method = "1run".to_string();
        config.conventions.request_type = "http::".to_string();
        config.output.suffix = "gen/out".to_string();
        config.output.runtime_crate = "::typed_middleware".to_string();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors[0].contains("implementation_suffix"));
        assert!(errors[1].contains("invocation_method"));
        assert!(errors[2].contains("request_type"));
        assert!(errors[3].contains("path separators"));
    }

    #[test]
    fn test_path_syntax() {
        assert!(is_path("http::Request"));
        assert!(is_path("::http::Request"));
        assert!(is_path("Request"));
        assert!(!is_path("http::"));
        assert!(!is_path("&Request"));
        assert!(!is_path(""));
    }
}
