//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported config format '{0}', expected toml, json, yaml or yml")]
    UnsupportedFormat(String),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Config file formats, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match extension.as_str() {
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Parse, validate and resolve configuration text.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = match format {
        ConfigFormat::Toml => toml::from_str(content)?,
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config.resolve())
}

/// Load and validate configuration from a TOML, JSON or YAML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path)?;
    parse_config(&content, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ApplyMoment;
    use crate::transform::ModifierAction;
    use std::io::Write;
    use std::time::Duration;

    const TOML_CONFIG: &str = r##"
timeout_ms = 2000

[[endpoints]]
path = "/users/:id"
method = "GET"
abort_if_status_codes = [401, 503]

[endpoints.response]
aggregate = true
nomenclature = "SNAKE"

[[endpoints.backends]]
name = "users"
hosts = ["localhost:9001"]
path = "/users/:id"

[endpoints.backends.response]
group = "user"
apply = "LATE"

[endpoints.backends.response.projection]
id = 1
name = 1

[[endpoints.backends.modifiers.header]]
action = "SET"
key = "X-Tenant"
value = "#request.header.X-Tenant[0]"
propagate = true
"##;

    #[test]
    fn test_parse_toml() {
        let config = parse_config(TOML_CONFIG, ConfigFormat::Toml).unwrap();
        let endpoint = &config.endpoints[0];
        let backend = &endpoint.backends[0];

        assert_eq!(endpoint.effective.timeout, Duration::from_millis(2000));
        assert_eq!(endpoint.effective.backend_count, 1);
        assert!(endpoint.abort(401));
        assert!(!endpoint.abort(500));
        assert!(endpoint.response.aggregate);
        assert_eq!(backend.response.group.as_deref(), Some("user"));
        assert_eq!(backend.response.apply, ApplyMoment::Late);
        assert_eq!(backend.forward_headers, ["*"]);
        assert_eq!(backend.modifiers.header[0].action, ModifierAction::Set);
        assert!(backend.modifiers.header[0].propagate);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
endpoints:
  - path: /orders
    method: POST
    backends:
      - name: orders
        hosts: ["localhost:9002"]
        path: /orders
        modifiers:
          body:
            - action: ADD
              key: source
              value: gateway
"#;
        let config = parse_config(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.endpoints[0].method, "POST");
        assert_eq!(config.endpoints[0].backends[0].modifiers.body[0].key, "source");
    }

    #[test]
    fn test_load_from_file_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"endpoints":[{{"path":"/ping","backends":[{{"hosts":["localhost:9003"]}}]}}]}}"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.endpoints[0].path, "/ping");
    }

    #[test]
    fn test_validation_failure_is_reported() {
        let err = parse_config(
            r#"{"endpoints":[{"path":"/empty"}]}"#,
            ConfigFormat::Json,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            ConfigFormat::from_path(Path::new("gateway.ini")),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
