//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{ServiceConfig, WeatherMode};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable carrying the weather provider credential.
pub const WEATHER_API_KEY_ENV: &str = "WEATHER_API_KEY";
/// Overrides `gateway.resolver_url`.
pub const RESOLVER_URL_ENV: &str = "RESOLVER_URL";
/// Base collector URL; the traces path is appended.
pub const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
/// Full traces URL, used as is. Takes precedence over `OTLP_ENDPOINT_ENV`.
pub const OTLP_TRACES_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_TRACES_ENDPOINT";

/// Path of the OTLP/HTTP traces signal under a collector base URL.
pub const OTLP_TRACES_PATH: &str = "/v1/traces";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration, overlay the process environment, then validate.
///
/// A missing `path` means "defaults only".
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables.
///
/// A non-empty `WEATHER_API_KEY` switches the weather mode to live; an empty or
/// absent one leaves the configured mode untouched.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(api_key) = non_empty(WEATHER_API_KEY_ENV) {
        config.weather = WeatherMode::Live { api_key };
    }
    if let Some(url) = non_empty(RESOLVER_URL_ENV) {
        config.gateway.resolver_url = url;
    }
    if let Some(endpoint) = non_empty(OTLP_TRACES_ENDPOINT_ENV) {
        config.observability.otlp_endpoint = endpoint;
    } else if let Some(base) = non_empty(OTLP_ENDPOINT_ENV) {
        config.observability.otlp_endpoint = traces_endpoint(&base);
    }
}

/// Traces URL for a collector base URL such as `http://collector:4318`.
pub fn traces_endpoint(base: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), OTLP_TRACES_PATH)
}
