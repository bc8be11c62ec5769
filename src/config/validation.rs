//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs before any listener binds
//! - Validate value ranges (timeouts > 0, limits > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{ServiceConfig, WeatherMode};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a socket address")]
    InvalidBindAddress { field: &'static str, value: String },

    #[error("{field}: '{value}' is not a valid http(s) URL")]
    InvalidUrl { field: &'static str, value: String },

    #[error("timeouts.upstream_secs must be greater than zero")]
    ZeroTimeout,

    #[error("gateway.error_body_limit must be greater than zero")]
    ZeroBodyLimit,

    #[error("weather.api_key must not be empty in live mode")]
    EmptyApiKey,

    #[error("weather.celsius must be a finite number, got {0}")]
    NonFiniteFallback(f64),
}

/// Check every semantic rule and collect the failures.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_bind(&mut errors, "gateway.bind_address", &config.gateway.bind_address);
    check_bind(&mut errors, "resolver.bind_address", &config.resolver.bind_address);
    check_url(&mut errors, "gateway.resolver_url", &config.gateway.resolver_url);
    check_url(&mut errors, "resolver.location_url", &config.resolver.location_url);
    check_url(&mut errors, "resolver.weather_url", &config.resolver.weather_url);
    check_url(
        &mut errors,
        "observability.otlp_endpoint",
        &config.observability.otlp_endpoint,
    );

    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.gateway.error_body_limit == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    match &config.weather {
        WeatherMode::Live { api_key } if api_key.trim().is_empty() => {
            errors.push(ValidationError::EmptyApiKey);
        }
        WeatherMode::Fallback { celsius } if !celsius.is_finite() => {
            errors.push(ValidationError::NonFiniteFallback(*celsius));
        }
        _ => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_bind(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    let ok = url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
        .unwrap_or(false);
    if !ok {
        errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
}
