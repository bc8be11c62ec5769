//! Configuration schema definitions.
//!
//! One document configures both hops; each binary reads the sections it needs.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Root configuration shared by the gateway and the resolver.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// First hop: accepts `/cep` and forwards to the resolver.
    pub gateway: GatewayConfig,

    /// Second hop: resolves location and weather.
    pub resolver: ResolverConfig,

    /// Weather provider mode.
    pub weather: WeatherMode,

    /// Outbound call deadlines.
    pub timeouts: TimeoutConfig,

    /// Logging, tracing and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Full URL of the resolver's `/weather` endpoint.
    pub resolver_url: String,

    /// Maximum bytes of a non-200 resolver body relayed to the caller.
    pub error_body_limit: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            resolver_url: "http://service-b:8081/weather".to_string(),
            error_body_limit: 1024,
        }
    }
}

/// Resolver configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Bind address (e.g., "0.0.0.0:8081").
    pub bind_address: String,

    /// Base URL of the postal code lookup service.
    pub location_url: String,

    /// Current-conditions endpoint of the weather provider.
    pub weather_url: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8081".to_string(),
            location_url: "https://viacep.com.br/ws".to_string(),
            weather_url: "https://api.weatherapi.com/v1/current.json".to_string(),
        }
    }
}

/// Default reading used while no provider credential is available.
pub const DEFAULT_FALLBACK_CELSIUS: f64 = 25.0;

/// How the resolver obtains the current temperature.
///
/// ```toml
/// [weather]
/// mode = "live"
/// api_key = "..."
/// ```
#[derive(Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum WeatherMode {
    /// Query the provider with this credential.
    Live { api_key: String },

    /// Serve a fixed synthetic reading.
    Fallback {
        #[serde(default = "default_fallback_celsius")]
        celsius: f64,
    },
}

fn default_fallback_celsius() -> f64 {
    DEFAULT_FALLBACK_CELSIUS
}

impl WeatherMode {
    pub fn name(&self) -> &'static str {
        match self {
            WeatherMode::Live { .. } => "live",
            WeatherMode::Fallback { .. } => "fallback",
        }
    }
}

impl Default for WeatherMode {
    fn default() -> Self {
        WeatherMode::Fallback {
            celsius: DEFAULT_FALLBACK_CELSIUS,
        }
    }
}

// Never print the credential.
impl fmt::Debug for WeatherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherMode::Live { .. } => f
                .debug_struct("Live")
                .field("api_key", &"<redacted>")
                .finish(),
            WeatherMode::Fallback { celsius } => {
                f.debug_struct("Fallback").field("celsius", celsius).finish()
            }
        }
    }
}

/// Timeout configuration for outbound calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for each outbound call (gateway→resolver, location, weather) in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { upstream_secs: 10 }
    }
}

/// Span exporter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExporterKind {
    /// OTLP over HTTP/protobuf, batched.
    Otlp,
    /// Spans are created and propagated but not exported.
    None,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Span exporter.
    pub exporter: ExporterKind,

    /// OTLP traces endpoint.
    pub otlp_endpoint: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            exporter: ExporterKind::Otlp,
            otlp_endpoint: "http://localhost:4318/v1/traces".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
