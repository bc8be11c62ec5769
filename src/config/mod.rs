//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overlay: WEATHER_API_KEY, RESOLVER_URL, ...)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → handed to the gateway or resolver at construction
//! ```
//!
//! # Design Decisions
//! - Config is read once at process start and never reloaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The weather credential decides an explicit mode (live / fallback)

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ExporterKind, GatewayConfig, ObservabilityConfig, ResolverConfig, ServiceConfig,
    TimeoutConfig, WeatherMode,
};
pub use validation::ValidationError;
