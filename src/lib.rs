//! CEP weather pipeline library
//!
//! A gateway hop (`POST /cep`) and a resolver hop (`POST /weather`) that turn
//! a Brazilian postal code into the current temperature of its city, with
//! W3C trace context carried across both hops.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod model;
pub mod observability;
pub mod resilience;
pub mod services;
pub mod upstream;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::{Role, Shutdown};
pub use model::{CompositeResult, PostalCode};
pub use observability::Telemetry;
