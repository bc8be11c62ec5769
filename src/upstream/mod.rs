//! Leaf clients for the external location and weather services.
//!
//! # Data Flow
//! ```text
//! PostalCode
//!     → LocationLookup::locate   (location.rs, ViaCEP shape)
//!     → LocationResult { found: false } stops the pipeline
//!     → WeatherSource::observe   (weather.rs)
//!         live:     WeatherLookup::current (WeatherAPI shape)
//!         fallback: fixed synthetic reading
//!     → WeatherReading
//! ```
//!
//! # Design Decisions
//! - Lookups are traits so the resolver can be driven by test doubles
//! - One attempt per call, bounded by the shared client deadline
//! - Spans are opened by the caller, so doubles are traced the same way

pub mod error;
pub mod location;
pub mod weather;

use async_trait::async_trait;

use crate::model::PostalCode;

pub use error::LookupError;
pub use location::ViaCepClient;
pub use weather::{FallbackReason, Observation, WeatherApiClient, WeatherSource};

/// Outcome of resolving a postal code to a place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationResult {
    pub place_name: String,
    pub region_code: String,
    pub found: bool,
}

impl LocationResult {
    pub fn found(place_name: impl Into<String>, region_code: impl Into<String>) -> Self {
        Self {
            place_name: place_name.into(),
            region_code: region_code.into(),
            found: true,
        }
    }

    pub fn not_found() -> Self {
        Self {
            place_name: String::new(),
            region_code: String::new(),
            found: false,
        }
    }
}

/// A current temperature reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherReading {
    pub celsius: f64,
}

impl WeatherReading {
    pub fn new(celsius: f64) -> Self {
        Self { celsius }
    }
}

/// Resolves a postal code to a place.
#[async_trait]
pub trait LocationLookup: Send + Sync {
    async fn locate(&self, code: &PostalCode) -> Result<LocationResult, LookupError>;
}

/// Fetches the current temperature for a place.
#[async_trait]
pub trait WeatherLookup: Send + Sync {
    async fn current(&self, place: &str) -> Result<WeatherReading, LookupError>;
}

/// Read at most `limit` bytes; the rest of the body is discarded with the response.
pub(crate) async fn read_prefix(mut response: reqwest::Response, limit: usize) -> reqwest::Result<Vec<u8>> {
    let mut prefix = Vec::new();
    while prefix.len() < limit {
        match response.chunk().await? {
            Some(chunk) => {
                let take = (limit - prefix.len()).min(chunk.len());
                prefix.extend_from_slice(&chunk[..take]);
            }
            None => break,
        }
    }
    Ok(prefix)
}

/// At most `limit` bytes of an error body, for diagnostics only.
pub(crate) async fn body_excerpt(response: reqwest::Response, limit: usize) -> String {
    match read_prefix(response, limit).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}
