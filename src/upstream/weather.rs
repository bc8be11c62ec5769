//! Current temperature from a WeatherAPI-compatible provider, with the
//! fixed-reading fallback used when no usable credential exists.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::schema::{WeatherMode, DEFAULT_FALLBACK_CELSIUS};
use crate::upstream::{body_excerpt, LookupError, WeatherLookup, WeatherReading};

const TARGET: &str = "weather";

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: Current,
}

#[derive(Debug, Deserialize)]
struct Current {
    temp_c: f64,
}

/// HTTP client for the weather provider.
#[derive(Clone)]
pub struct WeatherApiClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl WeatherApiClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl WeatherLookup for WeatherApiClient {
    async fn current(&self, place: &str) -> Result<WeatherReading, LookupError> {
        // The key travels in the query string; keep the URL out of logs.
        tracing::debug!(place = %place, "Requesting current weather");

        let response = self
            .client
            .get(&self.url)
            .query(&[("key", self.api_key.as_str()), ("q", place), ("aqi", "no")])
            .send()
            .await
            .map_err(|e| LookupError::from_reqwest(TARGET, e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LookupError::Unauthorized {
                target: TARGET,
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(LookupError::Status {
                target: TARGET,
                status: status.as_u16(),
                body: body_excerpt(response, 256).await,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| LookupError::from_reqwest(TARGET, e))?;
        let parsed: CurrentResponse =
            serde_json::from_slice(&body).map_err(|e| LookupError::Decode {
                target: TARGET,
                reason: e.to_string(),
            })?;

        if !parsed.current.temp_c.is_finite() {
            return Err(LookupError::Decode {
                target: TARGET,
                reason: format!("non-finite temperature {}", parsed.current.temp_c),
            });
        }
        Ok(WeatherReading::new(parsed.current.temp_c))
    }
}

/// Why a synthetic reading replaced a provider answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// No credential configured.
    NoCredential,
    /// The provider refused the configured credential.
    CredentialRejected,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::NoCredential => "no_api_key",
            FallbackReason::CredentialRejected => "credential_rejected",
        }
    }
}

/// A reading and, if synthetic, why.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub reading: WeatherReading,
    pub fallback: Option<FallbackReason>,
}

/// Where the resolver gets temperatures from.
#[derive(Clone)]
pub enum WeatherSource {
    /// Ask the provider; substitute `fallback` if it rejects the credential.
    Live {
        lookup: Arc<dyn WeatherLookup>,
        fallback: WeatherReading,
    },
    /// Always serve this reading.
    Fallback(WeatherReading),
}

impl WeatherSource {
    /// Build the source selected by the configured mode.
    pub fn from_mode(mode: &WeatherMode, client: reqwest::Client, url: &str) -> Self {
        match mode {
            WeatherMode::Live { api_key } => {
                Self::live(Arc::new(WeatherApiClient::new(client, url, api_key.clone())))
            }
            WeatherMode::Fallback { celsius } => Self::fallback(*celsius),
        }
    }

    pub fn live(lookup: Arc<dyn WeatherLookup>) -> Self {
        WeatherSource::Live {
            lookup,
            fallback: WeatherReading::new(DEFAULT_FALLBACK_CELSIUS),
        }
    }

    pub fn fallback(celsius: f64) -> Self {
        WeatherSource::Fallback(WeatherReading::new(celsius))
    }

    pub fn mode_name(&self) -> &'static str {
        match self {
            WeatherSource::Live { .. } => "live",
            WeatherSource::Fallback(_) => "fallback",
        }
    }

    /// Current reading for `place`.
    ///
    /// Only a credential rejection is absorbed; every other lookup error is returned.
    pub async fn observe(&self, place: &str) -> Result<Observation, LookupError> {
        match self {
            WeatherSource::Fallback(reading) => Ok(Observation {
                reading: *reading,
                fallback: Some(FallbackReason::NoCredential),
            }),
            WeatherSource::Live { lookup, fallback } => match lookup.current(place).await {
                Ok(reading) => Ok(Observation {
                    reading,
                    fallback: None,
                }),
                Err(LookupError::Unauthorized { status, .. }) => {
                    tracing::warn!(
                        status,
                        "Weather provider rejected the credential, serving fallback reading"
                    );
                    Ok(Observation {
                        reading: *fallback,
                        fallback: Some(FallbackReason::CredentialRejected),
                    })
                }
                Err(e) => Err(e),
            },
        }
    }
}
