//! Postal code lookup against a ViaCEP-compatible service.
//!
//! `GET {base}/{cep}/json/` answers `{"localidade": ..., "uf": ...}` or
//! `{"erro": true}` for unknown codes. Newer deployments send `"erro": "true"`.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

use crate::model::PostalCode;
use crate::upstream::{body_excerpt, LocationLookup, LocationResult, LookupError};

const TARGET: &str = "location";

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
    #[serde(default, deserialize_with = "flag")]
    erro: bool,
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s.eq_ignore_ascii_case("true"),
    })
}

/// HTTP client for the location service.
#[derive(Clone)]
pub struct ViaCepClient {
    client: reqwest::Client,
    base_url: String,
}

impl ViaCepClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url_for(&self, code: &PostalCode) -> String {
        format!("{}/{}/json/", self.base_url.trim_end_matches('/'), code)
    }
}

#[async_trait]
impl LocationLookup for ViaCepClient {
    async fn locate(&self, code: &PostalCode) -> Result<LocationResult, LookupError> {
        let url = self.url_for(code);
        tracing::debug!(url = %url, "Requesting location");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::from_reqwest(TARGET, e))?;

        let status = response.status();
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
        let parsed: ViaCepResponse =
            serde_json::from_slice(&body).map_err(|e| LookupError::Decode {
                target: TARGET,
                reason: e.to_string(),
            })?;

        if parsed.erro {
            return Ok(LocationResult::not_found());
        }
        if parsed.localidade.is_empty() {
            return Err(LookupError::Decode {
                target: TARGET,
                reason: "response has neither a place name nor an error flag".to_string(),
            });
        }
        Ok(LocationResult::found(parsed.localidade, parsed.uf))
    }
}
