//! Postal code parsing and the 8-digit rule.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of digits in a postal code.
pub const POSTAL_CODE_LEN: usize = 8;

/// Inbound body accepted by both hops: `{"cep": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PostalCodeRequest {
    #[serde(rename = "cep")]
    pub code: String,
}

impl PostalCodeRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }

    /// Parse a raw request body. Any shape mismatch is reported as the serde error.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

/// The postal code did not match the 8-digit rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("postal code must be exactly {POSTAL_CODE_LEN} decimal digits, got {len} characters")]
pub struct InvalidPostalCode {
    pub len: usize,
}

/// A postal code that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostalCode(String);

impl PostalCode {
    pub fn parse(raw: &str) -> Result<Self, InvalidPostalCode> {
        if is_valid_postal_code(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidPostalCode {
                len: raw.chars().count(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&PostalCodeRequest> for PostalCode {
    type Error = InvalidPostalCode;

    fn try_from(request: &PostalCodeRequest) -> Result<Self, Self::Error> {
        Self::parse(&request.code)
    }
}

/// True when `raw` is exactly eight ASCII decimal digits.
pub fn is_valid_postal_code(raw: &str) -> bool {
    raw.len() == POSTAL_CODE_LEN && raw.bytes().all(|b| b.is_ascii_digit())
}
