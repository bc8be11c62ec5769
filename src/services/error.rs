//! Failure taxonomy shared by both hops and its HTTP mapping.
//!
//! Callers only see fixed bodies; the detail goes to the span and the log.

use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::model::InvalidPostalCode;
use crate::observability::HopSpan;
use crate::upstream::LookupError;

pub const INVALID_BODY: &str = "invalid request body";
pub const INVALID_ZIPCODE: &str = "invalid zipcode";
pub const ZIPCODE_NOT_FOUND: &str = "can not find zipcode";
pub const INTERNAL_ERROR: &str = "internal server error";

type BoxError = Box<dyn StdError + Send + Sync>;

/// Coarse class of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-correctable input problem (4xx).
    Validation,
    /// The postal code resolves to nothing.
    NotFound,
    /// A dependency could not be reached, timed out, or answered non-200.
    UpstreamTransport,
    /// A dependency answered with an unexpected shape.
    Decode,
}

/// Why a request could not be answered with a composite result.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed request body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    #[error("invalid postal code: {0}")]
    InvalidPostalCode(#[from] InvalidPostalCode),

    #[error("postal code {0} not found")]
    NotFound(String),

    #[error("{target} call failed: {source}")]
    UpstreamTransport {
        target: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("{target} response could not be decoded: {source}")]
    Decode {
        target: &'static str,
        #[source]
        source: BoxError,
    },
}

impl PipelineError {
    pub fn upstream(target: &'static str, source: impl Into<BoxError>) -> Self {
        PipelineError::UpstreamTransport {
            target,
            source: source.into(),
        }
    }

    pub fn decode(target: &'static str, source: impl Into<BoxError>) -> Self {
        PipelineError::Decode {
            target,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::MalformedBody(_) | PipelineError::InvalidPostalCode(_) => {
                ErrorKind::Validation
            }
            PipelineError::NotFound(_) => ErrorKind::NotFound,
            PipelineError::UpstreamTransport { .. } => ErrorKind::UpstreamTransport,
            PipelineError::Decode { .. } => ErrorKind::Decode,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            PipelineError::InvalidPostalCode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::UpstreamTransport { .. } | PipelineError::Decode { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Body returned to the caller.
    pub fn public_body(&self) -> &'static str {
        match self {
            PipelineError::MalformedBody(_) => INVALID_BODY,
            PipelineError::InvalidPostalCode(_) => INVALID_ZIPCODE,
            PipelineError::NotFound(_) => ZIPCODE_NOT_FOUND,
            PipelineError::UpstreamTransport { .. } | PipelineError::Decode { .. } => {
                INTERNAL_ERROR
            }
        }
    }

    /// Span status description.
    fn span_description(&self) -> &'static str {
        match self {
            PipelineError::MalformedBody(_) => "invalid JSON",
            PipelineError::InvalidPostalCode(_) => "invalid postal code",
            PipelineError::NotFound(_) => "postal code not found",
            PipelineError::UpstreamTransport { .. } => "upstream call failed",
            PipelineError::Decode { .. } => "failed to decode upstream response",
        }
    }

    /// Record the failure on `span`, log it, and build the caller's response.
    pub fn into_traced_response(self, span: &HopSpan) -> Response {
        let status = self.status();
        span.record_status(status.as_u16());
        span.set_attribute(opentelemetry::KeyValue::new(
            crate::observability::span::keys::HTTP_RESPONSE_BODY_SIZE,
            self.public_body().len() as i64,
        ));
        span.fail(self.span_description(), Some(&self));

        if status.is_server_error() {
            tracing::error!(
                trace_id = %span.trace_id(),
                status = status.as_u16(),
                error = %self,
                "Request failed"
            );
        } else {
            tracing::info!(
                trace_id = %span.trace_id(),
                status = status.as_u16(),
                error = %self,
                "Request rejected"
            );
        }

        self.into_response()
    }
}

impl From<LookupError> for PipelineError {
    fn from(err: LookupError) -> Self {
        let target = err.target();
        if err.is_decode() {
            PipelineError::decode(target, err)
        } else {
            PipelineError::upstream(target, err)
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        (self.status(), self.public_body()).into_response()
    }
}
