//! The two hops of the pipeline.
//!
//! # Data Flow
//! ```text
//! Client ── POST /cep ──▶ gateway.rs
//!                           extract context, span handle_cep_request
//!                           validate (400 / 422)
//!                           span call_weather_service, inject context
//!                           ── POST /weather ──▶ resolver.rs
//!                                                  extract context, span handle_weather_request
//!                                                  re-validate (400 / 422)
//!                                                  location lookup (404 / 500)
//!                                                  weather source (live or fallback)
//!                                                  convert, 200 JSON
//!                           relay 200 / pass through non-200 / 500
//! ```
//!
//! # Design Decisions
//! - Each hop has exactly one handler; tracing is always on, export is optional
//! - Handlers take the raw body so malformed JSON maps to 400 uniformly
//! - No request-scoped data is shared between requests

pub mod error;
pub mod gateway;
pub mod resolver;

use axum::http::{header, HeaderMap};
use opentelemetry::KeyValue;
use opentelemetry_semantic_conventions::trace::{HTTP_REQUEST_METHOD, HTTP_ROUTE};

use crate::observability::span::keys;
use crate::observability::HopSpan;

pub use error::{ErrorKind, PipelineError};
pub use gateway::{GatewayState, SERVICE_NAME as GATEWAY_SERVICE};
pub use resolver::{ResolverState, SERVICE_NAME as RESOLVER_SERVICE};

/// Attributes common to both inbound spans.
fn describe_inbound(span: &HopSpan, route: &'static str, headers: &HeaderMap, body_len: usize) {
    let header_text = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };

    span.set_attributes([
        KeyValue::new(HTTP_REQUEST_METHOD, "POST"),
        KeyValue::new(HTTP_ROUTE, route),
        KeyValue::new(
            "http.request.header.content-type",
            header_text(header::CONTENT_TYPE),
        ),
        KeyValue::new(
            "http.request.header.user-agent",
            header_text(header::USER_AGENT),
        ),
        KeyValue::new(keys::HTTP_REQUEST_BODY_SIZE, body_len as i64),
    ]);
}
