//! Header carriers for W3C trace context.
//!
//! Adapts `http::HeaderMap` (shared by axum and reqwest) to the
//! OpenTelemetry `Extractor` / `Injector` traits.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::propagation::{Extractor, Injector};

/// W3C Trace Context header carrying trace id, parent span id and flags.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Read-only view over inbound request headers.
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Write view over outbound request headers.
pub struct HeaderInjector<'a>(pub &'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                self.0.insert(name, value);
            }
            _ => tracing::debug!(header = key, "Skipping unrepresentable trace header"),
        }
    }
}
