//! Distributed tracing support.
//!
//! # Responsibilities
//! - Extract trace context from incoming requests
//! - Propagate trace context to outbound requests
//! - Create spans for hop operations
//! - Flush buffered spans at shutdown
//!
//! # Design Decisions
//! - `Telemetry` is built once at startup and cloned into handler state;
//!   nothing is installed globally
//! - Supports W3C Trace Context headers
//! - Spans go through the SDK batch processor, so request handling never
//!   waits on the exporter and export failures stay off the request path

use axum::http::HeaderMap;
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{SpanKind, TraceContextExt, Tracer, TracerProvider};
use opentelemetry::Context;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::error::OTelSdkError;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use thiserror::Error;

use crate::config::{ExporterKind, ObservabilityConfig};
use crate::observability::propagation::{HeaderExtractor, HeaderInjector};
use crate::observability::span::HopSpan;

/// Errors raised while setting up or tearing down the tracer provider.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to build span exporter: {0}")]
    Exporter(#[from] opentelemetry_otlp::ExporterBuildError),

    #[error("failed to flush spans: {0}")]
    Shutdown(#[from] OTelSdkError),
}

/// Tracer, propagator and provider for one service.
#[derive(Clone)]
pub struct Telemetry {
    service_name: String,
    provider: SdkTracerProvider,
    tracer: SdkTracer,
    propagator: TraceContextPropagator,
}

impl Telemetry {
    /// Build the provider described by `config` for `service_name`.
    pub fn init(service_name: &str, config: &ObservabilityConfig) -> Result<Self, TelemetryError> {
        let resource = Resource::builder()
            .with_service_name(service_name.to_string())
            .build();

        let provider = match config.exporter {
            ExporterKind::Otlp => {
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .with_endpoint(config.otlp_endpoint.clone())
                    .build()?;
                tracing::info!(
                    endpoint = %config.otlp_endpoint,
                    "OTLP span exporter configured"
                );
                SdkTracerProvider::builder()
                    .with_resource(resource)
                    .with_batch_exporter(exporter)
                    .build()
            }
            ExporterKind::None => {
                tracing::info!("Span export disabled; trace context is still propagated");
                SdkTracerProvider::builder().with_resource(resource).build()
            }
        };

        Ok(Self::from_provider(service_name, provider))
    }

    /// Wrap an already configured provider.
    pub fn from_provider(service_name: &str, provider: SdkTracerProvider) -> Self {
        let tracer = provider.tracer(service_name.to_string());
        Self {
            service_name: service_name.to_string(),
            provider,
            tracer,
            propagator: TraceContextPropagator::new(),
        }
    }

    /// Provider without any exporter.
    pub fn disabled(service_name: &str) -> Self {
        Self::from_provider(service_name, SdkTracerProvider::builder().build())
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Context carried by `headers`; empty when the headers hold none.
    ///
    /// An empty context makes the next span a new root, so missing or
    /// malformed headers never fail a request.
    pub fn extract(&self, headers: &HeaderMap) -> Context {
        self.propagator
            .extract_with_context(&Context::new(), &HeaderExtractor(headers))
    }

    /// Write the span context of `cx` into outbound `headers`.
    pub fn inject(&self, cx: &Context, headers: &mut HeaderMap) {
        self.propagator
            .inject_context(cx, &mut HeaderInjector(headers));
    }

    /// Start `name` as a child of whatever span `parent` holds.
    pub fn start(&self, name: &'static str, kind: SpanKind, parent: &Context) -> HopSpan {
        let span = self
            .tracer
            .span_builder(name)
            .with_kind(kind)
            .start_with_context(&self.tracer, parent);
        HopSpan::new(parent.with_span(span))
    }

    /// Flush pending spans and stop the exporter.
    pub fn shutdown(&self) -> Result<(), TelemetryError> {
        self.provider.shutdown()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::propagation::TRACEPARENT_HEADER;
    use axum::http::HeaderValue;
    use opentelemetry::trace::SpanId;
    use opentelemetry_sdk::trace::InMemorySpanExporter;

    fn in_memory() -> (Telemetry, InMemorySpanExporter) {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        (Telemetry::from_provider("test", provider), exporter)
    }

    #[test]
    fn test_missing_context_starts_root() {
        let (telemetry, exporter) = in_memory();
        let cx = telemetry.extract(&HeaderMap::new());
        assert!(!cx.span().span_context().is_valid());

        let span = telemetry.start("root", SpanKind::Server, &cx);
        assert!(span.context().span().span_context().is_valid());
        drop(span);

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].parent_span_id, SpanId::INVALID);
    }

    #[test]
    fn test_malformed_context_starts_root() {
        let (telemetry, _exporter) = in_memory();
        let mut headers = HeaderMap::new();
        headers.insert(TRACEPARENT_HEADER, HeaderValue::from_static("garbage"));
        let cx = telemetry.extract(&headers);
        assert!(!cx.span().span_context().is_valid());
    }

    #[test]
    fn test_inject_then_extract_continues_trace() {
        let (upstream, _) = in_memory();
        let (downstream, exporter) = in_memory();

        let root = upstream.start("outbound", SpanKind::Client, &Context::new());
        let mut headers = HeaderMap::new();
        upstream.inject(root.context(), &mut headers);
        assert!(headers.contains_key(TRACEPARENT_HEADER));

        let parent = downstream.extract(&headers);
        let child = downstream.start("inbound", SpanKind::Server, &parent);
        assert_eq!(child.trace_id(), root.trace_id());
        let root_span_id = root.span_id();
        drop(child);

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans[0].name, "inbound");
        assert_eq!(spans[0].parent_span_id, root_span_id);
    }

    #[test]
    fn test_span_ends_once_on_drop() {
        let (telemetry, exporter) = in_memory();
        let span = telemetry.start("once", SpanKind::Internal, &Context::new());
        span.record_status(200);
        span.succeed();
        drop(span);
        assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
    }

    #[test]
    fn test_disabled_still_propagates() {
        let telemetry = Telemetry::disabled("quiet");
        let span = telemetry.start("root", SpanKind::Server, &Context::new());
        let mut headers = HeaderMap::new();
        telemetry.inject(span.context(), &mut headers);
        let extracted = telemetry.extract(&headers);
        assert_eq!(extracted.span().span_context().trace_id(), span.trace_id());
        assert_eq!(telemetry.service_name(), "quiet");
    }

    #[test]
    fn test_collector_base_url_exports_to_traces_path() {
        use crate::config::loader::{apply_env_overrides, OTLP_ENDPOINT_ENV};
        use crate::config::ServiceConfig;
        use httpmock::prelude::*;

        let collector = MockServer::start();
        let traces = collector.mock(|when, then| {
            when.method(POST).path("/v1/traces");
            then.status(200);
        });

        let mut config = ServiceConfig::default();
        let base = collector.base_url();
        apply_env_overrides(&mut config, |key| {
            (key == OTLP_ENDPOINT_ENV).then(|| base.clone())
        });

        let telemetry = Telemetry::init("export-test", &config.observability).unwrap();
        let span = telemetry.start("exported", SpanKind::Server, &Context::new());
        drop(span);
        telemetry.shutdown().unwrap();

        traces.assert();
    }
}
