//! Span guard owned by one hop.

use std::borrow::Cow;
use std::error::Error;

use opentelemetry::trace::{SpanId, Status, TraceContextExt, TraceId};
use opentelemetry::{Context, KeyValue};
use opentelemetry_semantic_conventions::trace::HTTP_RESPONSE_STATUS_CODE;

/// Attribute keys without a stable semantic-convention constant.
pub mod keys {
    pub const HTTP_REQUEST_BODY_SIZE: &str = "http.request.body.size";
    pub const HTTP_RESPONSE_BODY_SIZE: &str = "http.response.body.size";
    pub const CEP: &str = "cep";
    pub const CITY: &str = "city";
    pub const STATE: &str = "state";
    pub const TEMPERATURE_CELSIUS: &str = "temperature.celsius";
    pub const TEMPERATURE_FAHRENHEIT: &str = "temperature.fahrenheit";
    pub const TEMPERATURE_KELVIN: &str = "temperature.kelvin";
    pub const WEATHER_MODE: &str = "weather.mode";
    pub const REASON: &str = "reason";
}

/// A started span plus the context it is active in.
///
/// The span ends when the guard is dropped, so every return path closes it
/// exactly once. Child spans use [`HopSpan::context`] as their parent.
#[must_use = "dropping the guard ends the span immediately"]
pub struct HopSpan {
    cx: Context,
}

impl HopSpan {
    pub(crate) fn new(cx: Context) -> Self {
        Self { cx }
    }

    /// Context carrying this span; parent for children and source for injection.
    pub fn context(&self) -> &Context {
        &self.cx
    }

    pub fn trace_id(&self) -> TraceId {
        self.cx.span().span_context().trace_id()
    }

    pub fn span_id(&self) -> SpanId {
        self.cx.span().span_context().span_id()
    }

    pub fn set_attribute(&self, attribute: KeyValue) {
        self.cx.span().set_attribute(attribute);
    }

    pub fn set_attributes(&self, attributes: impl IntoIterator<Item = KeyValue>) {
        let span = self.cx.span();
        for attribute in attributes {
            span.set_attribute(attribute);
        }
    }

    pub fn event(&self, name: &'static str, attributes: Vec<KeyValue>) {
        self.cx.span().add_event(name, attributes);
    }

    /// Record the HTTP status code of the measured exchange.
    pub fn record_status(&self, status: u16) {
        self.cx
            .span()
            .set_attribute(KeyValue::new(HTTP_RESPONSE_STATUS_CODE, i64::from(status)));
    }

    pub fn succeed(&self) {
        self.cx.span().set_status(Status::Ok);
    }

    /// Mark the span errored; `cause`, when present, is attached as an `exception` event.
    pub fn fail(&self, description: impl Into<Cow<'static, str>>, cause: Option<&dyn Error>) {
        let span = self.cx.span();
        if let Some(err) = cause {
            span.record_error(err);
        }
        span.set_status(Status::error(description));
    }
}

impl Drop for HopSpan {
    fn drop(&mut self) {
        self.cx.span().end();
    }
}
