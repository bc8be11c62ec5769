//! Second hop: accept `POST /weather`, resolve location and temperature.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use opentelemetry::trace::SpanKind;
use opentelemetry::{Context, KeyValue};

use crate::config::ServiceConfig;
use crate::model::{CompositeResult, PostalCode, PostalCodeRequest};
use crate::observability::span::keys;
use crate::observability::{metrics, HopSpan, Telemetry};
use crate::resilience::outbound_client;
use crate::services::{describe_inbound, PipelineError};
use crate::upstream::{
    LocationLookup, LocationResult, Observation, ViaCepClient, WeatherSource,
};

/// Service name reported on spans and metrics.
pub const SERVICE_NAME: &str = "weather-service";
pub const ROUTE: &str = "/weather";

/// Dependencies injected into the resolver handler.
#[derive(Clone)]
pub struct ResolverState {
    pub telemetry: Telemetry,
    pub location: Arc<dyn LocationLookup>,
    pub weather: WeatherSource,
}

impl ResolverState {
    pub fn new(telemetry: Telemetry, location: Arc<dyn LocationLookup>, weather: WeatherSource) -> Self {
        Self {
            telemetry,
            location,
            weather,
        }
    }

    /// Real HTTP lookups sharing one deadline-bounded client.
    pub fn from_config(config: &ServiceConfig, telemetry: Telemetry) -> reqwest::Result<Self> {
        let client = outbound_client(&config.timeouts)?;
        let location = Arc::new(ViaCepClient::new(
            client.clone(),
            config.resolver.location_url.clone(),
        ));
        let weather = WeatherSource::from_mode(&config.weather, client, &config.resolver.weather_url);
        Ok(Self::new(telemetry, location, weather))
    }
}

/// Routes served by the resolver. Other methods on `/weather` get 405.
pub fn router(state: ResolverState) -> Router {
    Router::new()
        .route(ROUTE, post(accept_weather_request))
        .with_state(state)
}

/// `POST /weather` handler.
pub async fn accept_weather_request(
    State(state): State<ResolverState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let parent = state.telemetry.extract(&headers);
    let span = state
        .telemetry
        .start("handle_weather_request", SpanKind::Server, &parent);
    describe_inbound(&span, ROUTE, &headers, body.len());

    let response = match resolve(&state, &span, &body).await {
        Ok(result) => {
            let body_len = serde_json::to_vec(&result).map(|b| b.len()).unwrap_or_default();
            span.record_status(StatusCode::OK.as_u16());
            span.set_attributes([
                KeyValue::new(keys::HTTP_RESPONSE_BODY_SIZE, body_len as i64),
                KeyValue::new(keys::CITY, result.city.clone()),
                KeyValue::new(keys::TEMPERATURE_CELSIUS, result.temp_c),
                KeyValue::new(keys::TEMPERATURE_FAHRENHEIT, result.temp_f),
                KeyValue::new(keys::TEMPERATURE_KELVIN, result.temp_k),
            ]);
            span.event(
                "weather data processed successfully",
                vec![KeyValue::new(keys::CITY, result.city.clone())],
            );
            span.succeed();
            tracing::info!(
                trace_id = %span.trace_id(),
                city = %result.city,
                temp_c = result.temp_c,
                temp_f = result.temp_f,
                temp_k = result.temp_k,
                "Resolved temperature"
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(err) => err.into_traced_response(&span),
    };

    metrics::record_request(SERVICE_NAME, response.status().as_u16(), start);
    response
}

async fn resolve(
    state: &ResolverState,
    span: &HopSpan,
    body: &[u8],
) -> Result<CompositeResult, PipelineError> {
    let request = PostalCodeRequest::from_slice(body).map_err(PipelineError::MalformedBody)?;
    span.set_attribute(KeyValue::new(keys::CEP, request.code.clone()));
    span.event(
        "cep request received",
        vec![KeyValue::new(keys::CEP, request.code.clone())],
    );

    // Checked again here: the resolver may be called without the gateway.
    let code = PostalCode::try_from(&request).map_err(|e| {
        span.event(
            "cep validation failed",
            vec![KeyValue::new(keys::CEP, request.code.clone())],
        );
        PipelineError::from(e)
    })?;
    span.event("cep validation successful", vec![]);

    let location = locate(state, span.context(), &code).await?;
    if !location.found {
        span.event(
            "cep not found",
            vec![KeyValue::new(keys::CEP, code.to_string())],
        );
        return Err(PipelineError::NotFound(code.to_string()));
    }

    let observation = observe(state, span.context(), &location.place_name).await?;
    Ok(CompositeResult::from_celsius(
        location.place_name,
        observation.reading.celsius,
    ))
}

async fn locate(
    state: &ResolverState,
    parent: &Context,
    code: &PostalCode,
) -> Result<LocationResult, PipelineError> {
    let span = state
        .telemetry
        .start("get_location_from_cep", SpanKind::Internal, parent);
    span.set_attribute(KeyValue::new(keys::CEP, code.to_string()));

    match state.location.locate(code).await {
        Ok(location) if location.found => {
            span.event(
                "location found",
                vec![
                    KeyValue::new(keys::CITY, location.place_name.clone()),
                    KeyValue::new(keys::STATE, location.region_code.clone()),
                ],
            );
            span.succeed();
            metrics::record_upstream("location", "ok");
            Ok(location)
        }
        Ok(location) => {
            span.fail("postal code not found", None);
            metrics::record_upstream("location", "not_found");
            Ok(location)
        }
        Err(e) => {
            span.fail("location lookup failed", Some(&e));
            metrics::record_upstream("location", e.outcome());
            Err(e.into())
        }
    }
}

async fn observe(
    state: &ResolverState,
    parent: &Context,
    place: &str,
) -> Result<Observation, PipelineError> {
    let span = state.telemetry.start("get_weather", SpanKind::Internal, parent);
    span.set_attributes([
        KeyValue::new(keys::CITY, place.to_string()),
        KeyValue::new(keys::WEATHER_MODE, state.weather.mode_name()),
    ]);

    match state.weather.observe(place).await {
        Ok(observation) => {
            let celsius = KeyValue::new(keys::TEMPERATURE_CELSIUS, observation.reading.celsius);
            match observation.fallback {
                Some(reason) => {
                    tracing::debug!(
                        place = %place,
                        reason = reason.as_str(),
                        "Using fallback weather reading"
                    );
                    span.event(
                        "weather.fallback",
                        vec![KeyValue::new(keys::REASON, reason.as_str()), celsius],
                    );
                    metrics::record_upstream("weather", "fallback");
                }
                None => {
                    span.event("weather data retrieved", vec![celsius]);
                    metrics::record_upstream("weather", "ok");
                }
            }
            span.succeed();
            Ok(observation)
        }
        Err(e) => {
            span.fail("weather lookup failed", Some(&e));
            metrics::record_upstream("weather", e.outcome());
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use opentelemetry::trace::Status;
    use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};
    use tower::ServiceExt;

    use crate::upstream::{LookupError, WeatherLookup, WeatherReading};

    #[derive(Default)]
    struct FixedLocation {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LocationLookup for FixedLocation {
        async fn locate(&self, code: &PostalCode) -> Result<LocationResult, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match code.as_str() {
                "29902555" => Ok(LocationResult::found("Linhares", "ES")),
                "50000000" => Err(LookupError::Status {
                    target: "location",
                    status: 503,
                    body: "down".into(),
                }),
                _ => Ok(LocationResult::not_found()),
            }
        }
    }

    struct CountingWeather {
        answer: fn() -> Result<WeatherReading, LookupError>,
        calls: AtomicUsize,
    }

    impl CountingWeather {
        fn new(answer: fn() -> Result<WeatherReading, LookupError>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl WeatherLookup for CountingWeather {
        async fn current(&self, _place: &str) -> Result<WeatherReading, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.answer)()
        }
    }

    struct Harness {
        router: Router,
        location: Arc<FixedLocation>,
        spans: InMemorySpanExporter,
        // Held so the provider is not shut down (clearing `spans`) when the router drops.
        _provider: SdkTracerProvider,
    }

    fn harness(weather: WeatherSource) -> Harness {
        let spans = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(spans.clone())
            .build();
        let location = Arc::new(FixedLocation::default());
        let state = ResolverState::new(
            Telemetry::from_provider(SERVICE_NAME, provider.clone()),
            location.clone(),
            weather,
        );
        Harness {
            router: router(state),
            location,
            spans,
            _provider: provider,
        }
    }

    async fn post(router: Router, body: &'static str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(ROUTE)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn test_resolves_with_live_reading() {
        let weather = CountingWeather::new(|| Ok(WeatherReading::new(28.5)));
        let h = harness(WeatherSource::live(weather.clone()));

        let (status, body) = post(h.router, r#"{"cep":"29902555"}"#).await;
        assert_eq!(status, StatusCode::OK);
        let result: CompositeResult = serde_json::from_slice(&body).unwrap();
        assert_eq!(result.city, "Linhares");
        assert_eq!(result.temp_c, 28.5);
        assert_eq!(result.temp_k, 301.5);
        assert_eq!(weather.calls.load(Ordering::SeqCst), 1);

        let spans = h.spans.get_finished_spans().unwrap();
        let names: Vec<_> = spans.iter().map(|s| s.name.as_ref()).collect();
        assert!(names.contains(&"handle_weather_request"));
        assert!(names.contains(&"get_location_from_cep"));
        assert!(names.contains(&"get_weather"));
        let root = spans
            .iter()
            .find(|s| s.name == "handle_weather_request")
            .unwrap();
        assert!(spans
            .iter()
            .filter(|s| s.name != "handle_weather_request")
            .all(|s| s.parent_span_id == root.span_context.span_id()
                && s.span_context.trace_id() == root.span_context.trace_id()));
    }

    #[tokio::test]
    async fn test_fallback_mode_uses_fixed_reading() {
        let h = harness(WeatherSource::fallback(25.0));
        let (status, body) = post(h.router, r#"{"cep":"29902555"}"#).await;
        assert_eq!(status, StatusCode::OK);
        let result: CompositeResult = serde_json::from_slice(&body).unwrap();
        assert_eq!(result.temp_c, 25.0);
        assert_eq!(result.temp_f, 77.0);
        assert_eq!(result.temp_k, 298.0);
    }

    #[tokio::test]
    async fn test_rejected_credential_falls_back() {
        let weather = CountingWeather::new(|| {
            Err(LookupError::Unauthorized {
                target: "weather",
                status: 401,
            })
        });
        let h = harness(WeatherSource::live(weather));
        let (status, body) = post(h.router, r#"{"cep":"29902555"}"#).await;
        assert_eq!(status, StatusCode::OK);
        let result: CompositeResult = serde_json::from_slice(&body).unwrap();
        assert_eq!(result.temp_c, 25.0);

        let spans = h.spans.get_finished_spans().unwrap();
        let weather_span = spans.iter().find(|s| s.name == "get_weather").unwrap();
        assert!(weather_span
            .events
            .events
            .iter()
            .any(|e| e.name == "weather.fallback"));
    }

    #[tokio::test]
    async fn test_unknown_code_is_404_without_weather_call() {
        let weather = CountingWeather::new(|| Ok(WeatherReading::new(20.0)));
        let h = harness(WeatherSource::live(weather.clone()));
        let (status, body) = post(h.router, r#"{"cep":"99999999"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, b"can not find zipcode");
        assert_eq!(h.location.calls.load(Ordering::SeqCst), 1);
        assert_eq!(weather.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_code_never_reaches_location() {
        let h = harness(WeatherSource::fallback(25.0));
        let (status, body) = post(h.router, r#"{"cep":"2990-2555"}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, b"invalid zipcode");
        assert_eq!(h.location.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let h = harness(WeatherSource::fallback(25.0));
        let (status, body) = post(h.router, r#"{"cep": 29902555}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, b"invalid request body");
    }

    #[tokio::test]
    async fn test_location_failure_is_opaque_500() {
        let h = harness(WeatherSource::fallback(25.0));
        let (status, body) = post(h.router, r#"{"cep":"50000000"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, b"internal server error");

        let spans = h.spans.get_finished_spans().unwrap();
        let root = spans
            .iter()
            .find(|s| s.name == "handle_weather_request")
            .unwrap();
        assert!(matches!(root.status, Status::Error { .. }));
    }

    #[tokio::test]
    async fn test_weather_failure_is_500() {
        let weather = CountingWeather::new(|| {
            Err(LookupError::Decode {
                target: "weather",
                reason: "missing current.temp_c".into(),
            })
        });
        let h = harness(WeatherSource::live(weather));
        let (status, body) = post(h.router, r#"{"cep":"29902555"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, b"internal server error");
    }
}
