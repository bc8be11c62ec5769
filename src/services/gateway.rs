//! First hop: accept `POST /cep`, forward to the resolver, relay its answer.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use opentelemetry::trace::SpanKind;
use opentelemetry::{Context, KeyValue};
use opentelemetry_semantic_conventions::trace::{HTTP_REQUEST_METHOD, SERVER_ADDRESS, URL_FULL};

use crate::config::ServiceConfig;
use crate::model::{CompositeResult, PostalCode, PostalCodeRequest};
use crate::observability::span::keys;
use crate::observability::{metrics, HopSpan, Telemetry};
use crate::resilience::{is_deadline, outbound_client};
use crate::services::{describe_inbound, PipelineError};
use crate::upstream::read_prefix;

/// Service name reported on spans and metrics.
pub const SERVICE_NAME: &str = "cep-service";
pub const ROUTE: &str = "/cep";

const TARGET: &str = "resolver";

/// Dependencies injected into the gateway handler.
#[derive(Clone)]
pub struct GatewayState {
    pub telemetry: Telemetry,
    pub client: reqwest::Client,
    pub resolver_url: String,
    /// Maximum bytes of a non-200 resolver body relayed to the caller.
    pub error_body_limit: usize,
}

impl GatewayState {
    pub fn from_config(config: &ServiceConfig, telemetry: Telemetry) -> reqwest::Result<Self> {
        Ok(Self {
            telemetry,
            client: outbound_client(&config.timeouts)?,
            resolver_url: config.gateway.resolver_url.clone(),
            error_body_limit: config.gateway.error_body_limit,
        })
    }
}

/// Routes served by the gateway. Other methods on `/cep` get 405.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route(ROUTE, post(accept_postal_code))
        .with_state(state)
}

/// What the resolver answered.
enum ResolverReply {
    Success { result: CompositeResult, body_len: usize },
    Passthrough {
        status: StatusCode,
        content_type: Option<HeaderValue>,
        body: Vec<u8>,
    },
}

/// `POST /cep` handler.
pub async fn accept_postal_code(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let parent = state.telemetry.extract(&headers);
    let span = state
        .telemetry
        .start("handle_cep_request", SpanKind::Server, &parent);
    describe_inbound(&span, ROUTE, &headers, body.len());

    let response = match forward(&state, &span, &body).await {
        Ok(ResolverReply::Success { result, body_len }) => {
            span.record_status(StatusCode::OK.as_u16());
            span.set_attribute(KeyValue::new(keys::HTTP_RESPONSE_BODY_SIZE, body_len as i64));
            span.event(
                "weather data retrieved",
                vec![KeyValue::new(keys::CITY, result.city.clone())],
            );
            span.succeed();
            (StatusCode::OK, Json(result)).into_response()
        }
        Ok(ResolverReply::Passthrough {
            status,
            content_type,
            body,
        }) => {
            span.record_status(status.as_u16());
            span.set_attribute(KeyValue::new(keys::HTTP_RESPONSE_BODY_SIZE, body.len() as i64));
            span.fail("weather service error", None);
            tracing::info!(
                trace_id = %span.trace_id(),
                status = status.as_u16(),
                "Relaying resolver error"
            );
            let mut response = (status, body).into_response();
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                content_type
                    .unwrap_or_else(|| HeaderValue::from_static("text/plain; charset=utf-8")),
            );
            response
        }
        Err(err) => err.into_traced_response(&span),
    };

    metrics::record_request(SERVICE_NAME, response.status().as_u16(), start);
    response
}

async fn forward(
    state: &GatewayState,
    span: &HopSpan,
    body: &[u8],
) -> Result<ResolverReply, PipelineError> {
    let request = PostalCodeRequest::from_slice(body).map_err(PipelineError::MalformedBody)?;
    span.event(
        "cep received",
        vec![KeyValue::new(keys::HTTP_REQUEST_BODY_SIZE, request.code.len() as i64)],
    );

    let code = PostalCode::try_from(&request).map_err(|e| {
        span.event("cep validation failed", vec![]);
        PipelineError::from(e)
    })?;
    span.event("cep validation successful", vec![]);

    tracing::debug!(cep = %code, "Forwarding to resolver");
    call_resolver(state, span.context(), &code).await
}

/// One traced, context-propagating call to the resolver. No retries.
async fn call_resolver(
    state: &GatewayState,
    parent: &Context,
    code: &PostalCode,
) -> Result<ResolverReply, PipelineError> {
    let call = state
        .telemetry
        .start("call_weather_service", SpanKind::Client, parent);

    let payload = serde_json::json!({ "cep": code.as_str() }).to_string();
    call.set_attributes([
        KeyValue::new(HTTP_REQUEST_METHOD, "POST"),
        KeyValue::new(URL_FULL, state.resolver_url.clone()),
        KeyValue::new("peer.service", super::RESOLVER_SERVICE),
        KeyValue::new(keys::HTTP_REQUEST_BODY_SIZE, payload.len() as i64),
    ]);
    if let Some(host) = url::Url::parse(&state.resolver_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
    {
        call.set_attribute(KeyValue::new(SERVER_ADDRESS, host));
    }

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    state.telemetry.inject(call.context(), &mut headers);

    let response = match state
        .client
        .post(&state.resolver_url)
        .headers(headers)
        .body(payload)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            call.fail("failed to call weather service", Some(&e));
            metrics::record_upstream(TARGET, if is_deadline(&e) { "timeout" } else { "transport" });
            return Err(PipelineError::upstream(TARGET, e));
        }
    };

    let status = response.status();
    call.record_status(status.as_u16());

    if status == StatusCode::OK {
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                call.fail("failed to read weather service response", Some(&e));
                metrics::record_upstream(TARGET, "transport");
                return Err(PipelineError::upstream(TARGET, e));
            }
        };
        call.set_attribute(KeyValue::new(keys::HTTP_RESPONSE_BODY_SIZE, bytes.len() as i64));

        return match serde_json::from_slice::<CompositeResult>(&bytes) {
            Ok(result) => {
                call.succeed();
                metrics::record_upstream(TARGET, "ok");
                Ok(ResolverReply::Success {
                    result,
                    body_len: bytes.len(),
                })
            }
            Err(e) => {
                call.fail("failed to decode weather service response", Some(&e));
                metrics::record_upstream(TARGET, "decode");
                Err(PipelineError::decode(TARGET, e))
            }
        };
    }

    let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
    let body = match read_prefix(response, state.error_body_limit).await {
        Ok(body) => body,
        Err(e) => {
            call.fail("failed to read weather service response", Some(&e));
            metrics::record_upstream(TARGET, "transport");
            return Err(PipelineError::upstream(TARGET, e));
        }
    };
    call.set_attribute(KeyValue::new(keys::HTTP_RESPONSE_BODY_SIZE, body.len() as i64));
    call.fail(format!("weather service returned {}", status.as_u16()), None);
    metrics::record_upstream(TARGET, "status");

    Ok(ResolverReply::Passthrough {
        status,
        content_type,
        body,
    })
}
