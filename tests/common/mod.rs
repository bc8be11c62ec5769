//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use cep_weather::config::TimeoutConfig;
use cep_weather::model::PostalCode;
use cep_weather::resilience::outbound_client;
use cep_weather::services::{gateway, resolver, GatewayState, ResolverState};
use cep_weather::upstream::{
    LocationLookup, LocationResult, LookupError, WeatherLookup, WeatherReading, WeatherSource,
};
use cep_weather::{HttpServer, Shutdown, Telemetry};

/// Telemetry that keeps finished spans in memory.
pub fn recording_telemetry(service: &str) -> (Telemetry, InMemorySpanExporter) {
    let exporter = InMemorySpanExporter::default();
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    (Telemetry::from_provider(service, provider), exporter)
}

pub fn finished(spans: &InMemorySpanExporter, name: &str) -> Vec<SpanData> {
    spans
        .get_finished_spans()
        .unwrap()
        .into_iter()
        .filter(|s| s.name == name)
        .collect()
}

/// Postal codes mapped to a city; everything else is unknown.
#[derive(Default)]
pub struct MockLocation {
    places: HashMap<String, (String, String)>,
    pub calls: AtomicUsize,
}

impl MockLocation {
    pub fn with(mut self, code: &str, city: &str, state: &str) -> Self {
        self.places
            .insert(code.to_string(), (city.to_string(), state.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationLookup for MockLocation {
    async fn locate(&self, code: &PostalCode) -> Result<LocationResult, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match self.places.get(code.as_str()) {
            Some((city, state)) => LocationResult::found(city.clone(), state.clone()),
            None => LocationResult::not_found(),
        })
    }
}

/// Always reports the same temperature.
pub struct MockWeather {
    celsius: f64,
    pub calls: AtomicUsize,
}

impl MockWeather {
    pub fn new(celsius: f64) -> Self {
        Self {
            celsius,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherLookup for MockWeather {
    async fn current(&self, _place: &str) -> Result<WeatherReading, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(WeatherReading::new(self.celsius))
    }
}

/// A hop running on an ephemeral port.
pub struct RunningHop {
    pub addr: SocketAddr,
    pub spans: InMemorySpanExporter,
    shutdown: Shutdown,
}

impl RunningHop {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RunningHop {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

async fn serve(name: &'static str, routes: axum::Router, spans: InMemorySpanExporter) -> RunningHop {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = HttpServer::new(name, routes).run(listener, rx).await;
    });
    RunningHop {
        addr,
        spans,
        shutdown,
    }
}

pub async fn start_resolver(
    location: Arc<MockLocation>,
    weather: WeatherSource,
) -> RunningHop {
    let (telemetry, spans) = recording_telemetry(resolver::SERVICE_NAME);
    let state = ResolverState::new(telemetry, location, weather);
    serve(resolver::SERVICE_NAME, resolver::router(state), spans).await
}

pub async fn start_gateway(resolver_url: String, timeout_secs: u64) -> RunningHop {
    let (telemetry, spans) = recording_telemetry(gateway::SERVICE_NAME);
    let state = GatewayState {
        telemetry,
        client: outbound_client(&TimeoutConfig {
            upstream_secs: timeout_secs,
        })
        .unwrap(),
        resolver_url,
        error_body_limit: 1024,
    };
    serve(gateway::SERVICE_NAME, gateway::router(state), spans).await
}

/// Gateway in front of a resolver backed by the given doubles.
pub async fn start_pipeline(
    location: Arc<MockLocation>,
    weather: WeatherSource,
) -> (RunningHop, RunningHop) {
    let resolver = start_resolver(location, weather).await;
    let gateway = start_gateway(resolver.url("/weather"), 5).await;
    (gateway, resolver)
}

/// Start a programmable raw HTTP/1.1 backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;

                let (status, body) = f().await;
                let reason = StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown");
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            });
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
