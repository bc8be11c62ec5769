//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems for one role in dependency order
//! - Bind the listener and begin accepting traffic
//! - Flush spans once the server has drained
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)
//! - Configuration is loaded by the caller so CLI and tests can supply their own

use std::net::SocketAddr;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ServiceConfig;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::{metrics, Telemetry, TelemetryError};
use crate::services::{gateway, resolver, GatewayState, ResolverState};

/// Which hop this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Gateway,
    Resolver,
}

impl Role {
    /// Name reported on spans and metrics.
    pub fn service_name(self) -> &'static str {
        match self {
            Role::Gateway => gateway::SERVICE_NAME,
            Role::Resolver => resolver::SERVICE_NAME,
        }
    }

    pub fn bind_address(self, config: &ServiceConfig) -> &str {
        match self {
            Role::Gateway => &config.gateway.bind_address,
            Role::Resolver => &config.resolver.bind_address,
        }
    }

    /// Routes for this role, with real upstream clients.
    pub fn routes(self, config: &ServiceConfig, telemetry: Telemetry) -> Result<Router, StartupError> {
        let routes = match self {
            Role::Gateway => gateway::router(GatewayState::from_config(config, telemetry)?),
            Role::Resolver => resolver::router(ResolverState::from_config(config, telemetry)?),
        };
        Ok(routes)
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid metrics address {0}")]
    MetricsAddress(String),

    #[error("failed to start metrics endpoint: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("failed to build outbound client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Run `role` until `shutdown` fires, then flush telemetry.
pub async fn run(role: Role, config: &ServiceConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    let name = role.service_name();
    tracing::info!(
        service = name,
        weather_mode = config.weather.name(),
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Starting"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let telemetry = Telemetry::init(name, &config.observability)?;
    let routes = role.routes(config, telemetry.clone())?;

    let address = role.bind_address(config);
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })?;

    let served = HttpServer::new(name, routes)
        .run(listener, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve);

    // The batch exporter blocks while it flushes.
    let flushed = tokio::task::spawn_blocking(move || telemetry.shutdown()).await;
    match flushed {
        Ok(Ok(())) => tracing::info!(service = name, "Telemetry flushed"),
        Ok(Err(e)) => tracing::warn!(service = name, error = %e, "Telemetry flush failed"),
        Err(e) => tracing::warn!(service = name, error = %e, "Telemetry flush task failed"),
    }

    served
}
