//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap a hop's routes with the shared middleware (access log, request ID, body limit)
//! - Bind the Axum service to a listener
//! - Stop accepting and drain on the shutdown signal

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::lifecycle::shutdown::triggered;

/// Largest accepted request body. A postal code request is a few dozen bytes.
pub const MAX_REQUEST_BODY: usize = 16 * 1024;

/// HTTP server for one hop.
pub struct HttpServer {
    name: &'static str,
    router: Router,
}

impl HttpServer {
    /// Create a server for `routes` (already carrying their state).
    pub fn new(name: &'static str, routes: Router) -> Self {
        Self {
            name,
            router: Self::build_router(routes),
        }
    }

    /// Add the middleware stack around the hop's routes.
    fn build_router(routes: Router) -> Router {
        routes.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY)),
        )
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            service = self.name,
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(triggered(shutdown))
            .await?;

        tracing::info!(service = self.name, "HTTP server stopped");
        Ok(())
    }
}
