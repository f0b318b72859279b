//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Mount the `HitRouter` as the service behind an Axum router
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener, stop on shutdown signal
//!
//! Request timeouts drop the in-flight dispatch, which still counts its hit.

use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, X_REQUEST_ID};
use crate::lifecycle::shutdown::signalled;
use crate::routing::{HitRouter, RouteError, RouterBuilder};

/// Start a `RouterBuilder` from config: router options plus the optional
/// static file route.
pub fn router_builder(config: &ServerConfig) -> Result<RouterBuilder, RouteError> {
    let mut builder = RouterBuilder::new(config.router.clone())?;
    if let Some(files) = &config.static_files {
        builder.serve_files(&files.pattern, &files.root)?;
        tracing::info!(pattern = %files.pattern, root = %files.root, "Serving static files");
    }
    Ok(builder)
}

/// HTTP server hosting a hit-counting router.
pub struct HttpServer {
    app: Router,
}

impl HttpServer {
    /// Create a new HTTP server for `router` with the given configuration.
    pub fn new(config: ServerConfig, router: HitRouter) -> Self {
        Self {
            app: Self::build_app(&config, router),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_app(config: &ServerConfig, router: HitRouter) -> Router {
        Router::new()
            .fallback_service(router)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(set_request_id_layer())
    }

    /// Run the server until `shutdown` fires or Ctrl+C is received.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.app)
            .with_graceful_shutdown(signalled(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
