//! Hit-counting router server.
//!
//! Serves a small demo API plus the introspection routes, so coverage of a
//! test suite run against it can be read from `/endpoints/unhit`.
//!
//! ```text
//! hit-router [config.toml]
//! ```

use std::path::Path;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use tokio::net::TcpListener;

use hit_router::config::{load_config, ServerConfig};
use hit_router::http::response;
use hit_router::http::server::router_builder;
use hit_router::observability::{logging, metrics};
use hit_router::routing::{HandlerPanic, Params, RouteError, RouterBuilder};
use hit_router::{HttpServer, Shutdown};

fn register_demo_routes(builder: &mut RouterBuilder) -> Result<(), RouteError> {
    builder.get("/health", |_req: Request<Body>, _params: Params| async { "ok" })?;
    builder.get("/hello/:name", |_req: Request<Body>, params: Params| async move {
        format!("Hello, {}!", params.get("name").unwrap_or_default())
    })?;
    builder.post("/echo", |req: Request<Body>, _params: Params| async move {
        match axum::body::to_bytes(req.into_body(), 1024 * 1024).await {
            Ok(bytes) => bytes.into_response(),
            Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        }
    })?;
    builder.panic_handler(|panic: HandlerPanic| {
        response::internal_error(panic.message().unwrap_or("internal error"))
    });
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(Path::new(&path))?,
        None => ServerConfig::default(),
    };

    logging::init(&config.observability.log_level);
    tracing::info!("hit-router v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        introspection = config.router.introspection.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut builder = router_builder(&config)?;
    register_demo_routes(&mut builder)?;
    let router = builder.build();

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, router);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
