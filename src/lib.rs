//! Hit-counting HTTP router.
//!
//! Routes requests by method and path pattern (static, `:param`, `*catchall`)
//! and counts how often every registered endpoint is dispatched to, so
//! endpoints no test ever exercised can be listed via `GET /endpoints/unhit`.
//! Not built for high-throughput production traffic: all hit accounting
//! goes through one mutex.
//!
//! ```no_run
//! use axum::{body::Body, http::Request};
//! use hit_router::{config::RouterConfig, routing::{Params, RouterBuilder}};
//!
//! # fn main() -> Result<(), hit_router::routing::RouteError> {
//! let mut builder = RouterBuilder::new(RouterConfig::default())?;
//! builder.get("/users/:id", |_req: Request<Body>, params: Params| async move {
//!     format!("user {}", params.get("id").unwrap_or_default())
//! })?;
//! let router = builder.build();
//! # let _ = router;
//! # Ok(())
//! # }
//! ```

// Core subsystems
pub mod coverage;
pub mod http;
pub mod routing;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use coverage::{Endpoint, EndpointFilter, EndpointId, EndpointRegistry};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{HitRouter, RouterBuilder};
