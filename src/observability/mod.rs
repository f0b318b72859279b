//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher and server produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (dispatch outcomes, per-endpoint hits)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event (method, path, endpoint id)
//! - Request ID flows through logs via the HTTP trace span
//! - Hit counts served by the router are the source of truth; metrics mirror them

pub mod logging;
pub mod metrics;
