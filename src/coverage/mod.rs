//! Endpoint coverage subsystem.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     RouterBuilder::route
//!     → registry.rs (record Endpoint, hits = 0)
//!
//! Dispatch:
//!     matched route
//!     → handler runs
//!     → registry.rs (hit, from a drop guard)
//!
//! Introspection:
//!     GET /endpoints, GET /endpoints/unhit
//!     → registry.rs (snapshot)
//!     → report.rs (JSON listing)
//! ```

pub mod registry;
pub mod report;

pub use registry::{Endpoint, EndpointFilter, EndpointId, EndpointRegistry};
pub use report::ReportError;
