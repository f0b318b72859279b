//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (at startup):
//!     RouterBuilder::route(method, pattern, handler)
//!     → matcher.rs (insert into per-method segment trie)
//!     → coverage registry (record Endpoint, hits = 0)
//!     → build(): freeze as immutable HitRouter
//!
//! Incoming Request (method, path)
//!     → router.rs (dispatch)
//!     → path.rs (percent-decode)
//!     → matcher.rs (resolve)
//!     → Return: handler + params, MethodNotAllowed or NotFound
//!     → handler.rs (invoke), hit counted on every exit path
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment trie only)
//! - Deterministic: static beats parameter beats catch-all
//! - Ambiguous or duplicate registrations are errors, never silent overwrites

pub mod handler;
pub mod matcher;
pub mod path;
pub mod router;

pub use handler::{AllowedMethods, BoxHandler, Handler, HandlerPanic, PanicHandler, Params};
pub use matcher::{Lookup, RouteError, RouteTable};
pub use router::{HitRouter, RouterBuilder};
