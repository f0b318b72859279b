//! Endpoint hit accounting.
//!
//! # Responsibilities
//! - Record one `Endpoint` per registered route, starting at zero hits
//! - Count dispatches per endpoint without lost updates
//! - Produce snapshots for the introspection routes
//!
//! # Design Decisions
//! - Keyed by an opaque `EndpointId` handed out at registration, never by
//!   handler identity or path string
//! - One mutex around the whole map; every critical section is a map
//!   operation with no I/O. Not meant for high-throughput production use
//! - A poisoned lock is recovered, since hits are recorded from drop guards
//!   that may run while a handler panic unwinds

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use axum::http::Method;
use serde::Serialize;

/// Opaque token identifying one registered route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(u64);

impl std::fmt::Display for EndpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "endpoint-{}", self.0)
    }
}

/// Registration-time record of a route and how often it was dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Endpoint {
    pub method: String,
    pub path: String,
    pub hits: u64,
    /// Set for the introspection routes, which never list themselves.
    #[serde(skip)]
    pub(crate) internal: bool,
}

impl Endpoint {
    fn new(method: &Method, path: &str, internal: bool) -> Self {
        Self {
            method: method.as_str().to_string(),
            path: path.to_string(),
            hits: 0,
            internal,
        }
    }
}

/// Which endpoints a listing should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointFilter {
    All,
    /// Only endpoints that were never dispatched to.
    Unhit,
}

/// Hit counters for every registered route.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    endpoints: Mutex<HashMap<EndpointId, Endpoint>>,
    next_id: AtomicU64,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EndpointId, Endpoint>> {
        self.endpoints.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a zero-hit endpoint and return its token.
    pub fn record(&self, method: &Method, path: &str) -> EndpointId {
        self.insert(Endpoint::new(method, path, false))
    }

    /// Like `record`, but the endpoint is hidden from every listing.
    pub(crate) fn record_internal(&self, method: &Method, path: &str) -> EndpointId {
        self.insert(Endpoint::new(method, path, true))
    }

    fn insert(&self, endpoint: Endpoint) -> EndpointId {
        let id = EndpointId(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(
            endpoint_id = %id,
            method = %endpoint.method,
            path = %endpoint.path,
            "Endpoint recorded"
        );
        self.lock().insert(id, endpoint);
        id
    }

    /// Count one dispatch to `id`.
    ///
    /// An unknown id is a programming error: it is logged, and debug builds
    /// assert unless the thread is already panicking.
    pub fn hit(&self, id: EndpointId) {
        let mut endpoints = self.lock();
        if let Some(endpoint) = endpoints.get_mut(&id) {
            endpoint.hits += 1;
            return;
        }
        drop(endpoints);

        tracing::error!(endpoint_id = %id, "Hit recorded for unregistered endpoint");
        if cfg!(debug_assertions) && !std::thread::panicking() {
            panic!("hit recorded for unregistered {id}");
        }
    }

    /// Snapshot of a single endpoint.
    pub fn get(&self, id: EndpointId) -> Option<Endpoint> {
        self.lock().get(&id).cloned()
    }

    /// Snapshot of the visible endpoints. Order is unspecified.
    pub fn list(&self, filter: EndpointFilter) -> Vec<Endpoint> {
        self.lock()
            .values()
            .filter(|e| !e.internal)
            .filter(|e| filter == EndpointFilter::All || e.hits == 0)
            .cloned()
            .collect()
    }

    /// Number of endpoints, internal ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
