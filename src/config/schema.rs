//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the hit-counting server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Dispatch behaviour and introspection routes.
    pub router: RouterConfig,

    /// Optional static file tree served through the router.
    pub static_files: Option<StaticFilesConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Router behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Redirect `/a/` to `/a` (or the reverse) when only the other one is routed.
    pub redirect_trailing_slash: bool,

    /// Redirect to the cleaned, case-corrected path (`//A/../b` to `/b`)
    /// when that one is routed.
    pub redirect_fixed_path: bool,

    /// Answer 405 with an `Allow` header when the path exists under other methods.
    /// When disabled those requests go to the not-found handler.
    pub handle_method_not_allowed: bool,

    /// Answer `OPTIONS` with 200 and an `Allow` header when the path has no
    /// `OPTIONS` route of its own.
    pub handle_options: bool,

    /// Hit-count listing routes.
    pub introspection: IntrospectionConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            redirect_trailing_slash: true,
            redirect_fixed_path: true,
            handle_method_not_allowed: true,
            handle_options: true,
            introspection: IntrospectionConfig::default(),
        }
    }
}

/// Introspection routes. The unhit listing lives at `{path}/unhit`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IntrospectionConfig {
    pub enabled: bool,
    pub path: String,
}

impl IntrospectionConfig {
    pub fn unhit_path(&self) -> String {
        format!("{}/unhit", self.path)
    }
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/endpoints".to_string(),
        }
    }
}

/// Static file serving.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticFilesConfig {
    /// Route pattern, must end in `/*filepath` (e.g., "/static/*filepath").
    pub pattern: String,

    /// Directory the captured file path is resolved against.
    pub root: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
