//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check route patterns used by the config register cleanly and stay
//!   clear of the introspection routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::Method;
use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::routing::RouteTable;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a parsed configuration, collecting every error found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than zero",
        ));
    }

    let introspection = &config.router.introspection;
    if introspection.enabled {
        let path = &introspection.path;
        if !path.starts_with('/') || path.ends_with('/') || path.contains([':', '*']) {
            errors.push(ValidationError::new(
                "router.introspection.path",
                format!("'{path}' must be an absolute static path without a trailing slash"),
            ));
        }
    }

    if let Some(files) = &config.static_files {
        if !files.pattern.starts_with('/') || !files.pattern.ends_with("/*filepath") {
            errors.push(ValidationError::new(
                "static_files.pattern",
                format!("'{}' must be absolute and end in '/*filepath'", files.pattern),
            ));
        }
        if files.root.is_empty() {
            errors.push(ValidationError::new("static_files.root", "must not be empty"));
        }
        check_static_route(config, &files.pattern, &mut errors);
    }

    let level = config.observability.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Register the configured routes into a scratch table, in the order the
/// server does, so route errors surface here instead of at startup.
fn check_static_route(config: &ServerConfig, pattern: &str, errors: &mut Vec<ValidationError>) {
    let mut table = RouteTable::new();

    let introspection = &config.router.introspection;
    if introspection.enabled {
        let mount = pattern.strip_suffix("/*filepath").unwrap_or(pattern);
        let path = introspection.path.as_str();
        if mount == path || mount.starts_with(&format!("{path}/")) {
            errors.push(ValidationError::new(
                "static_files.pattern",
                format!("'{pattern}' overlaps the introspection routes under '{path}'"),
            ));
            return;
        }
        // Malformed introspection paths are reported above.
        let _ = table.insert(Method::GET, path, ());
        let _ = table.insert(Method::GET, &introspection.unhit_path(), ());
    }

    if let Err(e) = table.insert(Method::GET, pattern, ()) {
        errors.push(ValidationError::new("static_files.pattern", e.to_string()));
    }
}
