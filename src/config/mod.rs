//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → router options handed to RouterBuilder, rest to HttpServer
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; routes are frozen at startup anyway
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    IntrospectionConfig, ListenerConfig, ObservabilityConfig, RouterConfig, ServerConfig,
    StaticFilesConfig, TimeoutConfig,
};
pub use validation::ValidationError;
