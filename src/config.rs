//! Configuration module for the HANA exporter.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Server settings (bind address, port, telemetry path)
//! - Exporter settings (namespace, DSN template, concurrency, deadlines)
//! - Scraper unit enable/disable overrides
//! - Per-target database credentials

mod app;
mod credentials;
mod validation;

pub use app::{AppConfig, ExporterConfig, ServerConfig};
pub use credentials::{CredentialStore, Credentials, DEFAULT_TARGET};
pub use validation::{ConfigError, expand_env_vars, is_valid_metric_name, parse_duration};

// Re-export constants
pub use app::{DEFAULT_NAMESPACE, DEFAULT_PORT, DEFAULT_PROBE_QUERY, DEFAULT_SINK_CAPACITY};
