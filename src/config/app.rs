//! Application configuration structures.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::credentials::Credentials;
use super::validation::{ConfigError, is_valid_metric_name};
use crate::db::{Backend, TARGET_PLACEHOLDER};

// =============================================================================
// Constants
// =============================================================================

/// Default listen port.
pub const DEFAULT_PORT: u16 = 9460;

/// Default metric namespace.
pub const DEFAULT_NAMESPACE: &str = "hana";

/// Default measurement sink capacity.
pub const DEFAULT_SINK_CAPACITY: usize = 1024;

/// Default liveness probe.
pub const DEFAULT_PROBE_QUERY: &str =
    r#"select SYSTEM_ID AS SID, DATABASE_NAME AS DB_NAME, VERSION from "SYS"."M_DATABASE""#;

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default maximum connection lifetime (1 minute).
pub const DEFAULT_CONN_MAX_LIFETIME: Duration = Duration::from_secs(60);

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_conn_max_lifetime() -> Duration {
    DEFAULT_CONN_MAX_LIFETIME
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address (default: "0.0.0.0").
    pub bind: String,

    /// Server port (default: 9460).
    pub port: u16,

    /// Path serving the scrape endpoint (default: "/metrics").
    pub telemetry_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            telemetry_path: "/metrics".to_string(),
        }
    }
}

// =============================================================================
// Exporter Configuration
// =============================================================================

/// Scrape behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Metric namespace prefix (default: "hana").
    pub namespace: String,

    /// Connection string template; `{target}` is replaced per request.
    pub dsn_template: String,

    /// Measurement sink capacity per session (default: 1024).
    pub sink_capacity: usize,

    /// Statements allowed in flight on one session connection (default: 1).
    pub max_in_flight: usize,

    /// Connection open timeout (default: "10s").
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Maximum lifetime of a session connection (default: "1m").
    #[serde(with = "humantime_serde")]
    pub conn_max_lifetime: Duration,

    /// Deadline for a whole request; unset means no deadline.
    #[serde(with = "humantime_serde")]
    pub scrape_timeout: Option<Duration>,

    /// Run a discovery pass before each collection (default: true).
    pub discover_catalog: bool,

    /// Liveness probe statement.
    pub probe_query: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            dsn_template: "hdbsql://{target}".to_string(),
            sink_capacity: DEFAULT_SINK_CAPACITY,
            max_in_flight: 1,
            connect_timeout: default_connect_timeout(),
            conn_max_lifetime: default_conn_max_lifetime(),
            scrape_timeout: None,
            discover_catalog: true,
            probe_query: DEFAULT_PROBE_QUERY.to_string(),
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Web server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Scrape behaviour.
    #[serde(default)]
    pub exporter: ExporterConfig,

    /// Scraper unit overrides: unit name -> enabled.
    #[serde(default)]
    pub scrapers: BTreeMap<String, bool>,

    /// Credentials by target name, with an optional `default` entry.
    #[serde(default)]
    pub databases: BTreeMap<String, Credentials>,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Scraper names are checked against the unit set when the registry is built.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "invalid server bind address: '{}'",
                self.server.bind
            ))
        })?;

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server port must be non-zero".to_string(),
            ));
        }

        if !self.server.telemetry_path.starts_with('/')
            || matches!(self.server.telemetry_path.as_str(), "/" | "/healthz")
        {
            return Err(ConfigError::ValidationError(format!(
                "telemetry_path must be an absolute path other than '/' and '/healthz': '{}'",
                self.server.telemetry_path
            )));
        }

        let exporter = &self.exporter;
        if !is_valid_metric_name(&exporter.namespace) {
            return Err(ConfigError::ValidationError(format!(
                "invalid metric namespace: '{}'",
                exporter.namespace
            )));
        }

        if !exporter.dsn_template.contains(TARGET_PLACEHOLDER) {
            return Err(ConfigError::ValidationError(format!(
                "dsn_template must contain '{TARGET_PLACEHOLDER}'"
            )));
        }

        Backend::for_template(&exporter.dsn_template)
            .map_err(|e| ConfigError::ValidationError(format!("dsn_template: {e}")))?;

        if exporter.sink_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "exporter sink_capacity must be positive".to_string(),
            ));
        }

        if exporter.max_in_flight == 0 {
            return Err(ConfigError::ValidationError(
                "exporter max_in_flight must be positive".to_string(),
            ));
        }

        if exporter.probe_query.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "exporter probe_query cannot be empty".to_string(),
            ));
        }

        if exporter.scrape_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::ValidationError(
                "exporter scrape_timeout must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.port, 9460);
        assert_eq!(config.telemetry_path, "/metrics");
    }

    #[test]
    fn test_exporter_config_default() {
        let config = ExporterConfig::default();
        assert_eq!(config.namespace, "hana");
        assert_eq!(config.max_in_flight, 1);
        assert_eq!(config.sink_capacity, DEFAULT_SINK_CAPACITY);
        assert!(config.discover_catalog);
        assert!(config.scrape_timeout.is_none());
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = r#"
server:
  port: 9999
exporter:
  scrape_timeout: 15s
  connect_timeout: 2s
scrapers:
  sys_m_cs_tables: true
  sys_m_disks: false
databases:
  default:
    user: SYSTEM
    pass: manager
  "hana01:30015":
    user: MONITOR
    pass: "${HANA_PASS:-x}"
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.exporter.scrape_timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.exporter.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.scrapers.get("sys_m_disks"), Some(&false));
        assert_eq!(config.databases["default"].password, "manager");
        assert_eq!(config.databases.len(), 2);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(config.databases.is_empty());
    }

    #[test]
    fn test_config_validation_invalid_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_bind_address() {
        let mut config = AppConfig::default();
        config.server.bind = "not-an-ip".to_string();

        let result = config.validate();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("invalid server bind address")
        );
    }

    #[test]
    fn test_config_validation_dsn_without_target() {
        let mut config = AppConfig::default();
        config.exporter.dsn_template = "hdbsql://localhost:30015".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_dsn_scheme_needs_driver() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());
        config.exporter.dsn_template = "hdb://{target}".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("no driver for scheme 'hdb'"));
        config.exporter.dsn_template = "postgres://{target}/hana".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_in_flight() {
        let mut config = AppConfig::default();
        config.exporter.max_in_flight = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_namespace() {
        let mut config = AppConfig::default();
        config.exporter.namespace = "hana-db".to_string();
        assert!(config.validate().is_err());
    }
}
