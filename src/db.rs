//! Database connection layer.
//!
//! Scraper units never see a driver type. They talk to a [`Connection`] that
//! returns decoded [`Row`]s, and a session gets its connection from a
//! [`Connector`].
//!
//! # Components
//!
//! - [`Connector`] / [`Connection`]: the driver seam
//! - [`Row`] / [`Value`]: driver-neutral result rows
//! - [`GatedConnection`]: caps statements in flight on one connection
//! - [`HanaConnector`]: native HANA protocol, the default backend
//! - [`SqlxConnector`]: sqlx `Any` backend, one small pool per session
//! - `MemoryConnector`: scripted responses keyed by statement text, built
//!   for tests and with the `testing` feature

mod dsn;
mod error;
mod gate;
mod hana;
#[cfg(any(test, feature = "testing"))]
mod memory;
mod pool;
mod row;

use std::sync::Arc;

pub use dsn::{Backend, TARGET_PLACEHOLDER, render as render_dsn};
pub use error::DbError;
pub use gate::GatedConnection;
pub use hana::{HanaConnection, HanaConnector};
#[cfg(any(test, feature = "testing"))]
pub use memory::{MemoryConnector, MemoryDatabase};
pub use pool::{SqlxConnection, SqlxConnector};
pub use row::{Row, Value};

use crate::config::{Credentials, ExporterConfig};

/// A scrape target resolved to its credentials.
#[derive(Clone)]
pub struct Target {
    /// Target identifier as sent by the monitoring system (e.g. `host:30015`).
    pub name: String,
    /// Credentials resolved for this target.
    pub credentials: Credentials,
}

impl Target {
    pub fn new(name: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            name: name.into(),
            credentials,
        }
    }
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("user", &self.credentials.user)
            .finish_non_exhaustive()
    }
}

/// An open, read-only connection to a monitored database.
#[async_trait::async_trait]
pub trait Connection: Send + Sync + 'static {
    /// Run one statement and return every row it produced.
    async fn query(&self, sql: &str) -> Result<Vec<Row>, DbError>;

    /// Release the underlying connection. Further queries fail with [`DbError::Closed`].
    async fn close(&self);
}

/// Opens connections for scrape sessions.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a fresh connection to `target`.
    async fn connect(&self, target: &Target) -> Result<Arc<dyn Connection>, DbError>;
}

/// Build the connector serving `config.dsn_template`, chosen by its scheme.
///
/// # Errors
/// Returns `DbError::InvalidDsn` if no driver handles the scheme.
pub fn connector_for(config: &ExporterConfig) -> Result<Arc<dyn Connector>, DbError> {
    let connector: Arc<dyn Connector> = match Backend::for_template(&config.dsn_template)? {
        Backend::Hana => Arc::new(
            HanaConnector::new(&config.dsn_template).with_connect_timeout(config.connect_timeout),
        ),
        Backend::Sqlx => Arc::new(
            SqlxConnector::new(&config.dsn_template)
                .with_max_connections(u32::try_from(config.max_in_flight).unwrap_or(u32::MAX))
                .with_connect_timeout(config.connect_timeout)
                .with_max_lifetime(config.conn_max_lifetime),
        ),
    };
    Ok(connector)
}
