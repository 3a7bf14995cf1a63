//! HANA Exporter - On-demand Prometheus exporter for SAP HANA
//!
//! This crate provides the scrape engine behind the `hana_exporter` binary.
//! It can be embedded by other Rust projects that want to expose HANA
//! diagnostic views in the Prometheus text format.
//!
//! # Architecture
//!
//! - **Database**: Connector seam, per-session gated connection, scripted backend
//! - **Collector**: Scraper unit trait, registry, orchestrator and metric catalog
//! - **Scraper**: The built-in battery of diagnostic queries
//! - **Exposition**: Per-request Prometheus rendering
//! - **Server**: Axum router serving the scrape endpoint
//!
//! # Example
//!
//! ```rust,no_run
//! use hana_exporter::{
//!     AppConfig, CredentialStore, ScrapeOrchestrator, builtin_registry, db::connector_for,
//!     server::{AppState, create_router},
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load("hana.yml")?;
//! let registry = builtin_registry()?.with_overrides(&config.scrapers)?;
//! let orchestrator = ScrapeOrchestrator::new(registry, (&config.exporter).into());
//! let connector = connector_for(&config.exporter)?;
//! let state = AppState::new(orchestrator, connector, CredentialStore::new(&config.databases));
//! let app = create_router(state);
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod config;
pub mod db;
pub mod exposition;
pub mod scraper;
pub mod server;

// Re-export commonly used types
pub use collector::{
    Catalog, Measurement, ScrapeOrchestrator, ScrapeSettings, ScraperRegistry, ScraperUnit,
    SessionReport, UnitFilter,
};
pub use config::{AppConfig, ConfigError, CredentialStore, Credentials};
pub use db::{Connector, DbError, HanaConnector, SqlxConnector, Target};
#[cfg(any(test, feature = "testing"))]
pub use db::MemoryConnector;
pub use exposition::Exposition;
pub use scraper::builtin_registry;
