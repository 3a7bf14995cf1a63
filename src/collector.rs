//! Collector Layer
//!
//! Runs scraper units against one shared connection per request and turns
//! their output into a single measurement stream.
//!
//! # Architecture
//!
//! - [`ScraperUnit`]: Core trait for one diagnostic query and its mapping
//! - [`MeasurementSink`]: Bounded channel from unit tasks to the consumer
//! - [`ScraperRegistry`]: Unit set with per-unit enable flags
//! - [`ScrapeOrchestrator`]: Session lifecycle, fan-out and bookkeeping
//! - [`Catalog`]: Metric identities learned from a discovery session
//!
//! # Example
//!
//! ```rust,no_run
//! use hana_exporter::collector::{ScrapeOrchestrator, ScrapeSettings, UnitFilter};
//! use hana_exporter::config::Credentials;
//! use hana_exporter::db::{SqlxConnector, Target};
//! use hana_exporter::scraper::builtin_registry;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = ScrapeOrchestrator::new(builtin_registry()?, ScrapeSettings::default());
//! let connector = SqlxConnector::new("postgres://{target}/hana");
//! let target = Target::new("db01:5432", Credentials::default());
//! let (measurements, report) = orchestrator
//!     .collect(&connector, &target, &UnitFilter::all())
//!     .await;
//! println!("up={} measurements={}", report.up, measurements.len());
//! # Ok(())
//! # }
//! ```

mod catalog;
mod measurement;
mod orchestrator;
mod registry;
pub mod sink;
mod traits;

pub use catalog::{Catalog, CatalogEntry};
pub use measurement::{Measurement, MetricIdentity, ValueKind, fq_name};
pub use orchestrator::{
    COLLECTOR_LABEL, CONNECTION_COLLECTOR, ExporterCounters, ScrapeMode, ScrapeOrchestrator,
    ScrapeSettings, SessionReport, UnitOutcome,
};
pub use registry::{ScraperRegistry, UnitFilter, UnitInfo};
pub use sink::{MeasurementSink, MeasurementStream, SinkClosed};
pub use traits::{ScrapeContext, ScrapeError, ScraperUnit};
