//! Scrape session orchestration.
//!
//! A session opens one connection, probes it, fans the selected units out as
//! concurrent tasks sharing that connection, waits for all of them, then
//! emits the bookkeeping measurements and closes the connection.
//!
//! Collection and catalog discovery run the same session code; they differ
//! only in [`ScrapeMode`].

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures::FutureExt;
use strum_macros::{AsRefStr, Display};
use tokio::task::JoinSet;
use tracing::Instrument;

use super::sink::{self, MeasurementSink};
use super::{Measurement, ScrapeContext, ScrapeError, ScraperRegistry, ScraperUnit, UnitFilter, fq_name};
use crate::config::{DEFAULT_NAMESPACE, DEFAULT_PROBE_QUERY, DEFAULT_SINK_CAPACITY, ExporterConfig};
use crate::db::{Connection, Connector, DbError, GatedConnection, Target};

/// Label key carried by per-unit bookkeeping metrics.
pub const COLLECTOR_LABEL: &str = "collector";

/// `collector` label value under which the probe's duration is reported.
pub const CONNECTION_COLLECTOR: &str = "connection";

const EXPORTER_SUBSYSTEM: &str = "exporter";

/// What a session is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ScrapeMode {
    /// A live collection. Counts toward `scrapes_total`.
    Collect,
    /// A shape-discovery pass. Values are discarded by the caller.
    Discover,
}

/// Per-session knobs taken from the exporter configuration.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub namespace: String,
    pub max_in_flight: usize,
    pub sink_capacity: usize,
    pub probe_query: String,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            max_in_flight: 1,
            sink_capacity: DEFAULT_SINK_CAPACITY,
            probe_query: DEFAULT_PROBE_QUERY.to_string(),
        }
    }
}

impl From<&ExporterConfig> for ScrapeSettings {
    fn from(config: &ExporterConfig) -> Self {
        Self {
            namespace: config.namespace.clone(),
            max_in_flight: config.max_in_flight,
            sink_capacity: config.sink_capacity,
            probe_query: config.probe_query.clone(),
        }
    }
}

/// Process-wide counters. The only state shared between sessions.
#[derive(Debug, Default)]
pub struct ExporterCounters {
    scrapes: AtomicU64,
}

impl ExporterCounters {
    /// Count one collect-mode session and return the new total.
    pub fn record_scrape(&self) -> u64 {
        self.scrapes.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn total_scrapes(&self) -> u64 {
        self.scrapes.load(Ordering::Relaxed)
    }
}

/// Result of one unit run within a session.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOutcome {
    pub name: String,
    pub duration: Duration,
    /// Measurements forwarded to the sink.
    pub measurements: usize,
    pub error: Option<String>,
}

impl UnitOutcome {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// What happened during one session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub target: String,
    pub mode: ScrapeMode,
    /// Whether the connection opened and the probe succeeded.
    pub up: bool,
    /// Connection or probe failure.
    pub error: Option<String>,
    pub probe_duration: Duration,
    /// One entry per unit run, sorted by unit name.
    pub units: Vec<UnitOutcome>,
}

impl SessionReport {
    fn new(target: &str, mode: ScrapeMode) -> Self {
        Self {
            target: target.to_string(),
            mode,
            up: false,
            error: None,
            probe_duration: Duration::ZERO,
            units: Vec::new(),
        }
    }

    pub fn unit(&self, name: &str) -> Option<&UnitOutcome> {
        self.units.iter().find(|u| u.name == name)
    }

    pub fn failed_units(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.units.iter().filter(|u| u.failed())
    }

    /// Whether the connection, the probe or any unit failed.
    pub fn had_error(&self) -> bool {
        self.error.is_some() || self.units.iter().any(UnitOutcome::failed)
    }
}

/// Identity reported by the probe's first row.
#[derive(Debug, Clone, PartialEq, Eq)]
struct InstanceInfo {
    sid: String,
    db_name: String,
    db_version: String,
}

/// Runs scrape sessions for a fixed unit set.
///
/// Cheap to clone. Clones share the unit set and the process-wide counters.
#[derive(Clone)]
pub struct ScrapeOrchestrator {
    registry: Arc<ScraperRegistry>,
    settings: Arc<ScrapeSettings>,
    counters: Arc<ExporterCounters>,
}

impl std::fmt::Debug for ScrapeOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeOrchestrator")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .field("total_scrapes", &self.counters.total_scrapes())
            .finish()
    }
}

impl ScrapeOrchestrator {
    pub fn new(registry: ScraperRegistry, settings: ScrapeSettings) -> Self {
        Self {
            registry: Arc::new(registry),
            settings: Arc::new(settings),
            counters: Arc::new(ExporterCounters::default()),
        }
    }

    /// Share counters with another orchestrator.
    pub fn with_counters(mut self, counters: Arc<ExporterCounters>) -> Self {
        self.counters = counters;
        self
    }

    pub fn registry(&self) -> &ScraperRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &ScrapeSettings {
        &self.settings
    }

    pub fn counters(&self) -> &Arc<ExporterCounters> {
        &self.counters
    }

    /// Run one collection session and return everything it produced.
    pub async fn collect(
        &self,
        connector: &dyn Connector,
        target: &Target,
        filter: &UnitFilter,
    ) -> (Vec<Measurement>, SessionReport) {
        let (sink, stream) = sink::channel(self.settings.sink_capacity);
        let (report, measurements) = tokio::join!(
            self.run(connector, target, filter, ScrapeMode::Collect, sink),
            stream.collect_all()
        );
        (measurements, report)
    }

    /// Run one session, writing into `sink`.
    ///
    /// The sink is dropped when the session ends, which ends the stream once
    /// every unit task has finished with its clone. Dropping the returned
    /// future aborts every unit task and drops the connection.
    pub async fn run(
        &self,
        connector: &dyn Connector,
        target: &Target,
        filter: &UnitFilter,
        mode: ScrapeMode,
        sink: MeasurementSink,
    ) -> SessionReport {
        let span = tracing::info_span!("scrape", target = %target.name, mode = %mode);
        self.run_session(connector, target, filter, mode, sink)
            .instrument(span)
            .await
    }

    async fn run_session(
        &self,
        connector: &dyn Connector,
        target: &Target,
        filter: &UnitFilter,
        mode: ScrapeMode,
        sink: MeasurementSink,
    ) -> SessionReport {
        let started = Instant::now();
        let mut report = SessionReport::new(&target.name, mode);
        if mode == ScrapeMode::Collect {
            self.counters.record_scrape();
        }

        let connection: Arc<dyn Connection> = match connector.connect(target).await {
            Ok(conn) => Arc::new(GatedConnection::new(conn, self.settings.max_in_flight)),
            Err(e) => {
                tracing::warn!(error = %e, "Target unreachable");
                report.error = Some(e.to_string());
                self.emit(&sink, self.down_measurements(&report)).await;
                return report;
            }
        };

        let info = match probe(connection.as_ref(), &self.settings.probe_query).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(error = %e, "Liveness probe failed");
                connection.close().await;
                report.error = Some(e.to_string());
                self.emit(&sink, self.down_measurements(&report)).await;
                return report;
            }
        };
        report.up = true;
        report.probe_duration = started.elapsed();
        self.emit(&sink, self.up_measurements(&report, info.as_ref()))
            .await;

        let ctx = ScrapeContext::new(
            Arc::clone(&connection),
            target.name.as_str(),
            self.settings.namespace.as_str(),
        );
        let mut tasks = JoinSet::new();
        for unit in self.registry.select(filter) {
            tasks.spawn(run_unit(unit, ctx.clone(), sink.clone()));
        }
        drop(ctx);

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.units.push(outcome),
                Err(e) => tracing::warn!(error = %e, "Unit task did not complete"),
            }
        }
        report.units.sort_by(|a, b| a.name.cmp(&b.name));

        self.emit(&sink, self.bookkeeping_measurements(&report)).await;
        connection.close().await;

        tracing::debug!(
            units = report.units.len(),
            failed = report.failed_units().count(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Scrape session finished"
        );
        report
    }

    async fn emit(&self, sink: &MeasurementSink, measurements: Vec<Measurement>) {
        if let Err(e) = sink.send_all(measurements).await {
            tracing::debug!(error = %e, "Dropping session bookkeeping");
        }
    }

    fn metric(&self, subsystem: &str, name: &str) -> String {
        fq_name(&self.settings.namespace, subsystem, name)
    }

    fn up(&self, value: f64) -> Measurement {
        Measurement::gauge(
            self.metric("", "up"),
            "Was the last scrape of the database successful.",
            value,
        )
    }

    fn duration(&self, collector: &str, duration: Duration) -> Measurement {
        Measurement::gauge(
            self.metric(EXPORTER_SUBSYSTEM, "collector_duration_seconds"),
            "Collector time duration.",
            duration.as_secs_f64(),
        )
        .with_label(COLLECTOR_LABEL, collector)
    }

    fn session_totals(&self, report: &SessionReport) -> [Measurement; 2] {
        [
            Measurement::counter(
                self.metric(EXPORTER_SUBSYSTEM, "scrapes_total"),
                "Total number of times the database was scraped for metrics.",
                self.counters.total_scrapes() as f64,
            ),
            Measurement::gauge(
                self.metric(EXPORTER_SUBSYSTEM, "last_scrape_error"),
                "Whether the last scrape of metrics from the database resulted in an error (1 for error, 0 for success).",
                if report.had_error() { 1.0 } else { 0.0 },
            ),
        ]
    }

    fn down_measurements(&self, report: &SessionReport) -> Vec<Measurement> {
        let mut out = vec![self.up(0.0)];
        out.extend(self.session_totals(report));
        out
    }

    fn up_measurements(&self, report: &SessionReport, info: Option<&InstanceInfo>) -> Vec<Measurement> {
        let mut out = vec![self.up(1.0)];
        if let Some(info) = info {
            out.push(
                Measurement::gauge(self.metric("", "info"), "Database instance information.", 1.0)
                    .with_label("sid", &info.sid)
                    .with_label("db_name", &info.db_name)
                    .with_label("db_version", &info.db_version),
            );
        }
        out.push(self.duration(CONNECTION_COLLECTOR, report.probe_duration));
        out
    }

    fn bookkeeping_measurements(&self, report: &SessionReport) -> Vec<Measurement> {
        let mut out = Vec::with_capacity(report.units.len() * 2 + 2);
        for unit in &report.units {
            out.push(self.duration(&unit.name, unit.duration));
            out.push(
                Measurement::counter(
                    self.metric(EXPORTER_SUBSYSTEM, "scrape_errors_total"),
                    "Total number of times an error occurred scraping the database.",
                    if unit.failed() { 1.0 } else { 0.0 },
                )
                .with_label(COLLECTOR_LABEL, &unit.name),
            );
        }
        out.extend(self.session_totals(report));
        out
    }
}

/// Run the liveness probe. The first row, if it has the identity columns,
/// becomes the info metric.
async fn probe(connection: &dyn Connection, query: &str) -> Result<Option<InstanceInfo>, DbError> {
    let rows = connection.query(query).await?;
    let info = rows.first().and_then(|row| {
        Some(InstanceInfo {
            sid: row.get("SID")?.to_label(),
            db_name: row.get("DB_NAME")?.to_label(),
            db_version: row.get("VERSION")?.to_label(),
        })
    });
    Ok(info)
}

async fn run_unit(unit: Arc<dyn ScraperUnit>, ctx: ScrapeContext, sink: MeasurementSink) -> UnitOutcome {
    let name = unit.name().to_string();
    let started = Instant::now();
    let result = AssertUnwindSafe(unit.scrape(&ctx))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(ScrapeError::Panicked));
    let duration = started.elapsed();

    match result {
        Ok(measurements) => {
            let produced = measurements.len();
            let forwarded = match sink.send_all(measurements).await {
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!(collector = %name, error = %e, "Sink closed while forwarding");
                    0
                }
            };
            tracing::debug!(
                collector = %name,
                produced,
                duration_ms = duration.as_millis() as u64,
                "Unit finished"
            );
            UnitOutcome {
                name,
                duration,
                measurements: forwarded,
                error: None,
            }
        }
        Err(e) => {
            tracing::error!(collector = %name, error = %e, "Unit failed");
            UnitOutcome {
                name,
                duration,
                measurements: 0,
                error: Some(e.to_string()),
            }
        }
    }
}
