//! Metric catalog discovery.
//!
//! The set of metrics a target can produce depends on what its views return,
//! so it cannot be listed up front. Discovery runs a full session in
//! [`ScrapeMode::Discover`] and keeps only the identity of every measurement.

use std::collections::{BTreeMap, BTreeSet};

use super::{Measurement, MetricIdentity, ScrapeMode, ScrapeOrchestrator, UnitFilter, ValueKind, sink};
use crate::db::{Connector, Target};

/// Identity-only projection of a measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub help: String,
    pub kind: ValueKind,
    pub label_keys: Vec<String>,
}

impl CatalogEntry {
    pub fn identity(&self) -> MetricIdentity {
        MetricIdentity {
            name: self.name.clone(),
            label_keys: self.label_keys.clone(),
        }
    }
}

impl From<&Measurement> for CatalogEntry {
    fn from(m: &Measurement) -> Self {
        Self {
            name: m.name.clone(),
            help: m.help.clone(),
            kind: m.kind,
            label_keys: m.labels.iter().map(|(k, _)| k.clone()).collect(),
        }
    }
}

/// The metric identities a target produced during one discovery pass.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<MetricIdentity, CatalogEntry>,
    complete: bool,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discover the catalog of `target` through a private session.
    ///
    /// The session's connection is opened and closed here and never reused.
    /// If the target is down or a unit fails, the catalog holds whatever was
    /// seen and [`is_complete`](Self::is_complete) returns `false`.
    pub async fn discover(
        orchestrator: &ScrapeOrchestrator,
        connector: &dyn Connector,
        target: &Target,
        filter: &UnitFilter,
    ) -> Self {
        let (sink, mut stream) = sink::channel(orchestrator.settings().sink_capacity);
        let mut catalog = Self::new();

        let (report, ()) = tokio::join!(
            orchestrator.run(connector, target, filter, ScrapeMode::Discover, sink),
            async {
                while let Some(m) = stream.next().await {
                    catalog.observe(&m);
                }
            }
        );

        catalog.complete = report.up && !report.had_error();
        if !catalog.complete {
            tracing::debug!(
                target = %target.name,
                entries = catalog.len(),
                "Catalog discovery incomplete"
            );
        }
        catalog
    }

    /// Record the identity of `m`. Returns `true` if it was new.
    pub fn observe(&mut self, m: &Measurement) -> bool {
        let identity = m.identity();
        if self.entries.contains_key(&identity) {
            return false;
        }
        self.entries.insert(identity, CatalogEntry::from(m));
        true
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    pub fn identities(&self) -> BTreeSet<MetricIdentity> {
        self.entries.keys().cloned().collect()
    }

    pub fn contains(&self, identity: &MetricIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether discovery saw every unit succeed against a live target.
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::collector::{ScrapeContext, ScrapeError, ScrapeSettings, ScraperRegistry, ScraperUnit, fq_name};
    use crate::config::Credentials;
    use crate::db::{MemoryConnector, MemoryDatabase, Value};

    const PROBE: &str = "select probe";
    const SERVICES: &str = "select services";

    /// One status gauge per service row.
    struct ServiceUnit;

    #[async_trait::async_trait]
    impl ScraperUnit for ServiceUnit {
        fn name(&self) -> &str {
            "services"
        }

        fn help(&self) -> &str {
            "service status"
        }

        async fn scrape(&self, ctx: &ScrapeContext) -> Result<Vec<Measurement>, ScrapeError> {
            let rows = ctx.query(SERVICES).await?;
            Ok(rows
                .iter()
                .map(|row| {
                    let service = row.get("SERVICE_NAME").map(Value::to_label).unwrap_or_default();
                    Measurement::gauge(fq_name(ctx.namespace(), "services", "status"), "status", 1.0)
                        .with_label("hana_instance", ctx.instance())
                        .with_label("service_name", service)
                })
                .collect())
        }
    }

    fn orchestrator() -> ScrapeOrchestrator {
        let mut registry = ScraperRegistry::new();
        registry.register(Arc::new(ServiceUnit)).unwrap();
        ScrapeOrchestrator::new(
            registry,
            ScrapeSettings {
                probe_query: PROBE.to_string(),
                ..ScrapeSettings::default()
            },
        )
    }

    fn database(services: usize) -> MemoryDatabase {
        let rows = (0..services)
            .map(|i| vec![Value::from(format!("service{i}"))])
            .collect();
        MemoryDatabase::new()
            .with_rows(PROBE, &["SID"], vec![vec!["HXE".into()]])
            .with_rows(SERVICES, &["SERVICE_NAME"], rows)
    }

    fn target(name: &str) -> Target {
        Target::new(name, Credentials::default())
    }

    fn status_identity() -> MetricIdentity {
        MetricIdentity {
            name: "hana_services_status".to_string(),
            label_keys: vec!["hana_instance".to_string(), "service_name".to_string()],
        }
    }

    #[tokio::test]
    async fn test_discover_is_idempotent() {
        let orch = orchestrator();
        let connector = MemoryConnector::new().with_database("hana01", database(3));

        let first = Catalog::discover(&orch, &connector, &target("hana01"), &UnitFilter::all()).await;
        let second = Catalog::discover(&orch, &connector, &target("hana01"), &UnitFilter::all()).await;

        assert!(first.is_complete());
        assert_eq!(first.identities(), second.identities());
        assert!(first.contains(&status_identity()));

        let db = connector.database("hana01").unwrap();
        assert_eq!(db.connections_opened(), 2);
        assert_eq!(db.open_connections(), 0);
        assert_eq!(orch.counters().total_scrapes(), 0);
    }

    #[tokio::test]
    async fn test_row_count_does_not_change_shape() {
        let orch = orchestrator();
        let connector = MemoryConnector::new()
            .with_database("small", database(1))
            .with_database("large", database(250))
            .with_database("idle", database(0));

        let small = Catalog::discover(&orch, &connector, &target("small"), &UnitFilter::all()).await;
        let large = Catalog::discover(&orch, &connector, &target("large"), &UnitFilter::all()).await;
        let idle = Catalog::discover(&orch, &connector, &target("idle"), &UnitFilter::all()).await;

        assert_eq!(small.identities(), large.identities());
        assert!(!idle.contains(&status_identity()));
        assert_eq!(idle.len() + 1, small.len());
    }

    #[tokio::test]
    async fn test_unreachable_target_yields_partial_catalog() {
        let orch = orchestrator();
        let connector = MemoryConnector::new();

        let catalog = Catalog::discover(&orch, &connector, &target("nowhere"), &UnitFilter::all()).await;

        assert!(!catalog.is_complete());
        assert!(!catalog.contains(&status_identity()));
        let up = MetricIdentity {
            name: "hana_up".to_string(),
            label_keys: Vec::new(),
        };
        assert!(catalog.contains(&up));
    }

    #[test]
    fn test_observe_keeps_first_entry() {
        let mut catalog = Catalog::new();
        let a = Measurement::gauge("hana_x", "first", 1.0).with_label("host", "a");
        let b = Measurement::gauge("hana_x", "second", 2.0).with_label("host", "b");

        assert!(catalog.observe(&a));
        assert!(!catalog.observe(&b));
        let entry = catalog.entries().next().unwrap();
        assert_eq!(entry.help, "first");
        assert_eq!(entry.kind, ValueKind::Gauge);
    }
}
