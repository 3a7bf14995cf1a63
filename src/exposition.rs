//! Prometheus text exposition.
//!
//! Each request builds a fresh [`prometheus::Registry`]. Families are
//! registered from the discovered catalog first, then every collected
//! measurement sets its sample. Problems with single metrics are logged and
//! the metric dropped, so one odd series never fails a whole response.

use std::collections::{HashMap, HashSet};

use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;

use crate::collector::{Catalog, CatalogEntry, Measurement, MetricIdentity, ValueKind};

/// Content type of the rendered exposition.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Rendering failed.
#[derive(Debug, Error)]
pub enum ExpositionError {
    #[error("failed to encode metrics: {0}")]
    Encode(#[from] prometheus::Error),

    #[error("encoded metrics are not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

enum Family {
    Gauge(GaugeVec),
    Counter(CounterVec),
}

/// Metric families for one response.
pub struct Exposition {
    registry: Registry,
    families: HashMap<MetricIdentity, Family>,
    rejected: HashSet<MetricIdentity>,
    dropped: usize,
}

impl Default for Exposition {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Exposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exposition")
            .field("families", &self.families.len())
            .field("rejected", &self.rejected.len())
            .field("dropped", &self.dropped)
            .finish()
    }
}

impl Exposition {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            families: HashMap::new(),
            rejected: HashSet::new(),
            dropped: 0,
        }
    }

    /// Register one family per catalog entry.
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut exposition = Self::new();
        for entry in catalog.entries() {
            exposition.describe(entry);
        }
        exposition
    }

    /// Set the sample for `m`, registering its family if the catalog did not have it.
    pub fn record(&mut self, m: &Measurement) {
        let identity = m.identity();
        if !self.families.contains_key(&identity) && !self.describe(&CatalogEntry::from(m)) {
            self.dropped += 1;
            return;
        }
        let Some(family) = self.families.get(&identity) else {
            return;
        };

        let values: Vec<&str> = m.labels.iter().map(|(_, v)| v.as_str()).collect();
        let recorded = match family {
            Family::Gauge(vec) => vec.get_metric_with_label_values(&values).map(|g| g.set(m.value)),
            Family::Counter(vec) => {
                if !(m.value.is_finite() && m.value >= 0.0) {
                    tracing::warn!(metric = %m.name, value = m.value, "Dropping invalid counter value");
                    self.dropped += 1;
                    return;
                }
                vec.get_metric_with_label_values(&values).map(|c| c.inc_by(m.value))
            }
        };
        if let Err(e) = recorded {
            tracing::warn!(metric = %m.name, error = %e, "Dropping sample");
            self.dropped += 1;
        }
    }

    pub fn record_all<'a>(&mut self, measurements: impl IntoIterator<Item = &'a Measurement>) {
        for m in measurements {
            self.record(m);
        }
    }

    /// Measurements that could not be exported.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Render every registered family in the text format.
    pub fn encode(&self) -> Result<String, ExpositionError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Register the family for `entry`. Returns `false` if it cannot be registered.
    fn describe(&mut self, entry: &CatalogEntry) -> bool {
        let identity = entry.identity();
        if self.families.contains_key(&identity) {
            return true;
        }
        if self.rejected.contains(&identity) {
            return false;
        }

        match self.register(entry) {
            Ok(family) => {
                self.families.insert(identity, family);
                true
            }
            Err(e) => {
                tracing::warn!(
                    metric = %entry.name,
                    labels = ?entry.label_keys,
                    error = %e,
                    "Metric family rejected"
                );
                self.rejected.insert(identity);
                false
            }
        }
    }

    fn register(&self, entry: &CatalogEntry) -> Result<Family, prometheus::Error> {
        let help = if entry.help.is_empty() {
            entry.name.clone()
        } else {
            entry.help.clone()
        };
        let opts = Opts::new(entry.name.clone(), help);
        let labels: Vec<&str> = entry.label_keys.iter().map(String::as_str).collect();

        match entry.kind {
            ValueKind::Gauge => {
                let vec = GaugeVec::new(opts, &labels)?;
                self.registry.register(Box::new(vec.clone()))?;
                Ok(Family::Gauge(vec))
            }
            ValueKind::Counter => {
                let vec = CounterVec::new(opts, &labels)?;
                self.registry.register(Box::new(vec.clone()))?;
                Ok(Family::Counter(vec))
            }
        }
    }
}
