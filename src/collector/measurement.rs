//! Measurement data model.

use strum_macros::{AsRefStr, Display};

/// How a measurement's value behaves over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    Gauge,
    Counter,
}

/// Join metric name parts with `_`, skipping empty parts.
///
/// # Examples
///
/// ```
/// use hana_exporter::collector::fq_name;
///
/// assert_eq!(fq_name("hana", "sys_m_disks", "used_size"), "hana_sys_m_disks_used_size");
/// assert_eq!(fq_name("hana", "", "up"), "hana_up");
/// ```
pub fn fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Identity of a measurement: its name plus the label keys it carries, in order.
///
/// Label values are not part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricIdentity {
    pub name: String,
    pub label_keys: Vec<String>,
}

/// One labeled sample ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Fully qualified metric name.
    pub name: String,
    /// Help text advertised with the metric.
    pub help: String,
    pub kind: ValueKind,
    /// Ordered label pairs.
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

impl Measurement {
    pub fn gauge(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self::new(name, help, ValueKind::Gauge, value)
    }

    pub fn counter(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self::new(name, help, ValueKind::Counter, value)
    }

    fn new(name: impl Into<String>, help: impl Into<String>, kind: ValueKind, value: f64) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind,
            labels: Vec::new(),
            value,
        }
    }

    /// Append a label pair.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self
    }

    /// Value of the label `key`, if present.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn identity(&self) -> MetricIdentity {
        MetricIdentity {
            name: self.name.clone(),
            label_keys: self.labels.iter().map(|(k, _)| k.clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_ignores_label_values() {
        let a = Measurement::gauge("hana_disk", "d", 1.0).with_label("host", "a");
        let b = Measurement::gauge("hana_disk", "d", 2.0).with_label("host", "b");
        let c = Measurement::gauge("hana_disk", "d", 2.0).with_label("path", "b");

        assert_eq!(a.identity(), b.identity());
        assert_ne!(a.identity(), c.identity());
    }

    #[test]
    fn test_label_lookup() {
        let m = Measurement::counter("hana_x_total", "x", 3.0)
            .with_label("collector", "sys_m_disks")
            .with_label("hana_instance", "hana01");
        assert_eq!(m.label("collector"), Some("sys_m_disks"));
        assert_eq!(m.label("missing"), None);
        assert_eq!(m.kind.as_ref(), "counter");
    }

    #[test]
    fn test_fq_name_skips_empty_parts() {
        assert_eq!(fq_name("hana", "exporter", "scrapes_total"), "hana_exporter_scrapes_total");
        assert_eq!(fq_name("", "", "up"), "up");
    }
}
