//! Scraper unit registry.
//!
//! Holds the unit set and each unit's enabled flag. A registry is built at
//! startup and handed to the orchestrator, so two orchestrators in one process
//! can run different unit sets.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::ScraperUnit;
use crate::config::ConfigError;

/// Metadata about a registered unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitInfo {
    /// Unit name.
    pub name: String,
    /// Unit help text.
    pub help: String,
    /// Whether the unit runs on an unfiltered request.
    pub enabled: bool,
}

#[derive(Clone)]
struct RegisteredUnit {
    unit: Arc<dyn ScraperUnit>,
    enabled: bool,
}

/// Registered units in registration order, with their enabled flags.
#[derive(Clone, Default)]
pub struct ScraperRegistry {
    units: Vec<RegisteredUnit>,
}

impl std::fmt::Debug for ScraperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScraperRegistry")
            .field("unit_count", &self.units.len())
            .field("enabled", &self.enabled_names())
            .finish()
    }
}

impl ScraperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit with its default enabled flag.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if the name is empty or taken.
    pub fn register(&mut self, unit: Arc<dyn ScraperUnit>) -> Result<(), ConfigError> {
        let name = unit.name();
        if name.is_empty() {
            return Err(ConfigError::ValidationError(
                "scraper unit name cannot be empty".to_string(),
            ));
        }
        if self.position(name).is_some() {
            return Err(ConfigError::ValidationError(format!(
                "duplicate scraper unit name: '{name}'"
            )));
        }

        let enabled = unit.enabled_by_default();
        tracing::debug!(collector = %name, enabled, "Scraper unit registered");
        self.units.push(RegisteredUnit { unit, enabled });
        Ok(())
    }

    /// Apply configured enable flags.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` for a name no unit carries.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, bool>) -> Result<Self, ConfigError> {
        for (name, enabled) in overrides {
            if !self.set_enabled(name, *enabled) {
                return Err(ConfigError::ValidationError(format!(
                    "unknown scraper unit in config: '{name}'"
                )));
            }
        }
        Ok(self)
    }

    /// Set a unit's enabled flag. Returns `false` if no unit has that name.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.position(name) {
            Some(idx) => {
                self.units[idx].enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// List all registered units.
    pub fn list_units(&self) -> Vec<UnitInfo> {
        self.units
            .iter()
            .map(|r| UnitInfo {
                name: r.unit.name().to_string(),
                help: r.unit.help().to_string(),
                enabled: r.enabled,
            })
            .collect()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn enabled_names(&self) -> Vec<&str> {
        self.units
            .iter()
            .filter(|r| r.enabled)
            .map(|r| r.unit.name())
            .collect()
    }

    /// Enabled units admitted by `filter`, in registration order.
    pub fn select(&self, filter: &UnitFilter) -> Vec<Arc<dyn ScraperUnit>> {
        self.units
            .iter()
            .filter(|r| r.enabled && filter.admits(r.unit.name()))
            .map(|r| Arc::clone(&r.unit))
            .collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.units.iter().position(|r| r.unit.name() == name)
    }
}

/// Per-request unit selection.
///
/// An empty filter admits every enabled unit. Names that match no unit are
/// ignored, and a filter never turns on a disabled unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitFilter {
    names: BTreeSet<String>,
}

impl UnitFilter {
    /// Admit every enabled unit.
    pub fn all() -> Self {
        Self::default()
    }

    /// Admit only the named units. Empty names are dropped.
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(Into::into)
                .filter(|n: &String| !n.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn admits(&self, name: &str) -> bool {
        self.names.is_empty() || self.names.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{Measurement, ScrapeContext, ScrapeError};

    struct MockUnit {
        name: &'static str,
        default_on: bool,
    }

    #[async_trait::async_trait]
    impl ScraperUnit for MockUnit {
        fn name(&self) -> &str {
            self.name
        }

        fn help(&self) -> &str {
            "mock unit"
        }

        fn enabled_by_default(&self) -> bool {
            self.default_on
        }

        async fn scrape(&self, _ctx: &ScrapeContext) -> Result<Vec<Measurement>, ScrapeError> {
            Ok(Vec::new())
        }
    }

    fn registry() -> ScraperRegistry {
        let mut registry = ScraperRegistry::new();
        for (name, default_on) in [("disks", true), ("license", true), ("cs_tables", false)] {
            registry
                .register(Arc::new(MockUnit { name, default_on }))
                .unwrap();
        }
        registry
    }

    fn names(units: &[Arc<dyn ScraperUnit>]) -> Vec<&str> {
        units.iter().map(|u| u.name()).collect()
    }

    #[test]
    fn test_registry_lifecycle() {
        let registry = registry();
        assert_eq!(registry.unit_count(), 3);
        assert_eq!(registry.enabled_names(), vec!["disks", "license"]);

        let units = registry.list_units();
        assert_eq!(units[2].name, "cs_tables");
        assert!(!units[2].enabled);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = registry();
        let err = registry
            .register(Arc::new(MockUnit {
                name: "disks",
                default_on: true,
            }))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_overrides_apply_and_reject_unknown() {
        let mut overrides = BTreeMap::new();
        overrides.insert("cs_tables".to_string(), true);
        overrides.insert("disks".to_string(), false);
        let registry = registry().with_overrides(&overrides).unwrap();
        assert_eq!(registry.enabled_names(), vec!["license", "cs_tables"]);

        let mut bad = BTreeMap::new();
        bad.insert("nope".to_string(), true);
        assert!(registry.with_overrides(&bad).is_err());
    }

    #[test]
    fn test_filter_selection() {
        let registry = registry();

        assert_eq!(names(&registry.select(&UnitFilter::all())), vec!["disks", "license"]);
        assert_eq!(
            names(&registry.select(&UnitFilter::only(["license", "unknown"]))),
            vec!["license"]
        );
        // A filter never enables a disabled unit.
        assert!(registry.select(&UnitFilter::only(["cs_tables"])).is_empty());
        assert!(UnitFilter::only([""]).is_empty());
    }
}
