//! Built-in scraper units.
//!
//! Every unit is a [`QueryUnit`]: one statement against a monitoring view,
//! label columns, and value columns with a parse mode. The unit name is also
//! the metric subsystem.
//!
//! # Units
//!
//! | Unit | Source | Default |
//! |------|--------|---------|
//! | `up` | `DUMMY` | on |
//! | `sys_m_license` | `SYS.M_LICENSE` | on |
//! | `sys_m_disks` | `SYS.M_DISKS` | on |
//! | `sys_m_service_statistics` | `SYS.M_SERVICE_STATISTICS` | on |
//! | `sys_m_service_replication` | `SYS.M_SERVICE_REPLICATION` | on |
//! | `sys_m_system_replication` | `SYS.M_SYSTEM_REPLICATION` | on |
//! | `host_service_memory` | `_SYS_STATISTICS.HOST_SERVICE_MEMORY` | on |
//! | `host_service_statistics` | `_SYS_STATISTICS.HOST_SERVICE_STATISTICS` | off |
//! | `sys_m_host_resource_utilization` | `SYS.M_HOST_RESOURCE_UTILIZATION` | on |
//! | `sys_m_shared_memory` | `SYS.M_SHARED_MEMORY` | on |
//! | `sys_m_cs_loads` | `SYS.M_CS_LOADS` | on |
//! | `sys_m_cs_unloads` | `SYS.M_CS_UNLOADS` | on |
//! | `sys_m_cs_tables` | `SYS.M_CS_TABLES` | off |
//! | `sys_m_rs_tables` | `SYS.M_RS_TABLES` | off |
//! | `system_config` | `M_INIFILE_CONTENTS` | on |

mod memory;
mod query;
mod replication;
mod service;
mod status;
mod system;

use std::sync::Arc;

pub use query::{INSTANCE_LABEL, LabelSource, QueryUnit, ValueColumn, ValueParse};
pub use status::{parse_config_string, parse_status};

use crate::collector::ScraperRegistry;
use crate::config::ConfigError;

/// All built-in units, in registration order.
pub fn builtin_units() -> Vec<QueryUnit> {
    vec![
        system::up(),
        system::license(),
        system::disks(),
        service::service_statistics(),
        replication::service_replication(),
        replication::system_replication(),
        service::host_service_memory(),
        service::host_service_statistics(),
        system::host_resource_utilization(),
        memory::shared_memory(),
        memory::cs_loads(),
        memory::cs_unloads(),
        memory::cs_tables(),
        memory::rs_tables(),
        system::system_config(),
    ]
}

/// A registry holding every built-in unit with its default enabled flag.
///
/// # Errors
/// Returns `ConfigError::ValidationError` if two built-in units share a name.
pub fn builtin_registry() -> Result<ScraperRegistry, ConfigError> {
    let mut registry = ScraperRegistry::new();
    for unit in builtin_units() {
        registry.register(Arc::new(unit))?;
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{Measurement, ScrapeOrchestrator, ScrapeSettings, ScraperUnit, UnitFilter, fq_name};
    use crate::config::{Credentials, is_valid_metric_name};
    use crate::db::{MemoryConnector, MemoryDatabase, Target, Value};

    const PROBE: &str = "select probe";

    fn orchestrator() -> ScrapeOrchestrator {
        ScrapeOrchestrator::new(
            builtin_registry().unwrap(),
            ScrapeSettings {
                probe_query: PROBE.to_string(),
                ..ScrapeSettings::default()
            },
        )
    }

    fn database() -> MemoryDatabase {
        MemoryDatabase::new()
            .with_rows(PROBE, &["SID"], vec![vec!["HXE".into()]])
            .with_rows(system::UP_QUERY, &["STATUS"], vec![vec![1_i64.into()]])
            .with_rows(
                system::DISKS_QUERY,
                &["HOST", "PATH", "USAGE_TYPE", "TOTAL_SIZE", "USED_SIZE"],
                vec![vec![
                    "hxehost".into(),
                    "/hana/data/HXE/".into(),
                    "DATA".into(),
                    107_374_182_400_i64.into(),
                    21_474_836_480_i64.into(),
                ]],
            )
            .with_rows(
                service::SERVICE_STATISTICS_QUERY,
                &["SERVICE_NAME", "HOST", "PORT", "ACTIVE_STATUS", "DURATION"],
                vec![
                    vec!["indexserver".into(), "hxehost".into(), "39003".into(), "YES".into(), 3600_i64.into()],
                    vec!["xsengine".into(), "hxehost".into(), "39007".into(), "RESTARTING".into(), 12_i64.into()],
                ],
            )
            .with_rows(system::LOG_MODE_QUERY, &["LOG_MODE"], vec![vec![Value::Null]])
            .with_failure(system::LICENSE_QUERY, "insufficient privilege: Not authorized")
    }

    fn find<'a>(ms: &'a [Measurement], name: &str, key: &str, value: &str) -> Option<&'a Measurement> {
        ms.iter()
            .find(|m| m.name == name && m.label(key) == Some(value))
    }

    #[test]
    fn test_builtin_names_unique_and_defaults() {
        let registry = builtin_registry().unwrap();
        assert_eq!(registry.unit_count(), 15);

        let disabled: Vec<String> = registry
            .list_units()
            .into_iter()
            .filter(|u| !u.enabled)
            .map(|u| u.name)
            .collect();
        assert_eq!(
            disabled,
            vec!["host_service_statistics", "sys_m_cs_tables", "sys_m_rs_tables"]
        );
    }

    #[test]
    fn test_metric_names_are_valid() {
        for unit in builtin_units() {
            for value in unit.values() {
                let name = fq_name("hana", unit.name(), value.name());
                assert!(is_valid_metric_name(&name), "{name}");
            }
        }
    }

    #[tokio::test]
    async fn test_service_statistics_statuses() {
        let orch = orchestrator();
        let connector = MemoryConnector::new().with_database("hana01", database());
        let filter = UnitFilter::only(["sys_m_service_statistics"]);

        let (ms, report) = orch
            .collect(&connector, &Target::new("hana01", Credentials::default()), &filter)
            .await;
        assert!(!report.had_error());

        let status = "hana_sys_m_service_statistics_status";
        let duration = "hana_sys_m_service_statistics_status_duration_seconds";

        let indexserver = find(&ms, status, "service_name", "indexserver").unwrap();
        assert_eq!(indexserver.value, 1.0);
        assert_eq!(indexserver.label(INSTANCE_LABEL), Some("hana01"));

        // Unknown status: the status sample is dropped, the duration stays.
        assert!(find(&ms, status, "service_name", "xsengine").is_none());
        let restarting = find(&ms, duration, "service_name", "xsengine").unwrap();
        assert_eq!(restarting.value, 12.0);
        assert_eq!(restarting.label("service_status"), Some("RESTARTING"));
    }

    #[tokio::test]
    async fn test_default_battery_against_partial_instance() {
        let orch = orchestrator();
        let connector = MemoryConnector::new().with_database("hana01", database());

        let (ms, report) = orch
            .collect(&connector, &Target::new("hana01", Credentials::default()), &UnitFilter::all())
            .await;

        assert!(report.up);
        assert_eq!(report.units.len(), 12);
        assert!(report.unit("sys_m_license").unwrap().failed());
        assert!(!report.unit("up").unwrap().failed());
        assert!(!report.unit("sys_m_disks").unwrap().failed());
        // Views without a scripted answer fail like missing views would.
        assert!(report.unit("sys_m_shared_memory").unwrap().failed());

        let used = find(&ms, "hana_sys_m_disks_used_size", "usage_type", "DATA").unwrap();
        assert_eq!(used.value, 21_474_836_480.0);
        let up_state = ms.iter().find(|m| m.name == "hana_up_state").unwrap();
        assert_eq!(up_state.value, 1.0);
        let log_mode = ms.iter().find(|m| m.name == "hana_system_config_log_mode").unwrap();
        assert_eq!(log_mode.value, 0.0);
        assert!(log_mode.labels.is_empty());
    }
}
