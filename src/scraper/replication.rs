//! System and service replication units.

use super::query::{QueryUnit, ValueColumn, ValueParse};

pub(super) const SYSTEM_REPLICATION_QUERY: &str = "select SITE_NAME, SITE_ID, SECONDARY_SITE_NAME, SECONDARY_SITE_ID, \
     REPLICATION_MODE, REPLICATION_STATUS, OPERATION_MODE, TIER from SYS.M_SYSTEM_REPLICATION";

pub(super) const SERVICE_REPLICATION_QUERY: &str = "SELECT HOST, PORT, SECONDARY_HOST, SECONDARY_PORT, \
     REPLICATION_MODE, REPLICATION_STATUS FROM SYS.M_SERVICE_REPLICATION";

pub(super) fn system_replication() -> QueryUnit {
    QueryUnit::new(
        "sys_m_system_replication",
        "Collect info from SYS.M_SYSTEM_REPLICATION",
        SYSTEM_REPLICATION_QUERY,
    )
    .label("site_name", "SITE_NAME")
    .label("site_id", "SITE_ID")
    .label("secondary_site_name", "SECONDARY_SITE_NAME")
    .label("secondary_site_id", "SECONDARY_SITE_ID")
    .label("replication_mode", "REPLICATION_MODE")
    .label("operation_mode", "OPERATION_MODE")
    .label("tier", "TIER")
    .value(
        ValueColumn::gauge("REPLICATION_STATUS", "status", "system replication Status, 1(ACTIVE).")
            .parse(ValueParse::Status),
    )
}

pub(super) fn service_replication() -> QueryUnit {
    QueryUnit::new(
        "sys_m_service_replication",
        "Collect info from SYS.M_SERVICE_REPLICATION",
        SERVICE_REPLICATION_QUERY,
    )
    .instance_label()
    .label("host", "HOST")
    .label("port", "PORT")
    .label("secondary_host", "SECONDARY_HOST")
    .label("secondary_port", "SECONDARY_PORT")
    .label("replication_mode", "REPLICATION_MODE")
    .value(
        ValueColumn::gauge("REPLICATION_STATUS", "status", "service replication Status, 1(ACTIVE).")
            .parse(ValueParse::Status),
    )
}
