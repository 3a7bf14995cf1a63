//! Instance-level units: reachability, license, configuration, host resources.

use super::query::{QueryUnit, ValueColumn, ValueParse};

pub(super) const UP_QUERY: &str = "select 1 as status from dummy";

pub(super) const LICENSE_QUERY: &str = "select hardware_key, system_id, product_limit, \
     days_between(TO_SECONDDATE(CURRENT_TIMESTAMP), TO_SECONDDATE(expiration_date)) as expire_days \
     from sys.m_license";

pub(super) const LOG_MODE_QUERY: &str = "SELECT VALUE as LOG_MODE FROM M_INIFILE_CONTENTS \
     WHERE FILE_NAME = 'global.ini' AND SECTION = 'persistence' AND LAYER_NAME = 'DEFAULT' AND KEY = 'log_mode'";

pub(super) const HOST_RESOURCE_QUERY: &str =
    "select USED_PHYSICAL_MEMORY, FREE_PHYSICAL_MEMORY from SYS.M_HOST_RESOURCE_UTILIZATION";

pub(super) const DISKS_QUERY: &str = "SELECT HOST, PATH, USAGE_TYPE, TOTAL_SIZE, USED_SIZE FROM SYS.M_DISKS";

pub(super) fn up() -> QueryUnit {
    QueryUnit::new("up", "Check that the server answers queries", UP_QUERY)
        .instance_label()
        .value(ValueColumn::gauge("STATUS", "state", "the HANA server is up").parse(ValueParse::Status))
}

pub(super) fn license() -> QueryUnit {
    QueryUnit::new("sys_m_license", "Collect info from SYS.M_LICENSE", LICENSE_QUERY)
        .instance_label()
        .label("hardware_key", "HARDWARE_KEY")
        .label("system_id", "SYSTEM_ID")
        .label("product_limit", "PRODUCT_LIMIT")
        .gauge("EXPIRE_DAYS", "expire_days", "License expire days from sys.m_license.")
}

pub(super) fn system_config() -> QueryUnit {
    QueryUnit::new("system_config", "Collect info from system ini config", LOG_MODE_QUERY).value(
        ValueColumn::gauge(
            "LOG_MODE",
            "log_mode",
            "log_mode of the current system layer, 0 (normal), 1 (overwrite)",
        )
        .parse(ValueParse::ConfigString),
    )
}

pub(super) fn host_resource_utilization() -> QueryUnit {
    QueryUnit::new(
        "sys_m_host_resource_utilization",
        "Collect info from SYS.M_HOST_RESOURCE_UTILIZATION",
        HOST_RESOURCE_QUERY,
    )
    .instance_label()
    .gauge("USED_PHYSICAL_MEMORY", "used_physical_memory", "Used physical memory on the host.")
    .gauge("FREE_PHYSICAL_MEMORY", "free_physical_memory", "Free physical memory on the host.")
}

pub(super) fn disks() -> QueryUnit {
    QueryUnit::new("sys_m_disks", "Collect info from SYS.M_DISKS", DISKS_QUERY)
        .instance_label()
        .label("host", "HOST")
        .label("path", "PATH")
        .label("usage_type", "USAGE_TYPE")
        .gauge("TOTAL_SIZE", "total_size", "Volume Size.")
        .gauge("USED_SIZE", "used_size", "Volume Used Space.")
}
