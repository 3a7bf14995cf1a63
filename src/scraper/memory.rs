//! Memory and table store units.

use super::query::QueryUnit;

pub(super) const SHARED_MEMORY_QUERY: &str =
    "SELECT HOST, PORT, CATEGORY, ALLOCATED_SIZE, USED_SIZE, FREE_SIZE FROM SYS.M_SHARED_MEMORY";

pub(super) const CS_LOADS_QUERY: &str = r#"SELECT COUNT(*) CS_LOAD_COUNT, SCHEMA_NAME FROM "SYS"."M_CS_LOADS" WHERE SCHEMA_NAME NOT LIKE '_SYS%' GROUP BY SCHEMA_NAME ORDER BY COUNT(*) DESC"#;

pub(super) const CS_UNLOADS_QUERY: &str = r#"SELECT COUNT(*) as CS_UNLOAD_COUNT, SCHEMA_NAME FROM "SYS"."M_CS_UNLOADS" WHERE SCHEMA_NAME NOT LIKE 'SYS%' AND SCHEMA_NAME NOT LIKE '_SYS%' AND SCHEMA_NAME NOT LIKE 'HANA%' AND SCHEMA_NAME NOT LIKE 'UI%' GROUP BY SCHEMA_NAME ORDER BY COUNT(*) DESC"#;

pub(super) const CS_TABLES_QUERY: &str = "SELECT HOST, PORT, SCHEMA_NAME, TABLE_NAME, PART_ID, MEMORY_SIZE_IN_TOTAL, \
     RECORD_COUNT, READ_COUNT, WRITE_COUNT, MERGE_COUNT FROM SYS.M_CS_TABLES \
     WHERE SCHEMA_NAME != '_SYS_STATISTICS' ORDER BY MEMORY_SIZE_IN_TOTAL DESC LIMIT 10";

pub(super) const RS_TABLES_QUERY: &str = "select TOP 5 (ALLOCATED_FIXED_PART_SIZE + ALLOCATED_VARIABLE_PART_SIZE) as TOTAL_ALLOCATED_SIZE, \
     (USED_FIXED_PART_SIZE + USED_VARIABLE_PART_SIZE) as TOTAL_USED_SIZE, SCHEMA_NAME, TABLE_NAME \
     from SYS.M_RS_TABLES WHERE SCHEMA_NAME NOT LIKE 'SYS%' AND SCHEMA_NAME NOT LIKE '_SYS%' \
     AND SCHEMA_NAME NOT LIKE 'HANA%' AND SCHEMA_NAME NOT LIKE 'UI%' \
     AND (ALLOCATED_FIXED_PART_SIZE + ALLOCATED_VARIABLE_PART_SIZE) != 0 \
     ORDER BY TOTAL_ALLOCATED_SIZE DESC, TOTAL_USED_SIZE DESC";

pub(super) fn shared_memory() -> QueryUnit {
    QueryUnit::new("sys_m_shared_memory", "Collect info from SYS.M_SHARED_MEMORY", SHARED_MEMORY_QUERY)
        .label("host", "HOST")
        .label("port", "PORT")
        .label("category", "CATEGORY")
        .gauge("ALLOCATED_SIZE", "allocated_size", "Allocated shared memory size on the module.")
        .gauge("USED_SIZE", "used_size", "Used shared memory size on the module.")
        .gauge("FREE_SIZE", "free_size", "Free shared memory size on the module.")
}

pub(super) fn cs_loads() -> QueryUnit {
    QueryUnit::new("sys_m_cs_loads", "Collect info from SYS.M_CS_LOADS", CS_LOADS_QUERY)
        .label("schema", "SCHEMA_NAME")
        .gauge("CS_LOAD_COUNT", "count", "column loads count.")
}

pub(super) fn cs_unloads() -> QueryUnit {
    QueryUnit::new("sys_m_cs_unloads", "Collect info from SYS.M_CS_UNLOADS", CS_UNLOADS_QUERY)
        .label("schema", "SCHEMA_NAME")
        .gauge("CS_UNLOAD_COUNT", "count", "column unloads count.")
}

pub(super) fn cs_tables() -> QueryUnit {
    QueryUnit::new("sys_m_cs_tables", "Collect info from SYS.M_CS_TABLES", CS_TABLES_QUERY)
        .instance_label()
        .label("host", "HOST")
        .label("port", "PORT")
        .label("schema_name", "SCHEMA_NAME")
        .label("table_name", "TABLE_NAME")
        .label("part_id", "PART_ID")
        .gauge("MEMORY_SIZE_IN_TOTAL", "memory_size_in_total", "Total memory size of the column table.")
        .gauge("RECORD_COUNT", "record_count", "Number of records in the column table.")
        .gauge("READ_COUNT", "read_count", "Number of read accesses on the column table.")
        .gauge("WRITE_COUNT", "write_count", "Number of write accesses on the column table.")
        .gauge("MERGE_COUNT", "merge_count", "Number of delta merges on the column table.")
        .disabled_by_default()
}

pub(super) fn rs_tables() -> QueryUnit {
    QueryUnit::new("sys_m_rs_tables", "Collect info from SYS.M_RS_TABLES", RS_TABLES_QUERY)
        .label("schema_name", "SCHEMA_NAME")
        .label("table_name", "TABLE_NAME")
        .gauge("TOTAL_ALLOCATED_SIZE", "total_allocated_size", "Total allocated memory size on this table, Byte.")
        .gauge("TOTAL_USED_SIZE", "total_used_size", "Total Used memory of this table, Byte.")
        .disabled_by_default()
}
