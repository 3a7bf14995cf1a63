//! Per-service units.

use super::query::{LabelSource, QueryUnit, ValueColumn, ValueParse};

pub(super) const SERVICE_STATISTICS_QUERY: &str = "select SERVICE_NAME, HOST, PORT, ACTIVE_STATUS, \
     seconds_between(TO_SECONDDATE(START_TIME), TO_SECONDDATE(SYS_TIMESTAMP)) as DURATION \
     from SYS.M_SERVICE_STATISTICS";

pub(super) const HOST_SERVICE_MEMORY_QUERY: &str = r#"select host, port, service_name, total_memory_used_size from "_SYS_STATISTICS"."HOST_SERVICE_MEMORY" where snapshot_id in (select distinct max(snapshot_id) as snapshot_id from "_SYS_STATISTICS"."HOST_SERVICE_MEMORY")"#;

pub(super) const HOST_SERVICE_STATISTICS_QUERY: &str = r#"select HOST, PORT, SERVICE_NAME, ACTIVE_STATUS, ACTIVE_REQUEST_COUNT, PENDING_REQUEST_COUNT, ALL_FINISHED_REQUEST_COUNT, ALL_FINISHED_REQUEST_COUNT_DELTA, FINISHED_NON_INTERNAL_REQUEST_COUNT, FINISHED_NON_INTERNAL_REQUEST_COUNT_DELTA, REQUESTS_PER_SEC, RESPONSE_TIME, PROCESS_ID, ACTIVE_THREAD_COUNT, THREAD_COUNT, PROCESS_CPU_TIME, TOTAL_CPU_TIME, PROCESS_PHYSICAL_MEMORY, PROCESS_MEMORY, PHYSICAL_MEMORY from "_SYS_STATISTICS"."HOST_SERVICE_STATISTICS" where snapshot_id in (select distinct max(snapshot_id) as snapshot_id from "_SYS_STATISTICS"."HOST_SERVICE_STATISTICS") AND SERVICE_NAME != 'daemon'"#;

const HOST_SERVICE_STATISTICS_COLUMNS: &[(&str, &str, &str)] = &[
    ("ACTIVE_REQUEST_COUNT", "active_request_count", "Active Request Count"),
    ("PENDING_REQUEST_COUNT", "pending_request_count", "Pending Request Count"),
    ("ALL_FINISHED_REQUEST_COUNT", "all_finished_request_count", "All Finished Request Count"),
    (
        "ALL_FINISHED_REQUEST_COUNT_DELTA",
        "all_finished_request_count_delta",
        "All Finished Request Count Delta",
    ),
    (
        "FINISHED_NON_INTERNAL_REQUEST_COUNT",
        "finished_non_internal_request_count",
        "Finished requests",
    ),
    (
        "FINISHED_NON_INTERNAL_REQUEST_COUNT_DELTA",
        "finished_non_internal_request_count_delta",
        "Finished requests Delta",
    ),
    ("REQUESTS_PER_SEC", "requests_per_sec", "Requests per second (average over last 1000 requests)"),
    ("RESPONSE_TIME", "response_time", "Request response time (average over last 1000 requests)"),
    ("PROCESS_ID", "process_id", "process_id"),
    ("ACTIVE_THREAD_COUNT", "active_thread_count", "Number of active threads"),
    ("THREAD_COUNT", "thread_count", "Number of total threads"),
    ("PROCESS_CPU_TIME", "process_cpu_time", "CPU usage of current process since start"),
    ("TOTAL_CPU_TIME", "total_cpu_time", "CPU usage of all processes since start"),
    ("PROCESS_PHYSICAL_MEMORY", "process_physical_memory", "Process physical memory usage"),
    ("PROCESS_MEMORY", "process_memory", "Process logical memory usage"),
    ("PHYSICAL_MEMORY", "physical_memory", "Host physical memory size"),
];

pub(super) fn service_statistics() -> QueryUnit {
    QueryUnit::new(
        "sys_m_service_statistics",
        "Collect info from SYS.M_SERVICE_STATISTICS",
        SERVICE_STATISTICS_QUERY,
    )
    .instance_label()
    .label("service_name", "SERVICE_NAME")
    .label("host", "HOST")
    .label("port", "PORT")
    .value(
        ValueColumn::gauge(
            "ACTIVE_STATUS",
            "status",
            "Service Active Status from sys.m_service_statistics.",
        )
        .parse(ValueParse::Status),
    )
    .value(
        ValueColumn::gauge(
            "DURATION",
            "status_duration_seconds",
            "Current service status duration (seconds) from sys.m_service_statistics.",
        )
        .with_labels(vec![
            LabelSource::Instance,
            LabelSource::column("service_name", "SERVICE_NAME"),
            LabelSource::column("service_status", "ACTIVE_STATUS"),
            LabelSource::column("host", "HOST"),
            LabelSource::column("port", "PORT"),
        ]),
    )
}

pub(super) fn host_service_memory() -> QueryUnit {
    QueryUnit::new(
        "host_service_memory",
        "Collect from _SYS_STATISTICS.HOST_SERVICE_MEMORY",
        HOST_SERVICE_MEMORY_QUERY,
    )
    .label("service_name", "SERVICE_NAME")
    .instance_label()
    .label("host", "HOST")
    .label("port", "PORT")
    .gauge("TOTAL_MEMORY_USED_SIZE", "total_memory_used_size", "Service memory usage.")
}

pub(super) fn host_service_statistics() -> QueryUnit {
    let unit = QueryUnit::new(
        "host_service_statistics",
        "Collect service cpu and memory info from _SYS_STATISTICS.HOST_SERVICE_STATISTICS",
        HOST_SERVICE_STATISTICS_QUERY,
    )
    .label("service_name", "SERVICE_NAME")
    .instance_label()
    .label("host", "HOST")
    .label("port", "PORT")
    .value(
        ValueColumn::gauge(
            "ACTIVE_STATUS",
            "active_status",
            "Service Active Status from _sys_statistics.host_service_statistics.",
        )
        .parse(ValueParse::Status),
    )
    .disabled_by_default();

    HOST_SERVICE_STATISTICS_COLUMNS
        .iter()
        .fold(unit, |unit, (column, name, help)| {
            unit.gauge(column, name, &format!("{help} from _sys_statistics.host_service_statistics."))
        })
}
