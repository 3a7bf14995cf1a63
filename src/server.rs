//! Web server module for the HANA exporter.
//!
//! Serves the scrape endpoint, a landing page and a liveness probe.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{RawQuery, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::collector::{Catalog, ScrapeOrchestrator, UnitFilter};
use crate::config::CredentialStore;
use crate::db::{Connector, Target};
use crate::exposition::{CONTENT_TYPE, Exposition, ExpositionError};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: ScrapeOrchestrator,
    pub connector: Arc<dyn Connector>,
    pub credentials: Arc<CredentialStore>,
    /// Run a discovery session before each collection.
    pub discover_catalog: bool,
    /// Deadline for a whole scrape request.
    pub scrape_timeout: Option<Duration>,
    pub telemetry_path: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        orchestrator: ScrapeOrchestrator,
        connector: Arc<dyn Connector>,
        credentials: CredentialStore,
    ) -> Self {
        Self {
            orchestrator,
            connector,
            credentials: Arc::new(credentials),
            discover_catalog: true,
            scrape_timeout: None,
            telemetry_path: "/metrics".to_string(),
            started_at: Utc::now(),
        }
    }

    pub fn with_discovery(mut self, enabled: bool) -> Self {
        self.discover_catalog = enabled;
        self
    }

    pub fn with_scrape_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.scrape_timeout = timeout;
        self
    }

    pub fn with_telemetry_path(mut self, path: impl Into<String>) -> Self {
        self.telemetry_path = path.into();
        self
    }
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    started_at: String,
}

/// Query parameters of a scrape request.
///
/// `collect[]` may repeat; names are kept in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeParams {
    pub target: Option<String>,
    pub collect: Vec<String>,
}

impl ScrapeParams {
    /// Parse a raw, still percent-encoded query string.
    pub fn parse(query: Option<&str>) -> Self {
        let mut params = Self::default();
        let Some(query) = query else {
            return params;
        };

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "target" => params.target = Some(value.into_owned()),
                "collect[]" | "collect" => params.collect.push(value.into_owned()),
                _ => {}
            }
        }
        params
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let telemetry_path = state.telemetry_path.clone();
    let app_state = Arc::new(state);

    Router::new()
        .route("/", get(landing_handler))
        .route("/healthz", get(healthz_handler))
        .route(&telemetry_path, get(scrape_handler))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(app_state)
}

/// Landing page.
async fn landing_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(format!(
        "<html>\n<head><title>HANA Exporter</title></head>\n<body>\n<h1>HANA Exporter</h1>\n\
         <p><a href=\"{path}?target=\">Metrics</a> (pass <code>target</code> and optionally \
         <code>collect[]</code>)</p>\n</body>\n</html>\n",
        path = state.telemetry_path
    ))
}

/// Liveness probe.
async fn healthz_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        started_at: state.started_at.to_rfc3339(),
    })
}

/// Scrape one target and render the text exposition.
async fn scrape_handler(State(state): State<Arc<AppState>>, RawQuery(query): RawQuery) -> Response {
    let params = ScrapeParams::parse(query.as_deref());
    let Some(name) = params.target.filter(|t| !t.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "'target' parameter must be specified\n").into_response();
    };

    let credentials = match state.credentials.credentials_for(&name) {
        Ok(credentials) => credentials,
        Err(e) => {
            tracing::warn!(target = %name, error = %e, "Rejecting scrape request");
            return (StatusCode::BAD_REQUEST, format!("{e}\n")).into_response();
        }
    };
    let target = Target::new(name, credentials);
    let filter = UnitFilter::only(params.collect);

    let scrape = render(&state, &target, &filter);
    let rendered = match state.scrape_timeout {
        Some(deadline) => match tokio::time::timeout(deadline, scrape).await {
            Ok(rendered) => rendered,
            Err(_) => {
                tracing::warn!(
                    target = %target.name,
                    deadline = %humantime::format_duration(deadline),
                    "Scrape deadline exceeded"
                );
                return (
                    StatusCode::GATEWAY_TIMEOUT,
                    format!(
                        "scrape of {} exceeded {}\n",
                        target.name,
                        humantime::format_duration(deadline)
                    ),
                )
                    .into_response();
            }
        },
        None => scrape.await,
    };

    match rendered {
        Ok(body) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!(target = %target.name, error = %e, "Exposition failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {e}\n")).into_response()
        }
    }
}

async fn render(state: &AppState, target: &Target, filter: &UnitFilter) -> Result<String, ExpositionError> {
    let connector = state.connector.as_ref();

    let mut exposition = if state.discover_catalog {
        let catalog = Catalog::discover(&state.orchestrator, connector, target, filter).await;
        Exposition::from_catalog(&catalog)
    } else {
        Exposition::new()
    };

    let (measurements, report) = state.orchestrator.collect(connector, target, filter).await;
    exposition.record_all(&measurements);

    tracing::info!(
        target = %target.name,
        up = report.up,
        units = report.units.len(),
        failed = report.failed_units().count(),
        measurements = measurements.len(),
        dropped = exposition.dropped(),
        "Scrape complete"
    );
    exposition.encode()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::collector::ScrapeSettings;
    use crate::config::Credentials;
    use crate::db::{MemoryConnector, MemoryDatabase};
    use crate::scraper::builtin_registry;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const PROBE: &str = "select probe";
    const DISKS: &str = "SELECT HOST, PATH, USAGE_TYPE, TOTAL_SIZE, USED_SIZE FROM SYS.M_DISKS";

    fn database() -> MemoryDatabase {
        MemoryDatabase::new()
            .with_rows(
                PROBE,
                &["SID", "DB_NAME", "VERSION"],
                vec![vec!["HXE".into(), "HXE".into(), "2.00.061".into()]],
            )
            .with_rows(
                DISKS,
                &["HOST", "PATH", "USAGE_TYPE", "TOTAL_SIZE", "USED_SIZE"],
                vec![vec![
                    "hxehost".into(),
                    "/hana/log/".into(),
                    "LOG".into(),
                    4096_i64.into(),
                    1024_i64.into(),
                ]],
            )
    }

    fn create_test_state(connector: MemoryConnector, with_default: bool) -> AppState {
        let mut entries = BTreeMap::new();
        entries.insert(
            "hana01".to_string(),
            Credentials {
                user: "SYSTEM".to_string(),
                password: "secret".to_string(),
            },
        );
        if with_default {
            entries.insert("default".to_string(), Credentials::default());
        }

        let orchestrator = ScrapeOrchestrator::new(
            builtin_registry().unwrap(),
            ScrapeSettings {
                probe_query: PROBE.to_string(),
                ..ScrapeSettings::default()
            },
        );
        AppState::new(orchestrator, Arc::new(connector), CredentialStore::new(&entries))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[test]
    fn test_parse_params() {
        let params = ScrapeParams::parse(Some(
            "target=hana01%3A30015&collect%5B%5D=sys_m_disks&collect[]=up&other=1",
        ));
        assert_eq!(params.target.as_deref(), Some("hana01:30015"));
        assert_eq!(params.collect, vec!["sys_m_disks", "up"]);
        assert_eq!(ScrapeParams::parse(None), ScrapeParams::default());
    }

    #[tokio::test]
    async fn test_healthz() {
        let app = create_router(create_test_state(MemoryConnector::new(), true));
        let (status, _, body) = get(app, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json["started_at"].as_str().is_some_and(|s| s.contains('T')));
    }

    #[tokio::test]
    async fn test_landing_page_links_metrics() {
        let state = create_test_state(MemoryConnector::new(), true).with_telemetry_path("/probe");
        let (status, _, body) = get(create_router(state), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("href=\"/probe?target=\""));
    }

    #[tokio::test]
    async fn test_missing_target_is_bad_request() {
        let app = create_router(create_test_state(MemoryConnector::new(), true));
        let (status, _, body) = get(app, "/metrics").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("target"));
    }

    #[tokio::test]
    async fn test_unknown_credentials_is_bad_request() {
        let connector = MemoryConnector::new().with_database("hana02", database());
        let app = create_router(create_test_state(connector.clone(), false));

        let (status, _, _) = get(app, "/metrics?target=hana02").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(connector.database("hana02").unwrap().connections_opened(), 0);
    }

    #[tokio::test]
    async fn test_scrape_with_filter() {
        let connector = MemoryConnector::new().with_database("hana01", database());
        let app = create_router(create_test_state(connector.clone(), true));

        let (status, content_type, body) =
            get(app, "/metrics?target=hana01&collect[]=sys_m_disks&collect[]=nope").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(CONTENT_TYPE));
        assert!(body.contains("hana_up 1"));
        assert!(body.contains(r#"hana_info{db_name="HXE",db_version="2.00.061",sid="HXE"} 1"#));
        assert!(body.contains(
            r#"hana_sys_m_disks_used_size{hana_instance="hana01",host="hxehost",path="/hana/log/",usage_type="LOG"} 1024"#
        ));
        assert!(body.contains(r#"hana_exporter_scrape_errors_total{collector="sys_m_disks"} 0"#));
        assert!(body.contains("hana_exporter_scrapes_total 1"));
        assert!(!body.contains("hana_up_state"));

        // One discovery session plus one collection session.
        let db = connector.database("hana01").unwrap();
        assert_eq!(db.connections_opened(), 2);
        assert_eq!(db.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_target_reports_down() {
        let app = create_router(create_test_state(MemoryConnector::new(), true).with_discovery(false));
        let (status, _, body) = get(app, "/metrics?target=hana09").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("hana_up 0"));
        assert!(body.contains("hana_exporter_last_scrape_error 1"));
        assert!(!body.contains("hana_sys_m_disks"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_is_gateway_timeout() {
        let connector = MemoryConnector::new()
            .with_database("hana01", database().with_delay(Duration::from_secs(30)));
        let state = create_test_state(connector.clone(), true)
            .with_scrape_timeout(Some(Duration::from_secs(5)));

        let (status, _, body) = get(create_router(state), "/metrics?target=hana01").await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(!body.contains("hana_up"));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(connector.database("hana01").unwrap().open_connections(), 0);
    }
}
