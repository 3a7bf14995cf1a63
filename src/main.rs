//! HANA Exporter Binary Entry Point
//!
//! Loads the configuration, builds the scraper registry and serves scrapes.
//! Core functionality is provided by the `hana_exporter` library crate.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use hana_exporter::{
    collector::ScrapeOrchestrator,
    config::{AppConfig, CredentialStore, parse_duration},
    db::connector_for,
    scraper::builtin_registry,
    server::{AppState, create_router},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// HANA Exporter - Prometheus metrics for SAP HANA
#[derive(Parser, Debug)]
#[command(name = "hana_exporter", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "hana.yml", env = "HANA_EXPORTER_CONFIG")]
    config: String,

    /// Server bind address (overrides config file)
    #[arg(long, env = "HANA_EXPORTER_SERVER_BIND")]
    server_bind: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, env = "HANA_EXPORTER_SERVER_PORT")]
    server_port: Option<u16>,

    /// Deadline for a whole scrape request, e.g. "30s" (overrides config file)
    #[arg(long, env = "HANA_EXPORTER_SCRAPE_TIMEOUT", value_parser = parse_duration)]
    scrape_timeout: Option<Duration>,

    /// Connection string template (overrides config file)
    #[arg(long, env = "HANA_EXPORTER_DSN_TEMPLATE")]
    dsn_template: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hana_exporter=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    tracing::info!("Loading configuration from: {}", cli.config);
    let mut config = AppConfig::load(&cli.config)?;

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(bind) = cli.server_bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.server_port {
        config.server.port = port;
    }
    if let Some(timeout) = cli.scrape_timeout {
        config.exporter.scrape_timeout = Some(timeout);
    }
    if let Some(dsn) = cli.dsn_template {
        config.exporter.dsn_template = dsn;
    }
    config.validate()?;

    let registry = builtin_registry()?.with_overrides(&config.scrapers)?;
    let enabled = registry.enabled_names();
    tracing::info!(
        units = registry.unit_count(),
        enabled = enabled.len(),
        "Scraper units: {}",
        enabled.join(", ")
    );

    let exporter = &config.exporter;
    let connector = connector_for(exporter)?;
    tracing::info!(dsn_template = %exporter.dsn_template, "Database connector ready");

    let orchestrator = ScrapeOrchestrator::new(registry, exporter.into());
    let state = AppState::new(
        orchestrator,
        connector,
        CredentialStore::new(&config.databases),
    )
    .with_discovery(exporter.discover_catalog)
    .with_scrape_timeout(exporter.scrape_timeout)
    .with_telemetry_path(config.server.telemetry_path.clone());

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;

    tracing::info!(
        "Serving scrapes on: http://{}{}?target=<host:port>",
        addr,
        config.server.telemetry_path
    );
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Setup graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
