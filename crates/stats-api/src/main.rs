//! Stats API - traffic statistics for service mesh workloads
//!
//! Serves stat and pod summaries computed from the Kubernetes API and
//! the mesh's Prometheus metrics.

use anyhow::{Context, Result};
use stats_api::{api, ApiConfig, AppState};
use stats_lib::{
    backend::PrometheusClient,
    discovery::KubeLister,
    health::{components, HealthRegistry},
    observability::StructuredLogger,
    StatService,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const STATS_API_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting stats-api");

    let config = ApiConfig::load()?;
    info!(
        instance = %config.instance_name,
        prometheus_url = %config.prometheus_url,
        "Stats API configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::RESOURCE_LISTER).await;
    health_registry.register(components::METRICS_BACKEND).await;

    let lister = KubeLister::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let backend = PrometheusClient::new(&config.prometheus_url, config.query_timeout())
        .context("Failed to create Prometheus client")?;

    let logger = StructuredLogger::new(&config.instance_name);
    let service = StatService::new(Arc::new(lister), Arc::new(backend), health_registry.clone())
        .with_logger(logger.clone());
    let app_state = Arc::new(AppState::new(service, config.query_timeout()));

    logger.log_startup(STATS_API_VERSION, config.listen_port, &config.prometheus_url);
    health_registry.set_ready(true).await;

    let signal = async {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")
    };
    let outcome = api::run_until(config.listen_port, app_state, signal).await;

    match &outcome {
        Ok(()) => logger.log_shutdown("API server stopped"),
        Err(e) => error!(error = %format!("{:#}", e), "API server failed"),
    }
    info!("Shutting down");

    outcome
}
