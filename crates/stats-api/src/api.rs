//! HTTP API for stat summaries, pod summaries, health checks and metrics

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use anyhow::{anyhow, Context};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use stats_lib::{
    build_pod_summary_request, build_stat_summary_request,
    health::{ComponentStatus, HealthRegistry},
    Envelope, PodSummaryParams, QueryContext, StatError, StatService, StatSummary,
    StatSummaryParams,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: StatService,
    pub health_registry: HealthRegistry,
    pub query_timeout: Duration,
}

impl AppState {
    pub fn new(service: StatService, query_timeout: Duration) -> Self {
        Self {
            health_registry: service.health().clone(),
            service,
            query_timeout,
        }
    }
}

fn status_for(result: &Result<impl Sized, StatError>) -> StatusCode {
    match result {
        Ok(_) => StatusCode::OK,
        Err(e) if e.is_invalid_argument() => StatusCode::BAD_REQUEST,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn envelope<T>(result: Result<T, StatError>) -> (StatusCode, Json<Envelope<T>>) {
    let status = status_for(&result);
    (status, Json(Envelope::from(result)))
}

async fn stat_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatSummaryParams>,
) -> impl IntoResponse {
    let request = match build_stat_summary_request(&params) {
        Ok(request) => request,
        Err(e) => return envelope::<StatSummary>(Err(e)),
    };

    // Dropping the handler (client went away) cancels every in-flight query
    let ctx = QueryContext::with_timeout(state.query_timeout);
    let _cancel_on_drop = ctx.cancellation_token().clone().drop_guard();

    envelope(state.service.stat_summary(&ctx, &request).await)
}

/// Build version of the running server
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: &'static str,
}

async fn version() -> Json<Envelope<VersionInfo>> {
    Json(Envelope::Ok(VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
    }))
}

async fn pod_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PodSummaryParams>,
) -> impl IntoResponse {
    let result = match build_pod_summary_request(&params) {
        Ok(request) => state.service.pod_summary(&request).await,
        Err(e) => Err(e),
    };
    envelope(result)
}

/// Health check response - returns 200 unless a component is unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

async fn metrics() -> impl IntoResponse {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&prometheus::gather(), &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            e.to_string().into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/stat", get(stat_summary))
        .route("/api/pods", get(pod_summary))
        .route("/api/version", get(version))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve the API until `shutdown` is cancelled
pub async fn serve(port: u16, state: Arc<AppState>, shutdown: CancellationToken) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}

fn server_outcome(result: Result<anyhow::Result<()>, JoinError>) -> anyhow::Result<()> {
    match result {
        Ok(outcome) => outcome.context("API server failed"),
        Err(e) => Err(anyhow!("API server task panicked: {}", e)),
    }
}

/// Serve the API until `signal` resolves, then shut down gracefully.
///
/// # Errors
///
/// Returns the server's own failure (bind error, panic) if it stops before
/// `signal`, or the error `signal` resolves with.
pub async fn run_until<S>(port: u16, state: Arc<AppState>, signal: S) -> anyhow::Result<()>
where
    S: Future<Output = anyhow::Result<()>>,
{
    let shutdown = CancellationToken::new();
    let mut server = tokio::spawn(serve(port, state.clone(), shutdown.clone()));

    let signalled = tokio::select! {
        signalled = signal => signalled,
        result = &mut server => {
            // server exited on its own
            state.health_registry.set_ready(false).await;
            return server_outcome(result);
        }
    };

    state.health_registry.set_ready(false).await;
    shutdown.cancel();
    server_outcome(server.await)?;
    signalled
}
