//! Stat aggregation library for service mesh workloads
//!
//! This crate provides the core functionality for:
//! - Building direction-aware Prometheus queries for a resource selector
//! - Running the summary queries concurrently and merging their results
//! - Discovering cluster objects and taking their mesh census
//! - Assembling per-resource stat rows
//! - Health checks and observability

pub mod assemble;
pub mod backend;
pub mod census;
pub mod discovery;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod query;
pub mod request;
pub mod service;

pub use error::{BackendError, DiscoveryError, StatError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{StatMetrics, StructuredLogger};
pub use query::QueryContext;
pub use request::{
    build_pod_summary_request, build_stat_summary_request, PodSummaryParams, StatSummaryParams,
};
pub use service::StatService;
