//! Metrics backend abstraction
//!
//! The engine only needs instantaneous vector queries: a query string
//! evaluated at a single instant, answered by a list of labelled samples.

mod prometheus;

pub use self::prometheus::{parse_sample_value, PrometheusClient};

use crate::error::BackendError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Label name/value pairs identifying a series
pub type Metric = BTreeMap<String, String>;

/// One element of an instant vector
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub metric: Metric,
    pub value: f64,
    pub timestamp: f64,
}

impl Sample {
    pub fn new(metric: Metric, value: f64) -> Self {
        Self {
            metric,
            value,
            timestamp: 0.0,
        }
    }
}

pub type Vector = Vec<Sample>;

/// Trait for point-in-time metrics query implementations
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    /// Evaluate `query` at instant `at`.
    ///
    /// Implementations must fail with [`BackendError::UnexpectedResultType`]
    /// when the backend answers with anything other than a vector.
    async fn query(&self, query: &str, at: DateTime<Utc>) -> Result<Vector, BackendError>;
}
