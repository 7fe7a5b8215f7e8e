//! Concurrent execution of the four summary queries
//!
//! Every query runs on its own task and reports exactly one message on a
//! shared channel. The caller always receives one message per launched task
//! before looking at outcomes, so no task is ever left blocked on a send.

use super::template::{QueryKind, QuerySet};
use crate::backend::{MetricsBackend, Vector};
use crate::error::BackendError;
use crate::observability::StatMetrics;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Cancellation and deadline shared by every backend call of one request
#[derive(Debug, Clone)]
pub struct QueryContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for QueryContext {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryContext {
    /// Context without a deadline, cancelled only explicitly
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive `fut` until it completes, the context is cancelled, or the
    /// deadline passes; the losing future is dropped, aborting its I/O.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, BackendError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(BackendError::Cancelled),
            _ = deadline => Err(BackendError::DeadlineExceeded),
            result = fut => result,
        }
    }
}

/// Successful result of one summary query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub kind: QueryKind,
    pub vector: Vector,
}

struct TaskReport {
    kind: QueryKind,
    result: Result<Vector, BackendError>,
}

/// Fans summary queries out to the metrics backend
#[derive(Clone)]
pub struct MetricsFetcher {
    backend: Arc<dyn MetricsBackend>,
    metrics: StatMetrics,
}

impl MetricsFetcher {
    pub fn new(backend: Arc<dyn MetricsBackend>) -> Self {
        Self {
            backend,
            metrics: StatMetrics::new(),
        }
    }

    /// Run every query in `queries` concurrently and wait for all of them.
    ///
    /// All queries are evaluated at the same instant.
    ///
    /// # Errors
    ///
    /// If any query fails, the last failure observed is returned and the
    /// successful results are discarded. The error is only returned once every
    /// task has reported.
    pub async fn fetch(
        &self,
        ctx: &QueryContext,
        queries: &QuerySet,
    ) -> Result<Vec<QueryResult>, BackendError> {
        let (tx, mut rx) = mpsc::channel::<TaskReport>(1);
        let at = Utc::now();

        let mut launched = 0usize;
        for (kind, query) in queries.iter() {
            let tx = tx.clone();
            let backend = Arc::clone(&self.backend);
            let ctx = ctx.clone();
            let metrics = self.metrics.clone();
            let query = query.to_string();

            tokio::spawn(async move {
                let start = Instant::now();
                let result = ctx.run(backend.query(&query, at)).await;

                metrics.observe_backend_query(kind.as_str(), start.elapsed().as_secs_f64());
                if result.is_err() {
                    metrics.inc_backend_query_errors(kind.as_str());
                }

                // Fails only if the caller itself was dropped
                let _ = tx.send(TaskReport { kind, result }).await;
            });
            launched += 1;
        }
        drop(tx);

        let mut last_error = None;
        let mut results = Vec::with_capacity(launched);
        for _ in 0..launched {
            match rx.recv().await {
                Some(TaskReport {
                    kind,
                    result: Ok(vector),
                }) => {
                    debug!(kind = %kind, samples = vector.len(), "Query completed");
                    results.push(QueryResult { kind, vector });
                }
                Some(TaskReport {
                    kind,
                    result: Err(e),
                }) => {
                    error!(kind = %kind, error = %e, "Metrics query failed");
                    last_error = Some(e);
                }
                None => {
                    // every sender is gone: a task died before reporting
                    error!("Metrics query task exited without reporting");
                    last_error = Some(BackendError::TaskLost);
                    break;
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }
}
