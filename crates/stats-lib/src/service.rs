//! Stat and pod summary orchestration
//!
//! A stat summary runs object discovery (with the mesh census) and the
//! metrics fetch side by side, then joins both into rows. A pod summary
//! only needs discovery.

use crate::assemble::assemble_rows;
use crate::backend::MetricsBackend;
use crate::census::census_object;
use crate::discovery::{ClusterObject, ResourceLister};
use crate::error::{BackendError, DiscoveryError, StatError};
use crate::health::{components, HealthRegistry};
use crate::models::{
    Direction, MeshCensusRecord, PodSummary, PodSummaryRequest, PodSummaryRow, ResourceIdentity,
    StatSummary, StatSummaryRequest,
};
use crate::observability::{StatMetrics, StructuredLogger};
use crate::query::{merge_results, MetricsFetcher, QueryContext, QueryPlan, QuerySet};
use crate::request::validate_time_window;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

pub const STAT_SUMMARY_OPERATION: &str = "stat_summary";
pub const POD_SUMMARY_OPERATION: &str = "pod_summary";

type Discovered = (
    BTreeMap<String, ResourceIdentity>,
    HashMap<String, MeshCensusRecord>,
);

/// Answers stat and pod summary requests
#[derive(Clone)]
pub struct StatService {
    lister: Arc<dyn ResourceLister>,
    fetcher: MetricsFetcher,
    health: HealthRegistry,
    metrics: StatMetrics,
    logger: StructuredLogger,
}

impl StatService {
    pub fn new(
        lister: Arc<dyn ResourceLister>,
        backend: Arc<dyn MetricsBackend>,
        health: HealthRegistry,
    ) -> Self {
        Self {
            lister,
            fetcher: MetricsFetcher::new(backend),
            health,
            metrics: StatMetrics::new(),
            logger: StructuredLogger::new("stats-lib"),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    /// Compute per-resource traffic statistics for `request`.
    ///
    /// # Errors
    ///
    /// - [`StatError::InvalidSelector`] before any I/O for a rejected
    ///   selector or time window
    /// - [`StatError::Discovery`] if objects or pods cannot be resolved
    /// - [`StatError::Backend`] if any metrics query failed
    pub async fn stat_summary(
        &self,
        ctx: &QueryContext,
        request: &StatSummaryRequest,
    ) -> Result<StatSummary, StatError> {
        let start = Instant::now();
        let result = self.compute_stat_summary(ctx, request).await;
        self.record(STAT_SUMMARY_OPERATION, start, result.as_ref().map(|s| s.rows.len()));

        if let Ok(summary) = &result {
            self.logger.log_stat_summary(
                &request.selector.target.to_string(),
                direction_name(&request.selector.direction),
                &request.time_window,
                summary.rows.len(),
                start.elapsed().as_millis(),
            );
        }
        result
    }

    async fn compute_stat_summary(
        &self,
        ctx: &QueryContext,
        request: &StatSummaryRequest,
    ) -> Result<StatSummary, StatError> {
        request.selector.validate()?;
        validate_time_window(&request.time_window)?;

        let plan = QueryPlan::for_selector(&request.selector);
        let queries = QuerySet::render(&plan, &request.time_window);
        for (kind, query) in queries.iter() {
            debug!(kind = %kind, query = %query, "Rendered query");
        }

        let (discovered, fetched) = tokio::join!(
            self.discover(&request.selector.target),
            self.fetcher.fetch(ctx, &queries)
        );

        self.record_lister_health(discovered.as_ref().err()).await;
        if !matches!(fetched, Err(BackendError::Cancelled)) {
            self.health
                .record_outcome(components::METRICS_BACKEND, &fetched)
                .await;
        }

        let (identities, censuses) = discovered?;
        let results = fetched?;

        let stats = merge_results(&results, &plan.group_by);
        let rows = assemble_rows(&identities, &censuses, &stats, &plan, &request.time_window);
        Ok(StatSummary { rows })
    }

    async fn discover(&self, target: &ResourceIdentity) -> Result<Discovered, DiscoveryError> {
        let objects = self.objects_for(target).await?;

        let mut identities = BTreeMap::new();
        let mut censuses = HashMap::new();
        for object in &objects {
            let identity = self.lister.selector_for(object)?;
            let (census, _) = census_object(self.lister.as_ref(), object).await?;
            censuses.insert(object.key(), census);
            identities.insert(object.key(), identity);
        }

        debug!(target = %target, objects = identities.len(), "Discovered objects");
        Ok((identities, censuses))
    }

    async fn objects_for(&self, target: &ResourceIdentity) -> Result<Vec<ClusterObject>, DiscoveryError> {
        let mut objects = self
            .lister
            .get_objects(target.namespace_filter(), target.kind, target.name_filter())
            .await?;
        objects.sort_by_key(|o| o.key());
        Ok(objects)
    }

    /// List the pods behind every object matching `request`, with their
    /// mesh enrollment and phase.
    ///
    /// # Errors
    ///
    /// Returns [`StatError::Discovery`] if objects or pods cannot be resolved.
    pub async fn pod_summary(&self, request: &PodSummaryRequest) -> Result<PodSummary, StatError> {
        let start = Instant::now();
        let result = self.compute_pod_summary(request).await;
        match &result {
            Ok(_) => self.record_lister_health(None).await,
            Err(StatError::Discovery(e)) => self.record_lister_health(Some(e)).await,
            Err(_) => {}
        }
        self.record(POD_SUMMARY_OPERATION, start, result.as_ref().map(|s| s.rows.len()));
        result
    }

    async fn compute_pod_summary(&self, request: &PodSummaryRequest) -> Result<PodSummary, StatError> {
        let objects = self.objects_for(&request.resource).await?;

        let mut rows = Vec::with_capacity(objects.len());
        for object in &objects {
            let resource = self.lister.selector_for(object)?;
            let (_, pod_statuses) = census_object(self.lister.as_ref(), object).await?;
            rows.push(PodSummaryRow {
                resource,
                pod_statuses,
            });
        }
        Ok(PodSummary { rows })
    }

    /// Unknown objects leave the lister's health untouched
    async fn record_lister_health(&self, error: Option<&DiscoveryError>) {
        let outcome = match error {
            None => Ok(()),
            Some(e) if e.is_lister_failure() => Err(e),
            Some(_) => return,
        };
        self.health
            .record_outcome(components::RESOURCE_LISTER, &outcome)
            .await;
    }

    fn record(&self, operation: &str, start: Instant, outcome: Result<usize, &StatError>) {
        self.metrics
            .observe_request(operation, start.elapsed().as_secs_f64());
        match outcome {
            Ok(rows) => self.metrics.set_rows_returned(operation, rows),
            Err(e) => {
                self.metrics.inc_request_errors(operation, e.class());
                self.logger
                    .log_request_failed(operation, e.class(), &e.to_string());
            }
        }
    }
}

fn direction_name(direction: &Direction) -> &'static str {
    match direction {
        Direction::None => "none",
        Direction::ToResource(_) => "to",
        Direction::FromResource(_) => "from",
    }
}
