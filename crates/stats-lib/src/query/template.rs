//! Query text rendering

use super::labels::QueryPlan;
use std::fmt;

pub const REQUEST_METRIC: &str = "response_total";
pub const LATENCY_METRIC: &str = "response_latency_ms_bucket";
pub const CLASSIFICATION_LABEL: &str = "classification";

/// The four queries issued per stat summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKind {
    Requests,
    LatencyP50,
    LatencyP95,
    LatencyP99,
}

impl QueryKind {
    pub const ALL: [QueryKind; 4] = [
        QueryKind::Requests,
        QueryKind::LatencyP50,
        QueryKind::LatencyP95,
        QueryKind::LatencyP99,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Requests => "requests",
            QueryKind::LatencyP50 => "latency_p50",
            QueryKind::LatencyP95 => "latency_p95",
            QueryKind::LatencyP99 => "latency_p99",
        }
    }

    /// Quantile argument for latency queries
    pub fn quantile(&self) -> Option<&'static str> {
        match self {
            QueryKind::Requests => None,
            QueryKind::LatencyP50 => Some("0.5"),
            QueryKind::LatencyP95 => Some("0.95"),
            QueryKind::LatencyP99 => Some("0.99"),
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rendered query text, one per [`QueryKind`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySet {
    queries: Vec<(QueryKind, String)>,
}

impl QuerySet {
    pub fn render(plan: &QueryPlan, time_window: &str) -> Self {
        let queries = QueryKind::ALL
            .iter()
            .map(|kind| (*kind, render_query(*kind, plan, time_window)))
            .collect();
        Self { queries }
    }

    pub fn get(&self, kind: QueryKind) -> Option<&str> {
        self.queries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, q)| q.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (QueryKind, &str)> {
        self.queries.iter().map(|(k, q)| (*k, q.as_str()))
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

fn render_query(kind: QueryKind, plan: &QueryPlan, time_window: &str) -> String {
    match kind.quantile() {
        None => format!(
            "sum(increase({}{}[{}])) by ({}, {})",
            REQUEST_METRIC, plan.matchers, time_window, plan.group_by, CLASSIFICATION_LABEL
        ),
        Some(quantile) => format!(
            "histogram_quantile({}, sum(irate({}{}[{}])) by (le, {}))",
            quantile, LATENCY_METRIC, plan.matchers, time_window, plan.group_by
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, ResourceIdentity, ResourceKind, Selector};

    fn plan() -> QueryPlan {
        QueryPlan::for_selector(&Selector::new(
            ResourceIdentity::new(ResourceKind::Deployments)
                .in_namespace("ns1")
                .named("web"),
        ))
    }

    #[test]
    fn test_request_query() {
        let queries = QuerySet::render(&plan(), "1m");
        assert_eq!(
            queries.get(QueryKind::Requests).unwrap(),
            r#"sum(increase(response_total{deployment="web", direction="inbound", namespace="ns1"}[1m])) by (namespace, deployment, classification)"#
        );
    }

    #[test]
    fn test_latency_queries() {
        let queries = QuerySet::render(&plan(), "10s");
        assert_eq!(queries.len(), 4);
        assert_eq!(
            queries.get(QueryKind::LatencyP95).unwrap(),
            r#"histogram_quantile(0.95, sum(irate(response_latency_ms_bucket{deployment="web", direction="inbound", namespace="ns1"}[10s])) by (le, namespace, deployment))"#
        );
        assert!(queries
            .get(QueryKind::LatencyP50)
            .unwrap()
            .starts_with("histogram_quantile(0.5, "));
        assert!(queries
            .get(QueryKind::LatencyP99)
            .unwrap()
            .starts_with("histogram_quantile(0.99, "));
    }

    #[test]
    fn test_different_selectors_never_collide() {
        let target = ResourceIdentity::new(ResourceKind::Deployments).in_namespace("ns1");
        let inbound = QuerySet::render(&QueryPlan::for_selector(&Selector::new(target.clone())), "1m");
        let outbound = QuerySet::render(
            &QueryPlan::for_selector(
                &Selector::new(target.clone())
                    .with_direction(Direction::ToResource(target.clone().named("db"))),
            ),
            "1m",
        );

        for kind in QueryKind::ALL {
            assert_ne!(inbound.get(kind), outbound.get(kind));
        }
    }
}
