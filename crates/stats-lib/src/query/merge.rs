//! Folding query results into per-resource statistics

use super::fetcher::QueryResult;
use super::labels::{Correlate, GroupBy, GroupKey};
use super::template::{QueryKind, CLASSIFICATION_LABEL};
use crate::models::StatisticsRecord;
use std::collections::HashMap;

pub type StatsByKey = HashMap<GroupKey, StatisticsRecord>;

/// Merge query results into one record per group key.
///
/// Keys appear only if at least one query produced a sample for them. Each
/// query kind writes its own fields, so the order of `results` does not
/// matter; within one vector a repeated key keeps the last sample.
pub fn merge_results(results: &[QueryResult], group_by: &GroupBy) -> StatsByKey {
    let mut stats = StatsByKey::new();

    for result in results {
        for sample in &result.vector {
            let key = sample.metric.group_key(group_by);
            let record = stats.entry(key).or_default();
            let value = round_sample(sample.value);

            match result.kind {
                QueryKind::Requests => {
                    match sample.metric.get(CLASSIFICATION_LABEL).map(String::as_str) {
                        Some("success") => record.success_count = value,
                        Some("failure") => record.failure_count = value,
                        _ => {}
                    }
                }
                QueryKind::LatencyP50 => record.latency_ms_p50 = value,
                QueryKind::LatencyP95 => record.latency_ms_p95 = value,
                QueryKind::LatencyP99 => record.latency_ms_p99 = value,
            }
        }
    }

    stats
}

/// Round a sample to the nearest integer, halves away from zero.
///
/// NaN, infinities and negative values become 0.
pub fn round_sample(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    value.round() as u64
}
