//! Stat query pipeline
//!
//! Selector -> [`QueryPlan`] -> [`QuerySet`] -> [`MetricsFetcher`] ->
//! [`merge_results`].

mod fetcher;
mod labels;
mod merge;
mod template;


pub use fetcher::{MetricsFetcher, QueryContext, QueryResult};
pub use labels::{
    Correlate, GroupBy, GroupByLabel, GroupKey, LabelMatchers, LabelRole, QueryPlan,
    RowInclusion, DIRECTION_LABEL, NAMESPACE_LABEL,
};
pub use merge::{merge_results, round_sample, StatsByKey};
pub use template::{QueryKind, QuerySet, CLASSIFICATION_LABEL, LATENCY_METRIC, REQUEST_METRIC};
