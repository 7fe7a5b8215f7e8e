//! Joining discovered objects, census and merged statistics into rows

use crate::models::{MeshCensusRecord, ResourceIdentity, StatRow};
use crate::query::{Correlate, QueryPlan, RowInclusion, StatsByKey};
use std::collections::{BTreeMap, HashMap};

/// Build stat rows, ordered by object key.
///
/// `identities` and `censuses` are keyed by object key (`namespace/name`).
/// Each object's group key is derived from its identity under the plan's
/// group-by and looked up in `stats`.
pub fn assemble_rows(
    identities: &BTreeMap<String, ResourceIdentity>,
    censuses: &HashMap<String, MeshCensusRecord>,
    stats: &StatsByKey,
    plan: &QueryPlan,
    time_window: &str,
) -> Vec<StatRow> {
    let mut rows = Vec::with_capacity(identities.len());

    for (key, identity) in identities {
        let found = stats.get(&identity.group_key(&plan.group_by));
        if found.is_none() && plan.inclusion == RowInclusion::ObservedTraffic {
            continue;
        }

        let census = censuses.get(key).copied().unwrap_or_default();
        rows.push(StatRow {
            resource: identity.clone(),
            time_window: time_window.to_string(),
            stats: found.copied().unwrap_or_default(),
            meshed_pod_count: census.in_mesh,
            total_pod_count: census.total,
        });
    }

    rows
}
