//! Mesh coverage of discovered objects

use crate::discovery::{ClusterObject, PodInfo, ResourceLister};
use crate::error::DiscoveryError;
use crate::models::{MeshCensusRecord, PodStatus};

/// Annotation the proxy injector stamps on meshed pods
pub const PROXY_VERSION_ANNOTATION: &str = "conduit.io/proxy-version";

/// Label carried by control plane pods
pub const CONTROL_PLANE_COMPONENT_LABEL: &str = "conduit.io/control-plane-component";

const TERMINATING_PHASE: &str = "Terminating";

pub fn is_in_mesh(pod: &PodInfo) -> bool {
    pod.annotations.contains_key(PROXY_VERSION_ANNOTATION)
}

pub fn is_control_plane_component(pod: &PodInfo) -> bool {
    pod.labels
        .get(CONTROL_PLANE_COMPONENT_LABEL)
        .map_or(false, |v| !v.is_empty())
}

pub fn mesh_census(pods: &[PodInfo]) -> MeshCensusRecord {
    let mut record = MeshCensusRecord::default();
    for pod in pods {
        record.record_pod(is_in_mesh(pod));
    }
    record
}

pub fn pod_status(pod: &PodInfo) -> PodStatus {
    let phase = if pod.deletion_timestamp.is_some() {
        TERMINATING_PHASE.to_string()
    } else {
        pod.phase.clone()
    };

    PodStatus {
        name: pod.name.clone(),
        mesh_enrolled: is_in_mesh(pod),
        control_plane: is_control_plane_component(pod),
        phase,
    }
}

/// Census record and per-pod statuses for one set of pods
pub fn census(pods: &[PodInfo]) -> (MeshCensusRecord, Vec<PodStatus>) {
    (mesh_census(pods), pods.iter().map(pod_status).collect())
}

/// Resolve `object` to its pods and take the census.
///
/// # Errors
///
/// Propagates pod resolution failures from the lister.
pub async fn census_object(
    lister: &dyn ResourceLister,
    object: &ClusterObject,
) -> Result<(MeshCensusRecord, Vec<PodStatus>), DiscoveryError> {
    let pods = lister.get_pods_for(object).await?;
    Ok(census(&pods))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn pod(name: &str, meshed: bool) -> PodInfo {
        let mut annotations = BTreeMap::new();
        if meshed {
            annotations.insert(PROXY_VERSION_ANNOTATION.to_string(), "v0.4.1".to_string());
        }
        PodInfo {
            name: name.to_string(),
            namespace: "ns1".to_string(),
            annotations,
            phase: "Running".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_pods() {
        assert_eq!(mesh_census(&[]), MeshCensusRecord { in_mesh: 0, total: 0 });
    }

    #[test]
    fn test_counts_meshed_pods() {
        let pods = vec![pod("a", true), pod("b", false), pod("c", true)];
        let (record, statuses) = census(&pods);

        assert_eq!(record, MeshCensusRecord { in_mesh: 2, total: 3 });
        assert!(record.in_mesh <= record.total);
        let enrolled: Vec<bool> = statuses.iter().map(|s| s.mesh_enrolled).collect();
        assert_eq!(enrolled, vec![true, false, true]);
    }

    #[test]
    fn test_deleted_pod_is_terminating() {
        let mut p = pod("a", true);
        p.deletion_timestamp = Some(Utc::now());
        assert_eq!(pod_status(&p).phase, "Terminating");
        assert_eq!(pod_status(&pod("b", true)).phase, "Running");
    }

    #[test]
    fn test_control_plane_label_must_be_non_empty() {
        let mut p = pod("controller", true);
        assert!(!pod_status(&p).control_plane);

        p.labels
            .insert(CONTROL_PLANE_COMPONENT_LABEL.to_string(), String::new());
        assert!(!pod_status(&p).control_plane);

        p.labels.insert(
            CONTROL_PLANE_COMPONENT_LABEL.to_string(),
            "controller".to_string(),
        );
        assert!(pod_status(&p).control_plane);
    }
}
