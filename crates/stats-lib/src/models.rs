//! Core data models for the stats engine

use crate::error::StatError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical Kubernetes resource kinds the engine can report on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Deployments,
    Namespaces,
    Pods,
    ReplicationControllers,
    Services,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Deployments,
        ResourceKind::Namespaces,
        ResourceKind::Pods,
        ResourceKind::ReplicationControllers,
        ResourceKind::Services,
    ];

    /// Canonical (plural, lowercase) name
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Deployments => "deployments",
            ResourceKind::Namespaces => "namespaces",
            ResourceKind::Pods => "pods",
            ResourceKind::ReplicationControllers => "replicationcontrollers",
            ResourceKind::Services => "services",
        }
    }

    /// Label the mesh proxy attaches to its metrics for this kind
    pub fn proxy_label(&self) -> &'static str {
        match self {
            ResourceKind::Deployments => "deployment",
            ResourceKind::Namespaces => "namespace",
            ResourceKind::Pods => "pod",
            ResourceKind::ReplicationControllers => "replication_controller",
            ResourceKind::Services => "service",
        }
    }

    pub fn is_namespace(&self) -> bool {
        matches!(self, ResourceKind::Namespaces)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = StatError;

    /// Accepts canonical names as well as the short and singular forms kubectl users type
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deploy" | "deployment" | "deployments" => Ok(ResourceKind::Deployments),
            "ns" | "namespace" | "namespaces" => Ok(ResourceKind::Namespaces),
            "po" | "pod" | "pods" => Ok(ResourceKind::Pods),
            "rc" | "replicationcontroller" | "replicationcontrollers" => {
                Ok(ResourceKind::ReplicationControllers)
            }
            "svc" | "service" | "services" => Ok(ResourceKind::Services),
            _ => Err(StatError::InvalidSelector(format!(
                "cannot find Kubernetes canonical name from friendly name [{}]",
                s
            ))),
        }
    }
}

/// A namespace/type/name triple identifying one or more cluster resources.
///
/// `namespace: None` means all namespaces; `Some("")` is a cluster-scoped
/// resource. `name: None` matches every resource of the kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ResourceIdentity {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            namespace: None,
            kind,
            name: None,
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Namespace constraint, if a non-empty one is set
    pub fn namespace_filter(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }

    /// Name constraint, if a non-empty one is set
    pub fn name_filter(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ns) = self.namespace_filter() {
            write!(f, "{}/", ns)?;
        }
        write!(f, "{}", self.kind)?;
        if let Some(name) = self.name_filter() {
            write!(f, "/{}", name)?;
        }
        Ok(())
    }
}

/// Traffic direction filter applied to a stat query
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Inbound traffic to the target, no peer constraint
    #[default]
    None,
    /// Outbound traffic from the target toward this resource
    ToResource(ResourceIdentity),
    /// Outbound traffic from this resource toward the target
    FromResource(ResourceIdentity),
}

/// Target resource plus a traffic-direction filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    pub target: ResourceIdentity,
    #[serde(default)]
    pub direction: Direction,
}

impl Selector {
    pub fn new(target: ResourceIdentity) -> Self {
        Self {
            target,
            direction: Direction::None,
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Reject combinations that cannot be answered before any I/O happens.
    ///
    /// # Errors
    ///
    /// Returns [`StatError::InvalidSelector`] when a service is targeted by
    /// anything other than a `from` query.
    pub fn validate(&self) -> Result<(), StatError> {
        if self.target.kind == ResourceKind::Services
            && !matches!(self.direction, Direction::FromResource(_))
        {
            return Err(StatError::InvalidSelector(
                "service only supported as a target on 'from' queries, or as a destination on 'to' queries"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Request volume and latency percentiles for one resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsRecord {
    pub success_count: u64,
    pub failure_count: u64,
    pub latency_ms_p50: u64,
    pub latency_ms_p95: u64,
    pub latency_ms_p99: u64,
}

/// Mesh coverage of a resource's pods
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshCensusRecord {
    pub in_mesh: u64,
    pub total: u64,
}

impl MeshCensusRecord {
    /// Count one pod; `in_mesh` can never overtake `total`
    pub fn record_pod(&mut self, meshed: bool) {
        self.total += 1;
        if meshed {
            self.in_mesh += 1;
        }
    }
}

/// Status of a single pod as reported by the pod summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodStatus {
    pub name: String,
    pub mesh_enrolled: bool,
    pub control_plane: bool,
    pub phase: String,
}

/// One row of a stat summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRow {
    pub resource: ResourceIdentity,
    pub time_window: String,
    pub stats: StatisticsRecord,
    pub meshed_pod_count: u64,
    pub total_pod_count: u64,
}

/// Stat summary request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSummaryRequest {
    pub selector: Selector,
    pub time_window: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSummary {
    pub rows: Vec<StatRow>,
}

/// Pod summary request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSummaryRequest {
    pub resource: ResourceIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSummaryRow {
    pub resource: ResourceIdentity,
    pub pod_statuses: Vec<PodStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSummary {
    pub rows: Vec<PodSummaryRow>,
}

/// Error body carried by a failed [`Envelope`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Success/error wrapper for every API response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Envelope<T> {
    Ok(T),
    Error(ErrorBody),
}

impl<T> From<Result<T, StatError>> for Envelope<T> {
    fn from(result: Result<T, StatError>) -> Self {
        match result {
            Ok(body) => Envelope::Ok(body),
            Err(e) => Envelope::Error(ErrorBody {
                code: e.class().to_string(),
                message: e.to_string(),
            }),
        }
    }
}
