//! Cluster object discovery
//!
//! Resolves a namespace/type/name selector to live objects and the pods
//! backing them. [`KubeLister`] talks to the Kubernetes API;
//! [`InMemoryLister`] serves a fixed inventory.

mod kubernetes;
mod memory;

pub use kubernetes::KubeLister;
pub use memory::InMemoryLister;

use crate::error::DiscoveryError;
use crate::models::{ResourceIdentity, ResourceKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// How an object selects its pods
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodSelector {
    /// Pods in the object's namespace carrying all of these labels
    MatchLabels(BTreeMap<String, String>),
    /// Every pod in the namespace named by the object
    Namespace,
    /// The object is itself a pod
    Pod,
    /// Selects nothing (e.g. a service without a selector)
    Nothing,
}

impl PodSelector {
    /// Build a label selector; an empty label set selects nothing
    pub fn from_labels(labels: Option<BTreeMap<String, String>>) -> Self {
        match labels {
            Some(labels) if !labels.is_empty() => PodSelector::MatchLabels(labels),
            _ => PodSelector::Nothing,
        }
    }

    /// Whether `pod` belongs to an object with this selector living in
    /// `namespace` under `name`
    pub fn matches(&self, namespace: &str, name: &str, pod: &PodInfo) -> bool {
        match self {
            PodSelector::MatchLabels(labels) => {
                pod.namespace == namespace
                    && labels.iter().all(|(k, v)| pod.labels.get(k) == Some(v))
            }
            PodSelector::Namespace => pod.namespace == name,
            PodSelector::Pod => pod.namespace == namespace && pod.name == name,
            PodSelector::Nothing => false,
        }
    }
}

/// A discovered cluster object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterObject {
    /// Namespace (empty for cluster-scoped kinds), kind and name
    pub namespace: String,
    pub kind: ResourceKind,
    pub name: String,
    pub pod_selector: PodSelector,
}

impl ClusterObject {
    pub fn new(
        namespace: impl Into<String>,
        kind: ResourceKind,
        name: impl Into<String>,
        pod_selector: PodSelector,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            kind,
            name: name.into(),
            pod_selector,
        }
    }

    /// `namespace/name`, or just `name` for cluster-scoped objects
    pub fn key(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }

    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity {
            namespace: Some(self.namespace.clone()),
            kind: self.kind,
            name: Some(self.name.clone()),
        }
    }

    pub fn selects(&self, pod: &PodInfo) -> bool {
        self.pod_selector.matches(&self.namespace, &self.name, pod)
    }
}

/// The pod fields the engine reads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    /// Reported lifecycle phase (Pending, Running, ...); empty if unreported
    pub phase: String,
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

/// Trait for object discovery implementations
#[async_trait]
pub trait ResourceLister: Send + Sync {
    /// Objects of `kind` in `namespace` (all namespaces when `None`),
    /// narrowed to `name` when given
    async fn get_objects(
        &self,
        namespace: Option<&str>,
        kind: ResourceKind,
        name: Option<&str>,
    ) -> Result<Vec<ClusterObject>, DiscoveryError>;

    /// Pods backing `object`
    async fn get_pods_for(&self, object: &ClusterObject) -> Result<Vec<PodInfo>, DiscoveryError>;

    /// Resource identity reported for `object`
    fn selector_for(&self, object: &ClusterObject) -> Result<ResourceIdentity, DiscoveryError> {
        if object.name.is_empty() {
            return Err(DiscoveryError::Unnamed(object.kind));
        }
        Ok(object.identity())
    }
}
