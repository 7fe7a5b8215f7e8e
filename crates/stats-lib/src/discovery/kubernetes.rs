//! Object discovery backed by the Kubernetes API

use super::{ClusterObject, PodInfo, PodSelector, ResourceLister};
use crate::error::DiscoveryError;
use crate::models::ResourceKind;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Pod, ReplicationController, Service};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, ListParams};
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// Lists objects and pods through a Kubernetes client
#[derive(Clone)]
pub struct KubeLister {
    client: Client,
}

impl KubeLister {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using in-cluster configuration or the local kubeconfig.
    ///
    /// # Errors
    ///
    /// Fails if no usable configuration is found.
    pub async fn try_default() -> Result<Self, DiscoveryError> {
        let client = Client::try_default()
            .await
            .map_err(|source| DiscoveryError::Kube {
                context: "creating client".to_string(),
                source,
            })?;
        Ok(Self::new(client))
    }

    async fn list<K>(
        &self,
        namespace: Option<&str>,
        params: &ListParams,
        what: &str,
    ) -> Result<Vec<K>, DiscoveryError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        let list = api
            .list(params)
            .await
            .map_err(|source| DiscoveryError::Kube {
                context: format!("listing {}", what),
                source,
            })?;
        Ok(list.items)
    }
}

fn name_params(name: Option<&str>) -> ListParams {
    match name {
        Some(name) => ListParams::default().fields(&format!("metadata.name={}", name)),
        None => ListParams::default(),
    }
}

fn label_selector(labels: &std::collections::BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl ResourceLister for KubeLister {
    async fn get_objects(
        &self,
        namespace: Option<&str>,
        kind: ResourceKind,
        name: Option<&str>,
    ) -> Result<Vec<ClusterObject>, DiscoveryError> {
        let params = name_params(name);
        let what = kind.as_str();

        let objects: Vec<ClusterObject> = match kind {
            ResourceKind::Deployments => self
                .list::<Deployment>(namespace, &params, what)
                .await?
                .iter()
                .map(deployment_object)
                .collect(),
            ResourceKind::Pods => self
                .list::<Pod>(namespace, &params, what)
                .await?
                .iter()
                .map(pod_object)
                .collect(),
            ResourceKind::ReplicationControllers => self
                .list::<ReplicationController>(namespace, &params, what)
                .await?
                .iter()
                .map(replication_controller_object)
                .collect(),
            ResourceKind::Services => self
                .list::<Service>(namespace, &params, what)
                .await?
                .iter()
                .map(service_object)
                .collect(),
            ResourceKind::Namespaces => {
                // cluster-scoped, the namespace filter does not apply
                let api: Api<Namespace> = Api::all(self.client.clone());
                api.list(&params)
                    .await
                    .map_err(|source| DiscoveryError::Kube {
                        context: format!("listing {}", what),
                        source,
                    })?
                    .items
                    .iter()
                    .map(namespace_object)
                    .collect()
            }
        };

        if let Some(name) = name {
            if objects.is_empty() {
                return Err(DiscoveryError::NotFound {
                    kind,
                    name: name.to_string(),
                });
            }
        }

        debug!(kind = %kind, count = objects.len(), "Listed objects");
        Ok(objects)
    }

    async fn get_pods_for(&self, object: &ClusterObject) -> Result<Vec<PodInfo>, DiscoveryError> {
        let what = format!("pods for {}", object.key());
        let pods: Vec<Pod> = match &object.pod_selector {
            PodSelector::Nothing => return Ok(Vec::new()),
            PodSelector::MatchLabels(labels) => {
                let params = ListParams::default().labels(&label_selector(labels));
                self.list(Some(&object.namespace), &params, &what).await?
            }
            PodSelector::Namespace => {
                self.list(Some(&object.name), &ListParams::default(), &what)
                    .await?
            }
            PodSelector::Pod => {
                self.list(Some(&object.namespace), &name_params(Some(&object.name)), &what)
                    .await?
            }
        };

        Ok(pods.iter().map(pod_info).collect())
    }
}

fn deployment_object(deployment: &Deployment) -> ClusterObject {
    // matchExpressions are not evaluated
    let labels = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.selector.match_labels.clone());
    ClusterObject::new(
        deployment.namespace().unwrap_or_default(),
        ResourceKind::Deployments,
        deployment.name_any(),
        PodSelector::from_labels(labels),
    )
}

fn replication_controller_object(rc: &ReplicationController) -> ClusterObject {
    let labels = rc.spec.as_ref().and_then(|spec| spec.selector.clone());
    ClusterObject::new(
        rc.namespace().unwrap_or_default(),
        ResourceKind::ReplicationControllers,
        rc.name_any(),
        PodSelector::from_labels(labels),
    )
}

fn service_object(service: &Service) -> ClusterObject {
    let labels = service.spec.as_ref().and_then(|spec| spec.selector.clone());
    ClusterObject::new(
        service.namespace().unwrap_or_default(),
        ResourceKind::Services,
        service.name_any(),
        PodSelector::from_labels(labels),
    )
}

fn pod_object(pod: &Pod) -> ClusterObject {
    ClusterObject::new(
        pod.namespace().unwrap_or_default(),
        ResourceKind::Pods,
        pod.name_any(),
        PodSelector::Pod,
    )
}

fn namespace_object(namespace: &Namespace) -> ClusterObject {
    ClusterObject::new(
        "",
        ResourceKind::Namespaces,
        namespace.name_any(),
        PodSelector::Namespace,
    )
}

fn pod_info(pod: &Pod) -> PodInfo {
    PodInfo {
        name: pod.name_any(),
        namespace: pod.namespace().unwrap_or_default(),
        labels: pod.labels().clone(),
        annotations: pod.annotations().clone(),
        phase: pod
            .status
            .as_ref()
            .and_then(|status| status.phase.clone())
            .unwrap_or_default(),
        deletion_timestamp: pod.metadata.deletion_timestamp.as_ref().map(|t| t.0),
    }
}
