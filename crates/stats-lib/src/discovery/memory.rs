//! Fixed-inventory lister for tests and offline use

use super::{ClusterObject, PodInfo, ResourceLister};
use crate::error::DiscoveryError;
use crate::models::ResourceKind;
use async_trait::async_trait;

/// Serves objects and pods from memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryLister {
    objects: Vec<ClusterObject>,
    pods: Vec<PodInfo>,
}

impl InMemoryLister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, object: ClusterObject) -> Self {
        self.objects.push(object);
        self
    }

    pub fn with_pod(mut self, pod: PodInfo) -> Self {
        self.pods.push(pod);
        self
    }
}

#[async_trait]
impl ResourceLister for InMemoryLister {
    async fn get_objects(
        &self,
        namespace: Option<&str>,
        kind: ResourceKind,
        name: Option<&str>,
    ) -> Result<Vec<ClusterObject>, DiscoveryError> {
        let objects: Vec<ClusterObject> = self
            .objects
            .iter()
            .filter(|o| o.kind == kind)
            .filter(|o| kind.is_namespace() || namespace.map_or(true, |ns| o.namespace == ns))
            .filter(|o| name.map_or(true, |n| o.name == n))
            .cloned()
            .collect();

        match name {
            Some(name) if objects.is_empty() => Err(DiscoveryError::NotFound {
                kind,
                name: name.to_string(),
            }),
            _ => Ok(objects),
        }
    }

    async fn get_pods_for(&self, object: &ClusterObject) -> Result<Vec<PodInfo>, DiscoveryError> {
        Ok(self
            .pods
            .iter()
            .filter(|pod| object.selects(pod))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::PodSelector;
    use std::collections::BTreeMap;

    fn lister() -> InMemoryLister {
        let web = PodSelector::from_labels(Some(BTreeMap::from([(
            "app".to_string(),
            "web".to_string(),
        )])));
        InMemoryLister::new()
            .with_object(ClusterObject::new("ns1", ResourceKind::Deployments, "web", web))
            .with_object(ClusterObject::new(
                "ns2",
                ResourceKind::Deployments,
                "db",
                PodSelector::Nothing,
            ))
            .with_object(ClusterObject::new(
                "",
                ResourceKind::Namespaces,
                "ns1",
                PodSelector::Namespace,
            ))
            .with_pod(PodInfo {
                name: "web-1".to_string(),
                namespace: "ns1".to_string(),
                labels: BTreeMap::from([("app".to_string(), "web".to_string())]),
                ..Default::default()
            })
    }

    #[tokio::test]
    async fn test_filters_by_namespace_and_name() {
        let lister = lister();

        let all = lister
            .get_objects(None, ResourceKind::Deployments, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let ns1 = lister
            .get_objects(Some("ns1"), ResourceKind::Deployments, None)
            .await
            .unwrap();
        assert_eq!(ns1.len(), 1);
        assert_eq!(ns1[0].name, "web");

        // namespaces ignore the namespace filter
        let namespaces = lister
            .get_objects(Some("ns2"), ResourceKind::Namespaces, None)
            .await
            .unwrap();
        assert_eq!(namespaces.len(), 1);
    }

    #[tokio::test]
    async fn test_named_miss_is_not_found() {
        let err = lister()
            .get_objects(Some("ns1"), ResourceKind::Deployments, Some("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::NotFound { name, .. } if name == "missing"));

        // an unnamed query matching nothing is just empty
        let empty = lister()
            .get_objects(Some("ns3"), ResourceKind::Deployments, None)
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_pods_follow_selector() {
        let lister = lister();
        let objects = lister
            .get_objects(None, ResourceKind::Deployments, None)
            .await
            .unwrap();

        let web = objects.iter().find(|o| o.name == "web").unwrap();
        assert_eq!(lister.get_pods_for(web).await.unwrap().len(), 1);

        let db = objects.iter().find(|o| o.name == "db").unwrap();
        assert!(lister.get_pods_for(db).await.unwrap().is_empty());
    }
}
