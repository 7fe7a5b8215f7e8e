//! `meshstat pods`: pods behind resources and their mesh status

use anyhow::Result;
use tabled::Tabled;

use super::parse_target;
use crate::client::{ApiClient, PodSummary, Resource};
use crate::output::{color_status, format_bool, print_rows, OutputFormat};

#[derive(Tabled)]
struct PodTableRow {
    #[tabled(rename = "RESOURCE")]
    resource: String,
    #[tabled(rename = "POD")]
    pod: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "MESHED")]
    meshed: String,
    #[tabled(rename = "CONTROL PLANE")]
    control_plane: String,
}

fn resource_label(resource: &Resource) -> String {
    let mut label = String::new();
    if let Some(ns) = resource.namespace.as_deref().filter(|ns| !ns.is_empty()) {
        label.push_str(ns);
        label.push('/');
    }
    label.push_str(&resource.kind);
    if let Some(name) = &resource.name {
        label.push('/');
        label.push_str(name);
    }
    label
}

fn table_rows(summary: &PodSummary) -> Vec<PodTableRow> {
    summary
        .rows
        .iter()
        .flat_map(|row| {
            let resource = resource_label(&row.resource);
            row.pod_statuses.iter().map(move |pod| PodTableRow {
                resource: resource.clone(),
                pod: pod.name.clone(),
                status: color_status(&pod.phase),
                meshed: format_bool(pod.mesh_enrolled),
                control_plane: format_bool(pod.control_plane),
            })
        })
        .collect()
}

pub async fn show_pods(
    client: &ApiClient,
    resource: &str,
    name: Option<&str>,
    namespace: Option<String>,
    all_namespaces: bool,
    format: OutputFormat,
) -> Result<()> {
    let (kind, name) = parse_target(resource, name)?;

    let mut query = vec![("resource_type", kind)];
    if let Some(name) = name {
        query.push(("resource_name", name));
    }
    if all_namespaces {
        query.push(("all_namespaces", "true".to_string()));
    } else if let Some(ns) = namespace {
        query.push(("namespace", ns));
    }

    let summary: PodSummary = client.get_with_query("api/pods", &query).await?;
    print_rows(&table_rows(&summary), &summary, format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{PodStatus, PodSummaryRow};

    #[test]
    fn test_one_table_row_per_pod() {
        let summary = PodSummary {
            rows: vec![PodSummaryRow {
                resource: Resource {
                    namespace: Some("ns1".to_string()),
                    kind: "deployments".to_string(),
                    name: Some("web".to_string()),
                },
                pod_statuses: vec![
                    PodStatus {
                        name: "web-1".to_string(),
                        mesh_enrolled: true,
                        control_plane: false,
                        phase: "Running".to_string(),
                    },
                    PodStatus {
                        name: "web-2".to_string(),
                        mesh_enrolled: false,
                        control_plane: false,
                        phase: "Terminating".to_string(),
                    },
                ],
            }],
        };

        let rows = table_rows(&summary);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].resource, "ns1/deployments/web");
        assert_eq!(rows[1].pod, "web-2");
    }

    #[test]
    fn test_cluster_scoped_resource_label() {
        let resource = Resource {
            namespace: Some(String::new()),
            kind: "namespaces".to_string(),
            name: Some("emojivoto".to_string()),
        };
        assert_eq!(resource_label(&resource), "namespaces/emojivoto");
    }
}
