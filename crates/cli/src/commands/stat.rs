//! `meshstat stat`: per-resource traffic statistics

use anyhow::Result;
use tabled::Tabled;

use super::parse_target;
use crate::client::{ApiClient, StatRow, StatSummary};
use crate::output::{
    color_success_rate, format_latency, format_meshed, format_rps, print_rows, OutputFormat,
};

#[derive(Debug, Default)]
pub struct StatOptions {
    pub resource: String,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub all_namespaces: bool,
    pub time_window: Option<String>,
    pub to: Option<String>,
    pub to_namespace: Option<String>,
    pub from: Option<String>,
    pub from_namespace: Option<String>,
}

#[derive(Tabled)]
struct StatTableRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "MESHED")]
    meshed: String,
    #[tabled(rename = "SUCCESS")]
    success: String,
    #[tabled(rename = "RPS")]
    rps: String,
    #[tabled(rename = "LATENCY_P50")]
    p50: String,
    #[tabled(rename = "LATENCY_P95")]
    p95: String,
    #[tabled(rename = "LATENCY_P99")]
    p99: String,
}

/// Same columns, prefixed by namespace
#[derive(Tabled)]
struct NamespacedStatTableRow {
    #[tabled(rename = "NAMESPACE")]
    namespace: String,
    #[tabled(inline)]
    row: StatTableRow,
}

impl From<&StatRow> for StatTableRow {
    fn from(row: &StatRow) -> Self {
        let stats = &row.stats;
        let requests = stats.total_requests();
        let has_traffic = requests > 0;
        Self {
            name: row.resource.name.clone().unwrap_or_default(),
            meshed: format_meshed(row.meshed_pod_count, row.total_pod_count),
            success: color_success_rate(stats.success_count, stats.failure_count),
            rps: format_rps(requests, &row.time_window),
            p50: format_latency(stats.latency_ms_p50, has_traffic),
            p95: format_latency(stats.latency_ms_p95, has_traffic),
            p99: format_latency(stats.latency_ms_p99, has_traffic),
        }
    }
}

/// Query-string parameters for `/api/stat`
pub fn stat_query(options: &StatOptions) -> Result<Vec<(&'static str, String)>> {
    let (kind, name) = parse_target(&options.resource, options.name.as_deref())?;

    let mut query = vec![("resource_type", kind)];
    if let Some(name) = name {
        query.push(("resource_name", name));
    }
    if options.all_namespaces {
        query.push(("all_namespaces", "true".to_string()));
    } else if let Some(ns) = &options.namespace {
        query.push(("namespace", ns.clone()));
    }
    if let Some(window) = &options.time_window {
        query.push(("window", window.clone()));
    }

    if let Some(to) = &options.to {
        let (to_kind, to_name) = parse_target(to, None)?;
        query.push(("to_type", to_kind));
        if let Some(n) = to_name {
            query.push(("to_name", n));
        }
    }
    if let Some(ns) = &options.to_namespace {
        query.push(("to_namespace", ns.clone()));
    }
    if let Some(from) = &options.from {
        let (from_kind, from_name) = parse_target(from, None)?;
        query.push(("from_type", from_kind));
        if let Some(n) = from_name {
            query.push(("from_name", n));
        }
    }
    if let Some(ns) = &options.from_namespace {
        query.push(("from_namespace", ns.clone()));
    }

    Ok(query)
}

pub async fn show_stats(client: &ApiClient, options: &StatOptions, format: OutputFormat) -> Result<()> {
    let query = stat_query(options)?;
    let summary: StatSummary = client.get_with_query("api/stat", &query).await?;

    if options.all_namespaces {
        let rows: Vec<NamespacedStatTableRow> = summary
            .rows
            .iter()
            .map(|r| NamespacedStatTableRow {
                namespace: r.resource.namespace.clone().unwrap_or_default(),
                row: StatTableRow::from(r),
            })
            .collect();
        print_rows(&rows, &summary, format);
    } else {
        let rows: Vec<StatTableRow> = summary.rows.iter().map(StatTableRow::from).collect();
        print_rows(&rows, &summary, format);
    }

    Ok(())
}
