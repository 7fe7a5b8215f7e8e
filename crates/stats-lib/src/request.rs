//! Building summary requests from flat query parameters

use crate::error::StatError;
use crate::models::{
    Direction, PodSummaryRequest, ResourceIdentity, ResourceKind, Selector, StatSummaryRequest,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_TIME_WINDOW: &str = "1m";

const WINDOW_UNITS: &[char] = &['s', 'm', 'h', 'd', 'w', 'y'];

/// Query-string form of a stat summary request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSummaryParams {
    pub window: Option<String>,
    pub resource_name: Option<String>,
    pub resource_type: Option<String>,
    pub namespace: Option<String>,
    pub to_name: Option<String>,
    pub to_type: Option<String>,
    pub to_namespace: Option<String>,
    pub from_name: Option<String>,
    pub from_type: Option<String>,
    pub from_namespace: Option<String>,
    #[serde(default)]
    pub all_namespaces: bool,
}

/// Query-string form of a pod summary request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSummaryParams {
    pub resource_name: Option<String>,
    pub resource_type: Option<String>,
    pub namespace: Option<String>,
    #[serde(default)]
    pub all_namespaces: bool,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_kind(value: Option<&str>, default: ResourceKind) -> Result<ResourceKind, StatError> {
    value.map_or(Ok(default), str::parse)
}

fn target_identity(
    resource_type: &Option<String>,
    resource_name: &Option<String>,
    namespace: &Option<String>,
    all_namespaces: bool,
    default_namespace: Option<&str>,
) -> Result<ResourceIdentity, StatError> {
    let kind = parse_kind(non_empty(resource_type), ResourceKind::Deployments)?;
    let mut target = ResourceIdentity::new(kind);
    if !all_namespaces {
        if let Some(ns) = non_empty(namespace).or(default_namespace) {
            target = target.in_namespace(ns);
        }
    }
    if let Some(name) = non_empty(resource_name) {
        target = target.named(name);
    }
    Ok(target)
}

/// Peer identity for a to/from filter; unset fields inherit from `target`
fn peer_identity(
    target: &ResourceIdentity,
    kind: Option<&str>,
    name: Option<&str>,
    namespace: Option<&str>,
) -> Result<ResourceIdentity, StatError> {
    let mut peer = ResourceIdentity::new(parse_kind(kind, target.kind)?);
    peer.namespace = namespace.map(str::to_string).or_else(|| target.namespace.clone());
    peer.name = name.map(str::to_string);
    Ok(peer)
}

/// Check that `window` is a positive integer followed by a duration unit.
///
/// # Errors
///
/// Returns [`StatError::InvalidSelector`] for anything else, since the window is
/// spliced into query text verbatim.
pub fn validate_time_window(window: &str) -> Result<(), StatError> {
    let invalid = || {
        StatError::InvalidSelector(format!(
            "invalid time window {:?}: expected a positive integer followed by one of s, m, h, d, w, y",
            window
        ))
    };

    let unit = window.chars().last().ok_or_else(invalid)?;
    if !WINDOW_UNITS.contains(&unit) {
        return Err(invalid());
    }
    let amount = &window[..window.len() - unit.len_utf8()];
    if amount.is_empty() || !amount.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    match amount.parse::<u64>() {
        Ok(n) if n > 0 => Ok(()),
        _ => Err(invalid()),
    }
}

/// Turn query parameters into a validated stat summary request.
///
/// # Errors
///
/// Returns [`StatError::InvalidSelector`] for unknown kinds, a bad window,
/// both to and from filters, or a selector that fails [`Selector::validate`].
pub fn build_stat_summary_request(params: &StatSummaryParams) -> Result<StatSummaryRequest, StatError> {
    let target = target_identity(
        &params.resource_type,
        &params.resource_name,
        &params.namespace,
        params.all_namespaces,
        Some(DEFAULT_NAMESPACE),
    )?;

    let to = (
        non_empty(&params.to_type),
        non_empty(&params.to_name),
        non_empty(&params.to_namespace),
    );
    let from = (
        non_empty(&params.from_type),
        non_empty(&params.from_name),
        non_empty(&params.from_namespace),
    );
    let has_to = to.0.is_some() || to.1.is_some() || to.2.is_some();
    let has_from = from.0.is_some() || from.1.is_some() || from.2.is_some();

    let direction = match (has_to, has_from) {
        (true, true) => {
            return Err(StatError::InvalidSelector(
                "stat summary requests can specify either 'to' or 'from' parameters, not both"
                    .to_string(),
            ))
        }
        (true, false) => Direction::ToResource(peer_identity(&target, to.0, to.1, to.2)?),
        (false, true) => Direction::FromResource(peer_identity(&target, from.0, from.1, from.2)?),
        (false, false) => Direction::None,
    };

    let time_window = non_empty(&params.window)
        .unwrap_or(DEFAULT_TIME_WINDOW)
        .to_string();
    validate_time_window(&time_window)?;

    let selector = Selector::new(target).with_direction(direction);
    selector.validate()?;

    Ok(StatSummaryRequest {
        selector,
        time_window,
    })
}

/// Turn query parameters into a pod summary request. Without a namespace the
/// request spans all namespaces.
///
/// # Errors
///
/// Returns [`StatError::InvalidSelector`] for an unknown resource kind.
pub fn build_pod_summary_request(params: &PodSummaryParams) -> Result<PodSummaryRequest, StatError> {
    Ok(PodSummaryRequest {
        resource: target_identity(
            &params.resource_type,
            &params.resource_name,
            &params.namespace,
            params.all_namespaces,
            None,
        )?,
    })
}
