//! Label matcher and group-by construction
//!
//! A [`QueryPlan`] is the single place where the traffic direction of a
//! request is interpreted: it decides which series are selected, how they
//! are grouped, and which rows the assembler emits.

use crate::backend::Metric;
use crate::models::{Direction, ResourceIdentity, Selector};
use std::collections::BTreeMap;
use std::fmt;

pub const NAMESPACE_LABEL: &str = "namespace";
pub const DIRECTION_LABEL: &str = "direction";
const DST_PREFIX: &str = "dst_";

/// Equality matchers rendered into a query selector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMatchers(BTreeMap<String, String>);

impl LabelMatchers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Merge `other` into `self`; `other` wins on conflicting names
    pub fn merge(&mut self, other: LabelMatchers) {
        self.0.extend(other.0);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Matchers for a resource as a traffic source (or the inbound side)
    pub fn source(resource: &ResourceIdentity) -> Self {
        Self::for_resource(resource, "")
    }

    /// Matchers for a resource as a traffic destination
    pub fn destination(resource: &ResourceIdentity) -> Self {
        Self::for_resource(resource, DST_PREFIX)
    }

    fn for_resource(resource: &ResourceIdentity, prefix: &str) -> Self {
        let mut set = Self::new();
        if let Some(name) = resource.name_filter() {
            set.insert(format!("{}{}", prefix, resource.kind.proxy_label()), name);
        }
        if !resource.kind.is_namespace() {
            if let Some(ns) = resource.namespace_filter() {
                set.insert(format!("{}{}", prefix, NAMESPACE_LABEL), ns);
            }
        }
        set
    }

    fn direction(direction: &str) -> Self {
        let mut set = Self::new();
        set.insert(DIRECTION_LABEL, direction);
        set
    }
}

impl fmt::Display for LabelMatchers {
    /// Renders as `{a="x", b="y"}`, sorted by label name
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}=\"{}\"", name, escape_label_value(value))?;
        }
        f.write_str("}")
    }
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Which part of a resource identity a group-by label carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelRole {
    Namespace,
    Name,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupByLabel {
    pub name: String,
    pub role: LabelRole,
}

/// Ordered group-by label names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupBy(Vec<GroupByLabel>);

impl GroupBy {
    pub fn source(resource: &ResourceIdentity) -> Self {
        Self::for_resource(resource, "")
    }

    pub fn destination(resource: &ResourceIdentity) -> Self {
        Self::for_resource(resource, DST_PREFIX)
    }

    fn for_resource(resource: &ResourceIdentity, prefix: &str) -> Self {
        let mut labels = vec![GroupByLabel {
            name: format!("{}{}", prefix, NAMESPACE_LABEL),
            role: LabelRole::Namespace,
        }];
        if !resource.kind.is_namespace() {
            labels.push(GroupByLabel {
                name: format!("{}{}", prefix, resource.kind.proxy_label()),
                role: LabelRole::Name,
            });
        }
        Self(labels)
    }

    pub fn labels(&self) -> &[GroupByLabel] {
        &self.0
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|l| l.name.as_str())
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, name) in self.names().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

/// Anything that can be placed into the group-key keyspace.
///
/// Metric series and resource identities both implement this, and a series
/// labelled for a resource must yield the same key as the resource itself.
pub trait Correlate {
    /// Value this item contributes for `label`, if any
    fn label_value(&self, label: &GroupByLabel) -> Option<&str>;

    fn group_key(&self, group_by: &GroupBy) -> GroupKey {
        let values: Vec<&str> = group_by
            .labels()
            .iter()
            .map(|label| self.label_value(label).unwrap_or(""))
            .collect();
        GroupKey(values.join("/"))
    }
}

impl Correlate for Metric {
    fn label_value(&self, label: &GroupByLabel) -> Option<&str> {
        self.get(&label.name).map(String::as_str)
    }
}

impl Correlate for ResourceIdentity {
    fn label_value(&self, label: &GroupByLabel) -> Option<&str> {
        match label.role {
            // a namespace's own name is what its series carry in the namespace label
            LabelRole::Namespace if self.kind.is_namespace() => self.name.as_deref(),
            LabelRole::Namespace => self.namespace.as_deref(),
            LabelRole::Name => self.name.as_deref(),
        }
    }
}

/// Join key between merged statistics and discovered objects
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey(String);

impl GroupKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which rows the assembler emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowInclusion {
    /// One row per discovered object, with or without traffic
    AllObjects,
    /// Only objects with observed traffic in the requested direction
    ObservedTraffic,
}

/// Direction-dependent query shape for a selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub matchers: LabelMatchers,
    pub group_by: GroupBy,
    pub inclusion: RowInclusion,
}

impl QueryPlan {
    pub fn for_selector(selector: &Selector) -> Self {
        let target = &selector.target;
        let mut matchers = LabelMatchers::new();

        match &selector.direction {
            Direction::None => {
                matchers.merge(LabelMatchers::source(target));
                matchers.merge(LabelMatchers::direction("inbound"));
                Self {
                    matchers,
                    group_by: GroupBy::source(target),
                    inclusion: RowInclusion::AllObjects,
                }
            }
            Direction::ToResource(dst) => {
                matchers.merge(LabelMatchers::destination(dst));
                matchers.merge(LabelMatchers::source(target));
                matchers.merge(LabelMatchers::direction("outbound"));
                Self {
                    matchers,
                    group_by: GroupBy::source(target),
                    inclusion: RowInclusion::ObservedTraffic,
                }
            }
            Direction::FromResource(src) => {
                matchers.merge(LabelMatchers::source(src));
                matchers.merge(LabelMatchers::direction("outbound"));
                Self {
                    matchers,
                    group_by: GroupBy::destination(target),
                    inclusion: RowInclusion::ObservedTraffic,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceKind;

    fn deploy(ns: &str, name: &str) -> ResourceIdentity {
        ResourceIdentity::new(ResourceKind::Deployments)
            .in_namespace(ns)
            .named(name)
    }

    #[test]
    fn test_inbound_plan() {
        let plan = QueryPlan::for_selector(&Selector::new(deploy("ns1", "web")));

        assert_eq!(
            plan.matchers.to_string(),
            r#"{deployment="web", direction="inbound", namespace="ns1"}"#
        );
        assert_eq!(plan.group_by.to_string(), "namespace, deployment");
        assert_eq!(plan.inclusion, RowInclusion::AllObjects);
    }

    #[test]
    fn test_missing_name_is_a_wildcard() {
        let target = ResourceIdentity::new(ResourceKind::Pods).in_namespace("ns1");
        let plan = QueryPlan::for_selector(&Selector::new(target));

        assert_eq!(plan.matchers.get("pod"), None);
        assert_eq!(plan.matchers.get("namespace"), Some("ns1"));
        assert_eq!(plan.matchers.len(), 2);
    }

    #[test]
    fn test_all_namespaces_omits_namespace_matcher() {
        let target = ResourceIdentity::new(ResourceKind::Deployments);
        let plan = QueryPlan::for_selector(&Selector::new(target));
        assert_eq!(plan.matchers.to_string(), r#"{direction="inbound"}"#);
    }

    #[test]
    fn test_namespace_target_groups_by_namespace_only() {
        let target = ResourceIdentity::new(ResourceKind::Namespaces).named("ns1");
        let plan = QueryPlan::for_selector(&Selector::new(target));

        assert_eq!(plan.group_by.to_string(), "namespace");
        // the namespace name is matched through its own proxy label
        assert_eq!(
            plan.matchers.to_string(),
            r#"{direction="inbound", namespace="ns1"}"#
        );
    }

    #[test]
    fn test_to_plan_groups_by_target_source_labels() {
        let dst = ResourceIdentity::new(ResourceKind::Services)
            .in_namespace("ns2")
            .named("db");
        let selector = Selector::new(ResourceIdentity::new(ResourceKind::Deployments).in_namespace("ns1"))
            .with_direction(Direction::ToResource(dst));
        let plan = QueryPlan::for_selector(&selector);

        assert_eq!(
            plan.matchers.to_string(),
            r#"{direction="outbound", dst_namespace="ns2", dst_service="db", namespace="ns1"}"#
        );
        assert_eq!(plan.group_by.to_string(), "namespace, deployment");
        assert_eq!(plan.inclusion, RowInclusion::ObservedTraffic);
    }

    #[test]
    fn test_from_plan_groups_by_target_destination_labels() {
        let selector = Selector::new(ResourceIdentity::new(ResourceKind::Services).in_namespace("ns1"))
            .with_direction(Direction::FromResource(deploy("ns1", "web")));
        let plan = QueryPlan::for_selector(&selector);

        assert_eq!(
            plan.matchers.to_string(),
            r#"{deployment="web", direction="outbound", namespace="ns1"}"#
        );
        assert_eq!(plan.group_by.to_string(), "dst_namespace, dst_service");
        assert_eq!(plan.inclusion, RowInclusion::ObservedTraffic);
    }

    #[test]
    fn test_label_values_are_escaped() {
        let mut matchers = LabelMatchers::new();
        matchers.insert("pod", r#"a"b\c"#);
        assert_eq!(matchers.to_string(), r#"{pod="a\"b\\c"}"#);
    }

    #[test]
    fn test_identity_and_series_keys_agree_for_every_kind() {
        for kind in ResourceKind::ALL {
            let identity = if kind.is_namespace() {
                ResourceIdentity::new(kind).named("ns1")
            } else {
                ResourceIdentity::new(kind).in_namespace("ns1").named("obj")
            };

            for (group_by, prefix) in [
                (GroupBy::source(&identity), ""),
                (GroupBy::destination(&identity), "dst_"),
            ] {
                let mut series = Metric::new();
                series.insert(format!("{}namespace", prefix), "ns1".to_string());
                if !kind.is_namespace() {
                    series.insert(format!("{}{}", prefix, kind.proxy_label()), "obj".to_string());
                }
                series.insert("classification".to_string(), "success".to_string());

                assert_eq!(
                    identity.group_key(&group_by),
                    series.group_key(&group_by),
                    "kind {} prefix {:?}",
                    kind,
                    prefix
                );
            }
        }
    }

    #[test]
    fn test_missing_series_label_contributes_empty_value() {
        let group_by = GroupBy::source(&deploy("ns1", "web"));
        let mut series = Metric::new();
        series.insert("deployment".to_string(), "web".to_string());
        assert_eq!(series.group_key(&group_by).as_str(), "/web");
    }
}
