//! Subcommand implementations

pub mod pods;
pub mod stat;

use anyhow::{bail, Result};

/// Split `type[/name]` plus an optional positional name into (type, name)
pub fn parse_target(resource: &str, name: Option<&str>) -> Result<(String, Option<String>)> {
    let (kind, inline_name) = match resource.split_once('/') {
        Some((kind, inline)) => (kind, Some(inline)),
        None => (resource, None),
    };

    if kind.is_empty() {
        bail!("missing resource type in {:?}", resource);
    }

    match (inline_name, name) {
        (Some(_), Some(_)) => bail!(
            "resource name given twice: use either {} or {} {}",
            resource,
            kind,
            name.unwrap_or_default()
        ),
        (Some(""), None) => bail!("missing resource name in {:?}", resource),
        (Some(n), None) | (None, Some(n)) => Ok((kind.to_string(), Some(n.to_string()))),
        (None, None) => Ok((kind.to_string(), None)),
    }
}
