//! Error taxonomy for stat and pod summaries

use crate::models::ResourceKind;
use thiserror::Error;

/// Terminal failure of a summary request. Nothing at this layer retries.
#[derive(Debug, Error)]
pub enum StatError {
    /// Disallowed selector/direction combination or malformed parameter
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StatError {
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, StatError::InvalidSelector(_))
    }

    /// Stable class name used for error envelopes and metric labels
    pub fn class(&self) -> &'static str {
        match self {
            StatError::InvalidSelector(_) => "invalid_argument",
            StatError::Discovery(_) => "discovery",
            StatError::Backend(_) => "backend",
        }
    }
}

/// Object lookup or pod resolution failure
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("kubernetes API error while {context}: {source}")]
    Kube {
        context: String,
        #[source]
        source: kube::Error,
    },

    #[error("{kind} \"{name}\" not found")]
    NotFound { kind: ResourceKind, name: String },

    #[error("object {0} has no name")]
    Unnamed(ResourceKind),

    #[error("resource lister unavailable: {0}")]
    Unavailable(String),
}

impl DiscoveryError {
    /// True when the lister itself failed, false for lookups of objects that
    /// do not exist
    pub fn is_lister_failure(&self) -> bool {
        matches!(self, DiscoveryError::Kube { .. } | DiscoveryError::Unavailable(_))
    }
}

/// Metrics backend call failure or contract violation
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("query request failed: {source}")]
    Request {
        #[source]
        source: reqwest::Error,
    },

    #[error("metrics backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("metrics backend rejected query ({error_type}): {error}")]
    Api { error_type: String, error: String },

    #[error("failed to decode query response: {0}")]
    Decode(String),

    #[error("unexpected query result type (expected vector): {0}")]
    UnexpectedResultType(String),

    #[error("invalid sample value {0:?}")]
    InvalidSample(String),

    #[error("invalid metrics backend URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("query cancelled")]
    Cancelled,

    #[error("query deadline exceeded")]
    DeadlineExceeded,

    #[error("query task exited without reporting a result")]
    TaskLost,
}
