//! Discovery error types

use thiserror::Error;

/// Errors surfaced by the discovery engine and its transport
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The provider bootstrap listing came back empty. Fatal at first use:
    /// without it no API version can be resolved for any type.
    #[error("provider listing returned no providers")]
    ProviderDiscoveryFailed,

    #[error("no resource type derivable from identifier: {0}")]
    UnknownResourceType(String),

    #[error("API call failed: {status} {code}: {message}")]
    ApiCallFailed {
        status: u16,
        code: String,
        message: String,
    },

    /// A list endpoint answered where a single record was expected. The
    /// caller must narrow the identifier.
    #[error("identifier names a collection, not a single resource: {0}")]
    AmbiguousIdentifier(String),

    #[error("parent lookup denied for {0}")]
    ParentLookupDenied(String),

    #[error("parent chain exceeded maximum depth for {0}")]
    CycleDetected(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DiscoveryError {
    /// True for API failures caused by missing permissions on the target.
    pub fn is_permission_denied(&self) -> bool {
        matches!(
            self,
            Self::ApiCallFailed {
                status: 401 | 403,
                ..
            }
        )
    }

    /// True for per-resource API failures that a batch may recover from.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ApiCallFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
