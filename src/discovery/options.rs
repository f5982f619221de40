//! Discovery configuration
//!
//! Enumerated options steering cache interaction, API version release
//! channels, and which expensive aspects a build discovers.

use serde::{Deserialize, Serialize};

/// Default worker-pool fan-out for bulk fetches
pub const DEFAULT_THROTTLE_LIMIT: usize = 4;

/// Cache interaction mode for a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CacheMode {
    /// Serve from cache when present; populate on miss
    #[default]
    UseCache,
    /// Bypass the cache read but still write the result back
    SkipCache,
}

/// API version release channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Release {
    /// Newest version with a plain `YYYY-MM-DD` stamp
    #[default]
    Stable,
    /// Newest published version, previews included
    Latest,
}

impl Release {
    pub fn as_str(self) -> &'static str {
        match self {
            Release::Stable => "stable",
            Release::Latest => "latest",
        }
    }
}

/// Which access-control and policy aspects a build should discover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DiscoveryMode {
    #[default]
    ExcludeBoth,
    IncludeIam,
    IncludePolicy,
    IncludeBoth,
}

impl DiscoveryMode {
    pub fn from_flags(iam: bool, policy: bool) -> Self {
        match (iam, policy) {
            (false, false) => DiscoveryMode::ExcludeBoth,
            (true, false) => DiscoveryMode::IncludeIam,
            (false, true) => DiscoveryMode::IncludePolicy,
            (true, true) => DiscoveryMode::IncludeBoth,
        }
    }

    pub fn wants_iam(self) -> bool {
        matches!(self, DiscoveryMode::IncludeIam | DiscoveryMode::IncludeBoth)
    }

    pub fn wants_policy(self) -> bool {
        matches!(self, DiscoveryMode::IncludePolicy | DiscoveryMode::IncludeBoth)
    }
}

/// Options steering a [`TenantWalker`](super::TenantWalker) traversal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkOptions {
    /// Keep descending into discovered children; `false` stops after the root
    pub recurse: bool,
    pub include_management_groups: bool,
    pub include_subscriptions: bool,
    pub include_resource_groups: bool,
    pub include_resources: bool,
    pub include_iam: bool,
    pub include_policy: bool,
    /// Identifiers pruned from traversal (exact match, case-insensitive)
    #[serde(default)]
    pub exclude_path_ids: Vec<String>,
    /// Worker fan-out handed to the bulk fetcher; `0` means direct
    /// materialization from listing payloads
    pub throttle_limit: usize,
    pub cache_mode: CacheMode,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            recurse: true,
            include_management_groups: true,
            include_subscriptions: true,
            include_resource_groups: true,
            include_resources: true,
            include_iam: false,
            include_policy: false,
            exclude_path_ids: Vec::new(),
            throttle_limit: DEFAULT_THROTTLE_LIMIT,
            cache_mode: CacheMode::UseCache,
        }
    }
}

impl WalkOptions {
    /// Discovery mode implied by the IAM/policy inclusion flags
    pub fn discovery_mode(&self) -> DiscoveryMode {
        DiscoveryMode::from_flags(self.include_iam, self.include_policy)
    }
}
