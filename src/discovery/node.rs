//! State nodes
//!
//! The primary record type of a discovery run: an immutable-after-build
//! snapshot of one resource, its relations, and its IAM/policy aspects.

use super::identifier::{self, ResourceType};
use super::options::DiscoveryMode;
use serde::Serialize;
use serde_json::Value;

/// Reference to a resource: identifier plus derived type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceRef {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}

impl ResourceRef {
    pub fn new(id: impl Into<String>, resource_type: ResourceType) -> Self {
        Self {
            id: id.into(),
            resource_type,
        }
    }
}

/// Access-control records discovered at a scope
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct IamAspect {
    pub role_definitions: Vec<ResourceRef>,
    pub role_assignments: Vec<ResourceRef>,
}

/// Governance records discovered at a scope
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PolicyAspect {
    pub policy_definitions: Vec<ResourceRef>,
    pub policy_set_definitions: Vec<ResourceRef>,
    pub policy_assignments: Vec<ResourceRef>,
}

/// Snapshot of one resource in the tenant tree.
///
/// Built once per identifier per cache generation and never mutated after
/// installation; aspect upgrades re-publish a new node that only adds.
/// `iam`/`policy` are `None` until a build requests them; `Some` with empty
/// lists means the aspect was discovered and nothing was found (or a
/// permission failure was recovered).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateNode {
    /// Canonical resource identifier
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// Display name (subscriptions use `displayName`, others the payload
    /// `name` or the final path segment)
    pub name: String,
    /// Full decoded API response body
    pub raw: Value,
    /// Namespace portion of the type
    pub provider: String,
    /// Resources directly subordinate in the tenant tree
    pub children: Vec<ResourceRef>,
    /// Resources discovered via the same listing but not directly subordinate
    pub linked_resources: Vec<ResourceRef>,
    pub parent: Option<ResourceRef>,
    /// Ancestors ordered root first, immediate parent last
    pub parents: Vec<ResourceRef>,
    /// `/`-joined short names of the ancestors
    pub parent_path: String,
    /// `parent_path` plus this node's own short name
    pub resource_path: String,
    pub iam: Option<IamAspect>,
    pub policy: Option<PolicyAspect>,
}

impl StateNode {
    /// Canonical cache key for this node
    pub fn cache_key(&self) -> String {
        identifier::cache_key(&self.id)
    }

    /// Whether the aspects requested by `mode` are already present
    pub fn satisfies(&self, mode: DiscoveryMode) -> bool {
        (!mode.wants_iam() || self.iam.is_some())
            && (!mode.wants_policy() || self.policy.is_some())
    }
}
