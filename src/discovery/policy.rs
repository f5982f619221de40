//! Per-type discovery policy
//!
//! A single table from resource type to how that type lists its children,
//! locates its parent, and which IAM/policy sub-queries apply. Everything
//! type-specific in the engine dispatches through here.

use super::identifier::{
    ResourceType, MANAGEMENT_GROUP_TYPE, RESOURCE_GROUP_TYPE, SUBSCRIPTION_TYPE,
};

/// How a type lists its children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildrenStrategy {
    /// `GET {id}/descendants` — transitive subtree, partitioned into direct
    /// children and linked resources
    Descendants,
    /// `GET {id}/resourceGroups`
    ResourceGroups,
    /// `GET {id}/resources`
    Resources,
    None,
}

/// How a type locates its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentStrategy {
    /// `properties.details.parent.id` from the node's own body
    DetailsParent,
    /// Parent hint map first, management-group scan on miss
    HintOrScan,
    /// `/subscriptions/{guid}` prefix of the identifier
    SubscriptionPrefix,
    /// Strip the trailing provider chain from the identifier
    ScopeStrip,
}

/// Destination field for an IAM sub-query result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IamField {
    RoleDefinitions,
    RoleAssignments,
}

/// Destination field for a policy sub-query result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyField {
    Definitions,
    SetDefinitions,
    Assignments,
}

pub const ROLE_DEFINITIONS_SUFFIX: &str = "providers/Microsoft.Authorization/roleDefinitions";
pub const ROLE_ASSIGNMENTS_SUFFIX: &str =
    "providers/Microsoft.Authorization/roleAssignments?$filter=atScope()";
pub const POLICY_DEFINITIONS_SUFFIX: &str = "providers/Microsoft.Authorization/policyDefinitions";
pub const POLICY_SET_DEFINITIONS_SUFFIX: &str =
    "providers/Microsoft.Authorization/policySetDefinitions";
pub const POLICY_ASSIGNMENTS_SUFFIX: &str =
    "providers/Microsoft.Authorization/policyAssignments?$filter=atScope()";

const FULL_IAM: &[(IamField, &str)] = &[
    (IamField::RoleDefinitions, ROLE_DEFINITIONS_SUFFIX),
    (IamField::RoleAssignments, ROLE_ASSIGNMENTS_SUFFIX),
];

const FULL_POLICY: &[(PolicyField, &str)] = &[
    (PolicyField::Definitions, POLICY_DEFINITIONS_SUFFIX),
    (PolicyField::SetDefinitions, POLICY_SET_DEFINITIONS_SUFFIX),
    (PolicyField::Assignments, POLICY_ASSIGNMENTS_SUFFIX),
];

const ASSIGNMENTS_ONLY_POLICY: &[(PolicyField, &str)] =
    &[(PolicyField::Assignments, POLICY_ASSIGNMENTS_SUFFIX)];

/// Discovery policy record for one resource type
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryPolicy {
    pub children: ChildrenStrategy,
    pub parent: ParentStrategy,
    pub iam_suffixes: &'static [(IamField, &'static str)],
    pub policy_suffixes: &'static [(PolicyField, &'static str)],
}

/// Resolve the discovery policy for a resource type
pub fn policy_for(resource_type: &ResourceType) -> DiscoveryPolicy {
    if *resource_type == MANAGEMENT_GROUP_TYPE {
        DiscoveryPolicy {
            children: ChildrenStrategy::Descendants,
            parent: ParentStrategy::DetailsParent,
            iam_suffixes: FULL_IAM,
            policy_suffixes: FULL_POLICY,
        }
    } else if *resource_type == SUBSCRIPTION_TYPE {
        DiscoveryPolicy {
            children: ChildrenStrategy::ResourceGroups,
            parent: ParentStrategy::HintOrScan,
            iam_suffixes: FULL_IAM,
            policy_suffixes: FULL_POLICY,
        }
    } else if *resource_type == RESOURCE_GROUP_TYPE {
        DiscoveryPolicy {
            children: ChildrenStrategy::Resources,
            parent: ParentStrategy::SubscriptionPrefix,
            iam_suffixes: FULL_IAM,
            policy_suffixes: ASSIGNMENTS_ONLY_POLICY,
        }
    } else {
        // plain resources, including the synthetic Microsoft.Resources/resources
        DiscoveryPolicy {
            children: ChildrenStrategy::None,
            parent: ParentStrategy::ScopeStrip,
            iam_suffixes: &[],
            policy_suffixes: &[],
        }
    }
}
