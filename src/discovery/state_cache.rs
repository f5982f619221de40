//! State cache
//!
//! Thread-safe mapping from canonical resource identifier to its
//! fully-built [`StateNode`]; the deduplication layer closest to callers.
//! Installation is insert-if-absent: when two workers race the same id,
//! exactly one node wins and the loser is discarded. Aspect upgrades
//! re-publish a node that only adds, so concurrent upgraders converge.

use super::identifier;
use super::node::{IamAspect, PolicyAspect, StateNode};
use dashmap::DashMap;
use std::sync::Arc;

/// Concurrent id → node cache; keys are canonical (lowercase)
#[derive(Default)]
pub struct StateCache {
    entries: DashMap<String, Arc<StateNode>>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Arc<StateNode>> {
        self.entries
            .get(&identifier::cache_key(id))
            .map(|e| e.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(&identifier::cache_key(id))
    }

    /// Atomic insert-if-absent. Returns the winning node: the given one if
    /// this call installed it, the already-cached one otherwise.
    pub fn install(&self, node: StateNode) -> Arc<StateNode> {
        self.entries
            .entry(node.cache_key())
            .or_insert_with(|| Arc::new(node))
            .value()
            .clone()
    }

    /// Monotonic aspect upgrade: fill the cached node's missing aspects and
    /// re-publish. Aspects can be added but never removed or replaced, so
    /// concurrent upgraders converge. Returns the published node, or `None`
    /// when the id is not cached.
    pub fn upgrade(
        &self,
        id: &str,
        iam: Option<IamAspect>,
        policy: Option<PolicyAspect>,
    ) -> Option<Arc<StateNode>> {
        let mut entry = self.entries.get_mut(&identifier::cache_key(id))?;
        let current = entry.value();
        if (iam.is_none() || current.iam.is_some())
            && (policy.is_none() || current.policy.is_some())
        {
            return Some(current.clone());
        }

        let mut upgraded = (**current).clone();
        if upgraded.iam.is_none() {
            upgraded.iam = iam;
        }
        if upgraded.policy.is_none() {
            upgraded.policy = policy;
        }
        let upgraded = Arc::new(upgraded);
        *entry.value_mut() = upgraded.clone();
        Some(upgraded)
    }

    /// Snapshot of every cached node
    pub fn show(&self) -> Vec<Arc<StateNode>> {
        self.entries.iter().map(|e| e.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached node (explicit generation reset)
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::identifier::ResourceType;
    use crate::discovery::node::ResourceRef;
    use serde_json::json;

    fn node(id: &str) -> StateNode {
        StateNode {
            id: id.to_string(),
            resource_type: ResourceType::new("Microsoft.Management/managementGroups"),
            name: identifier::short_name(id).to_string(),
            raw: json!({}),
            provider: "Microsoft.Management".to_string(),
            children: Vec::new(),
            linked_resources: Vec::new(),
            parent: None,
            parents: Vec::new(),
            parent_path: String::new(),
            resource_path: format!("/{}", identifier::short_name(id)),
            iam: None,
            policy: None,
        }
    }

    #[test]
    fn install_is_insert_if_absent() {
        let cache = StateCache::new();
        let id = "/providers/Microsoft.Management/managementGroups/root";

        let first = cache.install(node(id));
        let mut loser = node(id);
        loser.name = "other".to_string();
        let winner = cache.install(loser);

        assert!(Arc::ptr_eq(&first, &winner));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn lookups_fold_case() {
        let cache = StateCache::new();
        cache.install(node("/providers/Microsoft.Management/managementGroups/Root"));
        assert!(cache.contains("/PROVIDERS/microsoft.management/managementgroups/ROOT"));
    }

    #[test]
    fn upgrade_adds_missing_aspects_only() {
        let cache = StateCache::new();
        let id = "/providers/Microsoft.Management/managementGroups/root";
        cache.install(node(id));

        let iam = IamAspect {
            role_definitions: vec![ResourceRef::new(
                format!("{id}/providers/Microsoft.Authorization/roleDefinitions/x"),
                ResourceType::new("Microsoft.Authorization/roleDefinitions"),
            )],
            role_assignments: Vec::new(),
        };
        let upgraded = cache.upgrade(id, Some(iam.clone()), None).unwrap();
        assert_eq!(upgraded.iam.as_ref(), Some(&iam));
        assert!(upgraded.policy.is_none());

        // a second upgrade cannot replace an existing aspect
        let other = IamAspect::default();
        let again = cache.upgrade(id, Some(other), Some(PolicyAspect::default())).unwrap();
        assert_eq!(again.iam.as_ref(), Some(&iam));
        assert!(again.policy.is_some());
    }

    #[test]
    fn upgrade_of_unknown_id_is_none() {
        let cache = StateCache::new();
        assert!(cache.upgrade("/subscriptions/missing", None, None).is_none());
    }
}
