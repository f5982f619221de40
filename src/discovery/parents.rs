//! Parent resolution
//!
//! Different resource classes locate their parent through different
//! queries: management groups carry it in their own body, subscriptions
//! only appear as children of some management group, resource groups and
//! plain resources encode it in their identifier. The hint map records
//! `child → parent` edges harvested opportunistically from descendants
//! listings so that subscription parents resolve in O(1) instead of a
//! scope-wide scan.

use super::identifier::{self, ResourceType, MANAGEMENT_GROUP_SCOPE, MANAGEMENT_GROUP_TYPE, SUBSCRIPTION_TYPE};
use super::node::ResourceRef;
use super::options::CacheMode;
use super::policy::{policy_for, ParentStrategy};
use super::router::{Payload, RequestRouter};
use crate::error::{DiscoveryError, Result};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// Edges and bodies harvested opportunistically from children listings
#[derive(Default)]
pub struct ListingHints {
    /// child id → parent id
    parents: DashMap<String, String>,
    /// child id → full listing body, for direct materialization
    bodies: DashMap<String, Arc<Value>>,
}

impl ListingHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_parent(&self, child_id: &str, parent_id: &str) {
        self.parents
            .insert(identifier::cache_key(child_id), parent_id.to_string());
    }

    pub fn parent_of(&self, id: &str) -> Option<String> {
        self.parents
            .get(&identifier::cache_key(id))
            .map(|e| e.value().clone())
    }

    pub fn record_body(&self, id: &str, body: Value) {
        self.bodies.insert(identifier::cache_key(id), Arc::new(body));
    }

    pub fn body_of(&self, id: &str) -> Option<Arc<Value>> {
        self.bodies
            .get(&identifier::cache_key(id))
            .map(|e| e.value().clone())
    }

    /// Record the parent edge and body of one descendants-listing item
    pub fn absorb_descendant(&self, item: &Value) {
        let Some(child_id) = item.get("id").and_then(|v| v.as_str()) else {
            return;
        };
        if let Some(parent_id) = item
            .pointer("/properties/parent/id")
            .and_then(|v| v.as_str())
        {
            self.record_parent(child_id, parent_id);
        }
        self.record_body(child_id, item.clone());
    }

    pub fn clear(&self) {
        self.parents.clear();
        self.bodies.clear();
    }
}

/// Type-specific parent location
pub struct ParentResolver {
    router: Arc<RequestRouter>,
    hints: Arc<ListingHints>,
}

impl ParentResolver {
    pub fn new(router: Arc<RequestRouter>, hints: Arc<ListingHints>) -> Self {
        Self { router, hints }
    }

    /// Locate the parent of `id`. Returns `None` at the hierarchy root or
    /// when the parent is unreadable (permission failures are tolerated:
    /// logged and treated as no parent, at the caller's risk).
    pub async fn resolve(
        &self,
        id: &str,
        resource_type: &ResourceType,
        raw: Option<&Value>,
    ) -> Result<Option<ResourceRef>> {
        match policy_for(resource_type).parent {
            ParentStrategy::DetailsParent => self.from_details(id, raw).await,
            ParentStrategy::HintOrScan => self.from_hints_or_scan(id).await,
            ParentStrategy::SubscriptionPrefix => Ok(identifier::subscription_scope(id)
                .map(|scope| ResourceRef::new(scope, ResourceType::new(SUBSCRIPTION_TYPE)))),
            ParentStrategy::ScopeStrip => Ok(self.from_scope_strip(id)),
        }
    }

    async fn from_details(&self, id: &str, raw: Option<&Value>) -> Result<Option<ResourceRef>> {
        let fetched;
        let body = match raw {
            Some(body) => body,
            None => match self.router.get(id, CacheMode::UseCache).await {
                Ok(payload) => match &*payload {
                    Payload::Single(value) => {
                        fetched = value.clone();
                        &fetched
                    }
                    Payload::List(_) => return Ok(None),
                },
                Err(e) if e.is_permission_denied() => {
                    let denied = DiscoveryError::ParentLookupDenied(id.to_string());
                    tracing::warn!("{}: {}", denied, e);
                    return Ok(None);
                }
                Err(e) => return Err(e),
            },
        };

        Ok(body
            .pointer("/properties/details/parent/id")
            .and_then(|v| v.as_str())
            .map(|parent_id| {
                ResourceRef::new(parent_id, ResourceType::new(MANAGEMENT_GROUP_TYPE))
            }))
    }

    async fn from_hints_or_scan(&self, id: &str) -> Result<Option<ResourceRef>> {
        if let Some(parent_id) = self.hints.parent_of(id) {
            return Ok(Some(ResourceRef::new(
                parent_id,
                ResourceType::new(MANAGEMENT_GROUP_TYPE),
            )));
        }

        tracing::debug!("parent hint miss for {}, scanning management groups", id);
        if let Err(e) = self.scan_management_groups().await {
            if e.is_permission_denied() {
                let denied = DiscoveryError::ParentLookupDenied(id.to_string());
                tracing::warn!("{}: {}", denied, e);
                return Ok(None);
            }
            return Err(e);
        }

        Ok(self.hints.parent_of(id).map(|parent_id| {
            ResourceRef::new(parent_id, ResourceType::new(MANAGEMENT_GROUP_TYPE))
        }))
    }

    /// Fallback for subscriptions never seen in a descendants listing:
    /// walk every management group and harvest its subtree into the hint
    /// map. Expensive, which is exactly why the hint map exists.
    async fn scan_management_groups(&self) -> Result<()> {
        let payload = self
            .router
            .get(MANAGEMENT_GROUP_SCOPE, CacheMode::UseCache)
            .await?;
        let Payload::List(groups) = &*payload else {
            return Ok(());
        };

        for group in groups {
            let Some(group_id) = group.get("id").and_then(|v| v.as_str()) else {
                continue;
            };
            let path = format!("{}/descendants", group_id.trim_end_matches('/'));
            match self.router.get(&path, CacheMode::UseCache).await {
                Ok(payload) => {
                    if let Payload::List(items) = &*payload {
                        for item in items {
                            self.hints.absorb_descendant(item);
                        }
                    }
                }
                Err(e) if e.is_permission_denied() => {
                    tracing::warn!("descendants listing denied for {}: {}", group_id, e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    fn from_scope_strip(&self, id: &str) -> Option<ResourceRef> {
        let parent_id = identifier::parent_scope(id)?;
        match identifier::derive_type(&parent_id) {
            Ok(parent_type) => Some(ResourceRef::new(parent_id, parent_type)),
            Err(e) => {
                tracing::warn!("cannot type parent scope of {}: {}", id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hint_map_folds_case() {
        let hints = ListingHints::new();
        hints.record_parent(
            "/subscriptions/AAAA",
            "/providers/Microsoft.Management/managementGroups/root",
        );
        assert_eq!(
            hints.parent_of("/subscriptions/aaaa").unwrap(),
            "/providers/Microsoft.Management/managementGroups/root"
        );
    }

    #[test]
    fn absorb_descendant_records_edge_and_body() {
        let hints = ListingHints::new();
        let item = json!({
            "id": "/subscriptions/00000000-0000-0000-0000-000000000002",
            "type": "Microsoft.Management/managementGroups/subscriptions",
            "name": "00000000-0000-0000-0000-000000000002",
            "properties": {
                "displayName": "Prod",
                "parent": {"id": "/providers/Microsoft.Management/managementGroups/root"}
            }
        });
        hints.absorb_descendant(&item);

        assert_eq!(
            hints
                .parent_of("/subscriptions/00000000-0000-0000-0000-000000000002")
                .unwrap(),
            "/providers/Microsoft.Management/managementGroups/root"
        );
        assert!(hints
            .body_of("/subscriptions/00000000-0000-0000-0000-000000000002")
            .is_some());
    }

    #[test]
    fn clear_drops_everything() {
        let hints = ListingHints::new();
        hints.record_parent("/subscriptions/a", "/providers/x");
        hints.record_body("/subscriptions/a", json!({}));
        hints.clear();
        assert!(hints.parent_of("/subscriptions/a").is_none());
        assert!(hints.body_of("/subscriptions/a").is_none());
    }
}
