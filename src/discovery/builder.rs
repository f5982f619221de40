//! Node building
//!
//! Constructs a [`StateNode`] from an identifier: fetches the raw config,
//! derives the type, populates children/parents and the requested IAM and
//! policy aspects per the type's discovery policy, and installs the result
//! into the state cache.

use super::identifier::{self, ResourceType, SUBSCRIPTION_TYPE};
use super::node::{IamAspect, PolicyAspect, ResourceRef, StateNode};
use super::options::{CacheMode, DiscoveryMode};
use super::parents::{ListingHints, ParentResolver};
use super::policy::{policy_for, ChildrenStrategy, IamField, PolicyField};
use super::router::{Payload, RequestRouter};
use super::state_cache::StateCache;
use crate::error::{DiscoveryError, Result};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Parent chains deeper than this indicate a cycle in the relationship data
const MAX_PARENT_DEPTH: usize = 32;

/// A recovered or per-identifier failure surfaced alongside results
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Identifier the failure belongs to
    pub id: String,
    /// Operation that failed, e.g. `roleAssignments` or `build`
    pub operation: String,
    /// Rendered error
    pub message: String,
}

impl Diagnostic {
    pub fn new(id: &str, operation: &str, message: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }
}

/// Outcome of a single build: the (possibly cached) node plus any
/// recovered warnings
#[derive(Debug)]
pub struct BuiltNode {
    pub node: Arc<StateNode>,
    pub warnings: Vec<Diagnostic>,
}

/// Builds state nodes and installs them into the shared caches
pub struct NodeBuilder {
    router: Arc<RequestRouter>,
    state: Arc<StateCache>,
    hints: Arc<ListingHints>,
    parents: ParentResolver,
}

impl NodeBuilder {
    pub fn new(
        router: Arc<RequestRouter>,
        state: Arc<StateCache>,
        hints: Arc<ListingHints>,
    ) -> Self {
        let parents = ParentResolver::new(router.clone(), hints.clone());
        Self {
            router,
            state,
            hints,
            parents,
        }
    }

    /// Build the node for `id`.
    ///
    /// With `CacheMode::UseCache` a state-cache hit short-circuits the
    /// network entirely; a hit lacking aspects requested by
    /// `discovery_mode` is upgraded in place (only the missing sub-queries
    /// are issued). A miss fetches the primary record fresh
    /// (`SkipCache`) while every subordinate call reuses the response
    /// cache.
    pub async fn build(
        &self,
        id: &str,
        cache_mode: CacheMode,
        discovery_mode: DiscoveryMode,
    ) -> Result<BuiltNode> {
        if cache_mode == CacheMode::UseCache {
            if let Some(cached) = self.state.get(id) {
                if cached.satisfies(discovery_mode) {
                    tracing::trace!("state cache hit: {}", id);
                    return Ok(BuiltNode {
                        node: cached,
                        warnings: Vec::new(),
                    });
                }
                return self.upgrade(cached, discovery_mode).await;
            }
        }

        let payload = self.router.get(id, CacheMode::SkipCache).await?;
        let raw = match &*payload {
            Payload::Single(value) => value.clone(),
            Payload::List(_) => {
                return Err(DiscoveryError::AmbiguousIdentifier(id.to_string()))
            }
        };

        self.assemble(id, raw, discovery_mode).await
    }

    /// Direct materialization: build from a body already obtained through a
    /// children listing, skipping the primary fetch.
    pub async fn materialize(
        &self,
        id: &str,
        raw: Value,
        discovery_mode: DiscoveryMode,
    ) -> Result<BuiltNode> {
        if let Some(cached) = self.state.get(id) {
            if cached.satisfies(discovery_mode) {
                return Ok(BuiltNode {
                    node: cached,
                    warnings: Vec::new(),
                });
            }
            return self.upgrade(cached, discovery_mode).await;
        }

        self.assemble(id, raw, discovery_mode).await
    }

    /// Listing body harvested for `id` during an earlier children listing
    pub fn listing_body(&self, id: &str) -> Option<Arc<Value>> {
        self.hints.body_of(id)
    }

    async fn upgrade(
        &self,
        cached: Arc<StateNode>,
        discovery_mode: DiscoveryMode,
    ) -> Result<BuiltNode> {
        let mut warnings = Vec::new();
        let type_policy = policy_for(&cached.resource_type);

        let iam = if discovery_mode.wants_iam() && cached.iam.is_none() {
            Some(
                self.fetch_iam(&cached.id, type_policy.iam_suffixes, &mut warnings)
                    .await?,
            )
        } else {
            None
        };
        let policy = if discovery_mode.wants_policy() && cached.policy.is_none() {
            Some(
                self.fetch_policy(&cached.id, type_policy.policy_suffixes, &mut warnings)
                    .await?,
            )
        } else {
            None
        };

        let node = self
            .state
            .upgrade(&cached.id, iam, policy)
            .unwrap_or(cached);
        Ok(BuiltNode { node, warnings })
    }

    async fn assemble(
        &self,
        id: &str,
        raw: Value,
        discovery_mode: DiscoveryMode,
    ) -> Result<BuiltNode> {
        let id = id.trim_end_matches('/');
        let resource_type = identifier::derive_type(id)?;
        let provider = resource_type.namespace().to_string();

        // subscriptions carry their display name at the top level
        let name = if resource_type == SUBSCRIPTION_TYPE {
            raw.get("displayName").and_then(|v| v.as_str())
        } else {
            raw.get("name").and_then(|v| v.as_str())
        }
        .map(str::to_string)
        .unwrap_or_else(|| identifier::short_name(id).to_string());

        let mut warnings = Vec::new();
        let (children, linked_resources) = self
            .list_children(id, &resource_type, &mut warnings)
            .await?;

        let parent = self.parents.resolve(id, &resource_type, Some(&raw)).await?;
        let parents = self.walk_parents(id, parent.clone()).await?;

        let parent_path = if parents.is_empty() {
            String::new()
        } else {
            format!(
                "/{}",
                parents
                    .iter()
                    .map(|p| identifier::short_name(&p.id))
                    .collect::<Vec<_>>()
                    .join("/")
            )
        };
        let resource_path = format!("{}/{}", parent_path, identifier::short_name(id));

        let type_policy = policy_for(&resource_type);
        let iam = if discovery_mode.wants_iam() {
            Some(
                self.fetch_iam(id, type_policy.iam_suffixes, &mut warnings)
                    .await?,
            )
        } else {
            None
        };
        let policy = if discovery_mode.wants_policy() {
            Some(
                self.fetch_policy(id, type_policy.policy_suffixes, &mut warnings)
                    .await?,
            )
        } else {
            None
        };

        let node = StateNode {
            id: id.to_string(),
            resource_type,
            name,
            raw,
            provider,
            children,
            linked_resources,
            parent,
            parents,
            parent_path,
            resource_path,
            iam,
            policy,
        };

        // losing a concurrent race discards this build and keeps the winner
        let node = self.state.install(node);
        Ok(BuiltNode { node, warnings })
    }

    async fn list_children(
        &self,
        id: &str,
        resource_type: &ResourceType,
        warnings: &mut Vec<Diagnostic>,
    ) -> Result<(Vec<ResourceRef>, Vec<ResourceRef>)> {
        match policy_for(resource_type).children {
            ChildrenStrategy::Descendants => self.list_descendants(id, warnings).await,
            ChildrenStrategy::ResourceGroups => Ok((
                self.list_scope(id, "resourceGroups", warnings).await?,
                Vec::new(),
            )),
            ChildrenStrategy::Resources => Ok((
                self.list_scope(id, "resources", warnings).await?,
                Vec::new(),
            )),
            ChildrenStrategy::None => Ok((Vec::new(), Vec::new())),
        }
    }

    /// Descendants return the full transitive subtree: direct children
    /// (parented by this node) go to `children`, everything deeper to
    /// `linked_resources`. Every item feeds the hint map.
    async fn list_descendants(
        &self,
        id: &str,
        warnings: &mut Vec<Diagnostic>,
    ) -> Result<(Vec<ResourceRef>, Vec<ResourceRef>)> {
        let path = format!("{}/descendants", id);
        let items = match self.router.get(&path, CacheMode::UseCache).await {
            Ok(payload) => payload_items(&payload),
            Err(e) if e.is_recoverable() => {
                tracing::warn!("descendants listing failed for {}: {}", id, e);
                warnings.push(Diagnostic::new(id, "descendants", &e));
                return Ok((Vec::new(), Vec::new()));
            }
            Err(e) => return Err(e),
        };

        let mut children = Vec::new();
        let mut linked = Vec::new();
        for item in &items {
            self.hints.absorb_descendant(item);

            let Some(child_ref) = item_ref(item) else {
                continue;
            };
            let is_direct = item
                .pointer("/properties/parent/id")
                .and_then(|v| v.as_str())
                .map(|parent_id| parent_id.eq_ignore_ascii_case(id))
                .unwrap_or(false);
            if is_direct {
                children.push(child_ref);
            } else {
                linked.push(child_ref);
            }
        }
        Ok((children, linked))
    }

    async fn list_scope(
        &self,
        id: &str,
        segment: &str,
        warnings: &mut Vec<Diagnostic>,
    ) -> Result<Vec<ResourceRef>> {
        let path = format!("{}/{}", id, segment);
        let items = match self.router.get(&path, CacheMode::UseCache).await {
            Ok(payload) => payload_items(&payload),
            Err(e) if e.is_recoverable() => {
                tracing::warn!("children listing failed for {}: {}", path, e);
                warnings.push(Diagnostic::new(id, segment, &e));
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut refs = Vec::new();
        for item in &items {
            if let Some(child_id) = item.get("id").and_then(|v| v.as_str()) {
                self.hints.record_body(child_id, item.clone());
            }
            if let Some(child_ref) = item_ref(item) {
                refs.push(child_ref);
            }
        }
        Ok(refs)
    }

    async fn fetch_iam(
        &self,
        id: &str,
        suffixes: &[(IamField, &str)],
        warnings: &mut Vec<Diagnostic>,
    ) -> Result<IamAspect> {
        let mut aspect = IamAspect::default();
        for (field, suffix) in suffixes {
            let refs = self.fetch_aspect_list(id, suffix, warnings).await?;
            match field {
                IamField::RoleDefinitions => aspect.role_definitions = refs,
                IamField::RoleAssignments => aspect.role_assignments = refs,
            }
        }
        Ok(aspect)
    }

    async fn fetch_policy(
        &self,
        id: &str,
        suffixes: &[(PolicyField, &str)],
        warnings: &mut Vec<Diagnostic>,
    ) -> Result<PolicyAspect> {
        let mut aspect = PolicyAspect::default();
        for (field, suffix) in suffixes {
            let refs = self.fetch_aspect_list(id, suffix, warnings).await?;
            match field {
                PolicyField::Definitions => aspect.policy_definitions = refs,
                PolicyField::SetDefinitions => aspect.policy_set_definitions = refs,
                PolicyField::Assignments => aspect.policy_assignments = refs,
            }
        }
        Ok(aspect)
    }

    /// One aspect sub-query. Failures are recovered: the aspect list stays
    /// empty and a warning diagnostic is recorded.
    async fn fetch_aspect_list(
        &self,
        id: &str,
        suffix: &str,
        warnings: &mut Vec<Diagnostic>,
    ) -> Result<Vec<ResourceRef>> {
        let path = format!("{}/{}", id, suffix);
        match self.router.get(&path, CacheMode::UseCache).await {
            Ok(payload) => Ok(payload_items(&payload)
                .iter()
                .filter_map(item_ref)
                .collect()),
            Err(e) if e.is_recoverable() => {
                let operation = identifier::short_name(identifier::strip_query(suffix));
                tracing::warn!("{} listing failed for {}: {}", operation, id, e);
                warnings.push(Diagnostic::new(id, operation, &e));
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Materialize the ancestor chain, root first. Each step resolves the
    /// parent of the previous one; relationship data with a cycle would
    /// otherwise loop forever.
    async fn walk_parents(
        &self,
        id: &str,
        immediate: Option<ResourceRef>,
    ) -> Result<Vec<ResourceRef>> {
        let mut chain: Vec<ResourceRef> = Vec::new();
        let mut current = immediate;
        while let Some(parent) = current {
            if chain.len() >= MAX_PARENT_DEPTH {
                return Err(DiscoveryError::CycleDetected(id.to_string()));
            }
            current = self
                .parents
                .resolve(&parent.id, &parent.resource_type, None)
                .await?;
            chain.push(parent);
        }
        chain.reverse();
        Ok(chain)
    }
}

/// View a payload as a list of records; a singleton is a one-item list
fn payload_items(payload: &Payload) -> Vec<Value> {
    match payload {
        Payload::List(items) => items.clone(),
        Payload::Single(value) => vec![value.clone()],
    }
}

/// Convert a listing item into a `{id, type}` reference. The type is
/// derived from the id when possible; descendants listings carry type
/// strings in shapes the derivation rules do not always mirror.
fn item_ref(item: &Value) -> Option<ResourceRef> {
    let id = item.get("id").and_then(|v| v.as_str())?;
    let resource_type = identifier::derive_type(id).ok().or_else(|| {
        item.get("type")
            .and_then(|v| v.as_str())
            .map(ResourceType::new)
    })?;
    Some(ResourceRef::new(id, resource_type))
}
