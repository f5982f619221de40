//! Recursion driver
//!
//! Walks an arbitrary root identifier down through its descendants to a
//! fixed point. The driver is the only component that knows what counts as
//! "interesting" for a traversal; the engine underneath is type-agnostic.

use super::builder::Diagnostic;
use super::engine::DiscoveryEngine;
use super::identifier::{
    self, ResourceType, MANAGEMENT_GROUP_TYPE, RESOURCE_GROUP_TYPE, SUBSCRIPTION_TYPE,
};
use super::node::StateNode;
use super::options::WalkOptions;
use crate::error::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything a traversal discovered, plus the failures along the way
pub struct WalkResult {
    pub nodes: Vec<Arc<StateNode>>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Recursive tenant traversal over a [`DiscoveryEngine`]
pub struct TenantWalker<'a> {
    engine: &'a DiscoveryEngine,
    options: WalkOptions,
}

impl<'a> TenantWalker<'a> {
    pub fn new(engine: &'a DiscoveryEngine, options: WalkOptions) -> Self {
        Self { engine, options }
    }

    /// Walk from `root_id` until a pass yields no new nodes (or immediately
    /// after the root when recursion is off). A failing root build is fatal;
    /// everything below it is best-effort and reported in the diagnostics.
    pub async fn walk(&self, root_id: &str) -> Result<WalkResult> {
        self.walk_with_cancel(root_id, &CancellationToken::new())
            .await
    }

    /// [`walk`](Self::walk) with a cancellation signal checked between
    /// passes and inside the bulk fetcher
    pub async fn walk_with_cancel(
        &self,
        root_id: &str,
        cancel: &CancellationToken,
    ) -> Result<WalkResult> {
        let mode = self.options.discovery_mode();
        let excludes: HashSet<String> = self
            .options
            .exclude_path_ids
            .iter()
            .map(|id| identifier::cache_key(id))
            .collect();

        let root = self
            .engine
            .build(root_id, self.options.cache_mode, mode)
            .await?;
        let mut diagnostics = root.warnings;
        let mut visited = HashSet::new();
        visited.insert(root.node.cache_key());
        let mut nodes = vec![root.node.clone()];
        let mut frontier = vec![root.node];

        while self.options.recurse && !frontier.is_empty() && !cancel.is_cancelled() {
            let mut next_ids = Vec::new();
            for node in &frontier {
                for child in &node.children {
                    if !self.included(&child.resource_type) {
                        continue;
                    }
                    let key = identifier::cache_key(&child.id);
                    if excludes.contains(&key) || visited.contains(&key) {
                        continue;
                    }
                    next_ids.push(child.id.clone());
                }
            }
            if next_ids.is_empty() {
                break;
            }

            tracing::debug!("walking {} identifiers at next depth", next_ids.len());
            let batch = self
                .engine
                .from_ids_with_cancel(
                    &next_ids,
                    self.options.throttle_limit,
                    self.options.cache_mode,
                    mode,
                    cancel,
                )
                .await;
            diagnostics.extend(batch.diagnostics);

            let mut discovered = Vec::new();
            for node in batch.nodes {
                if visited.insert(node.cache_key()) {
                    nodes.push(node.clone());
                    discovered.push(node);
                }
            }
            frontier = discovered;
        }

        Ok(WalkResult { nodes, diagnostics })
    }

    fn included(&self, resource_type: &ResourceType) -> bool {
        if *resource_type == MANAGEMENT_GROUP_TYPE {
            self.options.include_management_groups
        } else if *resource_type == SUBSCRIPTION_TYPE {
            self.options.include_subscriptions
        } else if *resource_type == RESOURCE_GROUP_TYPE {
            self.options.include_resource_groups
        } else {
            self.options.include_resources
        }
    }
}
