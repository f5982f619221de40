//! Discovery engine
//!
//! Wires the shared caches, the API version registry, the request router,
//! and the node builder into one handle. All of it is safe to share across
//! tasks; the caches are the only mutable state and they are concurrent
//! maps.

use super::api_versions::ApiVersionRegistry;
use super::builder::{BuiltNode, NodeBuilder};
use super::bulk::{BulkFetcher, BulkResult};
use super::driver::TenantWalker;
use super::node::StateNode;
use super::options::{CacheMode, DiscoveryMode, Release, WalkOptions};
use super::parents::ListingHints;
use super::response_cache::RawResponseCache;
use super::router::RequestRouter;
use super::state_cache::StateCache;
use crate::azure::Transport;
use crate::error::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared discovery engine for one tenant context
pub struct DiscoveryEngine {
    state: Arc<StateCache>,
    responses: Arc<RawResponseCache>,
    versions: Arc<ApiVersionRegistry>,
    hints: Arc<ListingHints>,
    builder: Arc<NodeBuilder>,
    bulk: BulkFetcher,
}

impl DiscoveryEngine {
    /// Create an engine resolving API versions on the stable channel
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_release(transport, Release::default())
    }

    /// Create an engine resolving API versions on the given channel
    pub fn with_release(transport: Arc<dyn Transport>, release: Release) -> Self {
        let versions = Arc::new(ApiVersionRegistry::new(transport.clone()));
        let responses = Arc::new(RawResponseCache::new());
        let router = Arc::new(RequestRouter::new(
            transport,
            versions.clone(),
            responses.clone(),
            release,
        ));
        let state = Arc::new(StateCache::new());
        let hints = Arc::new(ListingHints::new());
        let builder = Arc::new(NodeBuilder::new(router, state.clone(), hints.clone()));
        let bulk = BulkFetcher::new(builder.clone());

        Self {
            state,
            responses,
            versions,
            hints,
            builder,
            bulk,
        }
    }

    /// Build (or serve from cache) the node for one identifier
    pub async fn build(
        &self,
        id: &str,
        cache_mode: CacheMode,
        discovery_mode: DiscoveryMode,
    ) -> Result<BuiltNode> {
        self.builder.build(id, cache_mode, discovery_mode).await
    }

    /// Build a batch of identifiers across the worker pool
    pub async fn from_ids(
        &self,
        ids: &[String],
        throttle_limit: usize,
        cache_mode: CacheMode,
        discovery_mode: DiscoveryMode,
    ) -> BulkResult {
        self.bulk
            .from_ids(ids, throttle_limit, cache_mode, discovery_mode)
            .await
    }

    /// [`from_ids`](Self::from_ids) with a cancellation signal
    pub async fn from_ids_with_cancel(
        &self,
        ids: &[String],
        throttle_limit: usize,
        cache_mode: CacheMode,
        discovery_mode: DiscoveryMode,
        cancel: &CancellationToken,
    ) -> BulkResult {
        self.bulk
            .from_ids_with_cancel(ids, throttle_limit, cache_mode, discovery_mode, cancel)
            .await
    }

    /// Recursive traversal from a root identifier
    pub fn walker(&self, options: WalkOptions) -> TenantWalker<'_> {
        TenantWalker::new(self, options)
    }

    /// Snapshot of every node currently in the state cache
    pub fn show_cache(&self) -> Vec<Arc<StateNode>> {
        self.state.show()
    }

    /// Number of nodes in the state cache
    pub fn cached_node_count(&self) -> usize {
        self.state.len()
    }

    /// Number of cached raw responses
    pub fn cached_response_count(&self) -> usize {
        self.responses.len()
    }

    /// Number of registered `(type, release)` API version entries
    pub fn registered_version_count(&self) -> usize {
        self.versions.len()
    }

    /// Start a new cache generation: drop every state node, raw response,
    /// and harvested hint. The API version registry survives; it is
    /// per-tenant, not per-generation.
    pub fn reset_caches(&self) {
        self.state.clear();
        self.responses.clear();
        self.hints.clear();
    }
}
