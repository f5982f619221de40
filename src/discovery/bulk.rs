//! Bulk fetching
//!
//! Dispatches node builds over a list of identifiers across a bounded
//! worker pool. Per-identifier failures never abort sibling workers; the
//! result is a best-effort union with the failures reported alongside.

use super::builder::{BuiltNode, Diagnostic, NodeBuilder};
use super::identifier;
use super::node::StateNode;
use super::options::{CacheMode, DiscoveryMode};
use crate::error::{DiscoveryError, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Union of built nodes plus the failures collected along the way
#[derive(Default)]
pub struct BulkResult {
    pub nodes: Vec<Arc<StateNode>>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Fans node builds out across a bounded worker pool
pub struct BulkFetcher {
    builder: Arc<NodeBuilder>,
}

impl BulkFetcher {
    pub fn new(builder: Arc<NodeBuilder>) -> Self {
        Self { builder }
    }

    /// Build every identifier in `ids`.
    ///
    /// `throttle_limit` selects the dispatch mode: `0` materializes
    /// directly from previously harvested listing bodies (no per-id
    /// re-fetch), `1` runs serially, anything larger runs that many
    /// concurrent workers. A batch that collapses to a single id after
    /// dedup is demoted to serial.
    pub async fn from_ids(
        &self,
        ids: &[String],
        throttle_limit: usize,
        cache_mode: CacheMode,
        discovery_mode: DiscoveryMode,
    ) -> BulkResult {
        self.from_ids_with_cancel(
            ids,
            throttle_limit,
            cache_mode,
            discovery_mode,
            &CancellationToken::new(),
        )
        .await
    }

    /// [`from_ids`](Self::from_ids) with a cancellation signal: pending
    /// dispatches are aborted, in-flight builds run to completion, and
    /// partial results stay cached.
    pub async fn from_ids_with_cancel(
        &self,
        ids: &[String],
        throttle_limit: usize,
        cache_mode: CacheMode,
        discovery_mode: DiscoveryMode,
        cancel: &CancellationToken,
    ) -> BulkResult {
        let unique = dedup_ids(ids);
        let mut result = BulkResult::default();
        if unique.is_empty() {
            return result;
        }

        // worker-pool overhead is wasted on a single id
        let throttle = if unique.len() == 1 {
            throttle_limit.min(1)
        } else {
            throttle_limit
        };

        match throttle {
            0 => self.run_direct(unique, discovery_mode, cancel, &mut result).await,
            1 => {
                self.run_serial(unique, cache_mode, discovery_mode, cancel, &mut result)
                    .await
            }
            workers => {
                self.run_parallel(unique, workers, cache_mode, discovery_mode, cancel, &mut result)
                    .await
            }
        }

        result
    }

    async fn run_direct(
        &self,
        ids: Vec<String>,
        discovery_mode: DiscoveryMode,
        cancel: &CancellationToken,
        result: &mut BulkResult,
    ) {
        for id in ids {
            if cancel.is_cancelled() {
                result
                    .diagnostics
                    .push(Diagnostic::new(&id, "build", DiscoveryError::Cancelled));
                continue;
            }
            let built = match self.builder.listing_body(&id) {
                Some(body) => {
                    self.builder
                        .materialize(&id, (*body).clone(), discovery_mode)
                        .await
                }
                None => {
                    tracing::debug!("no listing body for {}, falling back to a cached build", id);
                    self.builder
                        .build(&id, CacheMode::UseCache, discovery_mode)
                        .await
                }
            };
            absorb(&id, built, result);
        }
    }

    async fn run_serial(
        &self,
        ids: Vec<String>,
        cache_mode: CacheMode,
        discovery_mode: DiscoveryMode,
        cancel: &CancellationToken,
        result: &mut BulkResult,
    ) {
        for id in ids {
            if cancel.is_cancelled() {
                result
                    .diagnostics
                    .push(Diagnostic::new(&id, "build", DiscoveryError::Cancelled));
                continue;
            }
            let built = self.builder.build(&id, cache_mode, discovery_mode).await;
            absorb(&id, built, result);
        }
    }

    async fn run_parallel(
        &self,
        ids: Vec<String>,
        workers: usize,
        cache_mode: CacheMode,
        discovery_mode: DiscoveryMode,
        cancel: &CancellationToken,
        result: &mut BulkResult,
    ) {
        let mut join_set = JoinSet::new();

        for id in ids {
            if cancel.is_cancelled() {
                result
                    .diagnostics
                    .push(Diagnostic::new(&id, "build", DiscoveryError::Cancelled));
                continue;
            }

            let builder = self.builder.clone();
            join_set.spawn(async move {
                let built = builder.build(&id, cache_mode, discovery_mode).await;
                (id, built)
            });

            // gate dispatch on the pool size
            if join_set.len() >= workers {
                if let Some(joined) = join_set.join_next().await {
                    absorb_joined(joined, result);
                }
            }
        }

        while let Some(joined) = join_set.join_next().await {
            absorb_joined(joined, result);
        }
    }
}

fn absorb(id: &str, built: Result<BuiltNode>, result: &mut BulkResult) {
    match built {
        Ok(built) => {
            result.nodes.push(built.node);
            result.diagnostics.extend(built.warnings);
        }
        Err(e) => {
            tracing::warn!("build failed for {}: {}", id, e);
            result.diagnostics.push(Diagnostic::new(id, "build", e));
        }
    }
}

fn absorb_joined(
    joined: std::result::Result<(String, Result<BuiltNode>), tokio::task::JoinError>,
    result: &mut BulkResult,
) {
    match joined {
        Ok((id, built)) => absorb(&id, built, result),
        Err(join_error) => {
            tracing::error!("worker task failed: {}", join_error);
            result
                .diagnostics
                .push(Diagnostic::new("", "join", join_error));
        }
    }
}

/// Case-insensitive dedup preserving first spellings; empties dropped
fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for id in ids {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(identifier::cache_key(trimmed)) {
            unique.push(trimmed.to_string());
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_drops_empties_and_case_duplicates() {
        let ids = vec![
            "/subscriptions/A".to_string(),
            "".to_string(),
            "  ".to_string(),
            "/subscriptions/a".to_string(),
            "/subscriptions/b".to_string(),
        ];
        let unique = dedup_ids(&ids);
        assert_eq!(unique, vec!["/subscriptions/A", "/subscriptions/b"]);
    }

    #[test]
    fn dedup_of_empty_input_is_empty() {
        assert!(dedup_ids(&[]).is_empty());
    }
}
