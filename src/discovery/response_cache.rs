//! Raw response cache
//!
//! Thread-safe mapping from fully-qualified request URI (query string
//! included) to the decoded payload it produced. This is the deduplication
//! layer closest to the network: two workers may race the same URI, but
//! every later read is served from here. Error responses are never stored,
//! so a failed fetch is retried by the next caller.

use super::router::Payload;
use dashmap::DashMap;
use std::sync::Arc;

/// Concurrent URI → payload cache; keys are lowercase
#[derive(Default)]
pub struct RawResponseCache {
    entries: DashMap<String, Arc<Payload>>,
}

impl RawResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a normalized URI
    pub fn get(&self, key: &str) -> Option<Arc<Payload>> {
        self.entries.get(&key.to_lowercase()).map(|e| e.value().clone())
    }

    /// Install a payload, returning the stored handle. The newest write
    /// wins so that a cache-bypassing fetch refreshes the entry.
    pub fn insert(&self, key: String, payload: Payload) -> Arc<Payload> {
        let payload = Arc::new(payload);
        self.entries.insert(key.to_lowercase(), payload.clone());
        payload
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached response
    pub fn clear(&self) {
        self.entries.clear();
    }
}
