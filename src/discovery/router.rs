//! Request routing
//!
//! Converts a resource identifier into the correct request URI by inferring
//! its type and attaching the resolved API version, dispatches through the
//! transport, and collapses list and singleton endpoints into one payload
//! shape. The raw-response cache sits directly behind this component.

use super::api_versions::ApiVersionRegistry;
use super::identifier;
use super::options::{CacheMode, Release};
use super::response_cache::RawResponseCache;
use crate::azure::{RawResponse, Transport};
use crate::error::{DiscoveryError, Result};
use serde_json::Value;
use std::sync::Arc;

/// Decoded response payload.
///
/// A JSON object whose only property is a `value` array is a list
/// endpoint's answer; everything else is a single record.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Single(Value),
    List(Vec<Value>),
}

impl Payload {
    pub fn from_value(value: Value) -> Self {
        if let Value::Object(map) = value {
            if map.len() == 1 {
                if let Some(Value::Array(items)) = map.get("value") {
                    return Payload::List(items.clone());
                }
            }
            return Payload::Single(Value::Object(map));
        }
        Payload::Single(value)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Payload::List(_))
    }
}

/// Routes identifier-level requests through the transport and the
/// raw-response cache
pub struct RequestRouter {
    transport: Arc<dyn Transport>,
    versions: Arc<ApiVersionRegistry>,
    cache: Arc<RawResponseCache>,
    release: Release,
}

impl RequestRouter {
    pub fn new(
        transport: Arc<dyn Transport>,
        versions: Arc<ApiVersionRegistry>,
        cache: Arc<RawResponseCache>,
        release: Release,
    ) -> Self {
        Self {
            transport,
            versions,
            cache,
            release,
        }
    }

    /// Fetch the resource(s) named by `id`, attaching the API version
    /// resolved for its type. `id` may already carry a query string.
    pub async fn get(&self, id: &str, cache_mode: CacheMode) -> Result<Arc<Payload>> {
        let resource_type = identifier::derive_type(id)?;
        let version = self.versions.resolve(&resource_type, self.release).await?;
        let path = compose_path(id, &version);
        self.get_path(&path, cache_mode).await
    }

    /// Fetch a fully composed path (query string already attached)
    pub async fn get_path(&self, path: &str, cache_mode: CacheMode) -> Result<Arc<Payload>> {
        let key = path.to_lowercase();

        if cache_mode == CacheMode::UseCache {
            if let Some(hit) = self.cache.get(&key) {
                tracing::trace!("response cache hit: {}", key);
                return Ok(hit);
            }
        }

        let response = self.transport.send_request(path).await?;
        if response.status != 200 {
            return Err(decode_error(&response));
        }

        let value: Value = serde_json::from_str(&response.body)?;
        Ok(self.cache.insert(key, Payload::from_value(value)))
    }
}

/// Compose `id + "?api-version=" + version`, preserving the first `?` and
/// rewriting any later one to `&`
fn compose_path(id: &str, version: &str) -> String {
    let raw = format!("{}?api-version={}", id, version);
    let mut out = String::with_capacity(raw.len());
    let mut seen_query = false;
    for ch in raw.chars() {
        if ch == '?' {
            if seen_query {
                out.push('&');
            } else {
                seen_query = true;
                out.push('?');
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Decode a non-200 body as the ARM `{error:{code,message}}` envelope
fn decode_error(response: &RawResponse) -> DiscoveryError {
    let envelope: Option<Value> = serde_json::from_str(&response.body).ok();
    let error = envelope.as_ref().and_then(|v| v.get("error"));

    let code = error
        .and_then(|e| e.get("code"))
        .and_then(|c| c.as_str())
        .unwrap_or("Unknown")
        .to_string();
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or("request failed without an error envelope")
        .to_string();

    DiscoveryError::ApiCallFailed {
        status: response.status,
        code,
        message,
    }
}
