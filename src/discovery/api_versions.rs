//! API version registry
//!
//! Resolves `providerNamespace/resourceType` to an API version string with
//! `stable` and `latest` release channels. Populated lazily by one bulk
//! provider-listing call per tenant; concurrent resolvers share the
//! bootstrap through a single-flight cell.

use super::identifier::ResourceType;
use super::options::Release;
use crate::azure::Transport;
use crate::error::{DiscoveryError, Result};
use dashmap::DashMap;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::OnceLock;
use tokio::sync::OnceCell;

/// Pinned version for the provider bootstrap listing itself
pub const PROVIDER_BOOTSTRAP_VERSION: &str = "2020-06-01";

fn stable_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("stable version pattern is valid"))
}

/// Per-type API version registry
pub struct ApiVersionRegistry {
    transport: Arc<dyn Transport>,
    /// `"{namespace}/{type} ({release})"` lowercase → version
    versions: DashMap<String, String>,
    bootstrap: OnceCell<()>,
}

impl ApiVersionRegistry {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            versions: DashMap::new(),
            bootstrap: OnceCell::new(),
        }
    }

    /// Resolve the API version for a resource type on the given release
    /// channel, bootstrapping the registry on first miss.
    pub async fn resolve(&self, resource_type: &ResourceType, release: Release) -> Result<String> {
        let key = Self::key(resource_type, release);
        if let Some(version) = self.versions.get(&key) {
            return Ok(version.value().clone());
        }

        self.bootstrap
            .get_or_try_init(|| self.populate())
            .await?;

        self.versions
            .get(&key)
            .map(|version| version.value().clone())
            .ok_or_else(|| DiscoveryError::UnknownResourceType(resource_type.to_string()))
    }

    /// Number of registered `(type, release)` entries
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    fn key(resource_type: &ResourceType, release: Release) -> String {
        format!("{} ({})", resource_type.as_str(), release.as_str()).to_lowercase()
    }

    async fn populate(&self) -> Result<()> {
        let path = format!(
            "/subscriptions/{}/providers?api-version={}",
            self.transport.default_subscription_id(),
            PROVIDER_BOOTSTRAP_VERSION
        );
        tracing::debug!("populating api version registry via {}", path);

        let response = self.transport.send_request(&path).await?;
        if response.status != 200 {
            tracing::error!("provider listing failed with status {}", response.status);
            return Err(DiscoveryError::ProviderDiscoveryFailed);
        }

        let body: Value = serde_json::from_str(&response.body)?;
        let providers = body
            .get("value")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut registered = 0usize;
        for provider in &providers {
            let Some(namespace) = provider.get("namespace").and_then(|v| v.as_str()) else {
                continue;
            };
            let types = provider
                .get("resourceTypes")
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default();

            for rt in &types {
                let Some(type_name) = rt.get("resourceType").and_then(|v| v.as_str()) else {
                    continue;
                };
                let mut api_versions: Vec<&str> = rt
                    .get("apiVersions")
                    .and_then(|v| v.as_array())
                    .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
                    .unwrap_or_default();
                if api_versions.is_empty() {
                    continue;
                }

                // the API publishes these in sortable form
                api_versions.sort_unstable();
                let Some(&latest) = api_versions.last() else {
                    continue;
                };
                let stable = api_versions
                    .iter()
                    .rev()
                    .find(|v| stable_version_re().is_match(v))
                    .copied()
                    // preview-only types fall back to the newest preview
                    .unwrap_or(latest);

                let full_type = format!("{}/{}", namespace, type_name).to_lowercase();
                self.versions
                    .insert(format!("{} (latest)", full_type), latest.to_string());
                self.versions
                    .insert(format!("{} (stable)", full_type), stable.to_string());
                registered += 1;
            }
        }

        if registered == 0 {
            return Err(DiscoveryError::ProviderDiscoveryFailed);
        }

        tracing::debug!("registered api versions for {} resource types", registered);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::RawResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubTransport {
        body: Value,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn send_request(&self, _path: &str) -> Result<RawResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RawResponse {
                status: 200,
                body: self.body.to_string(),
            })
        }

        fn default_subscription_id(&self) -> &str {
            "00000000-0000-0000-0000-000000000001"
        }
    }

    fn provider_listing() -> Value {
        json!({
            "value": [{
                "namespace": "Microsoft.Management",
                "resourceTypes": [{
                    "resourceType": "managementGroups",
                    "apiVersions": ["2021-04-01", "2023-04-01-preview", "2020-05-01"]
                }]
            }]
        })
    }

    #[tokio::test]
    async fn stable_skips_preview_versions() {
        let transport = Arc::new(StubTransport {
            body: provider_listing(),
            calls: AtomicUsize::new(0),
        });
        let registry = ApiVersionRegistry::new(transport);

        let rt = ResourceType::new("Microsoft.Management/managementGroups");
        assert_eq!(registry.resolve(&rt, Release::Stable).await.unwrap(), "2021-04-01");
        assert_eq!(
            registry.resolve(&rt, Release::Latest).await.unwrap(),
            "2023-04-01-preview"
        );
    }

    #[tokio::test]
    async fn bootstrap_runs_once() {
        let transport = Arc::new(StubTransport {
            body: provider_listing(),
            calls: AtomicUsize::new(0),
        });
        let registry = ApiVersionRegistry::new(transport.clone());

        let rt = ResourceType::new("Microsoft.Management/managementGroups");
        registry.resolve(&rt, Release::Stable).await.unwrap();
        registry.resolve(&rt, Release::Latest).await.unwrap();
        registry.resolve(&rt, Release::Stable).await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lookup_is_case_folded() {
        let transport = Arc::new(StubTransport {
            body: provider_listing(),
            calls: AtomicUsize::new(0),
        });
        let registry = ApiVersionRegistry::new(transport);

        let rt = ResourceType::new("MICROSOFT.MANAGEMENT/MANAGEMENTGROUPS");
        assert_eq!(registry.resolve(&rt, Release::Stable).await.unwrap(), "2021-04-01");
    }

    #[tokio::test]
    async fn empty_listing_is_fatal() {
        let transport = Arc::new(StubTransport {
            body: json!({"value": []}),
            calls: AtomicUsize::new(0),
        });
        let registry = ApiVersionRegistry::new(transport);

        let rt = ResourceType::new("Microsoft.Management/managementGroups");
        assert!(matches!(
            registry.resolve(&rt, Release::Stable).await,
            Err(DiscoveryError::ProviderDiscoveryFailed)
        ));
    }
}
