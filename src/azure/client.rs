//! ARM Client
//!
//! Main client for the Azure Resource Manager endpoint, combining
//! authentication and HTTP functionality behind the [`Transport`] trait
//! the discovery engine consumes.

use super::auth::AzureCredentials;
use super::http::{ArmHttpClient, RawResponse};
use crate::error::Result;
use async_trait::async_trait;

/// Default management endpoint; tests point this at a mock server
pub const DEFAULT_MANAGEMENT_BASE: &str = "https://management.azure.com";

/// Transport primitive consumed by the discovery engine.
///
/// `path` is absolute (leading `/`) with the query string already attached;
/// the implementation prefixes its management endpoint and authenticates.
/// Discovery is read-only, so the transport exposes nothing but GET.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET and return the undecoded status + body.
    async fn send_request(&self, path: &str) -> Result<RawResponse>;

    /// Subscription id of the authenticated context, used for the one-off
    /// provider bootstrap listing.
    fn default_subscription_id(&self) -> &str;
}

/// Main ARM client
#[derive(Clone)]
pub struct ArmClient {
    pub credentials: AzureCredentials,
    pub http: ArmHttpClient,
    subscription_id: String,
    management_base: String,
}

impl ArmClient {
    /// Create a new ARM client bound to the context's default subscription
    pub fn new(credentials: AzureCredentials, subscription_id: &str) -> Result<Self> {
        let http = ArmHttpClient::new()?;

        Ok(Self {
            credentials,
            http,
            subscription_id: subscription_id.to_string(),
            management_base: DEFAULT_MANAGEMENT_BASE.to_string(),
        })
    }

    /// Override the management endpoint (test injection)
    pub fn with_management_base(mut self, base: &str) -> Self {
        self.management_base = base.trim_end_matches('/').to_string();
        self
    }

    /// Build a full management URL from an absolute resource path
    pub fn management_url(&self, path: &str) -> String {
        format!("{}{}", self.management_base, path)
    }
}

#[async_trait]
impl Transport for ArmClient {
    async fn send_request(&self, path: &str) -> Result<RawResponse> {
        let token = self.credentials.get_token().await?;
        let url = self.management_url(path);
        self.http.get(&url, &token).await
    }

    fn default_subscription_id(&self) -> &str {
        &self.subscription_id
    }
}
