//! Azure Authentication
//!
//! Acquires management-plane access tokens through the OAuth2
//! client-credentials flow, with expiry-aware caching.

use crate::error::{DiscoveryError, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Scope requested for management-plane tokens
pub const DEFAULT_SCOPE: &str = "https://management.azure.com/.default";

/// Default login endpoint; tests point this at a mock server
pub const DEFAULT_LOGIN_BASE: &str = "https://login.microsoftonline.com";

/// Token expiry buffer - refresh tokens this much before they actually expire
/// This prevents using tokens that are about to expire during a request
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if the response does not carry one
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Azure credentials holder with token caching
#[derive(Clone)]
pub struct AzureCredentials {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    login_base: String,
    client: reqwest::Client,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    /// Check if this cached token is still valid
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl AzureCredentials {
    /// Create credentials for a service principal
    pub fn new(tenant_id: &str, client_id: &str, client_secret: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("armscope/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            login_base: DEFAULT_LOGIN_BASE.to_string(),
            client,
            token_cache: Arc::new(RwLock::new(None)),
        })
    }

    /// Create credentials from the standard environment variables
    /// (`AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET`)
    pub fn from_env() -> Result<Self> {
        let tenant = std::env::var("AZURE_TENANT_ID").map_err(|_| {
            DiscoveryError::AuthenticationFailed("AZURE_TENANT_ID is not set".to_string())
        })?;
        let client_id = std::env::var("AZURE_CLIENT_ID").map_err(|_| {
            DiscoveryError::AuthenticationFailed("AZURE_CLIENT_ID is not set".to_string())
        })?;
        let secret = std::env::var("AZURE_CLIENT_SECRET").map_err(|_| {
            DiscoveryError::AuthenticationFailed("AZURE_CLIENT_SECRET is not set".to_string())
        })?;

        Self::new(&tenant, &client_id, &secret)
    }

    /// Override the login endpoint (test injection)
    pub fn with_login_base(mut self, base: &str) -> Self {
        self.login_base = base.trim_end_matches('/').to_string();
        self
    }

    /// Get an access token for API calls
    /// Checks token expiry before returning a cached token
    pub async fn get_token(&self) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_base, self.tenant_id
        );
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", DEFAULT_SCOPE),
        ];

        let response = self.client.post(&url).form(&params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DiscoveryError::AuthenticationFailed(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let payload: Value = serde_json::from_str(&body)?;
        let token = payload
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                DiscoveryError::AuthenticationFailed(
                    "token response carried no access_token".to_string(),
                )
            })?
            .to_string();

        let ttl = payload
            .get("expires_in")
            .and_then(|v| v.as_u64())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_TTL);
        let expires_at = Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER);

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            ttl.saturating_sub(TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token)
    }

    /// Force refresh the token
    pub async fn refresh_token(&self) -> Result<String> {
        {
            let mut cache = self.token_cache.write().await;
            *cache = None;
        }

        self.get_token().await
    }
}
