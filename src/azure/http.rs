//! HTTP utilities for ARM REST API calls

use crate::error::Result;
use reqwest::Client;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        format!(
            "{}... [truncated, {} bytes total]",
            &body[..MAX_LOG_BODY_LENGTH],
            body.len()
        )
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Undecoded response from the management endpoint.
///
/// The status is reported alongside the body rather than turned into an
/// error here; the request router decodes ARM error envelopes itself.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP client wrapper for ARM API calls
#[derive(Clone)]
pub struct ArmHttpClient {
    client: Client,
}

impl ArmHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("armscope/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Make a GET request against the management endpoint
    pub async fn get(&self, url: &str, token: &str) -> Result<RawResponse> {
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).bearer_auth(token).send().await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        if status >= 400 {
            // Only log sanitized/truncated error bodies
            tracing::debug!("API error: {} - {}", status, sanitize_for_log(&body));
        }

        Ok(RawResponse { status, body })
    }

}
