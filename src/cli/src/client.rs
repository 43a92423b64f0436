//! HTTP client for communicating with the Conference Central API server.

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// API response wrapper matching the server's ApiResponse format.
#[derive(Debug, serde::Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[allow(dead_code)]
    pub error_code: Option<String>,
}

/// The caller identity forwarded in the gateway headers.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub user_id: String,
    pub email: String,
}

/// HTTP client for the Conference Central API.
pub struct ApiClient {
    client: Client,
    base_url: String,
    identity: Option<CallerIdentity>,
}

impl ApiClient {
    /// Create a new API client pointing at the given base URL.
    pub fn new(base_url: &str, identity: Option<CallerIdentity>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            identity,
        })
    }

    /// Return the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Attach the identity headers when a caller is configured.
    fn with_identity(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.identity {
            Some(identity) => req
                .header("x-user-id", &identity.user_id)
                .header("x-user-email", &identity.email),
            None => req,
        }
    }

    /// Perform a GET request and deserialize the response data.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .with_identity(self.client.get(&url))
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        Self::unwrap_response(resp, &url).await
    }

    /// Perform a POST request with a JSON body and deserialize the response.
    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .with_identity(self.client.post(&url))
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        Self::unwrap_response(resp, &url).await
    }

    /// Perform a raw GET request and return the full JSON value (for the
    /// health endpoint, which does not use the ApiResponse envelope).
    pub async fn get_raw(&self, path: &str) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    /// Check the status and unwrap the ApiResponse envelope.
    async fn unwrap_response<T: DeserializeOwned>(
        resp: reqwest::Response,
        url: &str,
    ) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        let api_resp: ApiResponse<T> = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))?;

        if api_resp.success {
            api_resp
                .data
                .ok_or_else(|| anyhow::anyhow!("API returned success but no data"))
        } else {
            Err(anyhow::anyhow!(
                "API error: {}",
                api_resp.error.unwrap_or_else(|| "Unknown error".into())
            ))
        }
    }
}
