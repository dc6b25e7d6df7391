//! HTTP client for the LLM text-generation endpoint
//!
//! One POST per call, authenticated with a bearer from the shared
//! [`CredentialCache`]. A 401 drops the cached token and fails the call; the
//! next call fetches a fresh one. There is no retry loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tracing::{debug, error, info};

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::TextGenerator;
use super::credentials::CredentialCache;
use super::types::{GenerationRequest, extract_content};

/// LLM client
#[derive(Clone)]
pub struct LlmClient {
    http_client: HttpClient,
    config: LlmConfig,
    endpoint: String,
    credentials: Arc<CredentialCache>,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.config.model)
            .finish()
    }
}

/// Builder for creating an LlmClient
#[derive(Default)]
pub struct LlmClientBuilder {
    config: Option<LlmConfig>,
    base_url: Option<String>,
    credentials: Option<Arc<CredentialCache>>,
    timeout_secs: Option<u64>,
}

impl LlmClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override `llm.base_url`
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Share an existing credential cache instead of creating one
    pub fn credentials(mut self, credentials: Arc<CredentialCache>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn build(self) -> Result<LlmClient> {
        let config = self.config.unwrap_or_default();
        let base_url = self
            .base_url
            .or_else(|| config.base_url.clone())
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| Error::ConfigError("llm.base_url is not set".to_string()))?;
        let timeout_secs = self.timeout_secs.unwrap_or(config.timeout_secs);

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        let credentials = match self.credentials {
            Some(credentials) => credentials,
            None => Arc::new(CredentialCache::new(config.token.clone(), timeout_secs)?),
        };

        Ok(LlmClient {
            http_client,
            endpoint: format!("{}/responses", base_url.trim_end_matches('/')),
            config,
            credentials,
        })
    }
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        LlmClientBuilder::new().config(config).build()
    }

    pub fn builder() -> LlmClientBuilder {
        LlmClientBuilder::new()
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn credentials(&self) -> &Arc<CredentialCache> {
        &self.credentials
    }

    async fn send_request(&self, request: &GenerationRequest) -> Result<String> {
        let token = self.credentials.get().await?;
        debug!(stage = "token_acquired", "Acquired LLM bearer token");

        let mut builder = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(request);
        for (header, value) in [
            ("x-project-id", &self.config.project_id),
            ("x-user-id", &self.config.user_id),
            ("x-asset-id", &self.config.asset_id),
        ] {
            if let Some(value) = value {
                builder = builder.header(header, value);
            }
        }

        info!(stage = "request_sent", model = %request.model, "Sending analysis request");
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            return self.handle_error_response(status, response).await;
        }

        let body: serde_json::Value = response.json().await?;
        extract_content(&body).ok_or_else(|| {
            Error::UpstreamRequest("response carried no generated content".to_string())
        })
    }

    async fn handle_error_response<T>(
        &self,
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> Result<T> {
        let body = response.text().await.unwrap_or_default();
        error!(status = status.as_u16(), body = %body, "LLM endpoint returned an error");

        match status.as_u16() {
            401 => {
                self.credentials.invalidate().await;
                Err(Error::UpstreamAuth(
                    "token rejected by the LLM endpoint".to_string(),
                ))
            }
            403 => Err(Error::UpstreamAuth(format!("Forbidden: {}", body))),
            400 => Err(Error::UpstreamRequest(format!("Bad request: {}", body))),
            500..=599 => Err(Error::UpstreamRequest(format!(
                "Server error ({}): {}",
                status, body
            ))),
            _ => Err(Error::UpstreamRequest(format!(
                "HTTP error {}: {}",
                status, body
            ))),
        }
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        let request = GenerationRequest::new(&self.config.model, system, user);
        self.send_request(&request).await
    }
}
