//! Bearer credential cache for the LLM endpoint
//!
//! A token is fetched from the token endpoint on first use and reused until
//! `refresh_margin_secs` before its stated expiry. Refreshes take the write
//! lock, so concurrent callers wait for one fetch instead of racing.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client as HttpClient;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::{TOKEN_AUTH_ENV, TokenConfig};
use crate::error::{Error, Result};

use super::types::{TokenRequest, TokenResponse};

/// Upper bound on a token lifetime (one year)
const MAX_LIFETIME_SECS: u64 = 365 * 24 * 3600;

/// A token together with the instant it stops being usable
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Build a cache entry, shortening the lifetime by the refresh margin
    pub fn issued_at(
        value: String,
        lifetime_secs: u64,
        margin_secs: u64,
        now: DateTime<Utc>,
    ) -> Self {
        let usable = lifetime_secs
            .saturating_sub(margin_secs)
            .min(MAX_LIFETIME_SECS) as i64;
        Self {
            value,
            expires_at: now + chrono::Duration::seconds(usable),
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Process-wide token cache, shared by reference with the LLM client
pub struct CredentialCache {
    http_client: HttpClient,
    config: TokenConfig,
    slot: RwLock<Option<CachedToken>>,
}

impl std::fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCache")
            .field("url", &self.config.url)
            .field("environment", &self.config.environment)
            .finish()
    }
}

impl CredentialCache {
    pub fn new(config: TokenConfig, timeout_secs: u64) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            http_client,
            config,
            slot: RwLock::new(None),
        })
    }

    /// Cached token if one is still valid at `now`
    pub async fn cached_at(&self, now: DateTime<Utc>) -> Option<String> {
        self.slot
            .read()
            .await
            .as_ref()
            .filter(|t| t.is_valid_at(now))
            .map(|t| t.value.clone())
    }

    /// Seed the cache directly
    pub async fn store(&self, token: CachedToken) {
        *self.slot.write().await = Some(token);
    }

    /// Drop the cached token so the next call fetches a fresh one
    pub async fn invalidate(&self) {
        if self.slot.write().await.take().is_some() {
            debug!("Invalidated cached LLM token");
        }
    }

    /// Return a valid token, fetching one if the cache is empty or stale
    pub async fn get(&self) -> Result<String> {
        let now = Utc::now();
        if let Some(token) = self.cached_at(now).await {
            return Ok(token);
        }

        let mut slot = self.slot.write().await;
        if let Some(token) = slot.as_ref().filter(|t| t.is_valid_at(now)) {
            return Ok(token.value.clone());
        }

        let fetched = self.fetch(now).await?;
        let value = fetched.value.clone();
        debug!(expires_at = %fetched.expires_at, "Cached new LLM token");
        *slot = Some(fetched);
        Ok(value)
    }

    async fn fetch(&self, now: DateTime<Utc>) -> Result<CachedToken> {
        let url = self
            .config
            .url
            .as_deref()
            .ok_or_else(|| Error::UpstreamAuth("llm.token.url is not set".to_string()))?;
        let auth = self
            .config
            .resolved_auth()
            .map_err(|e| Error::UpstreamAuth(e.to_string()))?
            .ok_or_else(|| Error::UpstreamAuth(format!("{} is not set", TOKEN_AUTH_ENV)))?;

        let request = TokenRequest {
            flow_id: self.config.flow_id.clone(),
            environment: self.config.environment.clone(),
            user_id: self.config.user_id.clone(),
        };

        let response = self
            .http_client
            .post(url)
            .bearer_auth(auth)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Token endpoint rejected request");
            return Err(match status.as_u16() {
                401 | 403 => Error::UpstreamAuth(format!("token endpoint returned {}", status)),
                _ => Error::UpstreamRequest(format!("token endpoint returned {}: {}", status, body)),
            });
        }

        let parsed: TokenResponse = response.json().await?;
        let lifetime = parsed
            .expires_in
            .unwrap_or(self.config.default_lifetime_secs);
        let value = parsed
            .into_token()
            .ok_or_else(|| Error::UpstreamAuth("token endpoint returned no token".to_string()))?;

        Ok(CachedToken::issued_at(
            value,
            lifetime,
            self.config.refresh_margin_secs,
            now,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> CredentialCache {
        CredentialCache::new(TokenConfig::default(), 5).unwrap()
    }

    #[test]
    fn test_expiry_applies_margin() {
        let now = Utc::now();
        let token = CachedToken::issued_at("t".into(), 3600, 600, now);
        assert_eq!(token.expires_at, now + chrono::Duration::seconds(3000));
        assert!(token.is_valid_at(now + chrono::Duration::seconds(2999)));
        assert!(!token.is_valid_at(now + chrono::Duration::seconds(3000)));
    }

    #[test]
    fn test_margin_larger_than_lifetime_expires_immediately() {
        let now = Utc::now();
        let token = CachedToken::issued_at("t".into(), 300, 600, now);
        assert!(!token.is_valid_at(now));
    }

    #[tokio::test]
    async fn test_cached_token_reused_until_expiry() {
        let cache = cache();
        let now = Utc::now();
        cache
            .store(CachedToken::issued_at("abc".into(), 3600, 600, now))
            .await;

        assert_eq!(cache.cached_at(now).await.as_deref(), Some("abc"));
        assert_eq!(cache.get().await.unwrap(), "abc");
        assert!(
            cache
                .cached_at(now + chrono::Duration::hours(1))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_invalidate_clears_slot() {
        let cache = cache();
        cache
            .store(CachedToken::issued_at("abc".into(), 3600, 600, Utc::now()))
            .await;
        cache.invalidate().await;
        assert!(cache.cached_at(Utc::now()).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_token_url_is_auth_failure() {
        let err = cache().get().await.unwrap_err();
        assert!(matches!(err, Error::UpstreamAuth(_)));
        assert_eq!(err.code(), "E201");
        assert!(err.is_upstream());
    }
}
