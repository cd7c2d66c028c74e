// libs/waitlist-cell/src/services/token_cache.rs
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::error::WaitlistError;

/// Tokens this close to expiry are refreshed before use.
const REFRESH_MARGIN_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn is_fresh_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Bearer token for the messaging transport, owned by whoever needs it
/// rather than held in process-wide state.
pub struct TokenCache {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_margin: Duration,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(token_url: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            client: Client::new(),
            token_url: token_url.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            refresh_margin: Duration::seconds(REFRESH_MARGIN_SECONDS),
            cached: RwLock::new(None),
        }
    }

    pub fn from_config(config: &AppConfig) -> Option<Self> {
        config.is_notifier_auth_configured().then(|| {
            Self::new(
                &config.notifier_token_url,
                &config.notifier_client_id,
                &config.notifier_client_secret,
            )
        })
    }

    /// Seeds the cache, e.g. with a token obtained out of band.
    pub fn with_token(self, token: CachedToken) -> Self {
        Self {
            cached: RwLock::new(Some(token)),
            ..self
        }
    }

    pub async fn current(&self) -> Option<CachedToken> {
        self.cached.read().await.clone()
    }

    /// Cached token if still fresh, otherwise a newly fetched one.
    pub async fn token(&self) -> Result<String, WaitlistError> {
        if let Some(cached) = self.cached.read().await.as_ref() {
            if cached.is_fresh_at(Utc::now(), self.refresh_margin) {
                return Ok(cached.token.clone());
            }
        }

        let mut slot = self.cached.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(cached) = slot.as_ref() {
            if cached.is_fresh_at(Utc::now(), self.refresh_margin) {
                return Ok(cached.token.clone());
            }
        }

        let fresh = self.fetch().await?;
        let token = fresh.token.clone();
        *slot = Some(fresh);
        Ok(token)
    }

    /// Unconditionally fetches a new token and replaces the cached one.
    pub async fn refresh(&self) -> Result<String, WaitlistError> {
        let mut slot = self.cached.write().await;
        let fresh = self.fetch().await?;
        let token = fresh.token.clone();
        *slot = Some(fresh);
        Ok(token)
    }

    pub async fn invalidate(&self) {
        debug!("Invalidating cached notifier token");
        *self.cached.write().await = None;
    }

    async fn fetch(&self) -> Result<CachedToken, WaitlistError> {
        debug!("Requesting notifier token from {}", self.token_url);

        let response = self
            .client
            .post(&self.token_url)
            .json(&json!({
                "grant_type": "client_credentials",
                "client_id": self.client_id,
                "client_secret": self.client_secret,
            }))
            .send()
            .await
            .map_err(|e| WaitlistError::Notifier(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Notifier token request failed: {} - {}", status, body);
            return Err(WaitlistError::Notifier(format!(
                "token endpoint returned HTTP {}",
                status
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| WaitlistError::Notifier(format!("invalid token response: {}", e)))?;

        info!("Obtained notifier token valid for {}s", parsed.expires_in);

        Ok(CachedToken {
            token: parsed.access_token,
            expires_at: Utc::now() + Duration::seconds(parsed.expires_in),
        })
    }
}
