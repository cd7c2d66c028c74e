// libs/waitlist-cell/src/services/notifier.rs
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;

use crate::error::WaitlistError;
use crate::models::NotifierPayload;
use crate::services::token_cache::TokenCache;

/// Outbound side of an offer. Implementations report failures; they never
/// retry.
#[async_trait]
pub trait OfferNotifier: Send + Sync {
    async fn send_offer(&self, payload: &NotifierPayload) -> Result<(), WaitlistError>;
}

/// Posts offers to the workflow engine that turns them into WhatsApp messages.
pub struct WebhookNotifier {
    client: Client,
    webhook_url: String,
    tokens: Option<Arc<TokenCache>>,
}

impl WebhookNotifier {
    pub fn new(webhook_url: &str, tokens: Option<Arc<TokenCache>>) -> Self {
        Self {
            client: Client::new(),
            webhook_url: webhook_url.to_string(),
            tokens,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let tokens = TokenCache::from_config(config).map(Arc::new);
        if tokens.is_none() {
            debug!("Notifier token endpoint not configured, sending offers without bearer token");
        }
        Self::new(&config.notifier_webhook_url, tokens)
    }
}

#[async_trait]
impl OfferNotifier for WebhookNotifier {
    async fn send_offer(&self, payload: &NotifierPayload) -> Result<(), WaitlistError> {
        if self.webhook_url.is_empty() {
            warn!("Notifier webhook URL not configured");
            return Err(WaitlistError::Notifier("notifier webhook is not configured".to_string()));
        }

        let mut request = self.client.post(&self.webhook_url).json(payload);
        if let Some(tokens) = &self.tokens {
            request = request.bearer_auth(tokens.token().await?);
        }

        debug!("Posting offer for patient {} to {}", payload.patient_id, self.webhook_url);

        let response = request
            .send()
            .await
            .map_err(|e| WaitlistError::Notifier(format!("transport unreachable: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            if let Some(tokens) = &self.tokens {
                tokens.invalidate().await;
            }
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Notifier rejected offer: {} - {}", status, body);
            return Err(WaitlistError::Notifier(format!("transport returned HTTP {}", status)));
        }

        info!(
            "Offer for waitlist {} delivered to transport for patient {}",
            payload.waitlist_id, payload.patient_id
        );
        Ok(())
    }
}
