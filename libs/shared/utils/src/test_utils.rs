use std::sync::Arc;

use shared_config::{AppConfig, StoreBackend, DEFAULT_COUNTRY_CODE, DEFAULT_OFFER_TIMEOUT_MINUTES};

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_service_role_key: String,
    pub webhook_secret: String,
    pub cron_secret: String,
    pub notifier_webhook_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_role_key: "test-service-role-key".to_string(),
            webhook_secret: "test-webhook-secret".to_string(),
            cron_secret: "test-cron-secret".to_string(),
            notifier_webhook_url: "http://localhost:5678/webhook/waitlist-offer".to_string(),
        }
    }
}

impl TestConfig {
    /// Points both the store and the notifier at one mock server.
    pub fn with_mock_server(uri: &str) -> Self {
        Self {
            supabase_url: uri.to_string(),
            notifier_webhook_url: format!("{}/webhook/waitlist-offer", uri),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_role_key: self.supabase_service_role_key.clone(),
            webhook_secret: self.webhook_secret.clone(),
            cron_secret: self.cron_secret.clone(),
            notifier_webhook_url: self.notifier_webhook_url.clone(),
            notifier_token_url: String::new(),
            notifier_client_id: String::new(),
            notifier_client_secret: String::new(),
            offer_timeout_minutes: DEFAULT_OFFER_TIMEOUT_MINUTES,
            default_country_code: DEFAULT_COUNTRY_CODE.to_string(),
            slot_utc_offset_minutes: 0,
            store_backend: StoreBackend::Memory,
            port: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}
