use std::env;
use tracing::warn;

pub const DEFAULT_OFFER_TIMEOUT_MINUTES: i64 = 30;
pub const DEFAULT_COUNTRY_CODE: &str = "55";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_role_key: String,
    pub webhook_secret: String,
    pub cron_secret: String,
    pub notifier_webhook_url: String,
    pub notifier_token_url: String,
    pub notifier_client_id: String,
    pub notifier_client_secret: String,
    pub offer_timeout_minutes: i64,
    pub default_country_code: String,
    pub slot_utc_offset_minutes: i32,
    pub store_backend: StoreBackend,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let supabase_url = required("SUPABASE_URL");
        let supabase_service_role_key = required("SUPABASE_SERVICE_ROLE_KEY");

        let store_backend = match env::var("WAITLIST_STORE").ok().as_deref() {
            Some("memory") => StoreBackend::Memory,
            Some("supabase") => StoreBackend::Supabase,
            other => {
                if let Some(value) = other {
                    warn!("Unknown WAITLIST_STORE '{}', choosing from Supabase settings", value);
                }
                if supabase_url.is_empty() || supabase_service_role_key.is_empty() {
                    warn!("Supabase not configured, falling back to in-memory waitlist store");
                    StoreBackend::Memory
                } else {
                    StoreBackend::Supabase
                }
            }
        };

        let config = Self {
            supabase_url,
            supabase_service_role_key,
            webhook_secret: required("WAITLIST_WEBHOOK_SECRET"),
            cron_secret: required("CRON_SECRET"),
            notifier_webhook_url: required("NOTIFIER_WEBHOOK_URL"),
            notifier_token_url: env::var("NOTIFIER_TOKEN_URL").unwrap_or_default(),
            notifier_client_id: env::var("NOTIFIER_CLIENT_ID").unwrap_or_default(),
            notifier_client_secret: env::var("NOTIFIER_CLIENT_SECRET").unwrap_or_default(),
            offer_timeout_minutes: parsed("OFFER_TIMEOUT_MINUTES", DEFAULT_OFFER_TIMEOUT_MINUTES),
            default_country_code: env::var("DEFAULT_COUNTRY_CODE")
                .unwrap_or_else(|_| DEFAULT_COUNTRY_CODE.to_string()),
            slot_utc_offset_minutes: parsed("SLOT_UTC_OFFSET_MINUTES", 0),
            store_backend,
            port: parsed("PORT", 3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        self.is_supabase_configured()
            && !self.webhook_secret.is_empty()
            && !self.cron_secret.is_empty()
            && !self.notifier_webhook_url.is_empty()
    }

    pub fn is_supabase_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_service_role_key.is_empty()
    }

    /// Client-credentials auth for the messaging transport is optional.
    pub fn is_notifier_auth_configured(&self) -> bool {
        !self.notifier_token_url.is_empty()
            && !self.notifier_client_id.is_empty()
            && !self.notifier_client_secret.is_empty()
    }
}

fn required(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", key);
        String::new()
    })
}

fn parsed<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
