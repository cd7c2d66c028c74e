use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_models::error::AppError;

type HmacSha256 = Hmac<Sha256>;

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";
pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

const COMPARE_KEY: &[u8] = b"waitlist-shared-secret";

/// Constant-time comparison of a presented secret against the configured one.
/// An empty configured secret never matches.
pub fn secrets_match(presented: &str, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }

    let tag = |value: &str| {
        HmacSha256::new_from_slice(COMPARE_KEY).map(|mut mac| {
            mac.update(value.as_bytes());
            mac
        })
    };

    let (Ok(expected_mac), Ok(presented_mac)) = (tag(expected), tag(presented)) else {
        return false;
    };

    presented_mac
        .verify_slice(&expected_mac.finalize().into_bytes())
        .is_ok()
}

fn check_header_secret(
    request: &Request<Body>,
    header: &str,
    expected: &str,
) -> Result<(), AppError> {
    if expected.is_empty() {
        warn!("Secret for {} is not configured, rejecting request", header);
        return Err(AppError::Auth("Endpoint secret is not configured".to_string()));
    }

    let presented = request
        .headers()
        .get(header)
        .ok_or_else(|| AppError::Auth(format!("Missing {} header", header)))?
        .to_str()
        .map_err(|_| AppError::Auth(format!("Invalid {} header format", header)))?;

    if !secrets_match(presented, expected) {
        debug!("Shared secret mismatch on {}", header);
        return Err(AppError::Auth("Invalid secret".to_string()));
    }

    Ok(())
}

/// Guards the dispatch, reply webhooks and manager routes.
pub async fn webhook_secret_middleware(
    State(config): State<Arc<AppConfig>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    check_header_secret(&request, WEBHOOK_SECRET_HEADER, &config.webhook_secret)?;
    Ok(next.run(request).await)
}

/// Guards the expiration sweep trigger.
pub async fn cron_secret_middleware(
    State(config): State<Arc<AppConfig>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    check_header_secret(&request, CRON_SECRET_HEADER, &config.cron_secret)?;
    Ok(next.run(request).await)
}

/// Guards the auto-offer sweep trigger, which schedulers call with
/// `Authorization: Bearer <CRON_SECRET>`.
pub async fn cron_bearer_middleware(
    State(config): State<Arc<AppConfig>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.ok_or_else(|| AppError::Auth("Missing bearer token".to_string()))?;

    if !secrets_match(bearer.token(), &config.cron_secret) {
        debug!("Bearer token mismatch on cron trigger");
        return Err(AppError::Auth("Invalid bearer token".to_string()));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_secret() {
        assert!(secrets_match("top-secret", "top-secret"));
    }

    #[test]
    fn test_mismatched_secret() {
        assert!(!secrets_match("top-secret ", "top-secret"));
        assert!(!secrets_match("", "top-secret"));
    }

    #[test]
    fn test_empty_expected_never_matches() {
        assert!(!secrets_match("", ""));
        assert!(!secrets_match("anything", ""));
    }
}
