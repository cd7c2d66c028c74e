// libs/waitlist-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::{
    cron_bearer_middleware, cron_secret_middleware, webhook_secret_middleware,
};

use crate::handlers;
use crate::services::WaitlistEngine;

pub fn waitlist_routes(config: Arc<AppConfig>) -> Router {
    let engine = Arc::new(WaitlistEngine::from_config(&config));
    waitlist_routes_with_engine(config, engine)
}

pub fn waitlist_routes_with_engine(config: Arc<AppConfig>, engine: Arc<WaitlistEngine>) -> Router {
    // Dispatch, patient replies and staff actions share the webhook secret
    let webhook_routes = Router::new()
        .route("/dispatch", post(handlers::dispatch_offer))
        .route("/webhooks/confirm", post(handlers::confirm_webhook))
        .route("/webhooks/decline", post(handlers::decline_webhook))
        .route("/entries/{entry_id}/cancel", post(handlers::cancel_entry))
        .route("/{waitlist_id}/entries", get(handlers::list_entries))
        .layer(middleware::from_fn_with_state(config.clone(), webhook_secret_middleware));

    let expire_routes = Router::new()
        .route("/cron/expire", post(handlers::expire_sweep))
        .layer(middleware::from_fn_with_state(config.clone(), cron_secret_middleware));

    let auto_offer_routes = Router::new()
        .route(
            "/cron/auto-offer",
            get(handlers::auto_offer_sweep).post(handlers::auto_offer_sweep),
        )
        .layer(middleware::from_fn_with_state(config, cron_bearer_middleware));

    Router::new()
        .merge(webhook_routes)
        .merge(expire_routes)
        .merge(auto_offer_routes)
        .with_state(engine)
}
