use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use shared_config::AppConfig;
use waitlist_cell::{router::waitlist_routes_with_engine, WaitlistEngine};

pub fn create_router(state: Arc<AppConfig>, engine: Arc<WaitlistEngine>) -> Router {
    Router::new()
        .route("/", get(|| async { "Waitlist Offer Engine is running!" }))
        .nest("/waitlist", waitlist_routes_with_engine(state, engine))
}
