use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::EntryStatus;

#[derive(Error, Debug)]
pub enum WaitlistError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Waitlist not found: {0}")]
    WaitlistNotFound(Uuid),

    #[error("Waitlist {0} is no longer active")]
    WaitlistInactive(Uuid),

    #[error("Waitlist entry not found")]
    EntryNotFound,

    #[error("No waiting patients in waitlist")]
    EmptyQueue,

    #[error("Waitlist already has an offer awaiting reply (entry {0})")]
    AlreadyBusy(Uuid),

    #[error("Monthly message quota exceeded")]
    QuotaExceeded,

    #[error("Offer has expired")]
    Expired,

    #[error("Offer was already declined")]
    AlreadyDeclined,

    #[error("Waitlist entry was canceled")]
    Canceled,

    #[error("Slot was already taken by another patient")]
    SlotTaken,

    #[error("Entry changed concurrently (now {0}), retry the request")]
    ConcurrentUpdate(EntryStatus),

    #[error("Notifier error: {0}")]
    Notifier(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl WaitlistError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WaitlistError::Validation(_) => StatusCode::BAD_REQUEST,
            WaitlistError::WaitlistNotFound(_) => StatusCode::NOT_FOUND,
            WaitlistError::WaitlistInactive(_) => StatusCode::CONFLICT,
            WaitlistError::EntryNotFound => StatusCode::NOT_FOUND,
            WaitlistError::EmptyQueue => StatusCode::NOT_FOUND,
            WaitlistError::AlreadyBusy(_) => StatusCode::CONFLICT,
            WaitlistError::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            WaitlistError::Expired => StatusCode::GONE,
            WaitlistError::AlreadyDeclined => StatusCode::BAD_REQUEST,
            WaitlistError::Canceled => StatusCode::GONE,
            WaitlistError::SlotTaken => StatusCode::CONFLICT,
            WaitlistError::ConcurrentUpdate(_) => StatusCode::CONFLICT,
            WaitlistError::Notifier(_) => StatusCode::BAD_GATEWAY,
            WaitlistError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            WaitlistError::Validation(_) => "VALIDATION_ERROR",
            WaitlistError::WaitlistNotFound(_) => "WAITLIST_NOT_FOUND",
            WaitlistError::WaitlistInactive(_) => "WAITLIST_INACTIVE",
            WaitlistError::EntryNotFound => "NOT_FOUND",
            WaitlistError::EmptyQueue => "EMPTY_QUEUE",
            WaitlistError::AlreadyBusy(_) => "ALREADY_BUSY",
            WaitlistError::QuotaExceeded => "QUOTA_EXCEEDED",
            WaitlistError::Expired => "EXPIRED",
            WaitlistError::AlreadyDeclined => "ALREADY_DECLINED",
            WaitlistError::Canceled => "CANCELED",
            WaitlistError::SlotTaken => "SLOT_TAKEN",
            WaitlistError::ConcurrentUpdate(_) => "CONCURRENT_UPDATE",
            WaitlistError::Notifier(_) => "NOTIFIER_ERROR",
            WaitlistError::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<anyhow::Error> for WaitlistError {
    fn from(err: anyhow::Error) -> Self {
        WaitlistError::Database(err.to_string())
    }
}

impl IntoResponse for WaitlistError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("Waitlist error: {}: {}", status, self);
        } else {
            tracing::info!("Waitlist request rejected: {}: {}", self.code(), self);
        }

        // Storage details stay in the logs.
        let message = match &self {
            WaitlistError::Database(_) => "Internal storage error".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}
