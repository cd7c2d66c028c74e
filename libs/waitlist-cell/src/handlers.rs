// libs/waitlist-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::error::WaitlistError;
use crate::models::{ConfirmOutcome, ConfirmRequest, DeclineRequest, DeliveryStatus, DispatchRequest};
use crate::services::WaitlistEngine;

/// Identifiers are validated before any store call.
fn parse_id(raw: &str, field: &str) -> Result<Uuid, WaitlistError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| WaitlistError::Validation(format!("{} must be a valid UUID", field)))
}

/// Manual dispatch trigger.
pub async fn dispatch_offer(
    State(engine): State<Arc<WaitlistEngine>>,
    Json(request): Json<DispatchRequest>,
) -> Result<Json<Value>, WaitlistError> {
    let waitlist_id = parse_id(&request.waitlist_id, "waitlistId")?;
    info!("Manual dispatch requested for waitlist {}", waitlist_id);

    let outcome = engine
        .dispatcher
        .dispatch(waitlist_id, &request.slot_description)
        .await?;

    let (message, delivery_error) = match &outcome.delivery {
        DeliveryStatus::Delivered => ("Offer sent".to_string(), None),
        DeliveryStatus::Failed { reason } => (
            "Offer recorded but delivery is unconfirmed".to_string(),
            Some(reason.clone()),
        ),
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "entryId": outcome.offer.entry_id,
        "patientId": outcome.offer.patient_id,
        "delivered": outcome.delivered(),
        "deliveryError": delivery_error,
    })))
}

/// Patient accepted the offer.
pub async fn confirm_webhook(
    State(engine): State<Arc<WaitlistEngine>>,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<Value>, WaitlistError> {
    let waitlist_id = parse_id(&request.waitlist_id, "waitlistId")?;
    let patient_id = parse_id(&request.patient_id, "patientId")?;

    let (entry, already_done) = match engine.resolution.confirm(waitlist_id, patient_id).await? {
        ConfirmOutcome::Confirmed(entry) => (entry, false),
        ConfirmOutcome::AlreadyDone(entry) => (entry, true),
    };

    Ok(Json(json!({
        "success": true,
        "alreadyDone": already_done,
        "entryId": entry.id,
    })))
}

/// Patient turned the offer down; optionally re-offers the slot.
pub async fn decline_webhook(
    State(engine): State<Arc<WaitlistEngine>>,
    Json(request): Json<DeclineRequest>,
) -> Result<Json<Value>, WaitlistError> {
    let waitlist_id = parse_id(&request.waitlist_id, "waitlistId")?;
    let patient_id = parse_id(&request.patient_id, "patientId")?;

    let outcome = engine
        .resolution
        .decline(
            waitlist_id,
            patient_id,
            request.reason.as_deref(),
            request.slot_description.as_deref(),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "nextTriggered": outcome.next_triggered,
        "nextEntryId": outcome.next_offer.as_ref().map(|next| next.offer.entry_id),
    })))
}

pub async fn cancel_entry(
    State(engine): State<Arc<WaitlistEngine>>,
    Path(entry_id): Path<String>,
) -> Result<Json<Value>, WaitlistError> {
    let entry_id = parse_id(&entry_id, "entryId")?;
    let entry = engine.manager.cancel_entry(entry_id).await?;

    Ok(Json(json!({
        "success": true,
        "entry": entry,
    })))
}

pub async fn list_entries(
    State(engine): State<Arc<WaitlistEngine>>,
    Path(waitlist_id): Path<String>,
) -> Result<Json<Value>, WaitlistError> {
    let waitlist_id = parse_id(&waitlist_id, "waitlistId")?;
    let entries = engine.manager.entries(waitlist_id).await?;

    Ok(Json(json!({
        "waitlistId": waitlist_id,
        "entries": entries,
    })))
}

pub async fn expire_sweep(
    State(engine): State<Arc<WaitlistEngine>>,
) -> Result<Json<Value>, WaitlistError> {
    let report = engine.sweeper.sweep().await?;

    Ok(Json(json!({
        "expiredCount": report.expired_count,
        "expiredEntryIds": report.expired_entry_ids,
    })))
}

pub async fn auto_offer_sweep(
    State(engine): State<Arc<WaitlistEngine>>,
) -> Result<Json<Value>, WaitlistError> {
    let results = engine.auto_offer.run().await?;

    Ok(Json(json!({
        "processed": results.len(),
        "results": results,
    })))
}
