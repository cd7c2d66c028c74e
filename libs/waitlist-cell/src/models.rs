// libs/waitlist-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// STORED RECORDS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    Waiting,
    Notified,
    Confirmed,
    Declined,
    Expired,
    Canceled,
}

impl EntryStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EntryStatus::Waiting | EntryStatus::Notified)
    }

    pub fn can_transition_to(&self, target: &EntryStatus) -> bool {
        use EntryStatus::*;
        match (self, target) {
            (Waiting, Notified) => true,
            (Notified, Confirmed | Declined | Expired) => true,
            // A patient may answer or leave before the offer reaches them.
            (Waiting, Confirmed | Declined) => true,
            (Waiting | Notified, Canceled) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Waiting => "WAITING",
            EntryStatus::Notified => "NOTIFIED",
            EntryStatus::Confirmed => "CONFIRMED",
            EntryStatus::Declined => "DECLINED",
            EntryStatus::Expired => "EXPIRED",
            EntryStatus::Canceled => "CANCELED",
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaitlistEntry {
    pub id: Uuid,
    pub waitlist_id: Uuid,
    pub patient_id: Uuid,
    pub status: EntryStatus,
    pub added_at: DateTime<Utc>,
    /// Doubles as "offer sent at" while the entry is `NOTIFIED`.
    pub updated_at: DateTime<Utc>,
}

impl WaitlistEntry {
    pub fn new(waitlist_id: Uuid, patient_id: Uuid, added_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            waitlist_id,
            patient_id,
            status: EntryStatus::Waiting,
            added_at,
            updated_at: added_at,
        }
    }

    /// FIFO key: `added_at`, ties broken by id.
    pub fn queue_key(&self) -> (DateTime<Utc>, Uuid) {
        (self.added_at, self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Waitlist {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuotaSnapshot {
    pub tenant_id: Uuid,
    pub messages_sent: i64,
    pub message_limit: i64,
}

impl QuotaSnapshot {
    pub fn has_allowance(&self) -> bool {
        self.messages_sent < self.message_limit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgendaSlot {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub is_booked: bool,
}

// ==============================================================================
// STORE WRITE OUTCOMES
// ==============================================================================

/// Result of the atomic "pick next and mark offered" step.
#[derive(Debug, Clone, PartialEq)]
pub enum OfferClaim {
    Claimed(WaitlistEntry),
    /// Another entry of the list is already awaiting a reply.
    Busy(WaitlistEntry),
    Empty,
}

/// Result of the atomic confirm step (race check + transition + deactivation).
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmWrite {
    Confirmed(WaitlistEntry),
    SlotTaken,
    /// The stored status no longer matched the expected one.
    StatusChanged(EntryStatus),
}

// ==============================================================================
// ENGINE OUTCOMES
// ==============================================================================

/// What the dispatcher hands to the notifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OfferPayload {
    pub waitlist_id: Uuid,
    pub entry_id: Uuid,
    pub patient_id: Uuid,
    pub phone: String,
    pub patient_name: String,
    pub slot_description: String,
}

/// Wire body posted to the messaging transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotifierPayload {
    pub waitlist_id: Uuid,
    pub patient_id: Uuid,
    pub phone: String,
    pub patient_name: String,
    pub slot_time: String,
}

impl From<&OfferPayload> for NotifierPayload {
    fn from(offer: &OfferPayload) -> Self {
        Self {
            waitlist_id: offer.waitlist_id,
            patient_id: offer.patient_id,
            phone: offer.phone.clone(),
            patient_name: offer.patient_name.clone(),
            slot_time: offer.slot_description.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DispatchOutcome {
    pub offer: OfferPayload,
    pub delivery: DeliveryStatus,
}

impl DispatchOutcome {
    pub fn delivered(&self) -> bool {
        matches!(self.delivery, DeliveryStatus::Delivered)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    Confirmed(WaitlistEntry),
    /// Replay of a confirmation that already went through.
    AlreadyDone(WaitlistEntry),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclineOutcome {
    pub entry: WaitlistEntry,
    pub next_triggered: bool,
    pub next_offer: Option<DispatchOutcome>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub expired_count: usize,
    pub expired_entry_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AutoOfferResult {
    Offered,
    OfferedDeliveryFailed,
    SkippedBusyWaitingReply,
    NoSlotsAvailable,
    Failed,
}

impl AutoOfferResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutoOfferResult::Offered => "offered",
            AutoOfferResult::OfferedDeliveryFailed => "offered_delivery_failed",
            AutoOfferResult::SkippedBusyWaitingReply => "skipped_busy_waiting_reply",
            AutoOfferResult::NoSlotsAvailable => "no_slots_available",
            AutoOfferResult::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutoOfferReport {
    pub waitlist_id: Uuid,
    pub list: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
    pub result: AutoOfferResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ==============================================================================
// REQUEST DTOs
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub waitlist_id: String,
    pub slot_description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub waitlist_id: String,
    pub patient_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclineRequest {
    pub waitlist_id: String,
    pub patient_id: String,
    pub reason: Option<String>,
    pub slot_description: Option<String>,
}

// ==============================================================================
// ENGINE SETTINGS
// ==============================================================================

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub offer_timeout_minutes: i64,
    pub default_country_code: String,
    pub slot_utc_offset_minutes: i32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            offer_timeout_minutes: shared_config::DEFAULT_OFFER_TIMEOUT_MINUTES,
            default_country_code: shared_config::DEFAULT_COUNTRY_CODE.to_string(),
            slot_utc_offset_minutes: 0,
        }
    }
}

impl From<&shared_config::AppConfig> for EngineSettings {
    fn from(config: &shared_config::AppConfig) -> Self {
        Self {
            offer_timeout_minutes: config.offer_timeout_minutes,
            default_country_code: config.default_country_code.clone(),
            slot_utc_offset_minutes: config.slot_utc_offset_minutes,
        }
    }
}
