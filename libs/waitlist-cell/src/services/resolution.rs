// libs/waitlist-cell/src/services/resolution.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::WaitlistError;
use crate::models::{ConfirmOutcome, ConfirmWrite, DeclineOutcome, EntryStatus, WaitlistEntry};
use crate::services::dispatcher::OfferDispatcher;
use crate::services::store::EntryStore;

/// Turns a patient's reply into a terminal entry state.
pub struct ResolutionHandler {
    store: Arc<dyn EntryStore>,
    dispatcher: Arc<OfferDispatcher>,
}

/// `Ok(true)` when the entry is already confirmed, `Ok(false)` when it can
/// still be confirmed.
fn confirmable(status: EntryStatus) -> Result<bool, WaitlistError> {
    match status {
        EntryStatus::Confirmed => Ok(true),
        EntryStatus::Expired => Err(WaitlistError::Expired),
        EntryStatus::Declined => Err(WaitlistError::AlreadyDeclined),
        EntryStatus::Canceled => Err(WaitlistError::Canceled),
        EntryStatus::Waiting | EntryStatus::Notified => Ok(false),
    }
}

impl ResolutionHandler {
    pub fn new(store: Arc<dyn EntryStore>, dispatcher: Arc<OfferDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    async fn locate(
        &self,
        waitlist_id: Uuid,
        patient_id: Uuid,
    ) -> Result<WaitlistEntry, WaitlistError> {
        self.store
            .find_entry(waitlist_id, patient_id)
            .await?
            .ok_or(WaitlistError::EntryNotFound)
    }

    /// First confirmation wins the slot; replays of a successful confirmation
    /// report `AlreadyDone`.
    pub async fn confirm(
        &self,
        waitlist_id: Uuid,
        patient_id: Uuid,
    ) -> Result<ConfirmOutcome, WaitlistError> {
        let entry = self.locate(waitlist_id, patient_id).await?;

        if confirmable(entry.status)? {
            info!("Duplicate confirmation for entry {} ignored", entry.id);
            return Ok(ConfirmOutcome::AlreadyDone(entry));
        }

        let write = self
            .store
            .confirm_entry(waitlist_id, entry.id, entry.status, Utc::now())
            .await?;

        match write {
            ConfirmWrite::Confirmed(confirmed) => {
                info!(
                    "Patient {} confirmed slot of waitlist {} (entry {}); waitlist deactivated",
                    patient_id, waitlist_id, confirmed.id
                );
                Ok(ConfirmOutcome::Confirmed(confirmed))
            }
            ConfirmWrite::SlotTaken => {
                warn!(
                    "Patient {} confirmed waitlist {} after another patient took the slot",
                    patient_id, waitlist_id
                );
                Err(WaitlistError::SlotTaken)
            }
            ConfirmWrite::StatusChanged(actual) => {
                info!(
                    "Entry {} moved from {} to {} before confirmation was written",
                    entry.id, entry.status, actual
                );
                if confirmable(actual)? {
                    let current = self
                        .store
                        .get_entry(entry.id)
                        .await?
                        .ok_or(WaitlistError::EntryNotFound)?;
                    return Ok(ConfirmOutcome::AlreadyDone(current));
                }
                Err(WaitlistError::ConcurrentUpdate(actual))
            }
        }
    }

    /// Declines the patient's entry and, when a slot description is given,
    /// immediately offers the same slot to the next patient in line.
    pub async fn decline(
        &self,
        waitlist_id: Uuid,
        patient_id: Uuid,
        reason: Option<&str>,
        slot_description: Option<&str>,
    ) -> Result<DeclineOutcome, WaitlistError> {
        let entry = self.locate(waitlist_id, patient_id).await?;

        if entry.status.is_terminal() {
            info!(
                "Decline for entry {} ignored, entry already {}",
                entry.id, entry.status
            );
            return Ok(DeclineOutcome {
                entry,
                next_triggered: false,
                next_offer: None,
            });
        }

        let declined = match self
            .store
            .transition_entry(entry.id, entry.status, EntryStatus::Declined, Utc::now())
            .await?
        {
            Some(declined) => declined,
            None => {
                let current = self
                    .store
                    .get_entry(entry.id)
                    .await?
                    .ok_or(WaitlistError::EntryNotFound)?;
                if !current.status.is_terminal() {
                    return Err(WaitlistError::ConcurrentUpdate(current.status));
                }
                info!(
                    "Entry {} reached {} concurrently, decline has no effect",
                    current.id, current.status
                );
                return Ok(DeclineOutcome {
                    entry: current,
                    next_triggered: false,
                    next_offer: None,
                });
            }
        };

        info!(
            "Patient {} declined waitlist {} (entry {}, reason: {})",
            patient_id,
            waitlist_id,
            declined.id,
            reason.unwrap_or("none given")
        );

        let Some(slot) = slot_description.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(DeclineOutcome {
                entry: declined,
                next_triggered: false,
                next_offer: None,
            });
        };

        match self.dispatcher.dispatch(waitlist_id, slot).await {
            Ok(next) => {
                info!(
                    "Slot '{}' re-offered to entry {} after decline",
                    slot, next.offer.entry_id
                );
                Ok(DeclineOutcome {
                    entry: declined,
                    next_triggered: true,
                    next_offer: Some(next),
                })
            }
            Err(WaitlistError::EmptyQueue) => {
                info!("Waitlist {} has no one left to offer '{}' to", waitlist_id, slot);
                Ok(DeclineOutcome {
                    entry: declined,
                    next_triggered: false,
                    next_offer: None,
                })
            }
            // A confirmed patient already holds the slot.
            Err(WaitlistError::WaitlistInactive(_)) => {
                info!(
                    "Waitlist {} closed before '{}' could be re-offered",
                    waitlist_id, slot
                );
                Ok(DeclineOutcome {
                    entry: declined,
                    next_triggered: false,
                    next_offer: None,
                })
            }
            Err(e) => Err(e),
        }
    }
}
