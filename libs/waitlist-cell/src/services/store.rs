// libs/waitlist-cell/src/services/store.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::WaitlistError;
use crate::models::{
    AgendaSlot, ConfirmWrite, EntryStatus, OfferClaim, Patient, QuotaSnapshot, Waitlist,
    WaitlistEntry,
};

/// Rejects status pairs the entry lifecycle does not allow, before any write.
pub(crate) fn check_transition(
    expected: EntryStatus,
    next: EntryStatus,
) -> Result<(), WaitlistError> {
    if expected.can_transition_to(&next) {
        Ok(())
    } else {
        Err(WaitlistError::Validation(format!(
            "entry cannot move from {} to {}",
            expected, next
        )))
    }
}

/// Persistent waitlist state.
///
/// Every method is one atomic unit against the backing store. Mutations are
/// predicated on the status the caller last observed: a write whose predicate
/// no longer holds is reported back (`None`, `StatusChanged`, ...) instead of
/// being applied.
#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn get_waitlist(&self, waitlist_id: Uuid) -> Result<Option<Waitlist>, WaitlistError>;

    async fn list_active_waitlists(&self) -> Result<Vec<Waitlist>, WaitlistError>;

    /// Entries of one list in queue order (`added_at`, then id).
    async fn list_entries(&self, waitlist_id: Uuid) -> Result<Vec<WaitlistEntry>, WaitlistError>;

    async fn get_entry(&self, entry_id: Uuid) -> Result<Option<WaitlistEntry>, WaitlistError>;

    /// Most recently added entry of `patient_id` in `waitlist_id`.
    async fn find_entry(
        &self,
        waitlist_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<WaitlistEntry>, WaitlistError>;

    async fn get_patient(&self, patient_id: Uuid) -> Result<Option<Patient>, WaitlistError>;

    /// Marks the oldest `WAITING` entry as `NOTIFIED`, unless the list already
    /// has an entry in `NOTIFIED`.
    async fn claim_next_waiting(
        &self,
        waitlist_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<OfferClaim, WaitlistError>;

    async fn transition_entry(
        &self,
        entry_id: Uuid,
        expected: EntryStatus,
        next: EntryStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<WaitlistEntry>, WaitlistError>;

    /// Confirms the entry if no other entry of the list is `CONFIRMED`, and
    /// deactivates the list in the same unit.
    async fn confirm_entry(
        &self,
        waitlist_id: Uuid,
        entry_id: Uuid,
        expected: EntryStatus,
        now: DateTime<Utc>,
    ) -> Result<ConfirmWrite, WaitlistError>;

    /// Moves every `NOTIFIED` entry last updated before `cutoff` to `EXPIRED`.
    async fn expire_offers(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<WaitlistEntry>, WaitlistError>;

    async fn get_quota(&self, tenant_id: Uuid) -> Result<Option<QuotaSnapshot>, WaitlistError>;

    /// Returns the new `messages_sent` value.
    async fn increment_messages_sent(&self, tenant_id: Uuid) -> Result<i64, WaitlistError>;

    async fn earliest_free_slot(
        &self,
        tenant_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<Option<AgendaSlot>, WaitlistError>;
}
