// libs/waitlist-cell/src/services/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::WaitlistError;
use crate::models::{
    AgendaSlot, ConfirmWrite, EntryStatus, OfferClaim, Patient, QuotaSnapshot, Waitlist,
    WaitlistEntry,
};
use crate::services::store::{check_transition, EntryStore};

#[derive(Default)]
struct MemoryState {
    waitlists: HashMap<Uuid, Waitlist>,
    entries: HashMap<Uuid, WaitlistEntry>,
    patients: HashMap<Uuid, Patient>,
    quotas: HashMap<Uuid, QuotaSnapshot>,
    slots: Vec<AgendaSlot>,
}

impl MemoryState {
    fn entries_of(&self, waitlist_id: Uuid) -> Vec<&WaitlistEntry> {
        let mut entries: Vec<&WaitlistEntry> = self
            .entries
            .values()
            .filter(|e| e.waitlist_id == waitlist_id)
            .collect();
        entries.sort_by_key(|e| e.queue_key());
        entries
    }
}

/// Process-local store. Each trait call holds the write lock for its whole
/// duration, so calls are serialisable.
#[derive(Default)]
pub struct InMemoryEntryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_waitlist(&self, waitlist: Waitlist) {
        self.state.write().await.waitlists.insert(waitlist.id, waitlist);
    }

    pub async fn insert_patient(&self, patient: Patient) {
        self.state.write().await.patients.insert(patient.id, patient);
    }

    pub async fn insert_entry(&self, entry: WaitlistEntry) {
        self.state.write().await.entries.insert(entry.id, entry);
    }

    pub async fn set_quota(&self, quota: QuotaSnapshot) {
        self.state.write().await.quotas.insert(quota.tenant_id, quota);
    }

    pub async fn insert_slot(&self, slot: AgendaSlot) {
        self.state.write().await.slots.push(slot);
    }

    /// Patient intake: appends a `WAITING` entry to the list.
    pub async fn add_entry(
        &self,
        waitlist_id: Uuid,
        patient_id: Uuid,
        added_at: DateTime<Utc>,
    ) -> WaitlistEntry {
        let entry = WaitlistEntry::new(waitlist_id, patient_id, added_at);
        self.insert_entry(entry.clone()).await;
        entry
    }
}

#[async_trait]
impl EntryStore for InMemoryEntryStore {
    async fn get_waitlist(&self, waitlist_id: Uuid) -> Result<Option<Waitlist>, WaitlistError> {
        Ok(self.state.read().await.waitlists.get(&waitlist_id).cloned())
    }

    async fn list_active_waitlists(&self) -> Result<Vec<Waitlist>, WaitlistError> {
        let state = self.state.read().await;
        let mut lists: Vec<Waitlist> = state
            .waitlists
            .values()
            .filter(|w| w.is_active)
            .cloned()
            .collect();
        lists.sort_by_key(|w| (w.created_at, w.id));
        Ok(lists)
    }

    async fn list_entries(&self, waitlist_id: Uuid) -> Result<Vec<WaitlistEntry>, WaitlistError> {
        let state = self.state.read().await;
        Ok(state.entries_of(waitlist_id).into_iter().cloned().collect())
    }

    async fn get_entry(&self, entry_id: Uuid) -> Result<Option<WaitlistEntry>, WaitlistError> {
        Ok(self.state.read().await.entries.get(&entry_id).cloned())
    }

    async fn find_entry(
        &self,
        waitlist_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<WaitlistEntry>, WaitlistError> {
        let state = self.state.read().await;
        Ok(state
            .entries_of(waitlist_id)
            .into_iter()
            .filter(|e| e.patient_id == patient_id)
            .last()
            .cloned())
    }

    async fn get_patient(&self, patient_id: Uuid) -> Result<Option<Patient>, WaitlistError> {
        Ok(self.state.read().await.patients.get(&patient_id).cloned())
    }

    async fn claim_next_waiting(
        &self,
        waitlist_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<OfferClaim, WaitlistError> {
        let mut state = self.state.write().await;
        let entries = state.entries_of(waitlist_id);

        if let Some(busy) = entries.iter().find(|e| e.status == EntryStatus::Notified) {
            return Ok(OfferClaim::Busy((*busy).clone()));
        }

        let next_id = match entries.iter().find(|e| e.status == EntryStatus::Waiting) {
            Some(entry) => entry.id,
            None => return Ok(OfferClaim::Empty),
        };

        let entry = state
            .entries
            .get_mut(&next_id)
            .ok_or(WaitlistError::EntryNotFound)?;
        entry.status = EntryStatus::Notified;
        entry.updated_at = now;

        debug!("Memory store claimed entry {} in waitlist {}", next_id, waitlist_id);
        Ok(OfferClaim::Claimed(entry.clone()))
    }

    async fn transition_entry(
        &self,
        entry_id: Uuid,
        expected: EntryStatus,
        next: EntryStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<WaitlistEntry>, WaitlistError> {
        check_transition(expected, next)?;

        let mut state = self.state.write().await;
        match state.entries.get_mut(&entry_id) {
            Some(entry) if entry.status == expected => {
                entry.status = next;
                entry.updated_at = now;
                Ok(Some(entry.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn confirm_entry(
        &self,
        waitlist_id: Uuid,
        entry_id: Uuid,
        expected: EntryStatus,
        now: DateTime<Utc>,
    ) -> Result<ConfirmWrite, WaitlistError> {
        let mut state = self.state.write().await;

        let current = state
            .entries
            .get(&entry_id)
            .filter(|e| e.waitlist_id == waitlist_id)
            .map(|e| e.status)
            .ok_or(WaitlistError::EntryNotFound)?;

        if current != expected {
            return Ok(ConfirmWrite::StatusChanged(current));
        }

        let taken = state.entries.values().any(|e| {
            e.waitlist_id == waitlist_id && e.id != entry_id && e.status == EntryStatus::Confirmed
        });
        if taken {
            return Ok(ConfirmWrite::SlotTaken);
        }

        let confirmed = {
            let entry = state
                .entries
                .get_mut(&entry_id)
                .ok_or(WaitlistError::EntryNotFound)?;
            entry.status = EntryStatus::Confirmed;
            entry.updated_at = now;
            entry.clone()
        };

        if let Some(waitlist) = state.waitlists.get_mut(&waitlist_id) {
            waitlist.is_active = false;
        }

        Ok(ConfirmWrite::Confirmed(confirmed))
    }

    async fn expire_offers(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<WaitlistEntry>, WaitlistError> {
        let mut state = self.state.write().await;
        let mut expired = Vec::new();

        for entry in state.entries.values_mut() {
            if entry.status == EntryStatus::Notified && entry.updated_at < cutoff {
                entry.status = EntryStatus::Expired;
                entry.updated_at = now;
                expired.push(entry.clone());
            }
        }

        expired.sort_by_key(|e| e.queue_key());
        Ok(expired)
    }

    async fn get_quota(&self, tenant_id: Uuid) -> Result<Option<QuotaSnapshot>, WaitlistError> {
        Ok(self.state.read().await.quotas.get(&tenant_id).cloned())
    }

    async fn increment_messages_sent(&self, tenant_id: Uuid) -> Result<i64, WaitlistError> {
        let mut state = self.state.write().await;
        let quota = state.quotas.get_mut(&tenant_id).ok_or_else(|| {
            WaitlistError::Database(format!("no quota record for tenant {}", tenant_id))
        })?;
        quota.messages_sent += 1;
        Ok(quota.messages_sent)
    }

    async fn earliest_free_slot(
        &self,
        tenant_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<Option<AgendaSlot>, WaitlistError> {
        let state = self.state.read().await;
        Ok(state
            .slots
            .iter()
            .filter(|s| s.tenant_id == tenant_id && !s.is_booked && s.starts_at > after)
            .min_by_key(|s| (s.starts_at, s.id))
            .cloned())
    }
}
