#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use waitlist_cell::{
    AgendaSlot, EngineSettings, EntryStatus, EntryStore, InMemoryEntryStore, NotifierPayload,
    OfferNotifier, Patient, QuotaSnapshot, Waitlist, WaitlistEngine, WaitlistEntry, WaitlistError,
};

/// Notifier double that records every payload and can be switched to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<NotifierPayload>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn fail_deliveries(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<NotifierPayload> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl OfferNotifier for RecordingNotifier {
    async fn send_offer(&self, payload: &NotifierPayload) -> Result<(), WaitlistError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(WaitlistError::Notifier("transport down".to_string()));
        }
        self.sent.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// One tenant with one active waitlist, backed by the in-memory store.
pub struct Fixture {
    pub store: Arc<InMemoryEntryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub engine: Arc<WaitlistEngine>,
    pub tenant_id: Uuid,
    pub waitlist: Waitlist,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_limit(100).await
    }

    pub async fn with_limit(message_limit: i64) -> Self {
        let store = Arc::new(InMemoryEntryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = Arc::new(WaitlistEngine::new(
            store.clone() as Arc<dyn EntryStore>,
            notifier.clone() as Arc<dyn OfferNotifier>,
            EngineSettings::default(),
        ));

        let tenant_id = Uuid::new_v4();
        store
            .set_quota(QuotaSnapshot {
                tenant_id,
                messages_sent: 0,
                message_limit,
            })
            .await;

        let fixture = Self {
            store,
            notifier,
            engine,
            tenant_id,
            waitlist: Waitlist {
                id: Uuid::new_v4(),
                tenant_id,
                name: "General practice".to_string(),
                is_active: true,
                created_at: Utc::now() - Duration::days(1),
            },
        };
        fixture.store.insert_waitlist(fixture.waitlist.clone()).await;
        fixture
    }

    pub async fn add_waitlist(&self, tenant_id: Uuid, name: &str) -> Waitlist {
        let waitlist = Waitlist {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        self.store.insert_waitlist(waitlist.clone()).await;
        waitlist
    }

    pub async fn add_tenant(&self, message_limit: i64) -> Uuid {
        let tenant_id = Uuid::new_v4();
        self.store
            .set_quota(QuotaSnapshot {
                tenant_id,
                messages_sent: 0,
                message_limit,
            })
            .await;
        tenant_id
    }

    /// Adds a patient with a reachable phone to `waitlist_id`, joined
    /// `minutes_ago` minutes before now.
    pub async fn add_patient(&self, waitlist_id: Uuid, name: &str, minutes_ago: i64) -> WaitlistEntry {
        self.add_patient_with_phone(waitlist_id, name, Some("(11) 98765-4321"), minutes_ago)
            .await
    }

    pub async fn add_patient_with_phone(
        &self,
        waitlist_id: Uuid,
        name: &str,
        phone: Option<&str>,
        minutes_ago: i64,
    ) -> WaitlistEntry {
        let patient = Patient {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            name: name.to_string(),
            phone: phone.map(str::to_string),
        };
        self.store.insert_patient(patient.clone()).await;
        self.store
            .add_entry(waitlist_id, patient.id, Utc::now() - Duration::minutes(minutes_ago))
            .await
    }

    pub async fn add_slot(&self, tenant_id: Uuid, starts_at: DateTime<Utc>) -> AgendaSlot {
        let slot = AgendaSlot {
            id: Uuid::new_v4(),
            tenant_id,
            starts_at,
            ends_at: starts_at + Duration::minutes(30),
            is_booked: false,
        };
        self.store.insert_slot(slot.clone()).await;
        slot
    }

    pub async fn entry(&self, entry_id: Uuid) -> WaitlistEntry {
        self.store.get_entry(entry_id).await.unwrap().expect("entry exists")
    }

    /// Overwrites an entry's status, e.g. to simulate an offer sent long ago.
    pub async fn force_status(&self, entry_id: Uuid, status: EntryStatus, updated_at: DateTime<Utc>) {
        let mut entry = self.entry(entry_id).await;
        entry.status = status;
        entry.updated_at = updated_at;
        self.store.insert_entry(entry).await;
    }

    pub async fn count_with_status(&self, waitlist_id: Uuid, status: EntryStatus) -> usize {
        self.store
            .list_entries(waitlist_id)
            .await
            .unwrap()
            .iter()
            .filter(|e| e.status == status)
            .count()
    }

    pub async fn messages_sent(&self, tenant_id: Uuid) -> i64 {
        self.store
            .get_quota(tenant_id)
            .await
            .unwrap()
            .map(|q| q.messages_sent)
            .unwrap_or_default()
    }

    pub async fn waitlist_active(&self, waitlist_id: Uuid) -> bool {
        self.store
            .get_waitlist(waitlist_id)
            .await
            .unwrap()
            .map(|w| w.is_active)
            .unwrap_or(false)
    }
}
