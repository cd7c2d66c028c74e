// libs/waitlist-cell/src/services/dispatcher.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::WaitlistError;
use crate::models::{
    DeliveryStatus, DispatchOutcome, EngineSettings, NotifierPayload, OfferClaim, OfferPayload,
    Patient, Waitlist, WaitlistEntry,
};
use crate::services::formatting::normalize_phone;
use crate::services::notifier::OfferNotifier;
use crate::services::quota::QuotaGate;
use crate::services::store::EntryStore;

pub struct OfferDispatcher {
    store: Arc<dyn EntryStore>,
    quota: QuotaGate,
    notifier: Arc<dyn OfferNotifier>,
    settings: EngineSettings,
}

impl OfferDispatcher {
    pub fn new(
        store: Arc<dyn EntryStore>,
        notifier: Arc<dyn OfferNotifier>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            quota: QuotaGate::new(Arc::clone(&store)),
            store,
            notifier,
            settings,
        }
    }

    /// Offers `slot_description` to the oldest waiting patient of the list.
    ///
    /// Once the entry is `NOTIFIED` it stays so even if delivery fails; the
    /// outcome then reports `DeliveryStatus::Failed` and the sweeper expires
    /// the offer unless someone intervenes. Quota is charged only after the
    /// transport accepted the message.
    pub async fn dispatch(
        &self,
        waitlist_id: Uuid,
        slot_description: &str,
    ) -> Result<DispatchOutcome, WaitlistError> {
        let slot_description = slot_description.trim();
        if slot_description.is_empty() {
            return Err(WaitlistError::Validation(
                "slotDescription must not be empty".to_string(),
            ));
        }

        let waitlist = self
            .store
            .get_waitlist(waitlist_id)
            .await?
            .ok_or(WaitlistError::WaitlistNotFound(waitlist_id))?;

        if !waitlist.is_active {
            return Err(WaitlistError::WaitlistInactive(waitlist_id));
        }

        if !self.quota.check(waitlist.tenant_id).await? {
            warn!("Tenant {} is out of message quota", waitlist.tenant_id);
            return Err(WaitlistError::QuotaExceeded);
        }

        let entry = match self.store.claim_next_waiting(waitlist_id, Utc::now()).await? {
            OfferClaim::Claimed(entry) => entry,
            OfferClaim::Busy(outstanding) => {
                info!(
                    "Waitlist {} already awaiting reply from entry {}",
                    waitlist_id, outstanding.id
                );
                return Err(WaitlistError::AlreadyBusy(outstanding.id));
            }
            OfferClaim::Empty => return Err(WaitlistError::EmptyQueue),
        };

        info!(
            "Entry {} (patient {}) in waitlist {} marked NOTIFIED for slot '{}'",
            entry.id, entry.patient_id, waitlist_id, slot_description
        );

        let patient = self.store.get_patient(entry.patient_id).await?;
        let (offer, blocked) = self.build_offer(&entry, patient.as_ref(), slot_description);

        let delivery = match blocked {
            Some(reason) => DeliveryStatus::Failed { reason },
            None => self.deliver(&waitlist, &offer).await,
        };

        if let DeliveryStatus::Failed { reason } = &delivery {
            warn!(
                "Offer for entry {} not delivered ({}); entry remains NOTIFIED",
                entry.id, reason
            );
        }

        Ok(DispatchOutcome { offer, delivery })
    }

    fn build_offer(
        &self,
        entry: &WaitlistEntry,
        patient: Option<&Patient>,
        slot_description: &str,
    ) -> (OfferPayload, Option<String>) {
        let mut offer = OfferPayload {
            waitlist_id: entry.waitlist_id,
            entry_id: entry.id,
            patient_id: entry.patient_id,
            phone: String::new(),
            patient_name: String::new(),
            slot_description: slot_description.to_string(),
        };

        let Some(patient) = patient else {
            return (offer, Some(format!("patient {} not found", entry.patient_id)));
        };
        offer.patient_name = patient.name.clone();

        let phone = patient
            .phone
            .as_deref()
            .and_then(|raw| normalize_phone(raw, &self.settings.default_country_code));

        match phone {
            Some(phone) => {
                offer.phone = phone;
                (offer, None)
            }
            None => (offer, Some("patient has no usable phone number".to_string())),
        }
    }

    async fn deliver(&self, waitlist: &Waitlist, offer: &OfferPayload) -> DeliveryStatus {
        if let Err(e) = self.notifier.send_offer(&NotifierPayload::from(offer)).await {
            return DeliveryStatus::Failed {
                reason: e.to_string(),
            };
        }

        if let Err(e) = self.quota.record_sent(waitlist.tenant_id).await {
            error!(
                "Offer {} delivered but message count for tenant {} not updated: {}",
                offer.entry_id, waitlist.tenant_id, e
            );
        }

        DeliveryStatus::Delivered
    }
}
