// libs/waitlist-cell/src/services/auto_offer.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::error::WaitlistError;
use crate::models::{AutoOfferReport, AutoOfferResult, EntryStatus, Waitlist};
use crate::services::dispatcher::OfferDispatcher;
use crate::services::formatting::format_slot;
use crate::services::store::EntryStore;

/// Periodic pass offering each idle list's next free agenda slot.
pub struct AutoOfferLoop {
    store: Arc<dyn EntryStore>,
    dispatcher: Arc<OfferDispatcher>,
    slot_utc_offset_minutes: i32,
}

impl AutoOfferLoop {
    pub fn new(
        store: Arc<dyn EntryStore>,
        dispatcher: Arc<OfferDispatcher>,
        slot_utc_offset_minutes: i32,
    ) -> Self {
        Self {
            store,
            dispatcher,
            slot_utc_offset_minutes,
        }
    }

    pub async fn run(&self) -> Result<Vec<AutoOfferReport>, WaitlistError> {
        self.run_at(Utc::now()).await
    }

    /// One report per active list that has someone waiting. A failing list
    /// is reported and the sweep moves on.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<Vec<AutoOfferReport>, WaitlistError> {
        let waitlists = self.store.list_active_waitlists().await?;
        let mut reports = Vec::new();

        for waitlist in waitlists {
            let report = match self.process(&waitlist, now).await {
                Ok(Some(report)) => report,
                Ok(None) => continue,
                Err(e) => {
                    error!("Auto-offer failed for waitlist {}: {}", waitlist.id, e);
                    AutoOfferReport {
                        waitlist_id: waitlist.id,
                        list: waitlist.name.clone(),
                        slot: None,
                        result: AutoOfferResult::Failed,
                        error: Some(e.code().to_string()),
                    }
                }
            };

            info!(
                "Auto-offer {} ({}): {}",
                report.list,
                report.waitlist_id,
                report.result.as_str()
            );
            reports.push(report);
        }

        info!("Auto-offer sweep processed {} waitlists", reports.len());
        Ok(reports)
    }

    async fn process(
        &self,
        waitlist: &Waitlist,
        now: DateTime<Utc>,
    ) -> Result<Option<AutoOfferReport>, WaitlistError> {
        let entries = self.store.list_entries(waitlist.id).await?;

        if !entries.iter().any(|e| e.status == EntryStatus::Waiting) {
            return Ok(None);
        }

        let report = |slot: Option<String>, result: AutoOfferResult| AutoOfferReport {
            waitlist_id: waitlist.id,
            list: waitlist.name.clone(),
            slot,
            result,
            error: None,
        };

        if entries.iter().any(|e| e.status == EntryStatus::Notified) {
            return Ok(Some(report(None, AutoOfferResult::SkippedBusyWaitingReply)));
        }

        let Some(slot) = self.store.earliest_free_slot(waitlist.tenant_id, now).await? else {
            return Ok(Some(report(None, AutoOfferResult::NoSlotsAvailable)));
        };

        let description = format_slot(slot.starts_at, self.slot_utc_offset_minutes);
        let outcome = self.dispatcher.dispatch(waitlist.id, &description).await;

        Ok(Some(match outcome {
            Ok(dispatched) if dispatched.delivered() => {
                report(Some(description), AutoOfferResult::Offered)
            }
            Ok(_) => {
                warn!("Auto-offer for waitlist {} recorded but not delivered", waitlist.id);
                report(Some(description), AutoOfferResult::OfferedDeliveryFailed)
            }
            Err(e) => AutoOfferReport {
                error: Some(e.code().to_string()),
                ..report(Some(description), AutoOfferResult::Failed)
            },
        }))
    }
}
