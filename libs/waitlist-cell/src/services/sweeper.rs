// libs/waitlist-cell/src/services/sweeper.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::error::WaitlistError;
use crate::models::SweepReport;
use crate::services::store::EntryStore;

/// Expires offers nobody answered within the timeout window.
pub struct ExpirationSweeper {
    store: Arc<dyn EntryStore>,
    timeout: Duration,
}

impl ExpirationSweeper {
    pub fn new(store: Arc<dyn EntryStore>, timeout_minutes: i64) -> Self {
        Self {
            store,
            timeout: Duration::minutes(timeout_minutes),
        }
    }

    pub async fn sweep(&self) -> Result<SweepReport, WaitlistError> {
        self.sweep_at(Utc::now()).await
    }

    /// Expires every `NOTIFIED` entry last updated before `now - timeout`.
    /// Replies that land first win; their entries no longer match.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport, WaitlistError> {
        let cutoff = now - self.timeout;
        debug!("Expiring offers sent before {}", cutoff);

        let expired = self.store.expire_offers(cutoff, now).await?;

        for entry in &expired {
            info!(
                "Offer for entry {} (waitlist {}, patient {}) expired",
                entry.id, entry.waitlist_id, entry.patient_id
            );
        }
        info!("Expiration sweep finished: {} offers expired", expired.len());

        Ok(SweepReport {
            expired_count: expired.len(),
            expired_entry_ids: expired.iter().map(|e| e.id).collect(),
        })
    }
}
