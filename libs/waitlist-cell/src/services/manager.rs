// libs/waitlist-cell/src/services/manager.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::WaitlistError;
use crate::models::{EntryStatus, WaitlistEntry};
use crate::services::store::EntryStore;

/// Clinic-staff operations on entries.
pub struct WaitlistManager {
    store: Arc<dyn EntryStore>,
}

impl WaitlistManager {
    pub fn new(store: Arc<dyn EntryStore>) -> Self {
        Self { store }
    }

    pub async fn entries(&self, waitlist_id: Uuid) -> Result<Vec<WaitlistEntry>, WaitlistError> {
        self.store
            .get_waitlist(waitlist_id)
            .await?
            .ok_or(WaitlistError::WaitlistNotFound(waitlist_id))?;
        self.store.list_entries(waitlist_id).await
    }

    /// Soft-removes an entry. Cancelling an outstanding offer frees the list
    /// for the next one; cancelling twice is a no-op.
    pub async fn cancel_entry(&self, entry_id: Uuid) -> Result<WaitlistEntry, WaitlistError> {
        let entry = self
            .store
            .get_entry(entry_id)
            .await?
            .ok_or(WaitlistError::EntryNotFound)?;

        match entry.status {
            EntryStatus::Canceled => return Ok(entry),
            status if status.is_terminal() => {
                return Err(WaitlistError::Validation(format!(
                    "entry is already {} and cannot be canceled",
                    status
                )))
            }
            _ => {}
        }

        let canceled = self
            .store
            .transition_entry(entry.id, entry.status, EntryStatus::Canceled, Utc::now())
            .await?;

        match canceled {
            Some(canceled) => {
                info!("Entry {} canceled (was {})", canceled.id, entry.status);
                Ok(canceled)
            }
            None => {
                let current = self
                    .store
                    .get_entry(entry_id)
                    .await?
                    .ok_or(WaitlistError::EntryNotFound)?;
                Err(WaitlistError::ConcurrentUpdate(current.status))
            }
        }
    }
}
