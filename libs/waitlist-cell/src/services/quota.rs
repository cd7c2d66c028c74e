// libs/waitlist-cell/src/services/quota.rs
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::WaitlistError;
use crate::services::store::EntryStore;

/// Monthly message allowance per tenant.
///
/// `check` and `record_sent` are deliberately separate calls: the counter is
/// only charged once the transport accepted the offer. Two dispatches for
/// different lists of one tenant can both pass `check` and overrun the
/// limit by one message.
pub struct QuotaGate {
    store: Arc<dyn EntryStore>,
}

impl QuotaGate {
    pub fn new(store: Arc<dyn EntryStore>) -> Self {
        Self { store }
    }

    pub async fn check(&self, tenant_id: Uuid) -> Result<bool, WaitlistError> {
        match self.store.get_quota(tenant_id).await? {
            Some(quota) => {
                debug!(
                    "Tenant {} quota: {}/{} messages",
                    tenant_id, quota.messages_sent, quota.message_limit
                );
                Ok(quota.has_allowance())
            }
            None => {
                warn!("No quota record for tenant {}, denying dispatch", tenant_id);
                Ok(false)
            }
        }
    }

    pub async fn record_sent(&self, tenant_id: Uuid) -> Result<i64, WaitlistError> {
        let sent = self.store.increment_messages_sent(tenant_id).await?;
        debug!("Tenant {} has now sent {} messages", tenant_id, sent);
        Ok(sent)
    }
}
