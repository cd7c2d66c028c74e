// libs/waitlist-cell/src/services/engine.rs
use std::sync::Arc;

use tracing::info;

use shared_config::{AppConfig, StoreBackend};

use crate::models::EngineSettings;
use crate::services::auto_offer::AutoOfferLoop;
use crate::services::dispatcher::OfferDispatcher;
use crate::services::manager::WaitlistManager;
use crate::services::memory::InMemoryEntryStore;
use crate::services::notifier::{OfferNotifier, WebhookNotifier};
use crate::services::resolution::ResolutionHandler;
use crate::services::store::EntryStore;
use crate::services::supabase_store::SupabaseEntryStore;
use crate::services::sweeper::ExpirationSweeper;

/// All engine components sharing one store and one notifier.
pub struct WaitlistEngine {
    pub store: Arc<dyn EntryStore>,
    pub dispatcher: Arc<OfferDispatcher>,
    pub resolution: ResolutionHandler,
    pub sweeper: ExpirationSweeper,
    pub auto_offer: AutoOfferLoop,
    pub manager: WaitlistManager,
}

impl WaitlistEngine {
    pub fn new(
        store: Arc<dyn EntryStore>,
        notifier: Arc<dyn OfferNotifier>,
        settings: EngineSettings,
    ) -> Self {
        let dispatcher = Arc::new(OfferDispatcher::new(
            Arc::clone(&store),
            notifier,
            settings.clone(),
        ));

        Self {
            resolution: ResolutionHandler::new(Arc::clone(&store), Arc::clone(&dispatcher)),
            sweeper: ExpirationSweeper::new(Arc::clone(&store), settings.offer_timeout_minutes),
            auto_offer: AutoOfferLoop::new(
                Arc::clone(&store),
                Arc::clone(&dispatcher),
                settings.slot_utc_offset_minutes,
            ),
            manager: WaitlistManager::new(Arc::clone(&store)),
            dispatcher,
            store,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let store: Arc<dyn EntryStore> = match config.store_backend {
            StoreBackend::Supabase => {
                info!("Waitlist engine using Supabase store at {}", config.supabase_url);
                Arc::new(SupabaseEntryStore::new(config))
            }
            StoreBackend::Memory => {
                info!("Waitlist engine using in-memory store");
                Arc::new(InMemoryEntryStore::new())
            }
        };
        let notifier: Arc<dyn OfferNotifier> = Arc::new(WebhookNotifier::from_config(config));

        Self::new(store, notifier, EngineSettings::from(config))
    }
}
