pub mod auto_offer;
pub mod dispatcher;
pub mod engine;
pub mod formatting;
pub mod manager;
pub mod memory;
pub mod notifier;
pub mod quota;
pub mod resolution;
pub mod store;
pub mod supabase_store;
pub mod sweeper;
pub mod token_cache;

pub use auto_offer::AutoOfferLoop;
pub use dispatcher::OfferDispatcher;
pub use engine::WaitlistEngine;
pub use manager::WaitlistManager;
pub use memory::InMemoryEntryStore;
pub use notifier::{OfferNotifier, WebhookNotifier};
pub use quota::QuotaGate;
pub use resolution::ResolutionHandler;
pub use store::EntryStore;
pub use supabase_store::SupabaseEntryStore;
pub use sweeper::ExpirationSweeper;
pub use token_cache::{CachedToken, TokenCache};
