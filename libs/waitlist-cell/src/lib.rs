// libs/waitlist-cell/src/lib.rs
//! # Waitlist Cell
//!
//! Decides which waiting patient is offered a freed appointment slot, sends
//! the offer through the messaging transport and resolves the reply (or the
//! silence) into a terminal state. At most one patient per waitlist holds an
//! offer at a time, and at most one confirms it.
//!
//! ```text
//! +-----------------------------------------------------+
//! |                  Waitlist Cell                      |
//! +-----------------------------------------------------+
//! |  handlers.rs        |  HTTP endpoint handlers       |
//! |  router.rs          |  Route definitions + auth     |
//! |  models.rs          |  Records, outcomes, DTOs      |
//! |  services/          |  Engine                       |
//! |    store.rs         |  EntryStore trait             |
//! |    memory.rs        |  In-process store             |
//! |    supabase_store.rs|  PostgREST store              |
//! |    dispatcher.rs    |  Offer selection + delivery   |
//! |    quota.rs         |  Monthly message allowance    |
//! |    notifier.rs      |  Messaging transport client   |
//! |    token_cache.rs   |  Transport bearer token       |
//! |    resolution.rs    |  Confirm / decline replies    |
//! |    sweeper.rs       |  Offer expiration             |
//! |    auto_offer.rs    |  Periodic auto-offer pass     |
//! |    manager.rs       |  Staff operations             |
//! +-----------------------------------------------------+
//! ```
//!
//! ## API Endpoints
//!
//! - `POST /waitlist/dispatch` - Offer a slot to the next waiting patient
//! - `POST /waitlist/webhooks/confirm` - Patient accepted
//! - `POST /waitlist/webhooks/decline` - Patient declined (re-offers when a slot is given)
//! - `POST /waitlist/entries/{id}/cancel` - Staff removes an entry
//! - `GET /waitlist/{id}/entries` - Entries of a list
//! - `POST /waitlist/cron/expire` - Expire unanswered offers (`x-cron-secret`)
//! - `GET|POST /waitlist/cron/auto-offer` - Offer free slots to idle lists (Bearer)
//!
//! Routes other than the cron triggers require the `x-webhook-secret` header.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shared_config::AppConfig;
//! use waitlist_cell::router::waitlist_routes;
//!
//! let config = Arc::new(AppConfig::from_env());
//! let routes = waitlist_routes(config);
//! ```

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::WaitlistError;
pub use models::*;
pub use router::{waitlist_routes, waitlist_routes_with_engine};
pub use services::*;
