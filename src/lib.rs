//! Swipe Feed
//!
//! Feed queue, dedup cache and feedback ledger behind a swipe-to-rate catalog browser.
//! Items are fetched page by page from a remote catalog, filtered against what the user has
//! already seen, and decided on one at a time; decisions and the seen set persist per user.

pub mod cache;
pub mod client;
pub mod config;
pub mod errors;
pub mod feed;
pub mod ledger;
pub mod models;
pub mod session;
pub mod storage;

pub use cache::SeenCache;
pub use client::{CatalogClient, HttpCatalogClient};
pub use config::{Config, QueueSettings};
pub use errors::{FeedError, FeedResult};
pub use feed::{FeedPhase, FeedQueue, QueueState};
pub use ledger::FeedbackLedger;
pub use models::{
    Decision, Facet, FeedbackRecord, FilterCriteria, Item, ItemId, StyleShare, UserId,
};
pub use session::SwipeSession;
pub use storage::{init_store, KeyValueStore, MemoryStore, SqliteStore};

#[cfg(test)]
mod testing;

#[cfg(test)]
mod tests;
