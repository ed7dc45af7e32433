//! Swipe session: the presentation-facing entry point for one user.
//!
//! Owns the seen cache, the feedback ledger and the feed queue, and sequences a swipe so
//! that an item leaves the queue only after its decision is recorded and it is marked seen.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cache::SeenCache;
use crate::client::CatalogClient;
use crate::config::QueueSettings;
use crate::errors::FeedResult;
use crate::feed::{FeedQueue, QueueState};
use crate::ledger::FeedbackLedger;
use crate::models::{Decision, FilterCriteria, Item, StyleShare, UserId};
use crate::storage::KeyValueStore;

pub struct SwipeSession {
    user_id: UserId,
    seen: Arc<SeenCache>,
    ledger: FeedbackLedger,
    queue: Arc<FeedQueue>,
    loaded: AtomicBool,
}

impl SwipeSession {
    pub fn new(
        user_id: UserId,
        client: Arc<dyn CatalogClient>,
        store: Arc<dyn KeyValueStore>,
        settings: QueueSettings,
    ) -> Self {
        let seen = Arc::new(SeenCache::new(store.clone()));
        let ledger = FeedbackLedger::new(client.clone(), store);
        let queue = Arc::new(FeedQueue::new(client, seen.clone(), settings));
        Self {
            user_id,
            seen,
            ledger,
            queue,
            loaded: AtomicBool::new(false),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Load persisted state for the user and fetch the first page. Runs once per session.
    ///
    /// Persisted state is loaded before the first fetch so the page is deduplicated against it.
    pub async fn ensure_loaded(&self) -> FeedResult<()> {
        if self.loaded.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        tokio::join!(self.seen.load(self.user_id), self.ledger.load(self.user_id));
        self.queue.load_more(None).await.map(|_| ())
    }

    /// The card on top of the stack.
    pub fn current(&self) -> Option<Item> {
        self.queue.peek_next()
    }

    /// Decide on the current card.
    ///
    /// Records the decision, marks the item seen, then advances the queue. A refill started
    /// by the advance runs in the background. Returns the decided item, or `None` when the
    /// queue is empty. A failed submission is returned as an error after all local steps have
    /// completed.
    pub async fn swipe(&self, decision: Decision) -> FeedResult<Option<Item>> {
        let Some(item) = self.queue.peek_next() else {
            return Ok(None);
        };

        let recorded = self.ledger.record(item.clone(), decision).await;
        if let Err(e) = &recorded {
            if !e.is_retryable() {
                // Nothing was stored, keep the card on top.
                return Err(e.clone());
            }
        }

        self.seen.mark_seen(item.id.clone()).await;
        self.queue.advance();

        recorded.map(|_| Some(item))
    }

    pub async fn load_more(&self, filter: Option<FilterCriteria>) -> FeedResult<usize> {
        self.queue.load_more(filter).await
    }

    pub async fn apply_filters(&self, filter: FilterCriteria) -> FeedResult<usize> {
        self.queue.apply_filters(filter).await
    }

    pub async fn retry(&self) -> FeedResult<usize> {
        self.queue.retry().await
    }

    /// Wait for a background refill started by a swipe.
    pub async fn wait_for_refill(&self) {
        self.queue.wait_for_refill().await
    }

    pub fn state(&self) -> QueueState {
        self.queue.snapshot()
    }

    pub fn liked_items(&self) -> Vec<Item> {
        self.ledger.liked_items()
    }

    pub fn disliked_items(&self) -> Vec<Item> {
        self.ledger.disliked_items()
    }

    pub fn style_distribution(&self) -> Vec<StyleShare> {
        self.ledger.style_distribution()
    }

    /// Forget everything about the user: feedback history, seen set and the current queue.
    pub async fn clear_all_data(&self) {
        tokio::join!(self.ledger.clear(self.user_id), self.seen.clear(self.user_id));
        self.queue.clear_queue();
        tracing::info!("Cleared all data for user {}", self.user_id);
    }
}
