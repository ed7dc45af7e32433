//! Feedback ledger: like/dislike history for one user.
//!
//! A decision is submitted to the catalog and then appended locally regardless of the
//! submission outcome, so the liked/disliked galleries always reflect what the user did.
//! Lists hold full item snapshots and are persisted write-behind.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::client::CatalogClient;
use crate::errors::{FeedError, FeedResult};
use crate::models::{Decision, FeedbackRecord, Item, StyleShare, UserId};
use crate::storage::{keys, KeyValueStore};

#[derive(Debug, Default)]
struct LedgerState {
    user_id: Option<UserId>,
    liked: Vec<Item>,
    disliked: Vec<Item>,
}

impl LedgerState {
    fn list_mut(&mut self, decision: Decision) -> &mut Vec<Item> {
        match decision {
            Decision::Like => &mut self.liked,
            Decision::Dislike => &mut self.disliked,
        }
    }
}

pub struct FeedbackLedger {
    client: Arc<dyn CatalogClient>,
    store: Arc<dyn KeyValueStore>,
    state: Mutex<LedgerState>,
    write_lock: tokio::sync::Mutex<()>,
}

impl FeedbackLedger {
    pub fn new(client: Arc<dyn CatalogClient>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            client,
            store,
            state: Mutex::new(LedgerState::default()),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Restore the liked and disliked lists of `user_id`.
    ///
    /// Each list falls back to empty on its own when missing, unreadable or corrupt.
    /// Returns `(liked, disliked)` counts.
    pub async fn load(&self, user_id: UserId) -> (usize, usize) {
        let liked_key = keys::liked_items(user_id);
        let disliked_key = keys::disliked_items(user_id);

        let (liked, disliked) = tokio::join!(
            self.read_list(&liked_key),
            self.read_list(&disliked_key)
        );

        let counts = (liked.len(), disliked.len());
        let mut state = self.state();
        state.user_id = Some(user_id);
        state.liked = liked;
        state.disliked = disliked;
        tracing::info!(
            "Loaded feedback for user {}: {} liked, {} disliked",
            user_id,
            counts.0,
            counts.1
        );
        counts
    }

    /// Record a decision on `item`.
    ///
    /// The decision is submitted first, then the item is appended to the local list and the
    /// list persisted. A submission failure is returned only after the local append; a
    /// persistence failure is logged and not returned.
    pub async fn record(&self, item: Item, decision: Decision) -> FeedResult<()> {
        let user_id = self.state().user_id.ok_or_else(|| {
            FeedError::NotLoaded("Feedback ledger has no user loaded".to_string())
        })?;

        let record = FeedbackRecord {
            item_id: item.id.clone(),
            user_id,
            decision,
        };
        let submitted = self.client.submit_feedback(&record).await;
        if let Err(e) = &submitted {
            tracing::warn!(
                "Feedback for item {} not delivered, keeping it locally: {}",
                record.item_id,
                e
            );
        }

        self.state().list_mut(decision).push(item);

        let _write = self.write_lock.lock().await;
        let snapshot = {
            let mut state = self.state();
            serde_json::to_value(&*state.list_mut(decision))
        };
        let key = match decision {
            Decision::Like => keys::liked_items(user_id),
            Decision::Dislike => keys::disliked_items(user_id),
        };
        match snapshot {
            Ok(value) => {
                if let Err(e) = self.store.set(&key, &value).await {
                    tracing::warn!("Error saving {}: {}", key, e);
                }
            }
            Err(e) => tracing::warn!("Error encoding {}: {}", key, e),
        }

        submitted
    }

    pub fn liked_items(&self) -> Vec<Item> {
        self.state().liked.clone()
    }

    pub fn disliked_items(&self) -> Vec<Item> {
        self.state().disliked.clone()
    }

    /// Style distribution over the liked list.
    pub fn style_distribution(&self) -> Vec<StyleShare> {
        style_distribution(&self.state().liked)
    }

    /// Empty both lists and remove their persisted entries.
    pub async fn clear(&self, user_id: UserId) {
        let _write = self.write_lock.lock().await;
        {
            let mut state = self.state();
            state.user_id = Some(user_id);
            state.liked.clear();
            state.disliked.clear();
        }

        let liked_key = keys::liked_items(user_id);
        let disliked_key = keys::disliked_items(user_id);
        let (liked, disliked) = tokio::join!(
            self.store.remove(&liked_key),
            self.store.remove(&disliked_key)
        );
        for (key, result) in [(liked_key, liked), (disliked_key, disliked)] {
            if let Err(e) = result {
                tracing::warn!("Error clearing {}: {}", key, e);
            }
        }
        tracing::info!("Cleared feedback for user {}", user_id);
    }

    async fn read_list(&self, key: &str) -> Vec<Item> {
        match self.store.get(key).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!("Discarding corrupt list {}: {}", key, e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Error loading {}: {}", key, e);
                Vec::new()
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Count each style tag over `liked` and express it as a percentage of the list size.
///
/// An item carrying several tags counts once towards each, so percentages may sum above 100.
/// Sorted by count descending, then by style name.
pub fn style_distribution(liked: &[Item]) -> Vec<StyleShare> {
    if liked.is_empty() {
        return Vec::new();
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for item in liked {
        for style in item.style_tags() {
            *counts.entry(style).or_insert(0) += 1;
        }
    }

    let total = liked.len() as f64;
    let mut shares: Vec<StyleShare> = counts
        .into_iter()
        .map(|(style, count)| StyleShare {
            style: style.to_string(),
            count,
            percentage: count as f64 / total * 100.0,
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count));
    shares
}
