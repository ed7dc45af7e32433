//! Dedup cache of items a user has already been shown.
//!
//! The seen set is write-behind: `mark_seen` updates memory synchronously and then persists
//! the whole set. A failed write is logged and leaves memory untouched; the worst outcome is
//! a repeated card in a later session.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::models::{Item, ItemId, UserId};
use crate::storage::{keys, KeyValueStore};

#[derive(Debug, Default)]
struct SeenState {
    user_id: Option<UserId>,
    seen: HashSet<ItemId>,
}

/// Per-user set of seen item identifiers.
pub struct SeenCache {
    store: Arc<dyn KeyValueStore>,
    state: Mutex<SeenState>,
    // Serializes persistence so a slower write never overwrites a newer snapshot.
    write_lock: tokio::sync::Mutex<()>,
}

impl SeenCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            state: Mutex::new(SeenState::default()),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Restore the seen set of `user_id`, replacing whatever was in memory.
    ///
    /// Missing, unreadable or corrupt data yields an empty set. Returns the restored size.
    pub async fn load(&self, user_id: UserId) -> usize {
        let key = keys::viewed_items(user_id);
        let restored: HashSet<ItemId> = match self.store.get(&key).await {
            Ok(Some(value)) => match serde_json::from_value::<Vec<ItemId>>(value) {
                Ok(ids) => ids.into_iter().collect(),
                Err(e) => {
                    tracing::warn!("Discarding corrupt seen set {}: {}", key, e);
                    HashSet::new()
                }
            },
            Ok(None) => HashSet::new(),
            Err(e) => {
                tracing::warn!("Error loading viewed items for user {}: {}", user_id, e);
                HashSet::new()
            }
        };

        let count = restored.len();
        let mut state = self.state();
        state.user_id = Some(user_id);
        state.seen = restored;
        tracing::info!("Loaded {} seen items for user {}", count, user_id);
        count
    }

    /// Record `item_id` as seen and persist the set.
    ///
    /// Returns false when the identifier was already present; nothing is written then.
    pub async fn mark_seen(&self, item_id: ItemId) -> bool {
        if !self.state().seen.insert(item_id) {
            return false;
        }

        let _write = self.write_lock.lock().await;
        let (user_id, snapshot) = {
            let state = self.state();
            let mut ids: Vec<&ItemId> = state.seen.iter().collect();
            ids.sort();
            (state.user_id, serde_json::to_value(ids))
        };

        let Some(user_id) = user_id else {
            tracing::warn!("Seen set has no user loaded; keeping it in memory only");
            return true;
        };

        match snapshot {
            Ok(value) => self.persist(user_id, &value).await,
            Err(e) => tracing::warn!("Error encoding viewed items: {}", e),
        }
        true
    }

    /// Candidates whose identifier is not in the seen set, in input order.
    pub fn filter_unseen(&self, candidates: Vec<Item>) -> Vec<Item> {
        let state = self.state();
        candidates
            .into_iter()
            .filter(|item| !state.seen.contains(&item.id))
            .collect()
    }

    pub fn contains(&self, item_id: &ItemId) -> bool {
        self.state().seen.contains(item_id)
    }

    pub fn len(&self) -> usize {
        self.state().seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().seen.is_empty()
    }

    /// User the set is currently scoped to, if any.
    pub fn user_id(&self) -> Option<UserId> {
        self.state().user_id
    }

    /// Empty the in-memory set and remove the persisted entry of `user_id`.
    pub async fn clear(&self, user_id: UserId) {
        let _write = self.write_lock.lock().await;
        {
            let mut state = self.state();
            state.seen.clear();
            state.user_id = Some(user_id);
        }

        match self.store.remove(&keys::viewed_items(user_id)).await {
            Ok(()) => tracing::info!("Cleared viewed items for user {}", user_id),
            Err(e) => tracing::warn!("Error clearing viewed items for user {}: {}", user_id, e),
        }
    }

    async fn persist(&self, user_id: UserId, value: &Value) {
        if let Err(e) = self.store.set(&keys::viewed_items(user_id), value).await {
            tracing::warn!("Error saving viewed items for user {}: {}", user_id, e);
        }
    }

    fn state(&self) -> MutexGuard<'_, SeenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
