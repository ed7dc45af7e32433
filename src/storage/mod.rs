//! Key-value persistence for per-user engine state.
//!
//! Every blob is a JSON value stored under a key namespaced by the user identifier, so
//! switching users never mixes state.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{init_store, SqliteStore};

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::FeedResult;
use crate::models::UserId;

/// Asynchronous string-keyed JSON store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a blob. Missing keys are `Ok(None)`.
    async fn get(&self, key: &str) -> FeedResult<Option<Value>>;

    /// Insert or overwrite a blob.
    async fn set(&self, key: &str, value: &Value) -> FeedResult<()>;

    /// Delete a blob. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> FeedResult<()>;
}

/// Storage key prefixes.
pub mod keys {
    use super::UserId;

    pub const VIEWED_ITEMS: &str = "viewed_items";
    pub const LIKED_ITEMS: &str = "liked_items";
    pub const DISLIKED_ITEMS: &str = "disliked_items";

    pub fn viewed_items(user_id: UserId) -> String {
        scoped(VIEWED_ITEMS, user_id)
    }

    pub fn liked_items(user_id: UserId) -> String {
        scoped(LIKED_ITEMS, user_id)
    }

    pub fn disliked_items(user_id: UserId) -> String {
        scoped(DISLIKED_ITEMS, user_id)
    }

    fn scoped(prefix: &str, user_id: UserId) -> String {
        format!("{}_{}", prefix, user_id)
    }
}
