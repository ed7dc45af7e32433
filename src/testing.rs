//! Test doubles shared by the unit and integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{RwLock, RwLockWriteGuard};

use crate::client::CatalogClient;
use crate::errors::{FeedError, FeedResult};
use crate::models::{FeedbackRecord, FilterCriteria, Item};
use crate::storage::{KeyValueStore, MemoryStore};

pub fn items(ids: &[i64]) -> Vec<Item> {
    ids.iter()
        .map(|id| Item::new(*id, format!("item {}", id)))
        .collect()
}

pub fn ids(items: &[Item]) -> Vec<i64> {
    items
        .iter()
        .map(|item| match &item.id {
            crate::models::ItemId::Int(id) => *id,
            crate::models::ItemId::Text(id) => panic!("unexpected text id {}", id),
        })
        .collect()
}

/// Catalog that replays scripted pages and records every call.
///
/// Each fetch yields to the scheduler once before answering so that concurrent callers
/// can observe the request in flight. When the script runs out, pages are empty.
#[derive(Default)]
pub struct ScriptedCatalog {
    fetch_gate: RwLock<()>,
    pages: Mutex<VecDeque<FeedResult<Vec<Item>>>>,
    fetches: Mutex<Vec<FilterCriteria>>,
    submissions: Mutex<Vec<FeedbackRecord>>,
    fail_submits: AtomicBool,
    fetch_count: AtomicUsize,
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&self, page: FeedResult<Vec<Item>>) {
        self.pages.lock().unwrap().push_back(page);
    }

    pub fn push_items(&self, ids: &[i64]) {
        self.push_page(Ok(items(ids)));
    }

    /// Fetches started while the guard is alive wait until it is dropped.
    pub async fn hold_fetches(&self) -> RwLockWriteGuard<'_, ()> {
        self.fetch_gate.write().await
    }

    pub fn fail_submits(&self, fail: bool) {
        self.fail_submits.store(fail, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn fetched_filters(&self) -> Vec<FilterCriteria> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> Vec<FeedbackRecord> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogClient for ScriptedCatalog {
    async fn fetch_items(&self, filter: &FilterCriteria) -> FeedResult<Vec<Item>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.fetches.lock().unwrap().push(filter.clone());
        let _open = self.fetch_gate.read().await;
        tokio::task::yield_now().await;
        self.pages.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
    }

    async fn submit_feedback(&self, record: &FeedbackRecord) -> FeedResult<()> {
        if self.fail_submits.load(Ordering::SeqCst) {
            return Err(FeedError::Submit("Failed to send feedback".to_string()));
        }
        self.submissions.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Memory store whose reads and writes can be switched to fail.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    write_gate: RwLock<()>,
    writes_started: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store on which every operation fails.
    pub fn broken() -> Self {
        let store = Self::new();
        store.fail_reads(true);
        store.fail_writes(true);
        store
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Writes started while the guard is alive wait until it is dropped.
    pub async fn hold_writes(&self) -> RwLockWriteGuard<'_, ()> {
        self.write_gate.write().await
    }

    pub fn writes_started(&self) -> usize {
        self.writes_started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, key: &str) -> FeedResult<Option<Value>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(FeedError::Persistence(format!("read of {} failed", key)));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &Value) -> FeedResult<()> {
        self.writes_started.fetch_add(1, Ordering::SeqCst);
        let _open = self.write_gate.read().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(FeedError::Persistence(format!("write of {} failed", key)));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> FeedResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(FeedError::Persistence(format!("remove of {} failed", key)));
        }
        self.inner.remove(key).await
    }
}
