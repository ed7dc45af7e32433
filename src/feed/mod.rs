//! Feed queue: the ordered, not-yet-decided items a user sees next.
//!
//! Pages are fetched from the catalog under the active filter, stripped of seen items and
//! appended to the tail. At most one fetch is in flight at a time; a page that arrives after
//! the filter changed (or the queue was cleared) is discarded and the current filter fetched
//! instead. Refills triggered by `advance` run as a background task.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use crate::cache::SeenCache;
use crate::client::CatalogClient;
use crate::config::QueueSettings;
use crate::errors::{FeedError, FeedResult};
use crate::models::{FilterCriteria, Item};

/// Where the queue is in its fetch lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    /// Nothing requested yet, or the queue was cleared
    Idle,
    /// A fetch is in flight
    Loading,
    /// The last fetch added items
    Ready,
    /// The catalog returned an empty page under the active filter
    Exhausted,
    /// The last fetch failed; queued items are untouched
    Errored,
}

/// Observable queue state.
#[derive(Debug, Clone)]
pub struct QueueState {
    pub items: VecDeque<Item>,
    pub is_loading: bool,
    pub error: Option<FeedError>,
    pub has_more: bool,
    pub active_filter: FilterCriteria,
    pub phase: FeedPhase,
    // Bumped whenever queued items stop being comparable with an outstanding request.
    epoch: u64,
}

impl Default for QueueState {
    fn default() -> Self {
        Self {
            items: VecDeque::new(),
            is_loading: false,
            error: None,
            has_more: true,
            active_filter: FilterCriteria::default(),
            phase: FeedPhase::Idle,
            epoch: 0,
        }
    }
}

impl QueueState {
    fn settled_phase(&self) -> FeedPhase {
        if self.items.is_empty() {
            FeedPhase::Idle
        } else {
            FeedPhase::Ready
        }
    }
}

pub struct FeedQueue {
    client: Arc<dyn CatalogClient>,
    seen: Arc<SeenCache>,
    settings: QueueSettings,
    state: Mutex<QueueState>,
    in_flight: AtomicBool,
    refill: Mutex<Option<JoinHandle<()>>>,
}

/// Holds the in-flight flag for the duration of one fetch and releases it on every exit path.
struct InFlight<'a> {
    queue: &'a FeedQueue,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        {
            let mut state = self.queue.state();
            state.is_loading = false;
            if state.phase == FeedPhase::Loading {
                state.phase = state.settled_phase();
            }
        }
        self.queue.in_flight.store(false, Ordering::SeqCst);
    }
}

impl FeedQueue {
    pub fn new(
        client: Arc<dyn CatalogClient>,
        seen: Arc<SeenCache>,
        settings: QueueSettings,
    ) -> Self {
        Self {
            client,
            seen,
            settings,
            state: Mutex::new(QueueState::default()),
            in_flight: AtomicBool::new(false),
            refill: Mutex::new(None),
        }
    }

    /// Fetch and enqueue the next page.
    ///
    /// A `filter` unequal to the active one resets the queue first. When a fetch is already
    /// in flight this is a no-op returning `Ok(0)`; the running fetch picks up a filter change
    /// on completion. Returns the number of items appended.
    pub async fn load_more(&self, filter: Option<FilterCriteria>) -> FeedResult<usize> {
        if let Some(filter) = filter {
            self.reset_for_filter(filter);
        }

        let Some(_in_flight) = self.begin_fetch() else {
            tracing::debug!("Fetch already in flight, skipping load");
            return Ok(0);
        };

        self.fetch_pages().await
    }

    /// Switch to `filter`, clearing the queue if it differs from the active one, and load.
    pub async fn apply_filters(&self, filter: FilterCriteria) -> FeedResult<usize> {
        self.load_more(Some(filter)).await
    }

    /// Fetch again after an error under the active filter.
    pub async fn retry(&self) -> FeedResult<usize> {
        self.load_more(None).await
    }

    /// Head of the queue, without removing it.
    pub fn peek_next(&self) -> Option<Item> {
        self.state().items.front().cloned()
    }

    /// Remove the head item.
    ///
    /// Call only once the item's decision is recorded and the item marked seen. When the
    /// queue drops to the low-water mark while more content is available and no fetch is
    /// running, a refill is spawned on the current tokio runtime and this returns without
    /// waiting for it. The fetch counts as in flight from the moment this returns; its
    /// failure is reflected in the state.
    pub fn advance(self: &Arc<Self>) -> Option<Item> {
        let (removed, refill) = {
            let mut state = self.state();
            let removed = state.items.pop_front();
            let refill = state.items.len() <= self.settings.low_water
                && state.has_more
                && state.phase != FeedPhase::Errored
                && self.claim_fetch();
            if refill {
                state.is_loading = true;
                state.phase = FeedPhase::Loading;
            }
            (removed, refill)
        };

        if refill {
            tracing::debug!("Queue at low water, refilling in the background");
            let queue = Arc::clone(self);
            let handle = tokio::spawn(async move {
                let _in_flight = InFlight { queue: &queue };
                if let Err(e) = queue.fetch_pages().await {
                    tracing::warn!("Low-water refill failed: {}", e);
                }
            });
            *self.refill_task() = Some(handle);
        }

        removed
    }

    /// Wait for the most recent background refill, if one was started.
    pub async fn wait_for_refill(&self) {
        let handle = self.refill_task().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("Refill task failed: {}", e);
            }
        }
    }

    /// Drop all queued items and return to an unfiltered, idle queue.
    pub fn clear_queue(&self) {
        let mut state = self.state();
        let epoch = state.epoch + 1;
        *state = QueueState {
            epoch,
            is_loading: self.in_flight.load(Ordering::SeqCst),
            ..QueueState::default()
        };
        tracing::debug!("Queue cleared");
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> QueueState {
        self.state().clone()
    }

    pub fn len(&self) -> usize {
        self.state().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().items.is_empty()
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reset_for_filter(&self, filter: FilterCriteria) {
        let mut state = self.state();
        if state.active_filter == filter {
            return;
        }

        tracing::debug!("Filter changed to {:?}, resetting queue", filter);
        state.items.clear();
        state.error = None;
        state.has_more = true;
        state.active_filter = filter;
        state.epoch += 1;
        state.phase = FeedPhase::Loading;
        state.is_loading = true;
    }

    fn refill_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.refill.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn claim_fetch(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn begin_fetch(&self) -> Option<InFlight<'_>> {
        self.claim_fetch().then(|| InFlight { queue: self })
    }

    async fn fetch_pages(&self) -> FeedResult<usize> {
        let max_empty_pages = self.settings.max_empty_pages.max(1);
        let mut empty_pages = 0;

        loop {
            let (filter, epoch) = {
                let mut state = self.state();
                state.is_loading = true;
                state.error = None;
                state.phase = FeedPhase::Loading;
                (state.active_filter.clone(), state.epoch)
            };

            let result = self.client.fetch_items(&filter).await;

            let mut state = self.state();
            if state.epoch != epoch {
                tracing::warn!("Discarding page fetched for superseded filter {:?}", filter);
                empty_pages = 0;
                continue;
            }

            let page = match result {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!("Error loading items: {}", e);
                    state.error = Some(e.clone());
                    state.phase = FeedPhase::Errored;
                    return Err(e);
                }
            };

            if page.is_empty() {
                tracing::debug!("Catalog exhausted for filter {:?}", filter);
                state.has_more = false;
                state.phase = FeedPhase::Exhausted;
                return Ok(0);
            }

            let raw = page.len();
            let mut queued: HashSet<_> = state.items.iter().map(|item| item.id.clone()).collect();
            let fresh: Vec<Item> = self
                .seen
                .filter_unseen(page)
                .into_iter()
                .filter(|item| queued.insert(item.id.clone()))
                .collect();

            if fresh.is_empty() {
                empty_pages += 1;
                if empty_pages >= max_empty_pages {
                    tracing::warn!(
                        "Giving up after {} consecutive pages of already seen items",
                        empty_pages
                    );
                    state.phase = state.settled_phase();
                    return Ok(0);
                }
                tracing::debug!("All {} fetched items already seen, fetching again", raw);
                continue;
            }

            let added = fresh.len();
            state.items.extend(fresh);
            state.has_more = true;
            state.phase = FeedPhase::Ready;
            tracing::debug!("Queued {} of {} fetched items", added, raw);
            return Ok(added);
        }
    }
}
