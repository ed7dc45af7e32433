//! Remote catalog access.
//!
//! The engine only needs two calls from the catalog service: a page of items for a filter,
//! and a feedback submission.

mod http;

pub use http::HttpCatalogClient;

use async_trait::async_trait;

use crate::errors::FeedResult;
use crate::models::{FeedbackRecord, FilterCriteria, Item};

#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch the next page of items matching `filter`.
    ///
    /// An empty page means the catalog has nothing more under this filter. Transport and
    /// server failures are `FeedError::Fetch`, never an empty page.
    async fn fetch_items(&self, filter: &FilterCriteria) -> FeedResult<Vec<Item>>;

    /// Submit one like/dislike decision. Failures are `FeedError::Submit`.
    async fn submit_feedback(&self, record: &FeedbackRecord) -> FeedResult<()>;
}
