//! HTTP implementation of the catalog client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::CatalogClient;
use crate::errors::{FeedError, FeedResult};
use crate::models::{FeedbackRecord, FilterCriteria, Item};

/// Catalog client speaking the service's JSON API:
/// `GET /get_items?<facet>=<value>` and `POST /feedback`.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
}

impl HttpCatalogClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> FeedResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Wrap an already configured `reqwest::Client`.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn fetch_items(&self, filter: &FilterCriteria) -> FeedResult<Vec<Item>> {
        let url = self.url("/get_items");
        let params = filter.query_pairs();
        tracing::debug!("API Request: GET {} {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| {
                tracing::warn!("Error fetching items: {}", e);
                FeedError::Fetch(format!("Failed to fetch items: {}", e))
            })?;

        tracing::debug!("API Response: {} {}", response.status(), url);

        response
            .json::<Vec<Item>>()
            .await
            .map_err(|e| FeedError::Fetch(format!("Failed to decode items: {}", e)))
    }

    async fn submit_feedback(&self, record: &FeedbackRecord) -> FeedResult<()> {
        let url = self.url("/feedback");
        tracing::debug!(
            "API Request: POST {} item={} decision={}",
            url,
            record.item_id,
            record.decision.as_str()
        );

        let response = self
            .client
            .post(&url)
            .json(record)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| {
                tracing::warn!("Error sending feedback: {}", e);
                FeedError::Submit(format!("Failed to send feedback: {}", e))
            })?;

        tracing::debug!("API Response: {} {}", response.status(), url);
        Ok(())
    }
}
