//! Integration tests against an in-process catalog server and a SQLite store.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::client::{CatalogClient, HttpCatalogClient};
use crate::config::QueueSettings;
use crate::errors::FeedError;
use crate::models::{Decision, Facet, FeedbackRecord, FilterCriteria, ItemId, UserId};
use crate::session::SwipeSession;
use crate::storage::{init_store, KeyValueStore};

/// Catalog server state: scripted pages plus a log of what the client sent.
#[derive(Default)]
struct MockCatalog {
    pages: Mutex<VecDeque<Vec<Value>>>,
    queries: Mutex<Vec<HashMap<String, String>>>,
    feedback: Mutex<Vec<Value>>,
    fail_items: AtomicBool,
    fail_feedback: AtomicBool,
}

impl MockCatalog {
    fn push_page(&self, page: Vec<Value>) {
        self.pages.lock().unwrap().push_back(page);
    }

    fn queries(&self) -> Vec<HashMap<String, String>> {
        self.queries.lock().unwrap().clone()
    }

    fn feedback(&self) -> Vec<Value> {
        self.feedback.lock().unwrap().clone()
    }
}

async fn get_items(
    State(mock): State<Arc<MockCatalog>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Value>>, StatusCode> {
    mock.queries.lock().unwrap().push(params);
    if mock.fail_items.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    let page = mock.pages.lock().unwrap().pop_front().unwrap_or_default();
    Ok(Json(page))
}

async fn post_feedback(
    State(mock): State<Arc<MockCatalog>>,
    Json(body): Json<Value>,
) -> StatusCode {
    if mock.fail_feedback.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    mock.feedback.lock().unwrap().push(body);
    StatusCode::OK
}

/// Test fixture for integration tests.
struct TestFixture {
    mock: Arc<MockCatalog>,
    client: Arc<HttpCatalogClient>,
    temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let mock = Arc::new(MockCatalog::default());
        let app = Router::new()
            .route("/get_items", get(get_items))
            .route("/feedback", post(post_feedback))
            .with_state(mock.clone());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = HttpCatalogClient::new(format!("http://{}/", addr), Duration::from_secs(5))
            .expect("Failed to build client");

        TestFixture {
            mock,
            client: Arc::new(client),
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    async fn session(&self, user_id: i64) -> SwipeSession {
        let store = init_store(&self.temp_dir.path().join("swipe.sqlite"))
            .await
            .expect("Failed to init store");
        SwipeSession::new(
            UserId(user_id),
            self.client.clone(),
            Arc::new(store),
            QueueSettings::default(),
        )
    }
}

fn catalog_item(id: i64, styles: (&str, &str)) -> Value {
    json!({
        "id": id,
        "link": format!("https://cdn.example.com/{}.jpg", id),
        "name": format!("Item {}", id),
        "description": "",
        "category": "Topwear",
        "season": "Summer",
        "style1": styles.0,
        "style2": styles.1,
    })
}

fn page(ids: &[i64]) -> Vec<Value> {
    ids.iter().map(|id| catalog_item(*id, ("Casual", ""))).collect()
}

#[tokio::test]
async fn test_fetch_sends_only_present_facets() {
    let fixture = TestFixture::new().await;
    fixture.mock.push_page(vec![catalog_item(1, ("Casual", "Formal"))]);

    let filter = FilterCriteria::new()
        .with(Facet::Season, "Summer")
        .with(Facet::BaseColour, "Navy Blue");
    let items = fixture.client.fetch_items(&filter).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, ItemId::Int(1));
    assert_eq!(items[0].style_tags(), vec!["Casual", "Formal"]);

    let queries = fixture.mock.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].len(), 2);
    assert_eq!(queries[0]["season"], "Summer");
    assert_eq!(queries[0]["basecolour"], "Navy Blue");
}

#[tokio::test]
async fn test_fetch_tolerates_null_attributes() {
    let fixture = TestFixture::new().await;
    let mut sparse = catalog_item(2, ("Formal", ""));
    sparse["description"] = Value::Null;
    sparse["link"] = Value::Null;
    sparse["style2"] = Value::Null;
    fixture.mock.push_page(vec![catalog_item(1, ("Casual", "")), sparse]);

    let items = fixture.client.fetch_items(&FilterCriteria::new()).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].description, None);
    assert_eq!(items[1].style_tags(), vec!["Formal"]);
}

#[tokio::test]
async fn test_fetch_empty_page_is_not_an_error() {
    let fixture = TestFixture::new().await;
    let items = fixture.client.fetch_items(&FilterCriteria::new()).await.unwrap();
    assert!(items.is_empty());
    assert!(fixture.mock.queries()[0].is_empty());
}

#[tokio::test]
async fn test_fetch_server_error_is_fetch_error() {
    let fixture = TestFixture::new().await;
    fixture.mock.fail_items.store(true, Ordering::SeqCst);

    let err = fixture
        .client
        .fetch_items(&FilterCriteria::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FeedError::Fetch(_)));
}

#[tokio::test]
async fn test_fetch_unreachable_server_is_fetch_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client =
        HttpCatalogClient::new(format!("http://{}", addr), Duration::from_secs(2)).unwrap();
    let err = client.fetch_items(&FilterCriteria::new()).await.unwrap_err();
    assert_eq!(err.error_code(), "FETCH_ERROR");
}

#[tokio::test]
async fn test_submit_feedback_body() {
    let fixture = TestFixture::new().await;
    let record = FeedbackRecord {
        item_id: ItemId::Int(15),
        user_id: UserId(4),
        decision: Decision::Like,
    };

    fixture.client.submit_feedback(&record).await.unwrap();
    assert_eq!(
        fixture.mock.feedback(),
        vec![json!({ "item_id": 15, "user_id": 4, "feedback": "like" })]
    );

    fixture.mock.fail_feedback.store(true, Ordering::SeqCst);
    let err = fixture.client.submit_feedback(&record).await.unwrap_err();
    assert!(matches!(err, FeedError::Submit(_)));
}

#[tokio::test]
async fn test_session_end_to_end() {
    let fixture = TestFixture::new().await;
    fixture.mock.push_page(vec![
        catalog_item(1, ("Casual", "Sporty")),
        catalog_item(2, ("Formal", "")),
        catalog_item(3, ("Casual", "")),
        catalog_item(4, ("Vintage", "")),
        catalog_item(5, ("Casual", "")),
    ]);
    fixture.mock.push_page(page(&[6, 7]));

    let session = fixture.session(11).await;
    session.ensure_loaded().await.unwrap();
    assert_eq!(session.state().items.len(), 5);

    session.swipe(Decision::Like).await.unwrap();
    session.swipe(Decision::Dislike).await.unwrap();
    session.swipe(Decision::Like).await.unwrap();
    session.wait_for_refill().await;

    // 5 -> 4 left no refill; 4 -> 3 triggered one refill of two items.
    assert_eq!(fixture.mock.queries().len(), 2);
    assert_eq!(session.state().items.len(), 4);
    assert_eq!(fixture.mock.feedback().len(), 3);

    let shares = session.style_distribution();
    assert_eq!(shares[0].style, "Casual");
    assert_eq!(shares[0].count, 2);
    assert_eq!(shares[0].percentage, 100.0);
    assert_eq!(shares[1].style, "Sporty");
    assert_eq!(shares[1].percentage, 50.0);
}

#[tokio::test]
async fn test_state_survives_restart() {
    let fixture = TestFixture::new().await;
    fixture.mock.push_page(page(&[1, 2, 3, 4, 5, 6]));

    {
        let session = fixture.session(2).await;
        session.ensure_loaded().await.unwrap();
        session.swipe(Decision::Like).await.unwrap();
        session.swipe(Decision::Dislike).await.unwrap();
    }

    fixture.mock.push_page(page(&[1, 2, 8]));
    let session = fixture.session(2).await;
    session.ensure_loaded().await.unwrap();

    let queued: Vec<ItemId> = session.state().items.iter().map(|item| item.id.clone()).collect();
    assert_eq!(queued, vec![ItemId::Int(8)]);
    assert_eq!(session.liked_items()[0].id, ItemId::Int(1));
    assert_eq!(session.disliked_items()[0].id, ItemId::Int(2));

    // Another user on the same store starts from scratch.
    fixture.mock.push_page(page(&[1, 2]));
    let other = fixture.session(3).await;
    other.ensure_loaded().await.unwrap();
    assert_eq!(other.state().items.len(), 2);
    assert!(other.liked_items().is_empty());
}

#[tokio::test]
async fn test_failed_submission_is_kept_locally() {
    let fixture = TestFixture::new().await;
    fixture.mock.push_page(page(&[1, 2, 3, 4, 5]));
    fixture.mock.fail_feedback.store(true, Ordering::SeqCst);

    let session = fixture.session(1).await;
    session.ensure_loaded().await.unwrap();
    let err = session.swipe(Decision::Like).await.unwrap_err();
    assert!(err.is_retryable());

    let store = init_store(&fixture.temp_dir.path().join("swipe.sqlite"))
        .await
        .unwrap();
    let liked = store.get("liked_items_1").await.unwrap().unwrap();
    assert_eq!(liked[0]["id"], json!(1));
    let seen = store.get("viewed_items_1").await.unwrap().unwrap();
    assert_eq!(seen, json!([1]));
}

#[tokio::test]
async fn test_fetch_failure_keeps_queue_until_retry() {
    let fixture = TestFixture::new().await;
    fixture.mock.push_page(page(&[1, 2, 3, 4]));

    let session = fixture.session(1).await;
    session.ensure_loaded().await.unwrap();

    fixture.mock.fail_items.store(true, Ordering::SeqCst);
    // 4 -> 3 hits low water; the refill fails but the swipe itself succeeds.
    session.swipe(Decision::Like).await.unwrap();
    session.wait_for_refill().await;
    let state = session.state();
    assert_eq!(state.items.len(), 3);
    assert!(matches!(state.error, Some(FeedError::Fetch(_))));

    fixture.mock.fail_items.store(false, Ordering::SeqCst);
    fixture.mock.push_page(page(&[9]));
    assert_eq!(session.retry().await.unwrap(), 1);
    assert!(session.state().error.is_none());
    assert_eq!(session.state().items.len(), 4);
}
