use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use parking_lot::Mutex;
use std::sync::Arc;
use tower::ServiceExt;
use waypoint_cache::MokaLinkCache;
use waypoint_core::repository::{LinkStore, Result as StoreResult};
use waypoint_core::{
    AccessEvent, AccessSink, LinkRepository, ShortKey, ShortLinkRecord, SinkError, StorageError,
};
use waypoint_gateway::{App, AppState};
use waypoint_resolver::{ResolutionEngine, ResolverConfig};
use waypoint_storage::InMemoryRepository;

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<AccessEvent>>,
}

#[async_trait]
impl AccessSink for RecordingSink {
    async fn record(&self, event: &AccessEvent) -> Result<(), SinkError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

struct DownStore;

#[async_trait]
impl LinkStore for DownStore {
    async fn find_by_key(&self, _key: &ShortKey) -> StoreResult<Option<ShortLinkRecord>> {
        Err(StorageError::Unavailable("connection refused".to_string()))
    }
}

struct Fixture {
    router: Router,
    engine: Arc<ResolutionEngine>,
    sink: Arc<RecordingSink>,
}

async fn fixture_with_store(store: Arc<dyn LinkStore>) -> Fixture {
    let sink = Arc::new(RecordingSink::default());
    let engine = Arc::new(
        ResolutionEngine::new(
            ResolverConfig::default(),
            Arc::new(MokaLinkCache::new()),
            store,
            sink.clone(),
        )
        .unwrap(),
    );

    Fixture {
        router: App::router(AppState::new(engine.clone())),
        engine,
        sink,
    }
}

async fn fixture() -> Fixture {
    let repo = Arc::new(InMemoryRepository::new());
    repo.insert(ShortLinkRecord::new(
        ShortKey::new("abc123").unwrap(),
        "https://example.com/page",
        "owner-1",
    ))
    .await
    .unwrap();
    fixture_with_store(repo).await
}

async fn get(router: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

fn request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn known_key_redirects_with_found() {
    let f = fixture().await;

    let (status, headers, _) = get(&f.router, request("/r/abc123")).await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(
        headers.get(header::LOCATION).unwrap(),
        "https://example.com/page"
    );
}

#[tokio::test]
async fn unknown_key_is_404_json() {
    let f = fixture().await;

    let (status, _, body) = get(&f.router, request("/r/doesnotexist")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn malformed_key_is_400() {
    let f = fixture().await;

    let (status, _, body) = get(&f.router, request("/r/ab")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "invalid_short_key");
}

#[tokio::test]
async fn store_outage_is_503() {
    let f = fixture_with_store(Arc::new(DownStore)).await;

    let (status, _, body) = get(&f.router, request("/r/abc123")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "unavailable");
}

#[tokio::test]
async fn redirect_records_request_metadata() {
    let f = fixture().await;
    let request = Request::builder()
        .uri("/r/abc123")
        .header(header::REFERER, "https://news.example/item")
        .header(header::USER_AGENT, "Mozilla/5.0")
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .body(Body::empty())
        .unwrap();

    let (status, _, _) = get(&f.router, request).await;
    assert_eq!(status, StatusCode::FOUND);

    f.engine.shutdown().await;

    let events = f.sink.events.lock().clone();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.short_key.as_str(), "abc123");
    assert_eq!(event.destination_url, "https://example.com/page");
    assert_eq!(event.referrer.as_deref(), Some("https://news.example/item"));
    assert_eq!(event.user_agent.as_deref(), Some("Mozilla/5.0"));
    assert_eq!(event.client_addr.as_deref(), Some("203.0.113.7"));
}

#[tokio::test]
async fn health_reports_ok() {
    let f = fixture().await;

    let (status, _, body) = get(&f.router, request("/health")).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, serde_json::json!({ "status": "ok" }));
}
