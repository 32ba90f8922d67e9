mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusBuilder;
use rust_decimal::Decimal;
use tower::ServiceExt;

use pricewatch::api::router::create_router;
use pricewatch::config::{AppConfig, ConfigError};
use pricewatch::db::MemoryPriceStore;
use pricewatch::models::{MatchStatus, TrackedProduct};
use pricewatch::run_log::{ArtifactStore, MemoryArtifactStore};
use pricewatch::AppState;

use common::{raw_product, tracked, StubPriceSource};

fn test_config(api_token: Option<&str>) -> AppConfig {
    AppConfig {
        database_url: "postgres://localhost/pricewatch_test".into(),
        host: "127.0.0.1".into(),
        port: 0,
        api_token: api_token.map(String::from),
        heb_search_url: "http://127.0.0.1:1/search".into(),
        heb_seller_id: "1".into(),
        log_dir: None,
        storage_url: None,
        storage_service_key: None,
        log_bucket: "scraper-logs".into(),
        batch_size: 15,
        request_delay_ms: 2_000,
        savings_threshold: Decimal::new(15, 2),
        scrape_interval_secs: None,
    }
}

struct TestApp {
    state: AppState,
    store: Arc<MemoryPriceStore>,
}

fn build_test_app(
    products: Vec<TrackedProduct>,
    source: StubPriceSource,
    artifacts: Result<Arc<dyn ArtifactStore>, ConfigError>,
    api_token: Option<&str>,
) -> TestApp {
    let store = Arc::new(MemoryPriceStore::new(products));
    let state = AppState {
        config: test_config(api_token),
        store: store.clone(),
        source: Arc::new(source),
        artifacts,
        run_guard: Arc::new(tokio::sync::Mutex::new(())),
        metrics_handle: PrometheusBuilder::new().build_recorder().handle(),
    };
    TestApp { state, store }
}

fn memory_artifacts() -> Result<Arc<dyn ArtifactStore>, ConfigError> {
    Ok(Arc::new(MemoryArtifactStore::default()))
}

async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = create_router(app.state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn trigger(method: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri("/scrape-heb-prices")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_trigger_reports_completed_run() {
    let product = tracked("cafe", "Café 400g", Decimal::from(15), MatchStatus::Pending);
    let source = StubPriceSource::default().with(
        "cafe",
        vec![raw_product("1", "Café HEB", &[("1", Decimal::from(10), Decimal::from(10), 5)])],
    );
    let app = build_test_app(vec![product], source, memory_artifacts(), None);

    let (status, json) = send(&app, trigger("POST")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "completed");
    assert_eq!(json["processed"], 1);
    assert_eq!(json["matched"], 1);
    assert_eq!(json["not_found"], 0);
    assert_eq!(json["alerts_created"], 1);
    assert_eq!(json["errors"], 0);
    assert_eq!(json["total_products_in_batch"], 1);
    assert!(json["run_id"].as_str().unwrap().starts_with("run_"));
    assert!(json["log_folder"].as_str().unwrap().starts_with("runs/"));
    assert!(json["message"].as_str().unwrap().contains("1 alerts created"));
    assert_eq!(app.store.alerts().len(), 1);
}

#[tokio::test]
async fn test_trigger_accepts_get() {
    let app = build_test_app(vec![], StubPriceSource::default(), memory_artifacts(), None);

    let (status, json) = send(&app, trigger("GET")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "No products to scrape");
    assert_eq!(json["processed"], 0);
    assert!(json["run_id"].is_string());
}

#[tokio::test]
async fn test_trigger_without_storage_config_fails() {
    let app = build_test_app(
        vec![tracked("x", "X", Decimal::from(1), MatchStatus::Pending)],
        StubPriceSource::default(),
        Err(ConfigError("STORAGE_URL")),
        None,
    );

    let (status, json) = send(&app, trigger("POST")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Missing STORAGE_URL");
    // Nothing was touched.
    assert!(app.store.snapshots().is_empty());
}

#[tokio::test]
async fn test_trigger_batch_fetch_failure() {
    let app = build_test_app(vec![], StubPriceSource::default(), memory_artifacts(), None);
    app.store.fail_due_fetch();

    let (status, json) = send(&app, trigger("POST")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Failed to fetch tracked products");
    assert_eq!(json["details"], "connection refused");
}

#[tokio::test]
async fn test_options_is_noop() {
    let product = tracked("cafe", "Café", Decimal::from(15), MatchStatus::Pending);
    let app = build_test_app(vec![product.clone()], StubPriceSource::default(), memory_artifacts(), Some("secret"));

    let resp = create_router(app.state.clone())
        .oneshot(trigger("OPTIONS"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ok");
    assert!(app.store.product(product.id).unwrap().last_scraped_at.is_none());
}

#[tokio::test]
async fn test_trigger_requires_token_when_configured() {
    let app = build_test_app(vec![], StubPriceSource::default(), memory_artifacts(), Some("secret"));

    let (status, json) = send(&app, trigger("POST")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Unauthorized");

    let wrong = Request::builder()
        .method("POST")
        .uri("/scrape-heb-prices")
        .header("authorization", "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let authorized = Request::builder()
        .method("POST")
        .uri("/scrape-heb-prices")
        .header("authorization", "Bearer secret")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app, authorized).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["processed"], 0);
}

#[tokio::test]
async fn test_overlapping_trigger_is_rejected() {
    let app = build_test_app(vec![], StubPriceSource::default(), memory_artifacts(), None);
    let _running = app.state.run_guard.lock().await;

    let (status, json) = send(&app, trigger("POST")).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("already in progress"));
}

#[tokio::test]
async fn test_health_check() {
    let app = build_test_app(vec![], StubPriceSource::default(), memory_artifacts(), Some("secret"));

    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, json) = send(&app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_health_reports_missing_storage() {
    let app = build_test_app(
        vec![],
        StubPriceSource::default(),
        Err(ConfigError("STORAGE_SERVICE_KEY")),
        None,
    );

    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, json) = send(&app, req).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["db"], "connected");
    assert_eq!(json["log_storage"], "Missing STORAGE_SERVICE_KEY");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = build_test_app(vec![], StubPriceSource::default(), memory_artifacts(), None);

    let resp = create_router(app.state.clone())
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_run_finishes_after_caller_disconnects() {
    let a = tracked("arroz", "Arroz", Decimal::from(30), MatchStatus::Pending);
    let b = tracked("frijol", "Frijol", Decimal::from(30), MatchStatus::Pending);
    let artifacts = Arc::new(MemoryArtifactStore::default());
    let mut app = build_test_app(
        vec![a.clone(), b.clone()],
        StubPriceSource::default(),
        Ok(artifacts.clone() as Arc<dyn ArtifactStore>),
        None,
    );
    app.state.config.request_delay_ms = 500;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = create_router(app.state.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // The client gives up while the run is waiting between products.
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let result = client
        .post(format!("http://{addr}/scrape-heb-prices"))
        .send()
        .await;
    assert!(result.is_err());

    let mut flushed = None;
    for _ in 0..50 {
        flushed = artifacts
            .paths()
            .into_iter()
            .find(|p| p.ends_with("/full_run.json"));
        if flushed.is_some() && app.state.run_guard.try_lock().is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let full_run = flushed.expect("run log should be flushed after the caller left");
    assert_eq!(app.store.product(a.id).unwrap().status(), MatchStatus::NotFound);
    assert_eq!(app.store.product(b.id).unwrap().status(), MatchStatus::NotFound);

    let full = artifacts.get_json(&full_run).unwrap();
    assert_eq!(full["summary"]["processed"], 2);
    assert_eq!(full["summary"]["status"], "completed");
}
