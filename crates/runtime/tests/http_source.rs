use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use runtime::{EventSource, FetchError, HttpSource, Monitor, OccupancySnapshot, WatchPublisher};
use serde_json::json;
use storage::{EventStore, RawEvent};

/// Serve `router` on an ephemeral local port and return its base URL.
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

fn provider() -> Router {
    Router::new()
        .route(
            "/api/donnees",
            get(|| async {
                Json(json!([
                    {"timestamp": "2024-03-01T09:00:00", "type": "entree", "value": 5},
                    {"timestamp": "2024-03-01T09:05:00", "type": "entree", "value": 3},
                    {"timestamp": "2024-03-01T09:10:00", "type": "sortie", "value": 2},
                ]))
            }),
        )
        .route(
            "/api/partial",
            get(|| async {
                Json(json!([
                    {"timestamp": "2024-03-01T09:00:00", "type": "entree", "value": 4},
                    {"timestamp": "2024-03-01T09:01:00", "value": 1},
                ]))
            }),
        )
        .route(
            "/api/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route("/api/garbage", get(|| async { "<html>not json</html>" }))
        .route("/api/object", get(|| async { Json(json!({"rows": []})) }))
}

fn source(base: &str, path: &str) -> HttpSource {
    HttpSource::builder(format!("{base}{path}")).build().unwrap()
}

#[tokio::test]
async fn fetch_decodes_rows() {
    let base = serve(provider()).await;
    let rows = source(&base, "/api/donnees").fetch().await.unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2], RawEvent::new("2024-03-01T09:10:00", "sortie", 2));
}

#[tokio::test]
async fn missing_fields_survive_decoding() {
    let base = serve(provider()).await;
    let rows = source(&base, "/api/partial").fetch().await.unwrap();

    assert_eq!(rows.len(), 2);
    assert!(rows[0].validate().is_ok());
    assert!(rows[1].validate().is_err());
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let base = serve(provider()).await;
    let err = source(&base, "/api/broken").fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Status(500)), "{err}");

    let err = source(&base, "/api/missing").fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Status(404)), "{err}");
}

#[tokio::test]
async fn undecodable_body_is_reported() {
    let base = serve(provider()).await;
    let err = source(&base, "/api/garbage").fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)), "{err}");

    let err = source(&base, "/api/object").fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)), "{err}");
}

#[tokio::test]
async fn monitor_over_http_keeps_appending() {
    let base = serve(provider()).await;
    let (publisher, updates) = WatchPublisher::channel();
    let mut monitor = Monitor::new(
        EventStore::in_memory().unwrap(),
        source(&base, "/api/donnees"),
        publisher,
    );

    monitor.tick().await;
    assert_eq!(
        updates.borrow().as_ref().and_then(|p| p.snapshot.current()),
        Some(6)
    );

    monitor.tick().await;
    assert_eq!(monitor.store().count().unwrap(), 6);
    assert_eq!(
        updates.borrow().as_ref().and_then(|p| p.snapshot.current()),
        Some(12)
    );
}

#[tokio::test]
async fn monitor_with_failing_provider_shows_waiting_state() {
    let base = serve(provider()).await;
    let (publisher, updates) = WatchPublisher::channel();
    let mut monitor = Monitor::new(
        EventStore::in_memory().unwrap(),
        source(&base, "/api/broken"),
        publisher,
    );

    let report = monitor.tick().await;

    assert!(report.fetch_failed);
    assert_eq!(
        updates.borrow().as_ref().map(|p| p.snapshot.clone()),
        Some(OccupancySnapshot::NoData)
    );
}
