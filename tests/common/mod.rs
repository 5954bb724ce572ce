#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use package_tracker::{
    models::api_key::ApiKey,
    routes::routes::app,
    services::AppState,
    store::{TrackingStore, memory::MemoryStore, sqlite::SqliteStore},
};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower::ServiceExt;

pub const ACME_KEY: &str = "acme-key";
pub const MAILWIND_KEY: &str = "mailwind-key";

async fn seed(store: &dyn TrackingStore) {
    let operators = [(ACME_KEY, "ACME", "US"), (MAILWIND_KEY, "MAILWIND", "GB")];
    for (key, operator, country_code) in operators {
        store
            .insert_api_key(ApiKey {
                key: key.into(),
                operator_name: operator.into(),
                country_code: country_code.into(),
            })
            .await
            .expect("seed key");
    }
}

pub async fn memory_app() -> (Router, Arc<dyn TrackingStore>) {
    let store: Arc<dyn TrackingStore> = Arc::new(MemoryStore::new());
    seed(store.as_ref()).await;
    (app_with(store.clone()), store)
}

/// A migrated, seeded in-memory SQLite store; the pool is reachable for raw SQL.
pub async fn sqlite_store() -> SqliteStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("connect");
    let sqlite = SqliteStore::new(Arc::new(pool));
    sqlite.migrate().await.expect("migrate");
    seed(&sqlite).await;
    sqlite
}

pub async fn sqlite_app() -> (Router, Arc<dyn TrackingStore>) {
    let store: Arc<dyn TrackingStore> = Arc::new(sqlite_store().await);
    (app_with(store.clone()), store)
}

pub fn app_with(store: Arc<dyn TrackingStore>) -> Router {
    app(AppState::new(store))
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.expect("response")
}

pub async fn read_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// Create a shipment through the API and return its tracking number.
pub async fn create(app: &Router, key: &str, sender: &str, receiver: &str) -> String {
    let response = send(
        app,
        json_request(
            "POST",
            "/shipments",
            serde_json::json!({ "apiKey": key, "sender": sender, "receiver": receiver }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    read_json(response).await["id"]
        .as_str()
        .expect("tracking number")
        .to_string()
}
