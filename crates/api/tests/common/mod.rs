#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use pilelog_api::auth::jwt::{generate_access_token, JwtConfig};
use pilelog_api::config::{LogFormat, ServerConfig, SyncConfig};
use pilelog_api::router::build_app_router;
use pilelog_api::state::AppState;
use pilelog_core::roles::{RoleAuthorizer, ROLE_ADMIN, ROLE_SUPERVISOR};
use pilelog_engine::Engine;
use pilelog_events::{BusNotifier, EventBus};
use pilelog_store::MemoryStore;

pub const SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig::new(SECRET),
        sync: SyncConfig::default(),
        log_format: LogFormat::Text,
    }
}

/// An application wired to an in-memory store, plus handles to inspect it.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub bus: Arc<EventBus>,
}

/// Build the full application router over a fresh [`MemoryStore`].
///
/// Users 3 (supervisor, site 7) and 5 (admin) are registered as alert
/// recipients.
pub async fn build_test_app() -> TestApp {
    build_test_app_with(test_config()).await
}

pub async fn build_test_app_with(config: ServerConfig) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    store.seed_user(3, ROLE_SUPERVISOR, &[7]).await;
    store.seed_user(5, ROLE_ADMIN, &[]).await;

    let bus = Arc::new(EventBus::default());
    let engine = Engine::new(
        Arc::clone(&store),
        Arc::new(RoleAuthorizer),
        Arc::new(BusNotifier::new(Arc::clone(&bus))),
        config.engine_config(),
    );
    let state = AppState {
        store: Arc::clone(&store),
        engine: Arc::new(engine),
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        bus,
    }
}

/// Mint a bearer token for `user_id` with `role`.
pub fn token(user_id: i64, role: &str) -> String {
    generate_access_token(user_id, role, &JwtConfig::new(SECRET))
        .expect("token generation should succeed")
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        builder = builder.header("authorization", format!("Bearer {t}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: &Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json_auth(
    app: &Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn patch_json_auth(
    app: &Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: &Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
