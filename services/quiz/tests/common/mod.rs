#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use quiz::AppState;
use quiz::identity::AuthPolicy;
use quiz::repositories::MemoryStore;
use quiz::routes;

pub const BOT_TOKEN: &str = "123456:TEST-TOKEN";

/// Policy accepting unsigned logins, as local browser testing needs
pub fn open_policy() -> AuthPolicy {
    AuthPolicy {
        bot_token: None,
        verify_telegram_auth: false,
        allow_demo_logins: true,
    }
}

pub fn verifying_policy() -> AuthPolicy {
    AuthPolicy {
        bot_token: Some(BOT_TOKEN.to_string()),
        verify_telegram_auth: true,
        allow_demo_logins: true,
    }
}

/// Build the full router over a fresh in-memory store
pub fn build_test_app(policy: AuthPolicy) -> Router {
    build_test_app_with(MemoryStore::new(), policy, Duration::hours(24))
}

pub fn build_test_app_with(store: MemoryStore, policy: AuthPolicy, ttl: Duration) -> Router {
    routes::create_router(AppState::new(store, policy, ttl))
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, &[], None).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, &[], Some(body)).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Log in and return the issued session token
pub async fn login(app: &Router, body: Value) -> String {
    let response = post_json(app, "/api/auth/telegram", body).await;
    assert_eq!(response.status(), 200);
    body_json(response).await["sessionId"]
        .as_str()
        .unwrap()
        .to_string()
}
