//! End-to-end tests driving the router over the in-memory store

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use common::{
    BOT_TOKEN, body_bytes, body_json, build_test_app, build_test_app_with, get, login,
    open_policy, post_json, send, verifying_policy,
};
use quiz::repositories::MemoryStore;
use quiz::telegram;

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reauthentication_updates_the_same_user() {
    let app = build_test_app(open_policy());

    let first = post_json(
        &app,
        "/api/auth/telegram",
        json!({"telegramId": 42, "username": "a"}),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_json(first).await;
    assert_eq!(first["user"]["telegram_id"], 42);
    assert_eq!(first["user"]["language_code"], "ru");
    assert!(first["sessionId"].as_str().is_some_and(|t| t.len() == 64));

    let second = post_json(
        &app,
        "/api/auth/telegram",
        json!({"telegramId": 42, "username": "b"}),
    )
    .await;
    assert_eq!(second.status(), StatusCode::OK);
    let second = body_json(second).await;

    assert_eq!(second["user"]["id"], first["user"]["id"]);
    assert_eq!(second["user"]["username"], "b");
    assert_ne!(second["sessionId"], first["sessionId"]);

    let stats = body_json(get(&app, "/api/stats").await).await;
    assert_eq!(stats["total_users"], 1);
}

#[tokio::test]
async fn empty_profile_fields_are_stored_as_unset() {
    let app = build_test_app(open_policy());

    let response = post_json(
        &app,
        "/api/auth/telegram",
        json!({"telegramId": 42, "username": "", "firstName": "", "languageCode": ""}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let user = &body["user"];
    assert_eq!(user["telegram_id"], 42);
    assert_eq!(user["username"], Value::Null);
    assert_eq!(user["first_name"], Value::Null);
    assert_eq!(user["language_code"], "ru");
}

#[tokio::test]
async fn demo_logins_get_fresh_identities() {
    let app = build_test_app(verifying_policy());

    let first = body_json(post_json(&app, "/api/auth/telegram", json!({"isDemo": true})).await).await;
    let second = body_json(post_json(&app, "/api/auth/telegram", json!({"isDemo": true})).await).await;

    assert!(first["user"]["telegram_id"].is_i64());
    assert_ne!(first["user"]["telegram_id"], second["user"]["telegram_id"]);
    assert_ne!(first["user"]["id"], second["user"]["id"]);
    assert_eq!(first["user"]["username"], "demo_user");
}

#[tokio::test]
async fn missing_identity_without_demo_is_rejected() {
    let policy = quiz::identity::AuthPolicy {
        allow_demo_logins: false,
        ..open_policy()
    };
    let app = build_test_app(policy);

    let response = post_json(&app, "/api/auth/telegram", json!({"username": "a"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn enforced_verification_accepts_only_signed_logins() {
    let app = build_test_app(verifying_policy());

    let mut login_data = json!({
        "id": 42,
        "first_name": "Ada",
        "username": "ada",
        "auth_date": Utc::now().timestamp(),
    });
    let payload = telegram::payload_from_json(login_data.as_object().unwrap()).unwrap();
    login_data["hash"] = Value::String(telegram::sign(&payload, BOT_TOKEN));

    let response = post_json(&app, "/api/auth/telegram", login_data.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["user"]["telegram_id"], 42);

    login_data["username"] = json!("mallory");
    let response = post_json(&app, "/api/auth/telegram", login_data).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_json(&app, "/api/auth/telegram", json!({"telegramId": 42})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Invalid authorization"})
    );
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = build_test_app(open_policy());

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/auth/telegram")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[tokio::test]
async fn results_are_listed_newest_first() {
    let app = build_test_app(open_policy());
    let token = login(&app, json!({"telegramId": 7})).await;

    for (score, result_type) in [(20, "human"), (80, "biorobot")] {
        let response = post_json(
            &app,
            "/api/test/result",
            json!({
                "sessionId": token,
                "score": score,
                "resultType": result_type,
                "resultTitle": "Verdict",
                "answers": ["a", "b"],
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert!(body["resultId"].is_string());
    }

    let response = send(
        &app,
        Method::GET,
        "/api/test/results",
        &[("x-session-id", token.as_str())],
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let listed = body_json(response).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["result_type"], "biorobot");
    assert_eq!(listed[0]["score"], 80);
    assert_eq!(listed[1]["result_type"], "human");
    assert_eq!(listed[1]["result_title"], "Verdict");
    assert!(listed[0]["completed_at"].is_string());
}

#[tokio::test]
async fn header_token_wins_over_body_token() {
    let app = build_test_app(open_policy());
    let alice = login(&app, json!({"telegramId": 1})).await;
    let bob = login(&app, json!({"telegramId": 2})).await;

    let response = send(
        &app,
        Method::POST,
        "/api/test/result",
        &[("x-session-id", bob.as_str())],
        Some(json!({"sessionId": alice, "score": 5, "result_type": "human"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let authorization = format!("Bearer {}", alice);
    let alice_results = body_json(
        send(
            &app,
            Method::GET,
            "/api/test/results",
            &[("authorization", authorization.as_str())],
            None,
        )
        .await,
    )
    .await;
    let bob_results = body_json(
        send(
            &app,
            Method::GET,
            "/api/test/results",
            &[("x-session-id", bob.as_str())],
            None,
        )
        .await,
    )
    .await;

    assert_eq!(alice_results, json!([]));
    assert_eq!(bob_results.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn expired_session_records_nothing() {
    let app = build_test_app_with(MemoryStore::new(), open_policy(), Duration::seconds(-1));
    let token = login(&app, json!({"telegramId": 42})).await;

    let response = post_json(
        &app,
        "/api/test/result",
        json!({"sessionId": token, "score": 50, "resultType": "human"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let stats = body_json(get(&app, "/api/stats").await).await;
    assert_eq!(stats["total_tests"], 0);
}

#[tokio::test]
async fn unknown_or_missing_session_is_unauthorized() {
    let app = build_test_app(open_policy());

    let response = post_json(
        &app,
        "/api/test/result",
        json!({"sessionId": "not-a-token", "score": 1, "resultType": "human"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_json(&app, "/api/test/result", json!({"score": 1})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get(&app, "/api/test/results").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn missing_result_fields_are_a_bad_request() {
    let app = build_test_app(open_policy());
    let token = login(&app, json!({"telegramId": 42})).await;

    let response = post_json(
        &app,
        "/api/test/result",
        json!({"sessionId": token, "resultType": "human"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(&app, "/api/test/result", json!({"sessionId": token, "score": 3})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let stats = body_json(get(&app, "/api/stats").await).await;
    assert_eq!(stats["total_tests"], 0);
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stats_on_empty_store() {
    let app = build_test_app(open_policy());

    let response = get(&app, "/api/stats").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "total_users": 0,
            "total_tests": 0,
            "avg_score": null,
            "result_distribution": {}
        })
    );
}

#[tokio::test]
async fn stats_aggregate_all_results() {
    let app = build_test_app(open_policy());
    let token = login(&app, json!({"telegramId": 42})).await;

    for (score, result_type) in [(10, "human"), (15, "human"), (20, "biorobot")] {
        let response = post_json(
            &app,
            "/api/test/result",
            json!({"sessionId": token, "score": score, "resultType": result_type}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let stats = body_json(get(&app, "/api/stats").await).await;
    assert_eq!(stats["total_users"], 1);
    assert_eq!(stats["total_tests"], 3);
    assert_eq!(stats["avg_score"], 15.0);
    assert_eq!(stats["result_distribution"], json!({"human": 2, "biorobot": 1}));
}

// ---------------------------------------------------------------------------
// HTTP plumbing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wrong_method_is_405() {
    let app = build_test_app(open_policy());

    let response = get(&app, "/api/auth/telegram").await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Method not allowed"})
    );

    let response = send(&app, Method::DELETE, "/api/test/results", &[], None).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn options_answers_200_with_empty_body() {
    let app = build_test_app(open_policy());

    for uri in ["/api/auth/telegram", "/api/test/result", "/api/test/results", "/elsewhere"] {
        let response = send(&app, Method::OPTIONS, uri, &[], None).await;
        assert_eq!(response.status(), StatusCode::OK, "OPTIONS {}", uri);
        assert!(body_bytes(response).await.is_empty());
    }
}

#[tokio::test]
async fn unknown_route_is_404_json() {
    let app = build_test_app(open_policy());

    let response = get(&app, "/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({"error": "Not found"}));
}

#[tokio::test]
async fn responses_allow_any_origin() {
    let app = build_test_app(open_policy());

    let response = send(
        &app,
        Method::GET,
        "/api/stats",
        &[("origin", "https://web.telegram.org")],
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}

#[tokio::test]
async fn health_reports_store_status() {
    let app = build_test_app(open_policy());

    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"status": "ok", "service": "quiz-service", "store": "ok"})
    );
}
