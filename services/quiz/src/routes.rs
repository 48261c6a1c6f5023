//! Quiz service routes

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::{require_session, token_from_headers},
    models::{Stats, TestResult, User},
    repositories::QuizStore,
    results::ResultRequest,
    session::ResolvedSession,
};

/// Response for a successful login
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub session_id: String,
    pub user: User,
}

/// Response for a recorded result
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResultResponse {
    pub success: bool,
    pub result_id: Uuid,
    pub message: String,
}

/// One entry of a user's result history
#[derive(Serialize)]
pub struct ResultSummary {
    pub id: Uuid,
    pub score: i32,
    pub result_type: String,
    pub result_title: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl From<TestResult> for ResultSummary {
    fn from(result: TestResult) -> Self {
        Self {
            id: result.id,
            score: result.score,
            result_type: result.result_type,
            result_title: result.result_title,
            completed_at: result.completed_at,
        }
    }
}

/// Create the router for the quiz service
pub fn create_router<S: QuizStore>(state: AppState<S>) -> Router {
    let session_gate = middleware::from_fn_with_state(state.clone(), require_session::<S>);

    Router::new()
        .route("/health", get(health_check::<S>))
        .route(
            "/api/auth/telegram",
            post(authenticate::<S>).fallback(method_fallback),
        )
        .route(
            "/api/test/result",
            post(record_result::<S>).fallback(method_fallback),
        )
        .route(
            "/api/test/results",
            get(list_results::<S>)
                .route_layer(session_gate)
                .fallback(method_fallback),
        )
        .route("/api/stats", get(stats::<S>).fallback(method_fallback))
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Parse a JSON body; an empty body reads as the default value
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Invalid JSON body: {}", e)))
}

/// Health check endpoint
pub async fn health_check<S: QuizStore>(State(state): State<AppState<S>>) -> Response {
    let store_ok = state.store.health_check().await.unwrap_or(false);

    let status = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = Json(json!({
        "status": if store_ok { "ok" } else { "degraded" },
        "service": "quiz-service",
        "store": if store_ok { "ok" } else { "unavailable" },
    }));

    (status, body).into_response()
}

/// Telegram or demo login
pub async fn authenticate<S: QuizStore>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> ApiResult<Json<AuthResponse>> {
    let login: Map<String, Value> = parse_body(&body)?;

    let user = state.identities.authenticate(&login).await?;
    let issued = state.sessions.create_session(user.id).await?;

    Ok(Json(AuthResponse {
        session_id: issued.token,
        user,
    }))
}

/// Record a quiz attempt for the session named in the headers or the body
pub async fn record_result<S: QuizStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<RecordResultResponse>> {
    let request: ResultRequest = parse_body(&body)?;

    let token = token_from_headers(&headers)
        .or_else(|| request.session_id.clone().filter(|token| !token.is_empty()))
        .ok_or_else(|| ApiError::Unauthorized("Session is required".to_string()))?;

    let resolved = state
        .sessions
        .resolve_session(&token)
        .await?
        .ok_or_else(|| {
            warn!("Rejected result for unknown or expired session");
            ApiError::Unauthorized("Invalid or expired session".to_string())
        })?;

    let result = state
        .results
        .record_result(resolved.user.id, Some(resolved.session.id), request)
        .await?;

    Ok(Json(RecordResultResponse {
        success: true,
        result_id: result.id,
        message: "Result saved".to_string(),
    }))
}

/// Result history of the session owner, newest first
pub async fn list_results<S: QuizStore>(
    State(state): State<AppState<S>>,
    Extension(resolved): Extension<ResolvedSession>,
) -> ApiResult<Json<Vec<ResultSummary>>> {
    let results = state.results.list_results(resolved.user.id).await?;

    Ok(Json(results.into_iter().map(ResultSummary::from).collect()))
}

/// Aggregate statistics
pub async fn stats<S: QuizStore>(State(state): State<AppState<S>>) -> ApiResult<Json<Stats>> {
    Ok(Json(state.stats.compute_stats().await?))
}

/// Known path, unsupported method
async fn method_fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    ApiError::MethodNotAllowed.into_response()
}

async fn not_found(method: Method) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    ApiError::NotFound.into_response()
}
