//! Session token extraction and the session gate for protected routes

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{AppState, error::ApiError, repositories::QuizStore};

/// Header carrying the session token
pub const SESSION_HEADER: &str = "x-session-id";

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Session token from `x-session-id`, falling back to `Authorization: Bearer`
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    header_value(headers, SESSION_HEADER)
        .or_else(|| {
            header_value(headers, AUTHORIZATION.as_str())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::trim)
                .filter(|token| !token.is_empty())
        })
        .map(str::to_string)
}

/// Resolve the header token and expose the session to the handler
///
/// Inserts a [`crate::session::ResolvedSession`] into the request extensions.
pub async fn require_session<S: QuizStore>(
    State(state): State<AppState<S>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = token_from_headers(req.headers())
        .ok_or_else(|| ApiError::Unauthorized("Session is required".to_string()))?;

    let resolved = state
        .sessions
        .resolve_session(&token)
        .await?
        .ok_or_else(|| {
            warn!("Rejected unknown or expired session token");
            ApiError::Unauthorized("Invalid or expired session".to_string())
        })?;

    req.extensions_mut().insert(resolved);

    Ok(next.run(req).await)
}
