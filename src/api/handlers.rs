//! REST API handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::{Map, Value};

use super::middleware::SessionEnded;
use super::types::{ErrorResponse, ListSessionsResponse, SessionResponse};
use crate::error::SessionError;
use crate::session::{Session, SessionManager};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: SessionError) -> ApiError {
    match err {
        SessionError::OperationNotPermitted(op) => (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::forbidden(format!(
                "{op} requires admin operations to be enabled"
            ))),
        ),
        SessionError::InvalidArgument(msg) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request(msg)),
        ),
        err if err.is_store_error() => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::store_unavailable(err.to_string())),
        ),
        err => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::internal_error(err.to_string())),
        ),
    }
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// API information endpoint.
pub async fn api_info(State(state): State<AppState>) -> Json<Value> {
    let config = state.sessions.config();
    Json(serde_json::json!({
        "name": "header-session",
        "version": env!("CARGO_PKG_VERSION"),
        "sid_header": config.sid_header,
        "ttl_secs": config.ttl_secs,
        "persist": config.persist,
    }))
}

/// Return the session attached to this request.
pub async fn get_session(session: Session) -> Json<SessionResponse> {
    Json(session.into())
}

/// Merge a JSON object into the session and save it.
pub async fn update_session(
    State(state): State<AppState>,
    mut session: Session,
    Json(fields): Json<Map<String, Value>>,
) -> Result<Json<SessionResponse>, ApiError> {
    session.data_mut().merge(fields);
    state
        .sessions
        .save(session.sid(), session.data())
        .await
        .map_err(api_error)?;

    Ok(Json(session.into()))
}

/// Destroy the session attached to this request.
///
/// The destroyed identifier is not echoed in the response header.
pub async fn delete_session(
    State(state): State<AppState>,
    session: Session,
) -> Result<(Extension<SessionEnded>, StatusCode), ApiError> {
    state
        .sessions
        .destroy(session.sid())
        .await
        .map_err(api_error)?;

    Ok((Extension(SessionEnded), StatusCode::NO_CONTENT))
}

/// List every stored session identifier.
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<ListSessionsResponse>, ApiError> {
    let sids = state.sessions.get_all_keys().await.map_err(api_error)?;
    Ok(Json(ListSessionsResponse {
        count: sids.len(),
        sids,
    }))
}

/// Destroy every stored session.
pub async fn destroy_sessions(State(state): State<AppState>) -> Response {
    match state.sessions.destroy_all().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => api_error(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let (status, _) = api_error(SessionError::OperationNotPermitted("destroy_all"));
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = api_error(SessionError::InvalidArgument("sid is required"));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, Json(body)) = api_error(SessionError::Store("refused".into()));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.code, "STORE_UNAVAILABLE");

        let json_err = serde_json::from_str::<Value>("{").unwrap_err();
        let (status, _) = api_error(json_err.into());
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
