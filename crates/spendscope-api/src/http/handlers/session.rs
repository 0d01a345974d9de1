//! Session HTTP handlers.
//!
//! Endpoints:
//! - POST   /api/v1/sessions               - Create an empty session
//! - GET    /api/v1/sessions               - List sessions, most recent first
//! - GET    /api/v1/sessions/{id}          - Get a single session
//! - GET    /api/v1/sessions/{id}/messages - Get messages for a session
//! - DELETE /api/v1/sessions/{id}          - Delete a session and its messages

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use spendscope_types::chat::{ChatMessage, ChatSession};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::query::SessionListQuery;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for explicit session creation.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// The message the session title is derived from.
    pub message: String,
}

/// Parse a UUID from a path parameter, returning a 400 error on invalid format.
pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    s.parse::<Uuid>()
        .map_err(|_| AppError::Validation(format!("Invalid UUID: {s}")))
}

/// POST /api/v1/sessions - Create a session titled after the given message.
pub async fn create_session(
    State(state): State<AppState>,
    Authenticated(user_id): Authenticated,
    Json(body): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ChatSession>>), AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session = state
        .chat_service
        .create_session(user_id, &body.message)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let self_link = format!("/api/v1/sessions/{}", session.id);
    let messages_link = format!("{self_link}/messages");
    let resp = ApiResponse::success(session, request_id, elapsed)
        .with_link("self", &self_link)
        .with_link("messages", &messages_link);

    Ok((StatusCode::CREATED, Json(resp)))
}

/// GET /api/v1/sessions - List the caller's sessions.
pub async fn list_sessions(
    State(state): State<AppState>,
    Authenticated(user_id): Authenticated,
    Query(query): Query<SessionListQuery>,
) -> Result<Json<ApiResponse<Vec<ChatSession>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let (limit, offset) = query.validated().map_err(AppError::Validation)?;
    let sessions = state
        .chat_service
        .list_sessions(&user_id, limit, offset)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(sessions, request_id, elapsed).with_link("self", "/api/v1/sessions");

    Ok(Json(resp))
}

/// GET /api/v1/sessions/{id} - Get a session by ID.
pub async fn get_session(
    State(state): State<AppState>,
    Authenticated(user_id): Authenticated,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<ChatSession>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let sid = parse_uuid(&session_id)?;
    let session = state.chat_service.get_session(&user_id, &sid).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(session, request_id, elapsed)
        .with_link("self", &format!("/api/v1/sessions/{sid}"))
        .with_link("messages", &format!("/api/v1/sessions/{sid}/messages"));

    Ok(Json(resp))
}

/// GET /api/v1/sessions/{id}/messages - Get messages for a session, oldest first.
pub async fn get_messages(
    State(state): State<AppState>,
    Authenticated(user_id): Authenticated,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ChatMessage>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let sid = parse_uuid(&session_id)?;
    let messages = state.chat_service.get_messages(&user_id, &sid).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(messages, request_id, elapsed)
        .with_link("self", &format!("/api/v1/sessions/{sid}/messages"))
        .with_link("session", &format!("/api/v1/sessions/{sid}"));

    Ok(Json(resp))
}

/// DELETE /api/v1/sessions/{id} - Delete a session and its messages.
pub async fn delete_session(
    State(state): State<AppState>,
    Authenticated(user_id): Authenticated,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let sid = parse_uuid(&session_id)?;
    state.chat_service.delete_session(user_id, sid).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(
        serde_json::json!({"deleted": true, "session_id": sid}),
        request_id,
        elapsed,
    );

    Ok(Json(resp))
}
