//! Chat turn endpoints.
//!
//! - POST /api/v1/chat                    - One-step turn (implicit session creation)
//! - POST /api/v1/sessions/{id}/messages  - Turn against an existing session
//!
//! Both take the same body. A turn appends a message, edits a past user
//! message (`edit_message_id`), or regenerates the last reply (`regenerate`).

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use spendscope_types::chat::{ChatReply, ChatRequest};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::handlers::session::parse_uuid;
use crate::http::response::ApiResponse;
use crate::state::AppState;

fn reply_response(reply: ChatReply, request_id: String, start: Instant) -> ApiResponse<ChatReply> {
    let elapsed = start.elapsed().as_millis() as u64;
    let session_link = format!("/api/v1/sessions/{}", reply.session_id);
    let messages_link = format!("{session_link}/messages");

    ApiResponse::success(reply, request_id, elapsed)
        .with_link("session", &session_link)
        .with_link("messages", &messages_link)
}

/// POST /api/v1/chat - Answer a chat request, creating the session if none is given.
pub async fn chat(
    State(state): State<AppState>,
    Authenticated(user_id): Authenticated,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatReply>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let reply = state.chat_service.handle_chat_request(user_id, body).await?;

    Ok(Json(reply_response(reply, request_id, start)))
}

/// POST /api/v1/sessions/{id}/messages - Answer a message in an existing session.
pub async fn post_message(
    State(state): State<AppState>,
    Authenticated(user_id): Authenticated,
    Path(session_id): Path<String>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatReply>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let sid = parse_uuid(&session_id)?;
    let reply = state.chat_service.post_message(user_id, sid, body).await?;

    Ok(Json(reply_response(reply, request_id, start)))
}
