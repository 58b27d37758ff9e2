use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;

use crate::db::{DbMessage, MessageType, MessageWithSession};
use crate::handlers::sessions::owned_session;
use crate::middleware::auth::{AuthAdmin, AuthUser};
use crate::middleware::json_request::JsonBody;
use crate::types::api::{CreateMessageRequest, SuccessResponse, UpdateMessageRequest};
use crate::{DeskError, router::DeskState};

/// GET /api/messages -> every message, newest first (admin view).
pub async fn list_messages(
    State(state): State<DeskState>,
    _admin: AuthAdmin,
) -> Result<Json<Vec<MessageWithSession>>, DeskError> {
    Ok(Json(state.storage.list_messages_with_session(None).await?))
}

/// POST /api/messages -> a USER message in one of the caller's sessions.
pub async fn create_message(
    State(state): State<DeskState>,
    AuthUser(user): AuthUser,
    JsonBody(req): JsonBody<CreateMessageRequest>,
) -> Result<Json<DbMessage>, DeskError> {
    if req.content.trim().is_empty() {
        return Err(DeskError::BadRequest("content is required".into()));
    }
    owned_session(&state, &req.session_id, &user.id).await?;
    let now = Utc::now();
    let message = state
        .storage
        .create_message(&req.session_id, &req.content, MessageType::User, now)
        .await?;
    state.storage.touch_session(&req.session_id, now).await?;
    Ok(Json(message))
}

pub async fn update_message(
    State(state): State<DeskState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateMessageRequest>,
) -> Result<Json<DbMessage>, DeskError> {
    state
        .storage
        .update_message_content(&id, &req.content)
        .await?
        .map(Json)
        .ok_or_else(|| DeskError::NotFound("Message".into()))
}

pub async fn delete_message(
    State(state): State<DeskState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, DeskError> {
    if !state.storage.delete_message(&id).await? {
        return Err(DeskError::NotFound("Message".into()));
    }
    Ok(Json(SuccessResponse::ok()))
}
