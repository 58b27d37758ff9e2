use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;

use crate::db::{DbMessage, DbSession};
use crate::middleware::auth::AuthUser;
use crate::middleware::json_request::JsonBody;
use crate::service::summary::{self, SessionSummary};
use crate::types::api::{CreateSessionRequest, SuccessResponse};
use crate::{DeskError, router::DeskState};

/// Fetch a session only if `user_id` owns it; others' sessions look missing.
pub(crate) async fn owned_session(
    state: &DeskState,
    session_id: &str,
    user_id: &str,
) -> Result<DbSession, DeskError> {
    state
        .storage
        .get_session(session_id)
        .await?
        .filter(|s| s.user_id == user_id)
        .ok_or_else(|| DeskError::NotFound("Session".into()))
}

pub async fn list_sessions(
    State(state): State<DeskState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<SessionSummary>>, DeskError> {
    Ok(Json(summary::list_for_user(&state.storage, &user.id).await?))
}

pub async fn create_session(
    State(state): State<DeskState>,
    AuthUser(user): AuthUser,
    JsonBody(req): JsonBody<CreateSessionRequest>,
) -> Result<Json<DbSession>, DeskError> {
    let name = req.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let session = state
        .storage
        .create_session(&user.id, name, Utc::now())
        .await?;
    Ok(Json(session))
}

/// DELETE /api/sessions/{id} -> messages are removed by cascade.
pub async fn delete_session(
    State(state): State<DeskState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, DeskError> {
    owned_session(&state, &id, &user.id).await?;
    state.storage.delete_session(&id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/sessions/{id}/messages -> conversation order; what the poller fetches.
pub async fn session_messages(
    State(state): State<DeskState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<DbMessage>>, DeskError> {
    owned_session(&state, &id, &user.id).await?;
    Ok(Json(state.storage.list_messages(&id).await?))
}
