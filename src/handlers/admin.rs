use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use chrono::Utc;
use tracing::info;

use crate::db::{DbMessage, MessageType, MessageWithSession, SystemStatus};
use crate::middleware::auth::{ADMIN_COOKIE, AuthAdmin, build_cookie, clear_cookie};
use crate::middleware::json_request::JsonBody;
use crate::service::accounts;
use crate::service::classifier::{self, AnsweredMessage};
use crate::types::api::{
    AdminAuthResponse, AdminCredentials, CreateMessageRequest, SetStatusRequest, SetupStatus,
    StatusResponse, SuccessResponse,
};
use crate::{DeskError, router::DeskState};

/// POST /api/admin/auth
pub async fn login(
    State(state): State<DeskState>,
    jar: PrivateCookieJar,
    JsonBody(req): JsonBody<AdminCredentials>,
) -> Result<impl IntoResponse, DeskError> {
    let admin = accounts::authenticate_admin(&state.storage, &req.username, &req.password).await?;
    info!(admin_id = %admin.id, "admin signed in");
    let jar = jar.add(build_cookie(ADMIN_COOKIE, admin.id.clone(), state.secure_cookie));
    Ok((
        jar,
        Json(AdminAuthResponse {
            success: true,
            admin: (&admin).into(),
        }),
    ))
}

pub async fn logout(jar: PrivateCookieJar) -> impl IntoResponse {
    (jar.remove(clear_cookie(ADMIN_COOKIE)), Json(SuccessResponse::ok()))
}

/// GET /api/admin/setup -> 409 once an admin exists, 200 otherwise.
pub async fn setup_status(State(state): State<DeskState>) -> Result<Response, DeskError> {
    if state.storage.admin_exists().await? {
        let body = SetupStatus {
            exists: true,
            message: "Admin user already exists".to_string(),
        };
        return Ok((StatusCode::CONFLICT, Json(body)).into_response());
    }
    let body = SetupStatus {
        exists: false,
        message: "Ready to create admin user".to_string(),
    };
    Ok(Json(body).into_response())
}

/// POST /api/admin/setup -> creates the first admin without authentication.
pub async fn setup(
    State(state): State<DeskState>,
    JsonBody(req): JsonBody<AdminCredentials>,
) -> Result<Json<AdminAuthResponse>, DeskError> {
    let admin = accounts::create_first_admin(&state.storage, &req.username, &req.password).await?;
    Ok(Json(AdminAuthResponse {
        success: true,
        admin: (&admin).into(),
    }))
}

pub async fn unanswered(
    State(state): State<DeskState>,
    _admin: AuthAdmin,
) -> Result<Json<Vec<MessageWithSession>>, DeskError> {
    Ok(Json(classifier::unanswered(&state.storage).await?))
}

pub async fn answered(
    State(state): State<DeskState>,
    _admin: AuthAdmin,
) -> Result<Json<Vec<AnsweredMessage>>, DeskError> {
    Ok(Json(classifier::answered(&state.storage).await?))
}

/// POST /api/admin/messages/answer -> posts an ASSISTANT reply into a session.
pub async fn answer(
    State(state): State<DeskState>,
    AuthAdmin(admin): AuthAdmin,
    JsonBody(req): JsonBody<CreateMessageRequest>,
) -> Result<Json<DbMessage>, DeskError> {
    if req.content.trim().is_empty() {
        return Err(DeskError::BadRequest("content is required".into()));
    }
    if state.storage.get_session(&req.session_id).await?.is_none() {
        return Err(DeskError::NotFound("Session".into()));
    }
    let now = Utc::now();
    let message = state
        .storage
        .create_message(&req.session_id, &req.content, MessageType::Assistant, now)
        .await?;
    state.storage.touch_session(&req.session_id, now).await?;
    info!(admin_id = %admin.id, session_id = %req.session_id, "reply posted");
    Ok(Json(message))
}

/// POST /api/admin/system-status
pub async fn set_system_status(
    State(state): State<DeskState>,
    AuthAdmin(admin): AuthAdmin,
    JsonBody(req): JsonBody<SetStatusRequest>,
) -> Result<Json<StatusResponse>, DeskError> {
    let status: SystemStatus = req
        .status
        .parse()
        .map_err(|_| DeskError::BadRequest("Invalid status".into()))?;
    state.storage.set_system_status(status).await?;
    info!(admin_id = %admin.id, status = status.as_str(), "system status changed");
    Ok(Json(StatusResponse {
        status,
        message: Some(format!("System status changed to {}", status.as_str())),
    }))
}
