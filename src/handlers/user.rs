use axum::{Json, extract::State, response::IntoResponse};
use axum_extra::extract::cookie::PrivateCookieJar;
use tracing::info;

use crate::middleware::auth::{USER_COOKIE, UserId, build_cookie, clear_cookie};
use crate::middleware::json_request::JsonBody;
use crate::service::accounts;
use crate::types::api::{
    LoginRequest, MeResponse, MeUser, RegisterRequest, SuccessResponse, UserAuthResponse,
};
use crate::{DeskError, router::DeskState};

/// POST /api/user/register -> creates the account and signs the user in.
pub async fn register(
    State(state): State<DeskState>,
    jar: PrivateCookieJar,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, DeskError> {
    let user =
        accounts::register_user(&state.storage, &req.username, req.email.as_deref(), &req.password)
            .await?;
    let jar = jar.add(build_cookie(USER_COOKIE, user.id.clone(), state.secure_cookie));
    Ok((
        jar,
        Json(UserAuthResponse {
            message: "Registration complete".to_string(),
            user: (&user).into(),
        }),
    ))
}

/// POST /api/user/auth
pub async fn login(
    State(state): State<DeskState>,
    jar: PrivateCookieJar,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, DeskError> {
    let user = accounts::authenticate_user(
        &state.storage,
        req.email.as_deref(),
        req.username.as_deref(),
        &req.password,
    )
    .await?;
    info!(user_id = %user.id, "user signed in");
    let jar = jar.add(build_cookie(USER_COOKIE, user.id.clone(), state.secure_cookie));
    Ok((
        jar,
        Json(UserAuthResponse {
            message: "Signed in".to_string(),
            user: (&user).into(),
        }),
    ))
}

pub async fn logout(jar: PrivateCookieJar) -> impl IntoResponse {
    (jar.remove(clear_cookie(USER_COOKIE)), Json(SuccessResponse::ok()))
}

/// GET /api/user/me -> 401 without a cookie, 404 when the account is gone.
pub async fn me(
    State(state): State<DeskState>,
    UserId(id): UserId,
) -> Result<Json<MeResponse>, DeskError> {
    let user = state
        .storage
        .find_user_by_id(&id)
        .await?
        .ok_or_else(|| DeskError::NotFound("User".into()))?;
    Ok(Json(MeResponse {
        user: MeUser {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
        },
    }))
}
