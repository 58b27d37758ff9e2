use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use time::Duration;

use crate::db::{DbAdminUser, DbUser};
use crate::error::DeskError;
use crate::router::DeskState;

pub const USER_COOKIE: &str = "user-auth";
pub const ADMIN_COOKIE: &str = "admin-session";

const COOKIE_MAX_AGE: Duration = Duration::weeks(1);

/// Raw user id from the `user-auth` cookie; the user may no longer exist.
#[derive(Debug, Clone)]
pub struct UserId(pub String);

/// A signed-in end user whose cookie names an existing account.
#[derive(Debug, Clone)]
pub struct AuthUser(pub DbUser);

/// A signed-in admin whose cookie names an existing admin account.
#[derive(Debug, Clone)]
pub struct AuthAdmin(pub DbAdminUser);

async fn cookie_value(
    parts: &mut Parts,
    state: &DeskState,
    name: &str,
) -> Result<String, DeskError> {
    let Ok(jar) = PrivateCookieJar::<Key>::from_request_parts(parts, state).await;
    jar.get(name)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or(DeskError::Unauthorized)
}

impl FromRequestParts<DeskState> for UserId {
    type Rejection = DeskError;

    async fn from_request_parts(parts: &mut Parts, state: &DeskState) -> Result<Self, Self::Rejection> {
        cookie_value(parts, state, USER_COOKIE).await.map(UserId)
    }
}

impl FromRequestParts<DeskState> for AuthUser {
    type Rejection = DeskError;

    async fn from_request_parts(parts: &mut Parts, state: &DeskState) -> Result<Self, Self::Rejection> {
        let id = cookie_value(parts, state, USER_COOKIE).await?;
        state
            .storage
            .find_user_by_id(&id)
            .await?
            .map(AuthUser)
            .ok_or(DeskError::Unauthorized)
    }
}

impl FromRequestParts<DeskState> for AuthAdmin {
    type Rejection = DeskError;

    async fn from_request_parts(parts: &mut Parts, state: &DeskState) -> Result<Self, Self::Rejection> {
        let id = cookie_value(parts, state, ADMIN_COOKIE).await?;
        state
            .storage
            .find_admin_by_id(&id)
            .await?
            .map(AuthAdmin)
            .ok_or(DeskError::Unauthorized)
    }
}

pub fn build_cookie(name: &str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(COOKIE_MAX_AGE)
        .build()
}

pub fn clear_cookie(name: &str) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build()
}
