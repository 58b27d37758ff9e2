//! Request and response bodies of the JSON API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{DbAdminUser, DbUser, SystemStatus};
use crate::service::cleanup::StaleSession;

#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AdminCredentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl From<&DbUser> for PublicUser {
    fn from(u: &DbUser) -> Self {
        Self {
            id: u.id.clone(),
            username: u.username.clone(),
            email: u.email.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserAuthResponse {
    pub message: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeUser {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: MeUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicAdmin {
    pub id: String,
    pub username: String,
}

impl From<&DbAdminUser> for PublicAdmin {
    fn from(a: &DbAdminUser) -> Self {
        Self {
            id: a.id.clone(),
            username: a.username.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminAuthResponse {
    pub success: bool,
    pub admin: PublicAdmin,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetupStatus {
    pub exists: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub session_id: String,
    pub content: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateMessageRequest {
    pub content: String,
}

/// Body of `POST /api/admin/system-status`; validated against [`SystemStatus`].
#[derive(Debug, Deserialize, Serialize)]
pub struct SetStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: SystemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupPreview {
    pub old_sessions: usize,
    pub sessions: Vec<StaleSession>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResult {
    pub success: bool,
    pub deleted_sessions: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthEnvironment {
    pub database_configured: bool,
    pub cleanup_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub environment: HealthEnvironment,
}
