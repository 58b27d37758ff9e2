use axum::{Json, extract::State};
use chrono::Utc;

use crate::middleware::auth::AuthAdmin;
use crate::types::api::{
    CleanupPreview, CleanupResult, HealthEnvironment, HealthResponse, StatusResponse,
};
use crate::{DeskError, router::DeskState};

/// GET /api/system-status, also served at /api/admin/system-status.
pub async fn system_status(
    State(state): State<DeskState>,
) -> Result<Json<StatusResponse>, DeskError> {
    let status = state.storage.system_status().await?;
    Ok(Json(StatusResponse {
        status,
        message: None,
    }))
}

pub async fn cleanup_preview(
    State(state): State<DeskState>,
    _admin: AuthAdmin,
) -> Result<Json<CleanupPreview>, DeskError> {
    let sessions = state.retention.preview(&state.storage, Utc::now()).await?;
    Ok(Json(CleanupPreview {
        old_sessions: sessions.len(),
        sessions,
    }))
}

pub async fn cleanup_run(
    State(state): State<DeskState>,
    _admin: AuthAdmin,
) -> Result<Json<CleanupResult>, DeskError> {
    let deleted_sessions = state.retention.run(&state.storage, Utc::now()).await?;
    Ok(Json(CleanupResult {
        success: true,
        deleted_sessions,
    }))
}

pub async fn health(State(state): State<DeskState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        environment: HealthEnvironment {
            // the state only exists once storage has connected
            database_configured: true,
            cleanup_enabled: state.cleanup_enabled,
        },
    })
}
