use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    routing::{delete, get, post, put},
};
use axum_extra::extract::cookie::Key;

use crate::db::DeskStorage;
use crate::handlers::{admin, messages, sessions, system, user};
use crate::service::cleanup::RetentionPolicy;

/// Request bodies are small JSON documents; anything larger is refused.
pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct DeskState {
    pub storage: DeskStorage,
    pub cookie_key: Key,
    /// Set the `Secure` attribute on auth cookies.
    pub secure_cookie: bool,
    pub retention: RetentionPolicy,
    /// Whether the periodic cleanup task was started.
    pub cleanup_enabled: bool,
}

impl DeskState {
    pub fn new(
        storage: DeskStorage,
        cookie_key: Key,
        secure_cookie: bool,
        retention: RetentionPolicy,
        cleanup_enabled: bool,
    ) -> Self {
        Self {
            storage,
            cookie_key,
            secure_cookie,
            retention,
            cleanup_enabled,
        }
    }
}

impl FromRef<DeskState> for Key {
    fn from_ref(state: &DeskState) -> Self {
        state.cookie_key.clone()
    }
}

pub fn desk_router(state: DeskState) -> Router {
    let user_routes = Router::new()
        .route("/register", post(user::register))
        .route("/auth", post(user::login))
        .route("/logout", post(user::logout))
        .route("/me", get(user::me));

    let admin_routes = Router::new()
        .route("/auth", post(admin::login))
        .route("/logout", post(admin::logout))
        .route("/setup", get(admin::setup_status).post(admin::setup))
        .route(
            "/system-status",
            get(system::system_status).post(admin::set_system_status),
        )
        .route("/messages/unanswered", get(admin::unanswered))
        .route("/messages/answered", get(admin::answered))
        .route("/messages/answer", post(admin::answer));

    let api = Router::new()
        .nest("/user", user_routes)
        .nest("/admin", admin_routes)
        .route(
            "/sessions",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route("/sessions/{id}", delete(sessions::delete_session))
        .route("/sessions/{id}/messages", get(sessions::session_messages))
        .route(
            "/messages",
            get(messages::list_messages).post(messages::create_message),
        )
        .route(
            "/messages/{id}",
            put(messages::update_message).delete(messages::delete_message),
        )
        .route("/system-status", get(system::system_status))
        .route("/cleanup", get(system::cleanup_preview).post(system::cleanup_run))
        .route("/health", get(system::health));

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}
