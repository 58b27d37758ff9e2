mod common;

use axum::http::StatusCode;
use chat_desk::DeskStorage;
use chat_desk::db::SystemStatus;
use chat_desk::router::BODY_LIMIT_BYTES;
use common::{spawn_app, spawn_app_with_cleanup};
use serde_json::json;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::str::FromStr;

#[tokio::test]
async fn protected_routes_require_a_sealed_cookie() {
    let app = spawn_app("auth").await;

    let anonymous = app.call("GET", "/api/sessions", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["error"]["code"], "UNAUTHORIZED");

    let cookie = app.register("alice", Some("alice@example.com")).await;
    let me = app.call("GET", "/api/user/me", Some(&cookie), None).await;
    assert_eq!(me.status, StatusCode::OK);
    let user_id = me.body["user"]["id"].as_str().unwrap().to_string();
    assert_eq!(me.body["user"]["username"], "alice");

    // A plain id in the cookie is not accepted; the value must be sealed.
    let forged = format!("user-auth={user_id}");
    let rejected = app.call("GET", "/api/sessions", Some(&forged), None).await;
    assert_eq!(rejected.status, StatusCode::UNAUTHORIZED);

    // A user cookie does not open admin routes.
    let admin_only = app
        .call("GET", "/api/admin/messages/unanswered", Some(&cookie), None)
        .await;
    assert_eq!(admin_only.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_by_email_or_username() {
    let app = spawn_app("login").await;
    app.register("bob", Some("bob@example.com")).await;

    let by_email = app
        .call(
            "POST",
            "/api/user/auth",
            None,
            Some(json!({ "email": "bob@example.com", "password": "secret-pass" })),
        )
        .await;
    assert_eq!(by_email.status, StatusCode::OK);
    assert!(by_email.cookie.unwrap().starts_with("user-auth="));
    assert_eq!(by_email.body["user"]["username"], "bob");

    let by_name = app
        .call(
            "POST",
            "/api/user/auth",
            None,
            Some(json!({ "username": "bob", "password": "secret-pass" })),
        )
        .await;
    assert_eq!(by_name.status, StatusCode::OK);

    let wrong = app
        .call(
            "POST",
            "/api/user/auth",
            None,
            Some(json!({ "username": "bob", "password": "not-it" })),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let duplicate = app
        .call(
            "POST",
            "/api/user/register",
            None,
            Some(json!({ "username": "bob", "password": "secret-pass" })),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);

    let short = app
        .call(
            "POST",
            "/api/user/register",
            None,
            Some(json!({ "username": "carol", "password": "123" })),
        )
        .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_reply_moves_message_to_answered() {
    let app = spawn_app("answer").await;
    let admin = app.admin().await;
    let user = app.register("dave", None).await;

    let session = app
        .call("POST", "/api/sessions", Some(&user), Some(json!({})))
        .await;
    assert_eq!(session.status, StatusCode::OK);
    let session_id = session.body["id"].as_str().unwrap().to_string();

    let posted = app
        .call(
            "POST",
            "/api/messages",
            Some(&user),
            Some(json!({ "sessionId": session_id, "content": "Hello there" })),
        )
        .await;
    assert_eq!(posted.status, StatusCode::OK);
    assert_eq!(posted.body["type"], "USER");

    let unanswered = app
        .call("GET", "/api/admin/messages/unanswered", Some(&admin), None)
        .await;
    assert_eq!(unanswered.status, StatusCode::OK);
    let pending = unanswered.body.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["content"], "Hello there");
    assert_eq!(pending[0]["session"]["user"]["username"], "dave");

    let empty = app
        .call(
            "POST",
            "/api/admin/messages/answer",
            Some(&admin),
            Some(json!({ "sessionId": session_id, "content": "   " })),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let reply = app
        .call(
            "POST",
            "/api/admin/messages/answer",
            Some(&admin),
            Some(json!({ "sessionId": session_id, "content": "How can I help?" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["type"], "ASSISTANT");

    let unanswered = app
        .call("GET", "/api/admin/messages/unanswered", Some(&admin), None)
        .await;
    assert!(unanswered.body.as_array().unwrap().is_empty());

    let answered = app
        .call("GET", "/api/admin/messages/answered", Some(&admin), None)
        .await;
    let done = answered.body.as_array().unwrap();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0]["content"], "Hello there");
    assert_eq!(done[0]["adminReply"]["content"], "How can I help?");

    let sessions = app.call("GET", "/api/sessions", Some(&user), None).await;
    let listed = sessions.body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["displayName"], "Hello...");
    assert_eq!(listed[0]["unreadReplies"], 1);
    assert_eq!(listed[0]["messages"][0]["content"], "How can I help?");

    let history = app
        .call(
            "GET",
            &format!("/api/sessions/{session_id}/messages"),
            Some(&user),
            None,
        )
        .await;
    let kinds: Vec<_> = history
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, vec!["USER", "ASSISTANT"]);
}

#[tokio::test]
async fn sessions_are_private_and_delete_cascades() {
    let app = spawn_app("cascade").await;
    let owner = app.register("erin", None).await;
    let other = app.register("frank", None).await;

    let session = app
        .call(
            "POST",
            "/api/sessions",
            Some(&owner),
            Some(json!({ "name": "  Billing  " })),
        )
        .await;
    let session_id = session.body["id"].as_str().unwrap().to_string();
    assert_eq!(session.body["name"], "Billing");

    app.call(
        "POST",
        "/api/messages",
        Some(&owner),
        Some(json!({ "sessionId": session_id, "content": "Invoice question" })),
    )
    .await;

    let foreign_post = app
        .call(
            "POST",
            "/api/messages",
            Some(&other),
            Some(json!({ "sessionId": session_id, "content": "hi" })),
        )
        .await;
    assert_eq!(foreign_post.status, StatusCode::NOT_FOUND);

    let foreign_delete = app
        .call(
            "DELETE",
            &format!("/api/sessions/{session_id}"),
            Some(&other),
            None,
        )
        .await;
    assert_eq!(foreign_delete.status, StatusCode::NOT_FOUND);

    let deleted = app
        .call(
            "DELETE",
            &format!("/api/sessions/{session_id}"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["success"], true);

    assert!(app.storage.get_session(&session_id).await.unwrap().is_none());
    assert!(app.storage.list_messages(&session_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn admin_can_edit_and_delete_messages() {
    let app = spawn_app("edit").await;
    let admin = app.admin().await;
    let user = app.register("gina", None).await;

    let session = app
        .call("POST", "/api/sessions", Some(&user), Some(json!({})))
        .await;
    let session_id = session.body["id"].as_str().unwrap().to_string();
    let posted = app
        .call(
            "POST",
            "/api/messages",
            Some(&user),
            Some(json!({ "sessionId": session_id, "content": "typo hree" })),
        )
        .await;
    let message_id = posted.body["id"].as_str().unwrap().to_string();
    let uri = format!("/api/messages/{message_id}");

    let as_user = app
        .call("PUT", &uri, Some(&user), Some(json!({ "content": "x" })))
        .await;
    assert_eq!(as_user.status, StatusCode::UNAUTHORIZED);

    let edited = app
        .call("PUT", &uri, Some(&admin), Some(json!({ "content": "typo here" })))
        .await;
    assert_eq!(edited.status, StatusCode::OK);
    assert_eq!(edited.body["content"], "typo here");

    let all = app.call("GET", "/api/messages", Some(&admin), None).await;
    assert_eq!(all.body.as_array().unwrap().len(), 1);

    let removed = app.call("DELETE", &uri, Some(&admin), None).await;
    assert_eq!(removed.status, StatusCode::OK);
    let missing = app.call("DELETE", &uri, Some(&admin), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn system_status_is_persisted_and_validated() {
    let app = spawn_app("status").await;

    let initial = app.call("GET", "/api/system-status", None, None).await;
    assert_eq!(initial.status, StatusCode::OK);
    assert_eq!(initial.body["status"], "active");

    let anonymous = app
        .call(
            "POST",
            "/api/admin/system-status",
            None,
            Some(json!({ "status": "maintenance" })),
        )
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let admin = app.admin().await;
    let invalid = app
        .call(
            "POST",
            "/api/admin/system-status",
            Some(&admin),
            Some(json!({ "status": "paused" })),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let changed = app
        .call(
            "POST",
            "/api/admin/system-status",
            Some(&admin),
            Some(json!({ "status": "maintenance" })),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK);
    assert_eq!(changed.body["message"], "System status changed to maintenance");

    let reopened = DeskStorage::connect(&app.database_url).await.unwrap();
    assert_eq!(
        reopened.system_status().await.unwrap(),
        SystemStatus::Maintenance
    );

    let admin_view = app
        .call("GET", "/api/admin/system-status", Some(&admin), None)
        .await;
    assert_eq!(admin_view.body["status"], "maintenance");
}

#[tokio::test]
async fn setup_creates_only_the_first_admin() {
    let app = spawn_app("setup").await;

    let open = app.call("GET", "/api/admin/setup", None, None).await;
    assert_eq!(open.status, StatusCode::OK);
    assert_eq!(open.body["exists"], false);

    let admin = app.admin().await;
    assert!(admin.starts_with("admin-session="));

    let closed = app.call("GET", "/api/admin/setup", None, None).await;
    assert_eq!(closed.status, StatusCode::CONFLICT);
    assert_eq!(closed.body["exists"], true);

    let second = app
        .call(
            "POST",
            "/api/admin/setup",
            None,
            Some(json!({ "username": "other", "password": "other-pass" })),
        )
        .await;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cleanup_preview_lists_nothing_for_fresh_sessions() {
    let app = spawn_app("cleanup").await;
    let admin = app.admin().await;
    let user = app.register("hank", None).await;
    app.call("POST", "/api/sessions", Some(&user), Some(json!({})))
        .await;

    let denied = app.call("GET", "/api/cleanup", Some(&user), None).await;
    assert_eq!(denied.status, StatusCode::UNAUTHORIZED);

    let preview = app.call("GET", "/api/cleanup", Some(&admin), None).await;
    assert_eq!(preview.status, StatusCode::OK);
    assert_eq!(preview.body["oldSessions"], 0);

    let run = app.call("POST", "/api/cleanup", Some(&admin), None).await;
    assert_eq!(run.status, StatusCode::OK);
    assert_eq!(run.body["deletedSessions"], 0);

    let health = app.call("GET", "/api/health", None, None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "healthy");
    assert_eq!(health.body["environment"]["cleanupEnabled"], false);
}

#[tokio::test]
async fn health_reports_the_cleanup_schedule_from_state() {
    let app = spawn_app_with_cleanup("health", true).await;
    let health = app.call("GET", "/api/health", None, None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["environment"]["cleanupEnabled"], true);
    assert_eq!(health.body["environment"]["databaseConfigured"], true);
}

#[tokio::test]
async fn cookie_for_a_deleted_user_is_rejected() {
    let app = spawn_app("deleted-user").await;
    let cookie = app.register("judy", None).await;
    let me = app.call("GET", "/api/user/me", Some(&cookie), None).await;
    let user_id = me.body["user"]["id"].as_str().unwrap().to_string();
    let session = app
        .call("POST", "/api/sessions", Some(&cookie), Some(json!({})))
        .await;
    let session_id = session.body["id"].as_str().unwrap().to_string();

    let opts = SqliteConnectOptions::from_str(&app.database_url)
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePool::connect_with(opts).await.unwrap();
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(&user_id)
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let sessions = app.call("GET", "/api/sessions", Some(&cookie), None).await;
    assert_eq!(sessions.status, StatusCode::UNAUTHORIZED);
    let me = app.call("GET", "/api/user/me", Some(&cookie), None).await;
    assert_eq!(me.status, StatusCode::NOT_FOUND);
    assert_eq!(me.body["error"]["code"], "NOT_FOUND");
    assert!(app.storage.get_session(&session_id).await.unwrap().is_none());
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let app = spawn_app("malformed").await;
    let user = app.register("kate", None).await;

    let missing_field = app
        .call(
            "POST",
            "/api/messages",
            Some(&user),
            Some(json!({ "sessionId": "x" })),
        )
        .await;
    assert_eq!(missing_field.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing_field.body["error"]["code"], "BAD_REQUEST");

    let no_body = app.call("POST", "/api/sessions", Some(&user), None).await;
    assert_eq!(no_body.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_body.body["error"]["code"], "BAD_REQUEST");

    let wrong_type = app
        .call(
            "POST",
            "/api/user/register",
            None,
            Some(json!({ "username": 42, "password": "secret-pass" })),
        )
        .await;
    assert_eq!(wrong_type.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = spawn_app("limit").await;
    let user = app.register("ivy", None).await;

    let huge = "x".repeat(BODY_LIMIT_BYTES + 1);
    let reply = app
        .call(
            "POST",
            "/api/messages",
            Some(&user),
            Some(json!({ "sessionId": "s", "content": huge })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(reply.body["error"]["code"], "PAYLOAD_TOO_LARGE");
}
