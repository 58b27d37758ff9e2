#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use axum_extra::extract::cookie::Key;
use chat_desk::service::cleanup::RetentionPolicy;
use chat_desk::{DeskState, DeskStorage, desk_router};
use serde_json::Value;
use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};
use tower::ServiceExt;

pub struct TestApp {
    pub app: Router,
    pub storage: DeskStorage,
    pub db_path: PathBuf,
    pub database_url: String,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.db_path);
    }
}

pub struct Reply {
    pub status: StatusCode,
    /// `name=value` of the first `Set-Cookie`, ready to send back.
    pub cookie: Option<String>,
    pub body: Value,
}

pub async fn spawn_app(tag: &str) -> TestApp {
    spawn_app_with_cleanup(tag, false).await
}

pub async fn spawn_app_with_cleanup(tag: &str, cleanup_enabled: bool) -> TestApp {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut db_path = std::env::temp_dir();
    db_path.push(format!(
        "chat-desk-it-{tag}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    let database_url = format!("sqlite:{}", db_path.display());
    let storage = DeskStorage::connect(&database_url)
        .await
        .expect("failed to open database");

    let state = DeskState::new(
        storage.clone(),
        Key::generate(),
        false,
        RetentionPolicy::new(chrono::TimeDelta::days(2)),
        cleanup_enabled,
    );
    TestApp {
        app: desk_router(state),
        storage,
        db_path,
        database_url,
    }
}

impl TestApp {
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        let req = match body {
            Some(json) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => req.body(Body::empty()),
        }
        .expect("failed to build request");

        let resp = self.app.clone().oneshot(req).await.expect("request failed");
        let status = resp.status();
        let cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body was not JSON")
        };
        Reply {
            status,
            cookie,
            body,
        }
    }

    /// Register a user and return its cookie.
    pub async fn register(&self, username: &str, email: Option<&str>) -> String {
        let reply = self
            .call(
                "POST",
                "/api/user/register",
                None,
                Some(serde_json::json!({
                    "username": username,
                    "email": email,
                    "password": "secret-pass",
                })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "register failed: {}", reply.body);
        reply.cookie.expect("register did not set a cookie")
    }

    /// Create the first admin, sign in, and return the admin cookie.
    pub async fn admin(&self) -> String {
        let creds = serde_json::json!({ "username": "admin", "password": "admin-pass" });
        let setup = self
            .call("POST", "/api/admin/setup", None, Some(creds.clone()))
            .await;
        assert_eq!(setup.status, StatusCode::OK, "setup failed: {}", setup.body);
        let login = self.call("POST", "/api/admin/auth", None, Some(creds)).await;
        assert_eq!(login.status, StatusCode::OK);
        login.cookie.expect("admin login did not set a cookie")
    }
}
