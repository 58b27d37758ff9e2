use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::client::watcher::MessageSource;
use crate::db::{DbMessage, DbSession};
use crate::error::DeskError;
use crate::types::api::{
    CreateMessageRequest, CreateSessionRequest, LoginRequest, RegisterRequest, StatusResponse,
    UserAuthResponse,
};

/// End-user client for the desk API. Keeps the `user-auth` cookie between
/// calls, so `register` or `login` must come first.
#[derive(Clone)]
pub struct DeskClient {
    http: Client,
    base: Url,
}

impl DeskClient {
    pub fn new(base: Url) -> Result<Self, DeskError> {
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self { http, base })
    }

    pub async fn register(
        &self,
        username: &str,
        email: Option<&str>,
        password: &str,
    ) -> Result<UserAuthResponse, DeskError> {
        let body = RegisterRequest {
            username: username.to_string(),
            email: email.map(str::to_string),
            password: password.to_string(),
        };
        self.post("api/user/register", &body).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserAuthResponse, DeskError> {
        let body = LoginRequest {
            email: Some(email.to_string()),
            username: None,
            password: password.to_string(),
        };
        self.post("api/user/auth", &body).await
    }

    pub async fn create_session(&self, name: Option<&str>) -> Result<DbSession, DeskError> {
        let body = CreateSessionRequest {
            name: name.map(str::to_string),
        };
        self.post("api/sessions", &body).await
    }

    pub async fn send_message(&self, session_id: &str, content: &str) -> Result<DbMessage, DeskError> {
        let body = CreateMessageRequest {
            session_id: session_id.to_string(),
            content: content.to_string(),
        };
        self.post("api/messages", &body).await
    }

    pub async fn messages(&self, session_id: &str) -> Result<Vec<DbMessage>, DeskError> {
        self.get(&format!("api/sessions/{session_id}/messages")).await
    }

    pub async fn system_status(&self) -> Result<StatusResponse, DeskError> {
        self.get("api/system-status").await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, DeskError> {
        let resp = self.http.get(self.base.join(path)?).send().await?;
        Self::decode(resp).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, DeskError> {
        let resp = self
            .http
            .post(self.base.join(path)?)
            .json(body)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, DeskError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(DeskError::UnexpectedStatus(status));
        }
        Ok(resp.json::<T>().await?)
    }
}

impl MessageSource for DeskClient {
    async fn session_messages(&self, session_id: &str) -> Result<Vec<DbMessage>, DeskError> {
        self.messages(session_id).await
    }
}
