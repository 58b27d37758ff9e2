use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who authored a message: the end user or the human admin answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    User,
    Assistant,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::User => "USER",
            MessageType::Assistant => "ASSISTANT",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(MessageType::User),
            "ASSISTANT" => Ok(MessageType::Assistant),
            other => Err(format!("unknown message type `{other}`")),
        }
    }
}

/// Global flag shown to users; stored under [`SYSTEM_STATUS_KEY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    #[default]
    Active,
    Maintenance,
}

pub const SYSTEM_STATUS_KEY: &str = "system_status";

impl SystemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemStatus::Active => "active",
            SystemStatus::Maintenance => "maintenance",
        }
    }
}

impl FromStr for SystemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SystemStatus::Active),
            "maintenance" => Ok(SystemStatus::Maintenance),
            other => Err(format!("invalid status `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DbUser {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DbAdminUser {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DbSession {
    pub id: String,
    pub name: Option<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DbMessage {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

impl DbMessage {
    pub fn is_user(&self) -> bool {
        self.kind == MessageType::User
    }

    pub fn is_assistant(&self) -> bool {
        self.kind == MessageType::Assistant
    }
}

/// Public projection of a user, as embedded in admin listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionWithUser {
    #[serde(flatten)]
    pub session: DbSession,
    pub user: UserSummary,
}

/// A message joined with its parent session (and that session's owner).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageWithSession {
    #[serde(flatten)]
    pub message: DbMessage,
    pub session: SessionWithUser,
}
