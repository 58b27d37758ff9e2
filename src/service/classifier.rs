use crate::db::{DbMessage, DeskStorage, MessageType, MessageWithSession};
use crate::error::DeskError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;

/// Finds the reply that answers a user message.
pub trait ReplyLookup: Send + Sync {
    /// Earliest ASSISTANT message in `session_id` created strictly after `after`.
    fn reply_after(
        &self,
        session_id: &str,
        after: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<DbMessage>, DeskError>> + Send;
}

impl ReplyLookup for DeskStorage {
    async fn reply_after(
        &self,
        session_id: &str,
        after: DateTime<Utc>,
    ) -> Result<Option<DbMessage>, DeskError> {
        self.first_reply_after(session_id, after).await
    }
}

/// A user message together with the reply that answers it, if any.
#[derive(Debug, Clone)]
pub struct ClassifiedMessage {
    pub message: MessageWithSession,
    pub reply: Option<DbMessage>,
}

impl ClassifiedMessage {
    pub fn is_answered(&self) -> bool {
        self.reply.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredMessage {
    #[serde(flatten)]
    pub message: MessageWithSession,
    pub admin_reply: DbMessage,
}

/// In-memory form of the answered predicate: some ASSISTANT message of the
/// same session is strictly newer than `user_message`.
pub fn is_answered(user_message: &DbMessage, messages: &[DbMessage]) -> bool {
    messages.iter().any(|m| {
        m.kind == MessageType::Assistant
            && m.session_id == user_message.session_id
            && m.created_at > user_message.created_at
    })
}

/// Classify each message with one reply lookup per message, preserving order.
pub async fn classify<L: ReplyLookup>(
    lookup: &L,
    user_messages: Vec<MessageWithSession>,
) -> Result<Vec<ClassifiedMessage>, DeskError> {
    let mut classified = Vec::with_capacity(user_messages.len());
    for message in user_messages {
        let reply = lookup
            .reply_after(&message.message.session_id, message.message.created_at)
            .await?;
        classified.push(ClassifiedMessage { message, reply });
    }
    Ok(classified)
}

/// USER messages still waiting for an answer, newest first.
pub async fn unanswered(storage: &DeskStorage) -> Result<Vec<MessageWithSession>, DeskError> {
    let user_messages = storage
        .list_messages_with_session(Some(MessageType::User))
        .await?;
    Ok(classify(storage, user_messages)
        .await?
        .into_iter()
        .filter(|c| !c.is_answered())
        .map(|c| c.message)
        .collect())
}

/// USER messages that have been answered, newest first, with their first reply.
pub async fn answered(storage: &DeskStorage) -> Result<Vec<AnsweredMessage>, DeskError> {
    let user_messages = storage
        .list_messages_with_session(Some(MessageType::User))
        .await?;
    Ok(classify(storage, user_messages)
        .await?
        .into_iter()
        .filter_map(|c| {
            c.reply.map(|admin_reply| AnsweredMessage {
                message: c.message,
                admin_reply,
            })
        })
        .collect())
}
