use crate::db::{DbMessage, DbSession, DeskStorage};
use crate::error::DeskError;
use serde::Serialize;

const PREVIEW_CHARS: usize = 5;

/// One row of a user's session list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    #[serde(flatten)]
    pub session: DbSession,
    pub display_name: String,
    pub unread_replies: usize,
    /// Latest message only, mirroring the session list preview.
    pub messages: Vec<DbMessage>,
}

/// Session name, else a short preview of the first user message, else a
/// fallback built from the id. `messages` must be in conversation order.
pub fn display_name(session: &DbSession, messages: &[DbMessage]) -> String {
    if let Some(name) = session.name.as_deref().filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    if let Some(first) = messages.iter().find(|m| m.is_user()) {
        let content = first.content.trim();
        if !content.is_empty() {
            return if content.chars().count() > PREVIEW_CHARS {
                let head: String = content.chars().take(PREVIEW_CHARS).collect();
                format!("{head}...")
            } else {
                content.to_string()
            };
        }
    }
    let short: String = session.id.chars().take(8).collect();
    format!("Chat {short}")
}

/// Replies the user has not followed up on: ASSISTANT messages strictly
/// newer than the last USER message.
pub fn unread_replies(messages: &[DbMessage]) -> usize {
    let Some(last_user) = messages.iter().filter(|m| m.is_user()).map(|m| m.created_at).max()
    else {
        return 0;
    };
    messages
        .iter()
        .filter(|m| m.is_assistant() && m.created_at > last_user)
        .count()
}

pub fn summarize(session: DbSession, messages: &[DbMessage]) -> SessionSummary {
    SessionSummary {
        display_name: display_name(&session, messages),
        unread_replies: unread_replies(messages),
        messages: messages.last().cloned().into_iter().collect(),
        session,
    }
}

/// Summaries of every session owned by `user_id`, most recently active first.
pub async fn list_for_user(
    storage: &DeskStorage,
    user_id: &str,
) -> Result<Vec<SessionSummary>, DeskError> {
    let sessions = storage.list_sessions_for_user(user_id).await?;
    let mut summaries = Vec::with_capacity(sessions.len());
    for session in sessions {
        let messages = storage.list_messages(&session.id).await?;
        summaries.push(summarize(session, &messages));
    }
    Ok(summaries)
}
