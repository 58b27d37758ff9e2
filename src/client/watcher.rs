//! Single-shot "wait for one reply" polling.
//!
//! A watch fetches the session's messages once per interval and compares the
//! number of ASSISTANT messages against a baseline. The first tick that sees
//! more of them ends the watch: the notifier fires and the messages are
//! returned with the new replies marked. Fetch failures are logged and the
//! next tick retries; there is no backoff. Dropping the future cancels it.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::DbMessage;
use crate::error::DeskError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Anything that can list a session's messages in conversation order.
pub trait MessageSource: Send + Sync {
    fn session_messages(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Vec<DbMessage>, DeskError>> + Send;
}

/// Receives the event that ends a watch.
pub trait ReplyNotifier: Send + Sync {
    fn notify(&self, event: &ReplyEvent);
}

impl<F> ReplyNotifier for F
where
    F: Fn(&ReplyEvent) + Send + Sync,
{
    fn notify(&self, event: &ReplyEvent) {
        self(event)
    }
}

/// Notifier that only logs.
pub struct LogNotifier;

impl ReplyNotifier for LogNotifier {
    fn notify(&self, event: &ReplyEvent) {
        info!(
            session_id = %event.session_id,
            new_replies = event.new_replies,
            "new reply received"
        );
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedMessage {
    #[serde(flatten)]
    pub message: DbMessage,
    pub is_new: bool,
}

#[derive(Debug, Clone)]
pub struct ReplyEvent {
    pub session_id: String,
    pub new_replies: usize,
    pub messages: Vec<MarkedMessage>,
    /// Number of fetches issued, including the one that saw the reply.
    pub polls: usize,
}

pub fn assistant_count(messages: &[DbMessage]) -> usize {
    messages.iter().filter(|m| m.is_assistant()).count()
}

/// Mark the trailing ASSISTANT messages that account for the increase over
/// `previous` assistant messages.
pub fn mark_new_replies(messages: Vec<DbMessage>, previous: usize) -> Vec<MarkedMessage> {
    let increase = assistant_count(&messages).saturating_sub(previous);
    let first_new = messages.len().saturating_sub(increase);
    messages
        .into_iter()
        .enumerate()
        .map(|(index, message)| MarkedMessage {
            is_new: increase > 0 && message.is_assistant() && index >= first_new,
            message,
        })
        .collect()
}

pub struct ReplyWatcher {
    interval: Duration,
}

impl Default for ReplyWatcher {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ReplyWatcher {
    /// A zero interval falls back to [`DEFAULT_POLL_INTERVAL`].
    pub fn new(interval: Duration) -> Self {
        if interval.is_zero() {
            warn!("zero poll interval; using the default");
            return Self::default();
        }
        Self { interval }
    }

    /// Watcher ticking at `DESK_POLL_INTERVAL_MS`.
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.poll_interval())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll until the session holds more than `baseline` ASSISTANT messages.
    /// The first fetch happens one interval after the call.
    pub async fn wait_for_reply<S, N>(
        &self,
        source: &S,
        session_id: &str,
        baseline: usize,
        notifier: &N,
    ) -> ReplyEvent
    where
        S: MessageSource,
        N: ReplyNotifier,
    {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls = 0usize;

        loop {
            ticker.tick().await;
            polls += 1;

            let messages = match source.session_messages(session_id).await {
                Ok(messages) => messages,
                Err(e) => {
                    warn!(session_id, error = %e, "failed to poll messages");
                    continue;
                }
            };

            let current = assistant_count(&messages);
            if current <= baseline {
                debug!(session_id, polls, current, "no new reply yet");
                continue;
            }

            let event = ReplyEvent {
                session_id: session_id.to_string(),
                new_replies: current - baseline,
                messages: mark_new_replies(messages, baseline),
                polls,
            };
            notifier.notify(&event);
            return event;
        }
    }
}
