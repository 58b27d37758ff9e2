use crate::db::DeskStorage;
use crate::error::DeskError;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Sessions created before `now - retention` are eligible for deletion.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub retention: TimeDelta,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleSession {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

impl RetentionPolicy {
    pub fn new(retention: TimeDelta) -> Self {
        Self { retention }
    }

    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.retention
    }

    pub async fn preview(
        &self,
        storage: &DeskStorage,
        now: DateTime<Utc>,
    ) -> Result<Vec<StaleSession>, DeskError> {
        Ok(storage
            .list_sessions_created_before(self.cutoff(now))
            .await?
            .into_iter()
            .map(|s| StaleSession {
                id: s.id,
                created_at: s.created_at,
            })
            .collect())
    }

    /// Delete stale sessions (messages cascade). Returns the number removed.
    pub async fn run(&self, storage: &DeskStorage, now: DateTime<Utc>) -> Result<u64, DeskError> {
        let deleted = storage
            .delete_sessions_created_before(self.cutoff(now))
            .await?;
        info!(deleted, cutoff = %self.cutoff(now), "cleaned up old sessions");
        Ok(deleted)
    }
}

/// Run the policy every `every`, starting one period from now. A zero
/// period falls back to [`DEFAULT_CLEANUP_INTERVAL`].
pub fn spawn_schedule(storage: DeskStorage, policy: RetentionPolicy, every: Duration) -> JoinHandle<()> {
    let every = if every.is_zero() {
        warn!("zero cleanup interval; using the daily default");
        DEFAULT_CLEANUP_INTERVAL
    } else {
        every
    };
    info!(every_secs = every.as_secs(), "cleanup schedule started");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = policy.run(&storage, Utc::now()).await {
                error!(error = %e, "scheduled cleanup failed");
            }
        }
    })
}
