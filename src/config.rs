use axum_extra::extract::cookie::Key;
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::warn;

/// Process-wide configuration, resolved once from defaults and `DESK_*` env vars.
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::from_env().unwrap_or_else(|e| panic!("failed to load configuration: {e}"))
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub database_url: String,
    pub loglevel: String,
    /// Master key for sealing auth cookies; must be at least 64 bytes.
    pub cookie_secret: Option<String>,
    /// Drop the `Secure` attribute from auth cookies (plain-HTTP deployments).
    pub insecure_cookie: bool,
    pub cleanup_enabled: bool,
    pub retention_hours: i64,
    pub cleanup_interval_secs: u64,
    pub poll_interval_ms: u64,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            database_url: "sqlite://chat-desk.db".to_string(),
            loglevel: "info".to_string(),
            cookie_secret: None,
            insecure_cookie: false,
            cleanup_enabled: false,
            retention_hours: 48,
            cleanup_interval_secs: 24 * 60 * 60,
            poll_interval_ms: 3_000,
            admin_username: None,
            admin_password: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, figment::Error> {
        let cfg: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("DESK_"))
            .extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the timers and retention policy cannot run with.
    pub fn validate(&self) -> Result<(), figment::Error> {
        if self.cleanup_interval_secs == 0 {
            return Err("DESK_CLEANUP_INTERVAL_SECS must be greater than zero".into());
        }
        if self.poll_interval_ms == 0 {
            return Err("DESK_POLL_INTERVAL_MS must be greater than zero".into());
        }
        if self.retention_hours < 0 {
            return Err("DESK_RETENTION_HOURS must not be negative".into());
        }
        Ok(())
    }

    /// Cookie sealing key. Falls back to a random key, which invalidates
    /// every issued cookie on restart.
    pub fn cookie_key(&self) -> Key {
        match self.cookie_secret.as_deref().map(str::as_bytes) {
            Some(secret) => Key::try_from(secret).unwrap_or_else(|_| {
                warn!(
                    len = secret.len(),
                    "DESK_COOKIE_SECRET shorter than 64 bytes; using a random cookie key"
                );
                Key::generate()
            }),
            None => {
                warn!("DESK_COOKIE_SECRET not set; using a random cookie key");
                Key::generate()
            }
        }
    }

    pub fn retention(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::hours(self.retention_hours)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
