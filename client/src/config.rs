//! Configuration for the sync client.

use std::env;
use std::time::Duration;

/// Default interval between timer-driven sync cycles.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Sync client configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the remote submission endpoints
    pub remote_url: String,
    /// SQLite connection URL for the local durable store
    pub database_url: String,
    /// Whether reconnect and timer triggers are active
    pub auto_sync: bool,
    /// Interval between timer-driven sync cycles
    pub sync_interval: Duration,
    /// Failed attempts before a record is dropped
    pub max_retries: u32,
}

impl SyncConfig {
    /// Configuration with default sync behavior.
    pub fn new(remote_url: impl Into<String>, database_url: impl Into<String>) -> Self {
        Self {
            remote_url: remote_url.into(),
            database_url: database_url.into(),
            auto_sync: true,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            max_retries: outbox_engine::DEFAULT_MAX_RETRIES,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let remote_url =
            env::var("OUTBOX_REMOTE_URL").map_err(|_| ConfigError::MissingRemoteUrl)?;
        let database_url =
            env::var("OUTBOX_DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;

        let mut config = Self::new(remote_url, database_url);

        if let Ok(value) = env::var("OUTBOX_AUTO_SYNC") {
            config.auto_sync = value.parse().map_err(|_| ConfigError::InvalidAutoSync)?;
        }
        if let Ok(value) = env::var("OUTBOX_SYNC_INTERVAL_MS") {
            let millis: u64 = value.parse().map_err(|_| ConfigError::InvalidSyncInterval)?;
            config.sync_interval = Duration::from_millis(millis);
        }
        if let Ok(value) = env::var("OUTBOX_MAX_RETRIES") {
            config.max_retries = value.parse().map_err(|_| ConfigError::InvalidMaxRetries)?;
        }

        Ok(config)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("OUTBOX_REMOTE_URL environment variable is required")]
    MissingRemoteUrl,

    #[error("OUTBOX_DATABASE_URL environment variable is required")]
    MissingDatabaseUrl,

    #[error("Invalid OUTBOX_AUTO_SYNC value")]
    InvalidAutoSync,

    #[error("Invalid OUTBOX_SYNC_INTERVAL_MS value")]
    InvalidSyncInterval,

    #[error("Invalid OUTBOX_MAX_RETRIES value")]
    InvalidMaxRetries,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SyncConfig::new("http://localhost:3000", "sqlite::memory:");
        assert!(config.auto_sync);
        assert_eq!(config.sync_interval, Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
    }
}
