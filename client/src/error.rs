//! Unified error handling for the sync client.

/// All errors surfaced by the sync client.
///
/// Storage and transport failures are caught at the point of use and turned
/// into sync results or notifications; nothing escapes a drain cycle uncaught.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("storage migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote rejected submission ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("engine error: {0}")]
    Engine(#[from] outbox_engine::Error),

    #[error("bridge init failed: {0}")]
    BridgeInit(String),
}

impl SyncError {
    /// Whether this failure came from the remote submission path.
    ///
    /// Transport failures feed the retry policy; storage failures abort the
    /// cycle instead.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SyncError::Transport(_) | SyncError::RemoteRejected { .. }
        )
    }
}

/// Result type alias for the sync client.
pub type Result<T> = std::result::Result<T, SyncError>;
