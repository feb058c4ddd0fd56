//! Error types for the Outbox engine.

use thiserror::Error;

/// All possible errors from the Outbox engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unknown partition: {0}")]
    UnknownPartition(String),

    #[error("invalid record id: {0}")]
    InvalidRecordId(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
