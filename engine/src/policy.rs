//! Retry accounting for failed sync attempts.

use serde::{Deserialize, Serialize};

use crate::record::SyncState;

/// Default retry ceiling.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Bounded-retry policy applied to every failed submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl RetryPolicy {
    /// Create a policy with the given retry ceiling.
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// The configured retry ceiling.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decide what happens to a record after one failed submission.
    ///
    /// Incrementing the retry count and evicting the record are mutually
    /// exclusive outcomes of a single failure: exactly one of them applies.
    pub fn on_failure(&self, state: &SyncState, error: impl Into<String>) -> Disposition {
        let retry_count = state.retry_count + 1;
        if retry_count >= self.max_retries {
            Disposition::Evict {
                error: error.into(),
            }
        } else {
            Disposition::Retry {
                retry_count,
                error: error.into(),
            }
        }
    }
}

/// Outcome of a single failed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Persist the incremented retry count and keep the record for the
    /// next drain cycle.
    Retry { retry_count: u32, error: String },
    /// The ceiling has been reached: drop the record and surface the loss.
    Evict { error: String },
}
