//! Per-record sync results and the per-cycle report.

use serde::{Deserialize, Serialize};

use crate::{Partition, RecordId};

/// What happened to one record during a drain cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "status")]
pub enum SyncOutcome {
    /// The remote confirmed the write
    Synced,
    /// The attempt failed; the record stays for the next cycle
    Retrying { retry_count: u32, error: String },
    /// The retry ceiling was reached and the record was dropped
    Dropped { error: String },
}

/// Result of one sync attempt for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    /// The record that was attempted
    pub id: RecordId,
    /// Partition the record belongs to
    pub partition: Partition,
    /// Outcome of the attempt
    pub outcome: SyncOutcome,
}

impl SyncResult {
    /// Whether the remote accepted the record.
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Synced)
    }
}

/// Aggregated results of one drain cycle.
///
/// All counts are derived from the result list itself; there is no parallel
/// counter that can drift from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// One entry per attempted record
    pub results: Vec<SyncResult>,
}

impl SyncReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one record's result.
    pub fn push(&mut self, result: SyncResult) {
        self.results.push(result);
    }

    /// Number of records attempted this cycle.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether any records were attempted.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Records the remote accepted.
    pub fn synced_count(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded()).count()
    }

    /// Records that failed and remain queued.
    pub fn retried_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, SyncOutcome::Retrying { .. }))
            .count()
    }

    /// Records permanently dropped at the retry ceiling.
    pub fn dropped_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, SyncOutcome::Dropped { .. }))
            .count()
    }

    /// True when every attempted record synced.
    pub fn is_clean(&self) -> bool {
        self.results.iter().all(|r| r.succeeded())
    }

    /// Iterate over terminal failures, for error surfacing.
    pub fn dropped(&self) -> impl Iterator<Item = &SyncResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, SyncOutcome::Dropped { .. }))
    }
}
