//! # Outbox Engine
//!
//! Core types for an offline write buffer.
//!
//! This crate provides the IO-free half of Outbox: the record model for
//! locally buffered writes, the fixed set of partitions they live in, the
//! bounded-retry policy applied when a remote submission fails, and the
//! per-cycle sync report.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine has no knowledge of files, network, or platform
//! - **Opaque payloads**: record payloads are carried, never interpreted
//! - **Single source of truth**: report counts derive from the result list,
//!   never from separate counters
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`Record`] is one pending unit of offline-originated data:
//! - Unique ID (`{partition}_{timestamp}_{nonce}` when generated)
//! - [`Partition`] membership (forms, patient data, recordings, uploads)
//! - Opaque JSON payload
//! - Creation timestamp (immutable)
//! - [`SyncState`]: synced flag, retry count, last error
//!
//! ### Retry Policy
//!
//! The [`RetryPolicy`] decides, after each failed submission, whether the
//! record stays queued with an incremented retry count or is evicted because
//! the ceiling was reached. The two outcomes are mutually exclusive; a record
//! that reaches the ceiling no longer exists in the buffer.
//!
//! ### Sync Reports
//!
//! Each drain cycle produces one [`SyncResult`] per attempted record and
//! aggregates them into a [`SyncReport`] for completion callbacks.
//!
//! ## Quick Start
//!
//! ```rust
//! use outbox_engine::{Disposition, Partition, Record, RetryPolicy};
//! use serde_json::json;
//!
//! let id = Record::generate_id(Partition::Form, 1706745600000, "a1b2c3d4");
//! let record = Record::new(id, Partition::Form, json!({"field": "value"}), 1706745600000);
//! assert!(record.is_pending());
//!
//! let policy = RetryPolicy::default(); // ceiling of 3
//! match policy.on_failure(&record.state, "connection refused") {
//!     Disposition::Retry { retry_count, .. } => assert_eq!(retry_count, 1),
//!     Disposition::Evict { .. } => unreachable!(),
//! }
//! ```

pub mod error;
pub mod policy;
pub mod record;
pub mod report;

// Re-export main types at crate root
pub use error::Error;
pub use policy::{Disposition, RetryPolicy, DEFAULT_MAX_RETRIES};
pub use record::{Partition, Record, SyncState};
pub use report::{SyncOutcome, SyncReport, SyncResult};

/// Type aliases for clarity
pub type RecordId = String;
pub type Timestamp = i64;
