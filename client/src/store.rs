//! Local durable store for offline records.
//!
//! Records are persisted immediately and optimistically; the sync
//! orchestrator moves them to the remote later. All state transitions are
//! single-statement writes, so the store's own transaction semantics are the
//! concurrency boundary.

use outbox_engine::{Partition, Record, RecordId};

use crate::db::{self, Pool};
use crate::error::{Result, SyncError};

/// Key-indexed persistent store partitioned into typed collections.
///
/// Cheap to clone; clones share the underlying pool.
#[derive(Debug, Clone)]
pub struct OfflineStore {
    pool: Pool,
}

impl OfflineStore {
    /// Open the store at the given SQLite URL, creating it and applying
    /// migrations as needed.
    pub async fn open(database_url: &str) -> Result<Self> {
        let pool = db::create_pool(database_url).await?;
        db::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool. Migrations must already have run.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Persist a record, generating an ID when the caller does not supply one.
    /// Returns the record's ID once the write is durable.
    ///
    /// Re-putting an existing ID replaces the payload and resets sync state;
    /// `created_at` stays at the first write.
    pub async fn put(
        &self,
        partition: Partition,
        payload: serde_json::Value,
        id: Option<String>,
    ) -> Result<RecordId> {
        let id = match id {
            Some(id) if id.is_empty() => {
                return Err(SyncError::Engine(outbox_engine::Error::InvalidRecordId(
                    "record id must not be empty".into(),
                )))
            }
            Some(id) => id,
            None => Record::generate_id(partition, now_ms(), &nonce()),
        };

        let record = Record::new(id.clone(), partition, payload, now_ms());
        db::upsert_record(&self.pool, &record).await?;
        tracing::debug!(partition = %partition, record_id = %id, "record buffered");

        Ok(id)
    }

    /// Get one record's payload, or `None` when absent.
    pub async fn get(&self, partition: Partition, id: &str) -> Result<Option<serde_json::Value>> {
        let stored = db::get_record(&self.pool, partition, id).await?;
        Ok(stored.map(|s| s.payload))
    }

    /// Get all payloads in a partition, in arrival order.
    pub async fn get_all(&self, partition: Partition) -> Result<Vec<serde_json::Value>> {
        let stored = db::get_records_in_partition(&self.pool, partition).await?;
        Ok(stored.into_iter().map(|s| s.payload).collect())
    }

    /// Remove a record. Absent IDs are not an error.
    pub async fn delete(&self, partition: Partition, id: &str) -> Result<()> {
        db::delete_record(&self.pool, partition, id).await?;
        Ok(())
    }

    /// Full records for a partition, in arrival order.
    pub async fn list_all(&self, partition: Partition) -> Result<Vec<Record>> {
        let stored = db::get_records_in_partition(&self.pool, partition).await?;
        to_records(stored)
    }

    /// Records still awaiting a successful sync, via the unsynced index.
    pub async fn list_unsynced(&self, partition: Partition) -> Result<Vec<Record>> {
        let stored = db::get_unsynced(&self.pool, partition).await?;
        to_records(stored)
    }

    /// Mark a record synced and reset its retry bookkeeping.
    pub async fn mark_synced(&self, partition: Partition, id: &str) -> Result<()> {
        db::mark_synced(&self.pool, partition, id).await?;
        Ok(())
    }

    /// Persist one failed attempt against a record.
    pub async fn record_failure(
        &self,
        partition: Partition,
        id: &str,
        retry_count: u32,
        last_error: &str,
    ) -> Result<()> {
        db::record_failure(&self.pool, partition, id, retry_count, last_error).await?;
        Ok(())
    }

    /// Wipe one partition.
    pub async fn clear(&self, partition: Partition) -> Result<()> {
        db::clear_partition(&self.pool, partition).await?;
        Ok(())
    }

    /// Wipe every partition.
    pub async fn clear_all(&self) -> Result<()> {
        db::clear_all(&self.pool).await?;
        Ok(())
    }

    /// Unsynced records across all partitions. This is the single source of
    /// truth for pending accounting; there is no separate counter to drift.
    pub async fn pending_count(&self) -> Result<u64> {
        Ok(db::count_unsynced(&self.pool).await?)
    }

    /// Best-effort storage usage in bytes; 0 when unsupported.
    pub async fn estimate_size(&self) -> u64 {
        db::estimate_size(&self.pool).await
    }
}

fn to_records(stored: Vec<db::StoredRecord>) -> Result<Vec<Record>> {
    stored
        .iter()
        .map(|s| s.to_record().map_err(SyncError::Engine))
        .collect()
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Short random suffix for generated record IDs.
fn nonce() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}
