//! Database operations for the records table.

use outbox_engine::{Partition, Record, SyncState};
use sqlx::types::Json;
use sqlx::{Row, SqlitePool};

/// A buffered record row from the database.
#[derive(Debug)]
pub struct StoredRecord {
    pub partition: String,
    pub record_id: String,
    pub payload: serde_json::Value,
    pub created_at: i64,
    pub synced: bool,
    pub retry_count: i64,
    pub last_error: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for StoredRecord {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        let payload: Json<serde_json::Value> = row.try_get("payload")?;
        Ok(StoredRecord {
            partition: row.try_get("partition")?,
            record_id: row.try_get("record_id")?,
            payload: payload.0,
            created_at: row.try_get("created_at")?,
            synced: row.try_get("synced")?,
            retry_count: row.try_get("retry_count")?,
            last_error: row.try_get("last_error")?,
        })
    }
}

impl StoredRecord {
    /// Convert a database row to an engine Record.
    pub fn to_record(&self) -> Result<Record, outbox_engine::Error> {
        let partition: Partition = self.partition.parse()?;
        Ok(Record {
            id: self.record_id.clone(),
            partition,
            payload: self.payload.clone(),
            created_at: self.created_at,
            state: SyncState {
                synced: self.synced,
                retry_count: self.retry_count as u32,
                last_error: self.last_error.clone(),
            },
        })
    }
}

/// Upsert a record. Re-putting an existing id replaces the payload and resets
/// sync state; `created_at` is never touched after the first write.
pub async fn upsert_record(pool: &SqlitePool, record: &Record) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO records (
            partition, record_id, payload, created_at,
            synced, retry_count, last_error
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (partition, record_id) DO UPDATE SET
            payload = excluded.payload,
            synced = excluded.synced,
            retry_count = excluded.retry_count,
            last_error = excluded.last_error
        "#,
    )
    .bind(record.partition.as_str())
    .bind(&record.id)
    .bind(Json(&record.payload))
    .bind(record.created_at)
    .bind(record.state.synced)
    .bind(record.state.retry_count as i64)
    .bind(&record.state.last_error)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a record by partition and ID.
pub async fn get_record(
    pool: &SqlitePool,
    partition: Partition,
    record_id: &str,
) -> Result<Option<StoredRecord>, sqlx::Error> {
    sqlx::query_as::<_, StoredRecord>(
        r#"
        SELECT partition, record_id, payload, created_at,
               synced, retry_count, last_error
        FROM records
        WHERE partition = ? AND record_id = ?
        "#,
    )
    .bind(partition.as_str())
    .bind(record_id)
    .fetch_optional(pool)
    .await
}

/// Get all records in a partition, in arrival order.
pub async fn get_records_in_partition(
    pool: &SqlitePool,
    partition: Partition,
) -> Result<Vec<StoredRecord>, sqlx::Error> {
    sqlx::query_as::<_, StoredRecord>(
        r#"
        SELECT partition, record_id, payload, created_at,
               synced, retry_count, last_error
        FROM records
        WHERE partition = ?
        ORDER BY created_at, record_id
        "#,
    )
    .bind(partition.as_str())
    .fetch_all(pool)
    .await
}

/// Get unsynced records in a partition, in arrival order.
/// Served by the (partition, synced) index.
pub async fn get_unsynced(
    pool: &SqlitePool,
    partition: Partition,
) -> Result<Vec<StoredRecord>, sqlx::Error> {
    sqlx::query_as::<_, StoredRecord>(
        r#"
        SELECT partition, record_id, payload, created_at,
               synced, retry_count, last_error
        FROM records
        WHERE partition = ? AND synced = 0
        ORDER BY created_at, record_id
        "#,
    )
    .bind(partition.as_str())
    .fetch_all(pool)
    .await
}

/// Mark a record as synced, resetting its retry bookkeeping.
/// A single UPDATE, so the state transition is atomic.
pub async fn mark_synced(
    pool: &SqlitePool,
    partition: Partition,
    record_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE records
        SET synced = 1, retry_count = 0, last_error = NULL
        WHERE partition = ? AND record_id = ?
        "#,
    )
    .bind(partition.as_str())
    .bind(record_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist one failed attempt: the incremented retry count and its error.
pub async fn record_failure(
    pool: &SqlitePool,
    partition: Partition,
    record_id: &str,
    retry_count: u32,
    last_error: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE records
        SET retry_count = ?, last_error = ?
        WHERE partition = ? AND record_id = ?
        "#,
    )
    .bind(retry_count as i64)
    .bind(last_error)
    .bind(partition.as_str())
    .bind(record_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a record. Deleting an absent record is not an error.
pub async fn delete_record(
    pool: &SqlitePool,
    partition: Partition,
    record_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM records WHERE partition = ? AND record_id = ?")
        .bind(partition.as_str())
        .bind(record_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Wipe one partition.
pub async fn clear_partition(pool: &SqlitePool, partition: Partition) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM records WHERE partition = ?")
        .bind(partition.as_str())
        .execute(pool)
        .await?;

    Ok(())
}

/// Wipe all partitions.
pub async fn clear_all(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM records").execute(pool).await?;

    Ok(())
}

/// Count unsynced records across all partitions, from the unsynced index.
pub async fn count_unsynced(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS pending FROM records WHERE synced = 0")
        .fetch_one(pool)
        .await?;
    let pending: i64 = row.try_get("pending")?;

    Ok(pending.max(0) as u64)
}

/// Best-effort storage usage in bytes; 0 when the pragma query fails.
pub async fn estimate_size(pool: &SqlitePool) -> u64 {
    let result = sqlx::query(
        "SELECT page_count * page_size AS bytes FROM pragma_page_count(), pragma_page_size()",
    )
    .fetch_one(pool)
    .await;

    match result {
        Ok(row) => row
            .try_get::<i64, _>("bytes")
            .map(|bytes| bytes.max(0) as u64)
            .unwrap_or(0),
        Err(_) => 0,
    }
}
