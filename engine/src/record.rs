//! Record and partition types for the offline write buffer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, RecordId, Timestamp};

/// A named collection of offline records.
///
/// Operations addressed by partition only ever touch that partition;
/// the sync orchestrator drains them in [`Partition::ALL`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    /// Intake and verification forms
    Form,
    /// Patient demographic and insurance data
    PatientData,
    /// Audio recordings (binary payloads)
    Recording,
    /// File uploads (binary payloads)
    Upload,
}

impl Partition {
    /// All partitions, in drain order.
    pub const ALL: [Partition; 4] = [
        Partition::Form,
        Partition::PatientData,
        Partition::Recording,
        Partition::Upload,
    ];

    /// Stable string name used in storage and record IDs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Form => "form",
            Partition::PatientData => "patient_data",
            Partition::Recording => "recording",
            Partition::Upload => "upload",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Partition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "form" => Ok(Partition::Form),
            "patient_data" => Ok(Partition::PatientData),
            "recording" => Ok(Partition::Recording),
            "upload" => Ok(Partition::Upload),
            other => Err(Error::UnknownPartition(other.to_string())),
        }
    }
}

/// Sync bookkeeping carried by every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// True once the remote has confirmed a successful write
    pub synced: bool,
    /// Failed sync attempts so far; never decreases while the record exists
    pub retry_count: u32,
    /// Most recent failure reason, cleared on success
    pub last_error: Option<String>,
}

impl SyncState {
    /// State for a freshly written, never-attempted record.
    pub fn pending() -> Self {
        Self::default()
    }

    /// State after the remote confirmed the write.
    pub fn synced() -> Self {
        Self {
            synced: true,
            retry_count: 0,
            last_error: None,
        }
    }
}

/// One pending unit of offline-originated data awaiting remote persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique identifier within the partition
    pub id: RecordId,
    /// Partition this record belongs to
    pub partition: Partition,
    /// Opaque application data; the buffer never interprets it
    pub payload: serde_json::Value,
    /// When the record was first written locally (milliseconds since epoch);
    /// immutable for the record's lifetime
    pub created_at: Timestamp,
    /// Sync metadata
    pub state: SyncState,
}

impl Record {
    /// Create a new unsynced record.
    pub fn new(
        id: impl Into<RecordId>,
        partition: Partition,
        payload: serde_json::Value,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            partition,
            payload,
            created_at,
            state: SyncState::pending(),
        }
    }

    /// Build a record ID in the `{partition}_{timestamp}_{nonce}` form used
    /// when the caller does not supply one.
    pub fn generate_id(partition: Partition, timestamp: Timestamp, nonce: &str) -> RecordId {
        format!("{}_{}_{}", partition, timestamp, nonce)
    }

    /// Whether this record still needs a sync attempt.
    pub fn is_pending(&self) -> bool {
        !self.state.synced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_record() {
        let record = Record::new("form_1_abc", Partition::Form, json!({"x": 1}), 1000);

        assert_eq!(record.id, "form_1_abc");
        assert_eq!(record.partition, Partition::Form);
        assert_eq!(record.created_at, 1000);
        assert!(record.is_pending());
        assert_eq!(record.state.retry_count, 0);
        assert!(record.state.last_error.is_none());
    }

    #[test]
    fn generate_id_format() {
        let id = Record::generate_id(Partition::PatientData, 1706745600000, "a1b2c3d4");
        assert_eq!(id, "patient_data_1706745600000_a1b2c3d4");
    }

    #[test]
    fn partition_roundtrip() {
        for partition in Partition::ALL {
            let parsed: Partition = partition.as_str().parse().unwrap();
            assert_eq!(parsed, partition);
        }
    }

    #[test]
    fn partition_unknown() {
        let result: Result<Partition, _> = "invoices".parse();
        assert!(matches!(result, Err(Error::UnknownPartition(_))));
    }

    #[test]
    fn serialization_roundtrip() {
        let record = Record::new(
            "upload_1000_x",
            Partition::Upload,
            json!({"fileName": "scan.pdf", "data": "aGVsbG8="}),
            1000,
        );

        let json = serde_json::to_string(&record).unwrap();
        let parsed: Record = serde_json::from_str(&json).unwrap();

        assert_eq!(record, parsed);
    }

    #[test]
    fn partition_serializes_snake_case() {
        let json = serde_json::to_string(&Partition::PatientData).unwrap();
        assert_eq!(json, "\"patient_data\"");
    }
}
