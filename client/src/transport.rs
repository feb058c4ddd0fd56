//! Remote submission transport.
//!
//! Owns the fixed partition-to-endpoint dispatch table and the HTTP client
//! used to submit buffered records. Submission timeouts are the transport's
//! own deadline; a timed-out request is an ordinary retryable failure.

use std::time::Duration;

use outbox_engine::{Partition, Record};
use reqwest::multipart::{Form, Part};
use serde::Serialize;

use crate::error::{Result, SyncError};

/// Per-request deadline for remote submissions.
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// How a partition's records travel on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// JSON body
    Json,
    /// Multipart form, for binary-bearing payloads
    Multipart,
}

/// One entry in the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Path appended to the remote base URL
    pub path: &'static str,
    /// Transport shape
    pub encoding: Encoding,
}

/// The dispatch table. Fixed; not configurable per call.
pub fn route(partition: Partition) -> Route {
    match partition {
        Partition::Form => Route {
            path: "/api/forms/submit",
            encoding: Encoding::Json,
        },
        Partition::PatientData => Route {
            path: "/api/patients/data",
            encoding: Encoding::Json,
        },
        Partition::Recording => Route {
            path: "/api/recordings/upload",
            encoding: Encoding::Multipart,
        },
        Partition::Upload => Route {
            path: "/api/uploads",
            encoding: Encoding::Multipart,
        },
    }
}

/// JSON body for a record submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody<'a> {
    id: &'a str,
    partition: Partition,
    created_at: i64,
    payload: &'a serde_json::Value,
}

/// HTTP client for the remote submission endpoints.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteClient {
    /// Create a client for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(SUBMIT_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Submit one record to its partition's endpoint.
    ///
    /// Any failure here is a transport failure and feeds the retry policy;
    /// non-2xx responses become [`SyncError::RemoteRejected`].
    pub async fn submit(&self, record: &Record) -> Result<()> {
        let route = route(record.partition);
        let url = format!("{}{}", self.base_url, route.path);

        let response = match route.encoding {
            Encoding::Json => {
                let body = SubmitBody {
                    id: &record.id,
                    partition: record.partition,
                    created_at: record.created_at,
                    payload: &record.payload,
                };
                self.http.post(&url).json(&body).send().await?
            }
            Encoding::Multipart => {
                self.http
                    .post(&url)
                    .multipart(multipart_form(record)?)
                    .send()
                    .await?
            }
        };

        if response.status().is_success() {
            tracing::debug!(record_id = %record.id, url = %url, "record submitted");
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(SyncError::RemoteRejected { status, message })
        }
    }
}

/// Build the multipart form for a binary-bearing record.
///
/// The payload stays opaque: it travels whole in the `metadata` part. When it
/// carries a string `data` field (the caller's serialized bytes, typically
/// base64), that field is additionally attached as the `file` part, named from
/// the payload's `fileName` when present.
fn multipart_form(record: &Record) -> Result<Form> {
    let mut form = Form::new()
        .text("recordId", record.id.clone())
        .text("partition", record.partition.to_string())
        .text("createdAt", record.created_at.to_string())
        .text("metadata", record.payload.to_string());

    if let Some(data) = record.payload.get("data").and_then(|v| v.as_str()) {
        let file_name = record
            .payload
            .get("fileName")
            .and_then(|v| v.as_str())
            .unwrap_or("upload.bin")
            .to_string();
        form = form.part(
            "file",
            Part::bytes(data.as_bytes().to_vec()).file_name(file_name),
        );
    }

    Ok(form)
}
