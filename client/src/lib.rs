//! # Outbox Client
//!
//! Offline write buffer and background sync client.
//!
//! UI-facing code writes records into the [`OfflineStore`] immediately and
//! optimistically; the [`SyncEngine`] drains unsynced records to their remote
//! endpoints when connectivity allows — on reconnect, on a timer, on an
//! explicit trigger, or on a signal from the background [`bridge`]. Failed
//! submissions retry up to a configurable ceiling, after which the record is
//! dropped and the loss reported through the error callback.
//!
//! ```no_run
//! use outbox_client::{Partition, SyncCallbacks, SyncConfig, SyncEngine};
//! use serde_json::json;
//!
//! # async fn demo() -> Result<(), outbox_client::SyncError> {
//! let config = SyncConfig::new("https://api.example.com", "sqlite:outbox.db");
//! let callbacks = SyncCallbacks::new()
//!     .on_sync_complete(|report| println!("synced {}", report.synced_count()))
//!     .on_sync_error(|message| eprintln!("{message}"));
//!
//! let mut engine = SyncEngine::connect(config, callbacks).await?;
//! let bridge = engine.register_bridge()?;
//! engine.start();
//!
//! // Buffered durably even while offline; synced later.
//! engine.store().put(Partition::Form, json!({"field": "value"}), None).await?;
//!
//! // Platform connectivity events feed the monitor.
//! engine.connectivity().set_online(false);
//!
//! // The background context only ever asks for a sync.
//! bridge.request_sync();
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod store;
pub mod sync;
pub mod transport;

// Re-export the main surface at crate root
pub use bridge::{BridgeHandle, BridgeMessage};
pub use config::{ConfigError, SyncConfig, DEFAULT_SYNC_INTERVAL};
pub use connectivity::ConnectivityMonitor;
pub use error::{Result, SyncError};
pub use store::OfflineStore;
pub use sync::{SyncCallbacks, SyncEngine, SyncHandle};
pub use transport::RemoteClient;

// Engine types callers interact with directly
pub use outbox_engine::{
    Partition, Record, RetryPolicy, SyncOutcome, SyncReport, SyncResult, SyncState,
};
