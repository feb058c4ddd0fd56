//! Sync orchestrator.
//!
//! Owns the store handle, remote client, connectivity subscription, timer
//! tasks and callbacks, with an explicit `start()`/`stop()` lifecycle. One
//! drain runs at a time; triggers that arrive while offline or mid-drain are
//! dropped, not queued — the next natural tick catches anything missed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use outbox_engine::{Disposition, Partition, RetryPolicy, SyncOutcome, SyncReport, SyncResult};
use tokio::task::JoinHandle;

use crate::bridge::{self, BridgeHandle, BridgeMessage, SyncBridge};
use crate::config::SyncConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{Result, SyncError};
use crate::store::OfflineStore;
use crate::transport::RemoteClient;

/// Called with the aggregated report after every drain cycle.
pub type SyncCompleteCallback = Arc<dyn Fn(&SyncReport) + Send + Sync>;
/// Called with a human-readable message for terminal losses and cycle aborts.
pub type SyncErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// UI-facing notification hooks. The engine only invokes these; it renders
/// nothing itself.
#[derive(Clone, Default)]
pub struct SyncCallbacks {
    on_sync_complete: Option<SyncCompleteCallback>,
    on_sync_error: Option<SyncErrorCallback>,
}

impl SyncCallbacks {
    /// No notifications.
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive the aggregated report after each cycle.
    pub fn on_sync_complete(mut self, f: impl Fn(&SyncReport) + Send + Sync + 'static) -> Self {
        self.on_sync_complete = Some(Arc::new(f));
        self
    }

    /// Receive terminal failures and cycle aborts.
    pub fn on_sync_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_sync_error = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for SyncCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCallbacks")
            .field("on_sync_complete", &self.on_sync_complete.is_some())
            .field("on_sync_error", &self.on_sync_error.is_some())
            .finish()
    }
}

/// The offline write buffer's sync engine.
///
/// Construct once per process, register a bridge if one is wanted, then
/// `start()`. Dropping the engine stops its background tasks.
pub struct SyncEngine {
    inner: Arc<Inner>,
    bridge: Option<SyncBridge>,
    tasks: Vec<JoinHandle<()>>,
}

struct Inner {
    store: OfflineStore,
    remote: RemoteClient,
    connectivity: ConnectivityMonitor,
    policy: RetryPolicy,
    config: SyncConfig,
    callbacks: SyncCallbacks,
    draining: AtomicBool,
}

/// Cheap clonable handle for triggering syncs from other tasks.
#[derive(Clone)]
pub struct SyncHandle {
    inner: Arc<Inner>,
}

impl SyncHandle {
    /// Explicit manual sync trigger; see [`SyncEngine::sync_now`].
    pub async fn sync_now(&self) -> Result<Option<SyncReport>> {
        self.inner.run_cycle().await
    }
}

impl SyncEngine {
    /// Assemble an engine from its parts.
    pub fn new(
        store: OfflineStore,
        remote: RemoteClient,
        connectivity: ConnectivityMonitor,
        config: SyncConfig,
        callbacks: SyncCallbacks,
    ) -> Self {
        let policy = RetryPolicy::new(config.max_retries);
        Self {
            inner: Arc::new(Inner {
                store,
                remote,
                connectivity,
                policy,
                config,
                callbacks,
                draining: AtomicBool::new(false),
            }),
            bridge: None,
            tasks: Vec::new(),
        }
    }

    /// Open the store and remote described by `config` and assemble an
    /// engine around them. Connectivity starts online until the platform
    /// feed says otherwise.
    pub async fn connect(config: SyncConfig, callbacks: SyncCallbacks) -> Result<Self> {
        let store = OfflineStore::open(&config.database_url).await?;
        let remote = RemoteClient::new(config.remote_url.clone())?;
        let connectivity = ConnectivityMonitor::new(true);
        Ok(Self::new(store, remote, connectivity, config, callbacks))
    }

    /// The engine's store handle.
    pub fn store(&self) -> &OfflineStore {
        &self.inner.store
    }

    /// The engine's connectivity monitor, for feeding platform events.
    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.inner.connectivity
    }

    /// A clonable trigger handle.
    pub fn handle(&self) -> SyncHandle {
        SyncHandle {
            inner: self.inner.clone(),
        }
    }

    /// Register the background bridge and hand back the sender half.
    ///
    /// Fails once a bridge exists or after `start()`; callers log the error
    /// and carry on — timer and connectivity triggers work without a bridge.
    pub fn register_bridge(&mut self) -> Result<BridgeHandle> {
        if self.bridge.is_some() {
            return Err(SyncError::BridgeInit("bridge already registered".into()));
        }
        if !self.tasks.is_empty() {
            return Err(SyncError::BridgeInit("engine already started".into()));
        }

        let (handle, bridge) = bridge::channel();
        self.bridge = Some(bridge);
        Ok(handle)
    }

    /// Spawn the engine's background tasks. Idempotent.
    ///
    /// With `auto_sync` enabled this arms the interval timer and the
    /// reconnect trigger; the bridge listener runs regardless.
    pub fn start(&mut self) {
        if !self.tasks.is_empty() {
            return;
        }

        if self.inner.config.auto_sync {
            let inner = self.inner.clone();
            self.tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(inner.config.sync_interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                // The first tick completes immediately; consume it so cycles
                // begin one interval after start.
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    run_logged(&inner).await;
                }
            }));

            let mut online = self.inner.connectivity.watch();
            let inner = self.inner.clone();
            self.tasks.push(tokio::spawn(async move {
                while online.changed().await.is_ok() {
                    if *online.borrow_and_update() {
                        tracing::info!("connectivity restored, draining buffer");
                        run_logged(&inner).await;
                    }
                }
            }));
        }

        if let Some(mut bridge) = self.bridge.take() {
            let inner = self.inner.clone();
            self.tasks.push(tokio::spawn(async move {
                while let Some(message) = bridge.recv().await {
                    match message {
                        BridgeMessage::SyncNow => {
                            tracing::debug!("bridge requested sync");
                            run_logged(&inner).await;
                        }
                    }
                }
            }));
        }

        tracing::info!(
            auto_sync = self.inner.config.auto_sync,
            interval_ms = self.inner.config.sync_interval.as_millis() as u64,
            max_retries = self.inner.policy.max_retries(),
            "sync engine started"
        );
    }

    /// Stop all background tasks. A drain already in flight is not
    /// interrupted mid-record by the store; it simply stops being driven.
    pub fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    /// Explicit manual sync trigger.
    ///
    /// Returns `Ok(None)` when the trigger was dropped (offline, or a drain
    /// is already in progress), `Ok(Some(report))` after a completed cycle.
    pub async fn sync_now(&self) -> Result<Option<SyncReport>> {
        self.inner.run_cycle().await
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_logged(inner: &Arc<Inner>) {
    // run_cycle reports through the error callback; here we only log.
    if let Err(error) = inner.run_cycle().await {
        tracing::warn!(%error, "sync cycle failed");
    }
}

impl Inner {
    /// One sync cycle: Idle -> Draining -> Idle.
    async fn run_cycle(&self) -> Result<Option<SyncReport>> {
        if !self.connectivity.is_online() {
            tracing::debug!("sync trigger ignored: offline");
            return Ok(None);
        }

        // Only one drain at a time; concurrent triggers are no-ops.
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("sync trigger ignored: drain in progress");
            return Ok(None);
        }

        // Reset on every exit path, including a task aborted mid-drain.
        let _guard = DrainGuard(&self.draining);
        let outcome = self.drain_all().await;

        match outcome {
            Ok(report) => {
                for result in report.dropped() {
                    if let SyncOutcome::Dropped { error } = &result.outcome {
                        self.report_error(&format!(
                            "record {} dropped after {} failed attempts: {}",
                            result.id,
                            self.policy.max_retries(),
                            error
                        ));
                    }
                }
                if let Some(callback) = &self.callbacks.on_sync_complete {
                    callback(&report);
                }
                tracing::info!(
                    synced = report.synced_count(),
                    retried = report.retried_count(),
                    dropped = report.dropped_count(),
                    "sync cycle complete"
                );
                Ok(Some(report))
            }
            Err(error) => {
                self.report_error(&format!("sync cycle aborted: {}", error));
                Err(error)
            }
        }
    }

    /// Drain every partition, one record at a time.
    ///
    /// Submission failures are absorbed into the report; only storage
    /// failures abort the cycle.
    async fn drain_all(&self) -> Result<SyncReport> {
        let mut report = SyncReport::new();

        for partition in Partition::ALL {
            let pending = self.store.list_unsynced(partition).await?;
            if pending.is_empty() {
                continue;
            }
            tracing::debug!(partition = %partition, count = pending.len(), "draining partition");

            for record in pending {
                // The snapshot can be stale by the time we act on it.
                if record.state.synced {
                    continue;
                }

                let outcome = match self.remote.submit(&record).await {
                    Ok(()) => {
                        self.store.mark_synced(partition, &record.id).await?;
                        SyncOutcome::Synced
                    }
                    Err(error) => match self.policy.on_failure(&record.state, error.to_string()) {
                        Disposition::Retry { retry_count, error } => {
                            self.store
                                .record_failure(partition, &record.id, retry_count, &error)
                                .await?;
                            SyncOutcome::Retrying { retry_count, error }
                        }
                        Disposition::Evict { error } => {
                            self.store.delete(partition, &record.id).await?;
                            tracing::warn!(
                                partition = %partition,
                                record_id = %record.id,
                                "retry ceiling reached, dropping record"
                            );
                            SyncOutcome::Dropped { error }
                        }
                    },
                };

                report.push(SyncResult {
                    id: record.id,
                    partition,
                    outcome,
                });
            }
        }

        Ok(report)
    }

    fn report_error(&self, message: &str) {
        tracing::warn!("{}", message);
        if let Some(callback) = &self.callbacks.on_sync_error {
            callback(message);
        }
    }
}

/// Clears the draining flag when the cycle ends, however it ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
