//! Integration tests for the offline write buffer and sync engine.
//!
//! Each test runs against an in-memory store and an in-process mock remote
//! whose failure behavior the test controls.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use outbox_client::{
    ConnectivityMonitor, OfflineStore, Partition, RemoteClient, SyncCallbacks, SyncConfig,
    SyncEngine, SyncReport,
};
use serde_json::json;

// ============================================================================
// Mock remote
// ============================================================================

#[derive(Default)]
struct MockRemote {
    /// Submission attempts that reached the server
    requests: AtomicUsize,
    /// Fail every submission
    fail_all: AtomicBool,
    /// Fail only the forms endpoint
    fail_forms: AtomicBool,
    /// Per-request artificial latency
    delay_ms: AtomicU64,
}

impl MockRemote {
    async fn respond(&self, is_form: bool) -> StatusCode {
        let delay = self.delay_ms.load(Ordering::Relaxed);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.requests.fetch_add(1, Ordering::Relaxed);
        if self.fail_all.load(Ordering::Relaxed)
            || (is_form && self.fail_forms.load(Ordering::Relaxed))
        {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::OK
        }
    }

    fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}

async fn handle_form(State(remote): State<Arc<MockRemote>>) -> StatusCode {
    remote.respond(true).await
}

async fn handle_other(State(remote): State<Arc<MockRemote>>) -> StatusCode {
    remote.respond(false).await
}

async fn spawn_mock_remote() -> (SocketAddr, Arc<MockRemote>) {
    let remote = Arc::new(MockRemote::default());
    let app = Router::new()
        .route("/api/forms/submit", post(handle_form))
        .route("/api/patients/data", post(handle_other))
        .route("/api/recordings/upload", post(handle_other))
        .route("/api/uploads", post(handle_other))
        .with_state(remote.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, remote)
}

// ============================================================================
// Test rig
// ============================================================================

struct TestRig {
    engine: SyncEngine,
    store: OfflineStore,
    monitor: ConnectivityMonitor,
    remote: Arc<MockRemote>,
    errors: Arc<Mutex<Vec<String>>>,
    reports: Arc<Mutex<Vec<SyncReport>>>,
}

async fn rig(online: bool) -> TestRig {
    rig_with(online, |config| config).await
}

async fn rig_with(online: bool, tweak: impl FnOnce(SyncConfig) -> SyncConfig) -> TestRig {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let (addr, remote) = spawn_mock_remote().await;
    let store = OfflineStore::open("sqlite::memory:").await.unwrap();
    let monitor = ConnectivityMonitor::new(online);
    let base_url = format!("http://{}", addr);
    let client = RemoteClient::new(base_url.clone()).unwrap();

    let mut config = SyncConfig::new(base_url, "sqlite::memory:");
    // Keep the timer out of the way unless a test opts in.
    config.sync_interval = Duration::from_secs(3600);
    let config = tweak(config);

    let errors = Arc::new(Mutex::new(Vec::new()));
    let reports = Arc::new(Mutex::new(Vec::new()));
    let error_sink = errors.clone();
    let report_sink = reports.clone();
    let callbacks = SyncCallbacks::new()
        .on_sync_error(move |message| error_sink.lock().unwrap().push(message.to_string()))
        .on_sync_complete(move |report| report_sink.lock().unwrap().push(report.clone()));

    let engine = SyncEngine::new(store.clone(), client, monitor.clone(), config, callbacks);

    TestRig {
        engine,
        store,
        monitor,
        remote,
        errors,
        reports,
    }
}

/// Poll until the store's pending count reaches `expected`.
async fn wait_for_pending(store: &OfflineStore, expected: u64) {
    for _ in 0..200 {
        if store.pending_count().await.unwrap() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("pending count never reached {}", expected);
}

// ============================================================================
// Scenarios
// ============================================================================

/// Scenario A: a record written offline syncs automatically on reconnect.
#[tokio::test]
async fn reconnect_drains_offline_writes() {
    let mut rig = rig(false).await;
    rig.engine.start();

    rig.store
        .put(Partition::Form, json!({"x": 1}), None)
        .await
        .unwrap();
    assert_eq!(rig.store.pending_count().await.unwrap(), 1);

    // Offline triggers are dropped: zero submission attempts (P4).
    assert!(rig.engine.sync_now().await.unwrap().is_none());
    assert_eq!(rig.remote.request_count(), 0);

    rig.monitor.set_online(true);
    wait_for_pending(&rig.store, 0).await;

    assert_eq!(rig.remote.request_count(), 1);
    let records = rig.store.list_all(Partition::Form).await.unwrap();
    assert!(records[0].state.synced);
}

/// Scenario B: three consecutive failures evict the record and surface a
/// terminal failure (P2).
#[tokio::test]
async fn retry_ceiling_drops_record() {
    let rig = rig(true).await;
    rig.remote.fail_all.store(true, Ordering::Relaxed);

    rig.store
        .put(Partition::Upload, json!({"data": "aGVsbG8="}), Some("u1".into()))
        .await
        .unwrap();

    let first = rig.engine.sync_now().await.unwrap().unwrap();
    assert_eq!(first.retried_count(), 1);
    let records = rig.store.list_unsynced(Partition::Upload).await.unwrap();
    assert_eq!(records[0].state.retry_count, 1);
    assert!(records[0].state.last_error.is_some());

    let second = rig.engine.sync_now().await.unwrap().unwrap();
    assert_eq!(second.retried_count(), 1);
    let records = rig.store.list_unsynced(Partition::Upload).await.unwrap();
    assert_eq!(records[0].state.retry_count, 2);

    let third = rig.engine.sync_now().await.unwrap().unwrap();
    assert_eq!(third.dropped_count(), 1);

    // The record is gone, not parked.
    assert!(rig.store.list_all(Partition::Upload).await.unwrap().is_empty());
    assert_eq!(rig.remote.request_count(), 3);

    let errors = rig.errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("u1"));
    assert!(errors[0].contains("dropped after 3 failed attempts"));
}

/// Scenario C: one failure and one success coexist in the same cycle.
#[tokio::test]
async fn mixed_outcomes_in_one_cycle() {
    let rig = rig(true).await;
    rig.remote.fail_forms.store(true, Ordering::Relaxed);

    rig.store
        .put(Partition::Form, json!({"f": 1}), Some("f1".into()))
        .await
        .unwrap();
    rig.store
        .put(Partition::PatientData, json!({"p": 1}), Some("p1".into()))
        .await
        .unwrap();

    let report = rig.engine.sync_now().await.unwrap().unwrap();
    assert_eq!(report.len(), 2);
    assert_eq!(report.synced_count(), 1);
    assert_eq!(report.retried_count(), 1);

    let forms = rig.store.list_unsynced(Partition::Form).await.unwrap();
    assert_eq!(forms[0].state.retry_count, 1);

    let patients = rig.store.list_all(Partition::PatientData).await.unwrap();
    assert!(patients[0].state.synced);
}

/// Scenario D: a bridge signal while offline is ignored without breaking the
/// bridge path for later.
#[tokio::test]
async fn bridge_trigger_respects_offline() {
    let mut rig = rig_with(false, |mut config| {
        // Only the bridge path; no reconnect or timer triggers.
        config.auto_sync = false;
        config
    })
    .await;
    let bridge = rig.engine.register_bridge().unwrap();
    rig.engine.start();

    rig.store
        .put(Partition::Form, json!({"x": 1}), None)
        .await
        .unwrap();

    assert!(bridge.request_sync());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(rig.remote.request_count(), 0);
    assert_eq!(rig.store.pending_count().await.unwrap(), 1);

    // Back online (auto_sync is off, so only the bridge can trigger).
    rig.monitor.set_online(true);
    assert!(bridge.request_sync());
    wait_for_pending(&rig.store, 0).await;
    assert_eq!(rig.remote.request_count(), 1);
}

// ============================================================================
// Properties
// ============================================================================

/// P1: a synced record is never submitted again.
#[tokio::test]
async fn synced_records_are_never_resubmitted() {
    let rig = rig(true).await;

    rig.store
        .put(Partition::Form, json!({"x": 1}), None)
        .await
        .unwrap();

    let first = rig.engine.sync_now().await.unwrap().unwrap();
    assert_eq!(first.synced_count(), 1);

    let second = rig.engine.sync_now().await.unwrap().unwrap();
    assert!(second.is_empty());
    assert_eq!(rig.remote.request_count(), 1);
}

/// P3: overlapping triggers run exactly one drain.
#[tokio::test]
async fn concurrent_triggers_run_one_drain() {
    let rig = rig(true).await;
    rig.remote.delay_ms.store(150, Ordering::Relaxed);

    rig.store
        .put(Partition::Form, json!({"a": 1}), Some("a".into()))
        .await
        .unwrap();
    rig.store
        .put(Partition::Form, json!({"b": 2}), Some("b".into()))
        .await
        .unwrap();

    let first = rig.engine.handle();
    let second = rig.engine.handle();
    let (one, two) = tokio::join!(first.sync_now(), second.sync_now());
    let reports = [one.unwrap(), two.unwrap()];

    // Exactly one trigger won the guard and drained both records once each.
    let completed: Vec<_> = reports.iter().flatten().collect();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].synced_count(), 2);
    assert_eq!(rig.remote.request_count(), 2);
}

/// P5: clearing one partition leaves the others untouched, and the next
/// drain only sees the survivors.
#[tokio::test]
async fn partition_isolation() {
    let rig = rig(true).await;

    rig.store
        .put(Partition::Form, json!({"f": 1}), Some("f1".into()))
        .await
        .unwrap();
    rig.store
        .put(Partition::Upload, json!({"u": 1}), Some("u1".into()))
        .await
        .unwrap();

    rig.store.clear(Partition::Upload).await.unwrap();
    assert_eq!(rig.store.list_all(Partition::Form).await.unwrap().len(), 1);

    let report = rig.engine.sync_now().await.unwrap().unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report.results[0].id, "f1");
}

// ============================================================================
// Triggers and recovery
// ============================================================================

#[tokio::test]
async fn timer_drives_auto_sync() {
    let mut rig = rig_with(true, |mut config| {
        config.sync_interval = Duration::from_millis(100);
        config
    })
    .await;
    rig.engine.start();

    rig.store
        .put(Partition::PatientData, json!({"mrn": "1"}), None)
        .await
        .unwrap();

    // No manual trigger: the interval task picks it up.
    wait_for_pending(&rig.store, 0).await;
    assert!(rig.remote.request_count() >= 1);
}

#[tokio::test]
async fn recovery_resets_retry_bookkeeping() {
    let rig = rig(true).await;
    rig.remote.fail_all.store(true, Ordering::Relaxed);

    rig.store
        .put(Partition::Form, json!({"x": 1}), Some("f1".into()))
        .await
        .unwrap();
    rig.engine.sync_now().await.unwrap();

    let records = rig.store.list_unsynced(Partition::Form).await.unwrap();
    assert_eq!(records[0].state.retry_count, 1);

    // The remote comes back before the ceiling is reached.
    rig.remote.fail_all.store(false, Ordering::Relaxed);
    let report = rig.engine.sync_now().await.unwrap().unwrap();
    assert_eq!(report.synced_count(), 1);

    let records = rig.store.list_all(Partition::Form).await.unwrap();
    assert!(records[0].state.synced);
    assert_eq!(records[0].state.retry_count, 0);
    assert!(records[0].state.last_error.is_none());
}

#[tokio::test]
async fn completion_callback_sees_every_cycle() {
    let rig = rig(true).await;

    rig.store
        .put(Partition::Form, json!({"x": 1}), None)
        .await
        .unwrap();
    rig.engine.sync_now().await.unwrap();
    rig.engine.sync_now().await.unwrap();

    let reports = rig.reports.lock().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].synced_count(), 1);
    assert!(reports[1].is_empty());
}

#[tokio::test]
async fn multipart_partitions_reach_their_endpoints() {
    let rig = rig(true).await;

    rig.store
        .put(
            Partition::Recording,
            json!({"fileName": "visit.ogg", "data": "b2dn"}),
            None,
        )
        .await
        .unwrap();
    rig.store
        .put(
            Partition::Upload,
            json!({"fileName": "scan.pdf", "data": "cGRm"}),
            None,
        )
        .await
        .unwrap();

    let report = rig.engine.sync_now().await.unwrap().unwrap();
    assert_eq!(report.synced_count(), 2);
    assert_eq!(rig.remote.request_count(), 2);
}
