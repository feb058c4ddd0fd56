//! Connectivity monitor.
//!
//! Tracks the platform's online/offline signal as a watchable boolean. The
//! platform feed (browser events, OS reachability, a probe task) is an
//! external collaborator; it reports transitions through [`ConnectivityMonitor::set_online`].

use tokio::sync::watch;

/// Read-only view plus publisher for the current connectivity state.
///
/// Cheap to clone; clones share the same underlying channel.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Create a monitor initialized from the platform's current snapshot.
    pub fn new(initially_online: bool) -> Self {
        let (tx, _) = watch::channel(initially_online);
        Self { tx }
    }

    /// Current connectivity state.
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Feed a platform connectivity event. Repeated reports of the same
    /// state publish nothing.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });

        if changed {
            if online {
                tracing::info!("connectivity: online");
            } else {
                tracing::warn!("connectivity: offline");
            }
        }
    }

    /// Subscribe to connectivity transitions.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}
