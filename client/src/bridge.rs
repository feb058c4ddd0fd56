//! Background bridge.
//!
//! Lets an independent background context (a separate task, process shim, or
//! platform worker) request synchronization without calling into the engine
//! directly. The relationship is strictly one-directional: background sends,
//! the engine's listener triggers a sync.

use tokio::sync::mpsc;

/// Inbound signals from the background context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeMessage {
    /// "Please sync now"
    SyncNow,
}

/// Sender half, held by the background context.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    tx: mpsc::UnboundedSender<BridgeMessage>,
}

impl BridgeHandle {
    /// Request a sync. Returns false when the engine side is gone; the
    /// background context has nothing useful to do about that beyond logging.
    pub fn request_sync(&self) -> bool {
        self.tx.send(BridgeMessage::SyncNow).is_ok()
    }
}

/// Receiver half, registered on the engine before `start()`.
#[derive(Debug)]
pub struct SyncBridge {
    rx: mpsc::UnboundedReceiver<BridgeMessage>,
}

impl SyncBridge {
    /// Receive the next inbound signal; `None` once all handles are dropped.
    pub(crate) async fn recv(&mut self) -> Option<BridgeMessage> {
        self.rx.recv().await
    }
}

/// Create a connected handle/bridge pair.
pub fn channel() -> (BridgeHandle, SyncBridge) {
    let (tx, rx) = mpsc::unbounded_channel();
    (BridgeHandle { tx }, SyncBridge { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signal_crosses_the_bridge() {
        let (handle, mut bridge) = channel();

        assert!(handle.request_sync());
        assert_eq!(bridge.recv().await, Some(BridgeMessage::SyncNow));
    }

    #[tokio::test]
    async fn handle_survives_cloning() {
        let (handle, mut bridge) = channel();
        let clone = handle.clone();

        assert!(clone.request_sync());
        assert_eq!(bridge.recv().await, Some(BridgeMessage::SyncNow));
    }

    #[tokio::test]
    async fn send_fails_once_engine_side_dropped() {
        let (handle, bridge) = channel();
        drop(bridge);

        assert!(!handle.request_sync());
    }
}
