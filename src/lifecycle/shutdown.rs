//! Graceful shutdown signalling.

use tokio::sync::broadcast;

/// Shutdown signal shared by the server loop and its housekeeping tasks.
///
/// Triggering closes the listener via axum's graceful shutdown and stops
/// the prune task; spawned event reports are independent tasks and still
/// run to completion.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// A receiver for one task that must stop on shutdown.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every subscribed task to stop.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
