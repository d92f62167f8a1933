//! Shutdown coordination for telemetry background tasks.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// The tracer shutdown task and the demo server both subscribe; a single
/// `trigger` wakes all of them.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    ///
    /// Subscribers created after `trigger` miss it.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Wake every current subscriber. Safe to call with none.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of subscribers still holding a receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
