//! Stop signal for the host.
//!
//! ```text
//! signal / test ── trigger() ──► HttpServer stops accepting
//!                                └─► aggregate lifespan exits (reverse order)
//! ```

use tokio::sync::broadcast;

/// Fan-out stop signal.
///
/// Each long-running task holds a receiver from [`Shutdown::subscribe`];
/// one `trigger` reaches all of them. Clones send on the same channel.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver to pass to [`HttpServer::run`](crate::HttpServer::run).
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Ask every subscriber to stop. A no-op when nobody is listening.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of subscribers that have not gone away yet.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
