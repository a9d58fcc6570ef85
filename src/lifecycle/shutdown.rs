//! Server stop signal.

use std::future::Future;
use tokio::sync::broadcast;

/// Stop signal shared by a running server and its handle.
///
/// Dropping the coordinator releases every waiter, so a dropped
/// `ServerHandle` stops its server.
#[derive(Debug)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Future that resolves on [`trigger`](Self::trigger) or when this
    /// coordinator is dropped.
    pub fn signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            // Closed and Lagged both mean the wait is over.
            let _ = rx.recv().await;
        }
    }

    /// Release every pending signal. Later signals are not affected.
    pub fn trigger(&self) {
        if self.tx.send(()).is_err() {
            tracing::debug!("Shutdown triggered with nothing waiting");
        }
    }

    #[cfg(test)]
    pub(crate) fn waiters(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
