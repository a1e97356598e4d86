//! Cooperative cancellation for in-flight exports.

use std::sync::Arc;

use tokio::sync::watch;

/// Create a connected handle/signal pair.
pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelSignal { rx })
}

/// Triggers cancellation. Cloneable; cancelling twice is harmless.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observes cancellation.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Never resolves if every
    /// handle is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn signal_resolves_after_cancel() {
        let (handle, mut signal) = cancellation();
        assert!(!signal.is_cancelled());

        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), signal.cancelled())
            .await
            .expect("cancel observed");
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn dropped_handle_never_cancels() {
        let (handle, mut signal) = cancellation();
        drop(handle);

        let waited = tokio::time::timeout(Duration::from_millis(50), signal.cancelled()).await;
        assert!(waited.is_err());
    }
}
