//! Batch-wide cancellation signal.

use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable one-way cancellation flag.
///
/// Once cancelled it stays cancelled. Workers poll [`is_cancelled`] before
/// picking up a job; the dispatcher awaits [`cancelled`] while blocked on a
/// full queue.
///
/// [`is_cancelled`]: CancelSignal::is_cancelled
/// [`cancelled`]: CancelSignal::cancelled
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation. Returns true for the call that flipped the flag.
    pub fn cancel(&self) -> bool {
        self.tx.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        })
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only ends on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}
