//! # Fatal Signal
//!
//! One-shot broadcast of an unrecoverable condition. The runtime watches it
//! and exits the process; only the first reason is kept.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::error;

/// Shared handle to raise the fatal condition.
#[derive(Clone)]
pub struct FatalSignal {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl FatalSignal {
    /// New, un-raised signal.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Raise the signal. Later reasons are ignored.
    pub fn raise(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let first = self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason.clone());
                true
            } else {
                false
            }
        });
        if first {
            error!(reason = %reason, "Fatal condition raised");
        }
    }

    /// Current reason, if raised.
    pub fn reason(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    /// Watch for the signal.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}

impl Default for FatalSignal {
    fn default() -> Self {
        Self::new()
    }
}
