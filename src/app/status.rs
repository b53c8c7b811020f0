// SPDX-License-Identifier: GPL-3.0-only

//! Transient status line

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

/// One-line status text that clears itself
///
/// Each message is shown for the configured duration. A newer message
/// replaces the current one and restarts the timer.
#[derive(Debug, Clone)]
pub struct StatusLine {
    tx: Arc<watch::Sender<Option<String>>>,
    generation: Arc<AtomicU64>,
    display: Duration,
}

impl StatusLine {
    pub fn new(display: Duration) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            generation: Arc::new(AtomicU64::new(0)),
            display,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }

    /// Message currently on screen
    pub fn current(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    /// Show `message` and schedule it to clear
    pub fn show(&self, message: impl Into<String>) {
        let message = message.into();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(%message, "Status message");
        self.tx.send_replace(Some(message));

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No runtime available, status message will not clear on its own");
            return;
        };

        let tx = Arc::clone(&self.tx);
        let current = Arc::clone(&self.generation);
        let display = self.display;
        handle.spawn(async move {
            tokio::time::sleep(display).await;
            if current.load(Ordering::Acquire) == generation {
                tx.send_replace(None);
            }
        });
    }

    /// Clear immediately
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.tx.send_replace(None);
    }
}
