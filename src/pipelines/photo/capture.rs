// SPDX-License-Identifier: MPL-2.0

//! Still capture requests
//!
//! Requests are accepted or rejected synchronously against the published
//! session snapshot. Accepted requests are handed to the session worker,
//! which talks to the device and saves the delivered image without pausing
//! the preview.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::backends::camera::types::SessionId;
use crate::errors::CaptureError;
use crate::session::{SessionCommand, SessionSnapshot};

/// Shared "a still is outstanding" flag
///
/// Set by the controller when a request is accepted and cleared by the worker
/// when the request resolves, either way.
#[derive(Debug, Clone, Default)]
pub(crate) struct CaptureTracker {
    in_flight: Arc<AtomicBool>,
}

impl CaptureTracker {
    /// Claim the slot; false if a capture is already outstanding
    pub(crate) fn begin(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub(crate) fn finish(&self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Handle used to request stills from one session
#[derive(Debug, Clone)]
pub struct CaptureController {
    session: SessionId,
    commands: mpsc::UnboundedSender<SessionCommand>,
    snapshot: watch::Receiver<SessionSnapshot>,
    tracker: CaptureTracker,
}

impl CaptureController {
    pub(crate) fn new(
        session: SessionId,
        commands: mpsc::UnboundedSender<SessionCommand>,
        snapshot: watch::Receiver<SessionSnapshot>,
        tracker: CaptureTracker,
    ) -> Self {
        Self {
            session,
            commands,
            snapshot,
            tracker,
        }
    }

    /// Request one still
    ///
    /// Fails with [`CaptureError::CaptureNotReady`] unless this session is
    /// active, and with [`CaptureError::CaptureInProgress`] while an earlier
    /// still is unresolved. The outcome of an accepted request arrives later
    /// as a notice.
    pub fn capture(&self) -> Result<(), CaptureError> {
        if !self.session_active() {
            debug!(session = %self.session, "Capture rejected: session not active");
            return Err(CaptureError::CaptureNotReady);
        }

        if !self.tracker.begin() {
            debug!(session = %self.session, "Capture rejected: still outstanding");
            return Err(CaptureError::CaptureInProgress);
        }

        if self.commands.send(SessionCommand::Capture).is_err() {
            self.tracker.finish();
            return Err(CaptureError::CaptureNotReady);
        }

        info!(session = %self.session, "Still capture requested");
        Ok(())
    }

    fn session_active(&self) -> bool {
        let snapshot = self.snapshot.borrow();
        snapshot.session == Some(self.session) && snapshot.state.is_active()
    }
}
