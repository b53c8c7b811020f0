// SPDX-License-Identifier: GPL-3.0-only

//! Session lifecycle state and the snapshots published to the UI

use std::sync::Arc;

use tokio::sync::watch;

use crate::backends::camera::types::{Resolution, SessionId};
use crate::errors::SessionError;

/// Camera session lifecycle
///
/// ```text
/// Closed ──▶ Opening ──▶ Configuring ──▶ Active
///   │           │             │            │
///   └───────────┴──── Failed ◀┴────────────┘
/// ```
///
/// Every state can be disposed back to `Closed`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Closed,
    /// Waiting for the device to open
    Opening,
    /// Device open, waiting for the capture session
    Configuring,
    /// Preview running, stills accepted
    Active,
    /// Terminal failure of this session
    Failed(SessionError),
}

impl SessionState {
    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: &SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (_, Closed) => true,
            (Closed, Opening) | (Opening, Configuring) | (Configuring, Active) => true,
            (Closed | Opening | Configuring | Active, Failed(_)) => true,
            _ => false,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active)
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Closed => "closed",
            SessionState::Opening => "opening",
            SessionState::Configuring => "configuring",
            SessionState::Active => "active",
            SessionState::Failed(_) => "failed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Failed(e) => write!(f, "failed ({})", e),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Sizes chosen for a session before the device is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewConfiguration {
    pub camera_id: String,
    pub preview_size: Resolution,
    pub still_size: Resolution,
}

/// Immutable view of the session for the UI
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    /// Session the snapshot describes; `None` once disposed
    pub session: Option<SessionId>,
    pub state: SessionState,
    pub configuration: Option<PreviewConfiguration>,
    /// A still capture is outstanding
    pub capture_pending: bool,
}

impl SessionSnapshot {
    /// Whether the capture trigger should be enabled
    pub fn capture_ready(&self) -> bool {
        self.state.is_active() && !self.capture_pending
    }

    pub fn preview_size(&self) -> Option<Resolution> {
        self.configuration.as_ref().map(|c| c.preview_size)
    }
}

/// Write side of the snapshot channel
///
/// Workers may only update a snapshot that still names their session, so a
/// worker that is winding down after disposal cannot overwrite newer state.
#[derive(Clone, Debug)]
pub(crate) struct SnapshotPublisher {
    tx: Arc<watch::Sender<SessionSnapshot>>,
}

impl SnapshotPublisher {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    pub(crate) fn current(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    /// Unconditionally replace the snapshot
    pub(crate) fn replace(&self, snapshot: SessionSnapshot) {
        self.tx.send_replace(snapshot);
    }

    /// Update the snapshot if it still belongs to `session`
    ///
    /// Returns true if receivers were notified.
    pub(crate) fn update_for(
        &self,
        session: SessionId,
        update: impl FnOnce(&mut SessionSnapshot),
    ) -> bool {
        self.tx.send_if_modified(|snapshot| {
            if snapshot.session != Some(session) {
                return false;
            }
            let before = snapshot.clone();
            update(snapshot);
            *snapshot != before
        })
    }
}
