// SPDX-License-Identifier: GPL-3.0-only

//! Messages from the session to the UI

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::SessionError;

/// Something the user should be told about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Camera hardware cannot run the preview; shown once per attempt
    DeviceUnsupported,
    /// The session failed
    SessionFailed(SessionError),
    /// A still was written to disk
    PhotoSaved(PathBuf),
    /// A still capture or save failed, with the user-facing reason
    CaptureFailed(String),
}

impl Notice {
    /// Text shown to the user
    pub fn message(&self) -> String {
        match self {
            Notice::DeviceUnsupported => SessionError::UnsupportedDevice.to_string(),
            Notice::SessionFailed(e) => e.to_string(),
            Notice::PhotoSaved(path) => format!("Photo saved: {}", path.display()),
            Notice::CaptureFailed(reason) => reason.clone(),
        }
    }

    /// Capture results disappear on their own; everything else stays
    pub fn is_transient(&self) -> bool {
        matches!(self, Notice::PhotoSaved(_) | Notice::CaptureFailed(_))
    }
}

impl From<SessionError> for Notice {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::UnsupportedDevice => Notice::DeviceUnsupported,
            other => Notice::SessionFailed(other),
        }
    }
}

/// Sending half of the notice channel
#[derive(Debug, Clone)]
pub struct NoticeSender {
    tx: mpsc::UnboundedSender<Notice>,
}

impl NoticeSender {
    pub fn send(&self, notice: Notice) {
        if self.tx.send(notice).is_err() {
            debug!("Notice receiver gone, dropping notice");
        }
    }
}

/// Create the notice channel
pub fn notice_channel() -> (NoticeSender, mpsc::UnboundedReceiver<Notice>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (NoticeSender { tx }, rx)
}
