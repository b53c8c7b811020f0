// SPDX-License-Identifier: GPL-3.0-only

//! UI-facing preview controller
//!
//! Glue between a preview view and the session manager. It reacts to the
//! view's surface lifecycle, keeps the display transform current, routes the
//! capture button and turns session notices into something the user sees.

mod status;

pub use status::StatusLine;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::backends::camera::CameraService;
use crate::backends::camera::types::{PreviewSurface, Resolution};
use crate::config::Config;
use crate::errors::{CaptureError, SessionError};
use crate::pipelines::preview::{DisplayRotation, TransformMatrix, compute_transform};
use crate::session::{Notice, SessionManager, SessionSnapshot, SessionState, notice_channel};
use crate::storage::ImageWriter;

/// Lifecycle of the view's drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The surface can be rendered into
    Available {
        surface: PreviewSurface,
        width: u32,
        height: u32,
    },
    SizeChanged {
        width: u32,
        height: u32,
    },
    Destroyed,
}

/// Controller for one preview screen
pub struct PreviewController {
    session: SessionManager,
    notices: mpsc::UnboundedReceiver<Notice>,
    status: StatusLine,
    persistent_notice: Option<String>,
    permission_granted: bool,
    surface: Option<PreviewSurface>,
    view_size: Option<(u32, u32)>,
    rotation: DisplayRotation,
    transform: TransformMatrix,
}

impl PreviewController {
    pub fn new(service: Arc<dyn CameraService>, config: Config, writer: ImageWriter) -> Self {
        let (notice_tx, notices) = notice_channel();
        let status = StatusLine::new(config.message_display());
        Self {
            session: SessionManager::new(service, config, writer, notice_tx),
            notices,
            status,
            persistent_notice: None,
            permission_granted: false,
            surface: None,
            view_size: None,
            rotation: DisplayRotation::default(),
            transform: TransformMatrix::identity(),
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.session.subscribe()
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    /// Notice that stays up until replaced, such as the unsupported device
    /// message
    pub fn persistent_notice(&self) -> Option<&str> {
        self.persistent_notice.as_deref()
    }

    /// Transform to apply to the preview view
    pub fn transform(&self) -> TransformMatrix {
        self.transform
    }

    pub fn rotation(&self) -> DisplayRotation {
        self.rotation
    }

    /// Whether the capture button should be enabled
    pub fn capture_enabled(&self) -> bool {
        self.session.snapshot().capture_ready()
    }

    /// Record the camera permission result
    ///
    /// A grant while the surface is up and no session is running starts the
    /// preview.
    pub fn set_permission(&mut self, granted: bool) {
        let changed = self.permission_granted != granted;
        self.permission_granted = granted;
        if !changed || !granted {
            return;
        }

        let restart = matches!(
            self.session.state(),
            SessionState::Closed | SessionState::Failed(SessionError::PermissionDenied)
        );
        if restart {
            self.open_session();
        }
    }

    pub fn handle_surface_event(&mut self, event: SurfaceEvent) {
        debug!(?event, "Surface event");
        match event {
            SurfaceEvent::Available {
                surface,
                width,
                height,
            } => {
                self.surface = Some(surface);
                self.view_size = Some((width, height));
                self.open_session();
            }
            SurfaceEvent::SizeChanged { width, height } => {
                self.view_size = Some((width, height));
                self.update_transform();
            }
            SurfaceEvent::Destroyed => {
                self.surface = None;
                self.view_size = None;
                self.session.dispose();
            }
        }
    }

    /// Change the display rotation and return the new transform
    pub fn set_rotation(&mut self, rotation: DisplayRotation) -> TransformMatrix {
        if self.rotation != rotation {
            info!(%rotation, "Display rotation changed");
            self.rotation = rotation;
        }
        self.update_transform();
        self.transform
    }

    /// Capture button handler
    ///
    /// Rejections are shown on the status line and returned.
    pub fn on_capture_pressed(&self) -> Result<(), CaptureError> {
        self.session.capture().inspect_err(|e| {
            debug!(error = %e, "Capture request rejected");
            self.status.show(e.to_string());
        })
    }

    /// Handle every notice already queued; returns how many were handled
    pub fn drain_notices(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(notice) = self.notices.try_recv() {
            self.apply_notice(&notice);
            handled += 1;
        }
        handled
    }

    /// Wait for the next notice, handle it and return it
    pub async fn next_notice(&mut self) -> Option<Notice> {
        let notice = self.notices.recv().await?;
        self.apply_notice(&notice);
        Some(notice)
    }

    /// Dispose the session and wait for the device to be released
    pub async fn shutdown(&mut self) {
        self.session.close().await;
    }

    fn apply_notice(&mut self, notice: &Notice) {
        let message = notice.message();
        if notice.is_transient() {
            self.status.show(message);
        } else {
            warn!(%message, "Session notice");
            self.persistent_notice = Some(message);
        }
    }

    fn open_session(&mut self) {
        let (Some(surface), Some((width, height))) = (self.surface, self.view_size) else {
            return;
        };

        self.persistent_notice = None;
        match self
            .session
            .open(surface, width, height, self.permission_granted)
        {
            Ok(configuration) => {
                debug!(preview = %configuration.preview_size, "Session opening");
            }
            // Reported through the notice channel
            Err(e) => debug!(error = %e, "Session did not start"),
        }
        self.update_transform();
    }

    fn update_transform(&mut self) {
        let Some((view_width, view_height)) = self.view_size else {
            return;
        };
        let stream = self
            .session
            .snapshot()
            .preview_size()
            .unwrap_or(Resolution::new(view_width, view_height));

        self.transform = compute_transform(
            self.rotation,
            view_width,
            view_height,
            stream.width,
            stream.height,
        );
    }
}
