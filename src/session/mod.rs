// SPDX-License-Identifier: GPL-3.0-only

//! Camera session management
//!
//! [`SessionManager`] owns at most one camera session at a time. Opening a
//! session runs the capability check, the permission gate and size
//! selection synchronously, then hands the device work to a worker task:
//!
//! ```text
//!  UI thread                      worker task                camera service
//! ───────────                     ───────────                ──────────────
//! open() ── check/select ──spawn──▶ open_camera ───────────▶
//!                                  ◀──────────── Opened(device)
//!                                  create_capture_session ──▶
//!                                  ◀──────────── Configured(session)
//!                                  set_repeating_request ──▶  preview
//! capture() ── Capture ───────────▶ capture(still) ─────────▶
//!                                  ◀──────────── image sink
//!                                  ImageWriter::write
//! notices ◀─────────────────────── PhotoSaved / CaptureFailed
//! ```
//!
//! The UI observes the session through [`SessionSnapshot`]s published on a
//! watch channel and through [`Notice`]s.

mod notice;
mod state;
mod worker;

pub use notice::{Notice, NoticeSender, notice_channel};
pub use state::{PreviewConfiguration, SessionSnapshot, SessionState};

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backends::camera::capability;
use crate::backends::camera::types::{ImageFormat, PreviewSurface, SessionId};
use crate::backends::camera::{CameraService, event_channel, image_sink};
use crate::config::Config;
use crate::errors::{CaptureError, SessionError};
use crate::pipelines::photo::{CaptureController, CaptureTracker};
use crate::pipelines::preview::ResolutionSelector;
use crate::storage::ImageWriter;

use state::SnapshotPublisher;
use worker::{SessionWorker, WorkerParts};

/// Requests from the UI to a session worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionCommand {
    Capture,
    Dispose,
}

struct ActiveSession {
    id: SessionId,
    commands: mpsc::UnboundedSender<SessionCommand>,
    capture: CaptureController,
    task: JoinHandle<()>,
}

/// Owner of the camera session lifecycle
///
/// Must be used from within a tokio runtime: [`SessionManager::open`] spawns
/// the session worker.
pub struct SessionManager {
    service: Arc<dyn CameraService>,
    config: Config,
    writer: ImageWriter,
    notices: NoticeSender,
    snapshot: SnapshotPublisher,
    active: Option<ActiveSession>,
    next_session: u64,
}

impl SessionManager {
    pub fn new(
        service: Arc<dyn CameraService>,
        config: Config,
        writer: ImageWriter,
        notices: NoticeSender,
    ) -> Self {
        Self {
            service,
            config,
            writer,
            notices,
            snapshot: SnapshotPublisher::new(),
            active: None,
            next_session: 1,
        }
    }

    /// Receive every snapshot change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.current()
    }

    pub fn state(&self) -> SessionState {
        self.snapshot.current().state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open a session rendering into `surface`
    ///
    /// Any previous session is disposed first. Capability, permission and size
    /// selection failures put the new session into `Failed` and are also
    /// returned. On success the session is `Opening` and the chosen sizes are
    /// returned; the rest of the lifecycle is observed through snapshots.
    pub fn open(
        &mut self,
        surface: PreviewSurface,
        view_width: u32,
        view_height: u32,
        permission_granted: bool,
    ) -> Result<PreviewConfiguration, SessionError> {
        self.dispose();

        let id = SessionId(self.next_session);
        self.next_session += 1;

        let configuration = match self.prepare(view_width, view_height, permission_granted) {
            Ok(configuration) => configuration,
            Err(e) => {
                warn!(session = %id, error = %e, "Camera session cannot start");
                self.snapshot.replace(SessionSnapshot {
                    session: Some(id),
                    state: SessionState::Failed(e.clone()),
                    configuration: None,
                    capture_pending: false,
                });
                self.notices.send(Notice::from(e.clone()));
                return Err(e);
            }
        };

        info!(
            session = %id,
            camera_id = %configuration.camera_id,
            preview = %configuration.preview_size,
            still = %configuration.still_size,
            "Opening camera session"
        );

        self.snapshot.replace(SessionSnapshot {
            session: Some(id),
            state: SessionState::Opening,
            configuration: Some(configuration.clone()),
            capture_pending: false,
        });

        let (sink_writer, sink) = image_sink(configuration.still_size, ImageFormat::Jpeg);
        let (events_tx, events) = event_channel(id);
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let tracker = CaptureTracker::default();

        let worker = SessionWorker::new(WorkerParts {
            id,
            service: Arc::clone(&self.service),
            surface,
            configuration: configuration.clone(),
            events_tx,
            events,
            commands,
            sink_writer,
            sink,
            writer: self.writer.clone(),
            tracker: tracker.clone(),
            snapshot: self.snapshot.clone(),
            notices: self.notices.clone(),
        });
        let task = tokio::spawn(worker.run());

        self.active = Some(ActiveSession {
            id,
            capture: CaptureController::new(
                id,
                commands_tx.clone(),
                self.snapshot.subscribe(),
                tracker,
            ),
            commands: commands_tx,
            task,
        });

        Ok(configuration)
    }

    fn prepare(
        &self,
        view_width: u32,
        view_height: u32,
        permission_granted: bool,
    ) -> Result<PreviewConfiguration, SessionError> {
        let camera_id =
            capability::check_camera(self.service.as_ref(), self.config.camera_id.as_deref())?;

        if !permission_granted {
            return Err(SessionError::PermissionDenied);
        }

        let characteristics = self.service.characteristics(&camera_id)?;
        let selector = ResolutionSelector::new(self.config.preview);
        let preview_size =
            selector.preview(&characteristics.preview_sizes, view_width, view_height)?;
        let still_size = selector.still(&characteristics.still_sizes)?;

        Ok(PreviewConfiguration {
            camera_id,
            preview_size,
            still_size,
        })
    }

    /// Request a still from the current session
    pub fn capture(&self) -> Result<(), CaptureError> {
        match &self.active {
            Some(active) => active.capture.capture(),
            None => Err(CaptureError::CaptureNotReady),
        }
    }

    /// Close the current session
    ///
    /// The snapshot reads `Closed` when this returns. The worker releases the
    /// capture session, the device and the image sink, in that order, and
    /// drops every callback or delivery that arrives afterwards.
    pub fn dispose(&mut self) {
        self.stop_worker();
    }

    /// Like [`SessionManager::dispose`], but waits until the worker has
    /// released the device
    pub async fn close(&mut self) {
        if let Some(task) = self.stop_worker() {
            if let Err(e) = task.await {
                warn!(error = %e, "Session worker ended abnormally");
            }
        }
    }

    fn stop_worker(&mut self) -> Option<JoinHandle<()>> {
        let active = self.active.take();
        self.snapshot.replace(SessionSnapshot::default());

        let active = active?;
        info!(session = %active.id, "Closing camera session");
        if active.commands.send(SessionCommand::Dispose).is_err() {
            debug!(session = %active.id, "Session worker already stopped");
        }
        Some(active.task)
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.dispose();
    }
}
