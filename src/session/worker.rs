// SPDX-License-Identifier: GPL-3.0-only

//! Per-session worker task
//!
//! Owns the device, the capture session and the image sink of one session
//! and serializes everything that touches them: UI commands, device
//! callbacks, delivered stills and save results.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backends::camera::types::{
    CaptureRequest, CapturedImage, OutputTarget, PreviewSurface, SessionId,
};
use crate::backends::camera::{
    CameraDevice, CameraService, CaptureSession, DeviceEvent, EventSink, ImageSinkReader,
    ImageSinkWriter,
};
use crate::errors::{CaptureError, SessionError, StorageError};
use crate::pipelines::photo::CaptureTracker;
use crate::storage::ImageWriter;

use super::SessionCommand;
use super::notice::{Notice, NoticeSender};
use super::state::{PreviewConfiguration, SessionState, SnapshotPublisher};

type SaveResult = Result<PathBuf, StorageError>;

/// Everything a worker needs, assembled by the session manager
pub(crate) struct WorkerParts {
    pub id: SessionId,
    pub service: Arc<dyn CameraService>,
    pub surface: PreviewSurface,
    pub configuration: PreviewConfiguration,
    pub events_tx: EventSink,
    pub events: mpsc::UnboundedReceiver<DeviceEvent>,
    pub commands: mpsc::UnboundedReceiver<SessionCommand>,
    pub sink_writer: ImageSinkWriter,
    pub sink: ImageSinkReader,
    pub writer: ImageWriter,
    pub tracker: CaptureTracker,
    pub snapshot: SnapshotPublisher,
    pub notices: NoticeSender,
}

pub(crate) struct SessionWorker {
    id: SessionId,
    service: Arc<dyn CameraService>,
    surface: PreviewSurface,
    configuration: PreviewConfiguration,
    state: SessionState,
    device: Option<Box<dyn CameraDevice>>,
    capture_session: Option<Box<dyn CaptureSession>>,
    events_tx: EventSink,
    events: mpsc::UnboundedReceiver<DeviceEvent>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    sink_writer: ImageSinkWriter,
    sink: ImageSinkReader,
    saves_tx: mpsc::UnboundedSender<SaveResult>,
    saves: mpsc::UnboundedReceiver<SaveResult>,
    save_task: Option<JoinHandle<()>>,
    writer: ImageWriter,
    tracker: CaptureTracker,
    snapshot: SnapshotPublisher,
    notices: NoticeSender,
    finished: bool,
}

impl SessionWorker {
    pub(crate) fn new(parts: WorkerParts) -> Self {
        let (saves_tx, saves) = mpsc::unbounded_channel();
        Self {
            id: parts.id,
            service: parts.service,
            surface: parts.surface,
            configuration: parts.configuration,
            state: SessionState::Opening,
            device: None,
            capture_session: None,
            events_tx: parts.events_tx,
            events: parts.events,
            commands: parts.commands,
            sink_writer: parts.sink_writer,
            sink: parts.sink,
            saves_tx,
            saves,
            save_task: None,
            writer: parts.writer,
            tracker: parts.tracker,
            snapshot: parts.snapshot,
            notices: parts.notices,
            finished: false,
        }
    }

    /// Open the device and process messages until the session ends
    pub(crate) async fn run(mut self) {
        info!(
            session = %self.id,
            camera_id = %self.configuration.camera_id,
            preview = %self.configuration.preview_size,
            still = %self.configuration.still_size,
            "Session worker started"
        );

        if let Err(e) = self
            .service
            .open_camera(&self.configuration.camera_id, self.events_tx.clone())
        {
            self.fail(SessionError::Backend(e));
        }

        while !self.finished {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(SessionCommand::Capture) => self.capture(),
                    Some(SessionCommand::Dispose) | None => self.dispose(),
                },
                Some(event) = self.events.recv() => self.handle_event(event),
                Some(image) = self.sink.recv() => self.handle_image(image),
                Some(result) = self.saves.recv() => self.finish_save(result),
            }
        }

        debug!(session = %self.id, "Session worker stopped");
    }

    fn handle_event(&mut self, event: DeviceEvent) {
        debug!(
            session = %self.id,
            state = self.state.name(),
            event = event.name(),
            "Device callback"
        );

        match event {
            DeviceEvent::Opened(device) => self.on_opened(device),
            DeviceEvent::Configured(session) => self.on_configured(session),
            DeviceEvent::ConfigureFailed => {
                if self.state == SessionState::Configuring {
                    self.fail(SessionError::SessionConfigurationFailed);
                }
            }
            DeviceEvent::Error(code) => self.fail(SessionError::DeviceOpenError(code)),
            DeviceEvent::Disconnected => self.fail(SessionError::DeviceDisconnected),
            DeviceEvent::CaptureCompleted => {
                debug!(session = %self.id, "Still capture completed by device");
            }
            DeviceEvent::CaptureFailed(reason) => {
                if self.tracker.is_pending() {
                    warn!(session = %self.id, %reason, "Device failed still capture");
                    self.reject_capture(CaptureError::CaptureFailed(String::new()));
                }
            }
        }
    }

    fn on_opened(&mut self, mut device: Box<dyn CameraDevice>) {
        if self.state != SessionState::Opening {
            warn!(
                session = %self.id,
                state = self.state.name(),
                "Unexpected device open, closing it"
            );
            device.close();
            return;
        }

        info!(session = %self.id, device = device.id(), "Camera device opened");
        let outputs = vec![
            OutputTarget::PreviewSurface {
                surface: self.surface,
                size: self.configuration.preview_size,
            },
            OutputTarget::StillImageSink(self.sink_writer.clone()),
        ];
        let result = device.create_capture_session(outputs, self.events_tx.clone());
        self.device = Some(device);
        self.transition(SessionState::Configuring);

        if let Err(e) = result {
            error!(session = %self.id, error = %e, "Failed to create capture session");
            self.fail(SessionError::SessionConfigurationFailed);
        }
    }

    fn on_configured(&mut self, mut session: Box<dyn CaptureSession>) {
        if self.state != SessionState::Configuring {
            warn!(
                session = %self.id,
                state = self.state.name(),
                "Unexpected capture session, closing it"
            );
            session.close();
            return;
        }

        if let Err(e) = session.set_repeating_request(CaptureRequest::preview()) {
            error!(session = %self.id, error = %e, "Failed to start preview");
            session.close();
            self.fail(SessionError::SessionConfigurationFailed);
            return;
        }

        info!(session = %self.id, "Preview running");
        self.capture_session = Some(session);
        self.transition(SessionState::Active);
    }

    fn capture(&mut self) {
        if !self.state.is_active() {
            self.reject_capture(CaptureError::CaptureNotReady);
            return;
        }
        let Some(session) = self.capture_session.as_mut() else {
            self.reject_capture(CaptureError::CaptureNotReady);
            return;
        };

        match session.capture(CaptureRequest::still_capture()) {
            Ok(()) => {
                debug!(session = %self.id, "Still request submitted");
                self.snapshot
                    .update_for(self.id, |snapshot| snapshot.capture_pending = true);
            }
            Err(e) => {
                warn!(session = %self.id, error = %e, "Still request rejected");
                self.reject_capture(CaptureError::CaptureFailed(e.to_string()));
            }
        }
    }

    fn reject_capture(&mut self, err: CaptureError) {
        self.resolve_capture(Notice::CaptureFailed(err.to_string()));
    }

    fn handle_image(&mut self, image: CapturedImage) {
        if !self.tracker.is_pending() {
            debug!(session = %self.id, ?image, "Discarding unrequested image");
            return;
        }

        debug!(session = %self.id, ?image, "Still delivered, saving");
        let writer = self.writer.clone();
        let results = self.saves_tx.clone();
        let bytes = image.into_bytes();
        self.save_task = Some(tokio::spawn(async move {
            let result = writer.write(bytes).await;
            // Nobody to tell once the session is gone
            let _ = results.send(result);
        }));
    }

    fn finish_save(&mut self, result: SaveResult) {
        self.save_task = None;
        let notice = match result {
            Ok(path) => Notice::PhotoSaved(path),
            Err(e) => Notice::CaptureFailed(e.to_string()),
        };
        self.resolve_capture(notice);
    }

    fn resolve_capture(&mut self, notice: Notice) {
        self.tracker.finish();
        self.snapshot
            .update_for(self.id, |snapshot| snapshot.capture_pending = false);
        self.notices.send(notice);
    }

    fn transition(&mut self, next: SessionState) -> bool {
        if !self.state.can_transition_to(&next) {
            warn!(
                session = %self.id,
                from = %self.state,
                to = %next,
                "Ignoring invalid state transition"
            );
            return false;
        }

        debug!(session = %self.id, from = %self.state, to = %next, "Session state change");
        self.state = next.clone();
        self.snapshot.update_for(self.id, |snapshot| {
            snapshot.state = next;
            if !snapshot.state.is_active() {
                snapshot.capture_pending = false;
            }
        });
        true
    }

    fn fail(&mut self, err: SessionError) {
        if self.finished {
            return;
        }
        error!(session = %self.id, error = %err, "Camera session failed");
        self.release();
        if self.transition(SessionState::Failed(err.clone())) {
            self.notices.send(Notice::from(err));
        }
        self.finished = true;
    }

    fn dispose(&mut self) {
        info!(session = %self.id, "Disposing camera session");
        self.release();
        self.transition(SessionState::Closed);
        self.finished = true;
    }

    /// Close the capture session, then the device, then the sink
    ///
    /// Callbacks still queued are released and later ones are refused. A save
    /// not yet handed to the blocking pool is cancelled; one already writing
    /// runs to completion but is never reported.
    fn release(&mut self) {
        if let Some(mut session) = self.capture_session.take() {
            session.close();
        }
        if let Some(mut device) = self.device.take() {
            device.close();
        }
        self.sink.close();
        self.events.close();
        while let Ok(event) = self.events.try_recv() {
            event.release();
        }
        if let Some(task) = self.save_task.take() {
            task.abort();
        }
        self.tracker.finish();
    }
}
