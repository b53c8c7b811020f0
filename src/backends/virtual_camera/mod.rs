// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera service
//!
//! A software [`CameraService`] that behaves like a phone camera stack:
//! asynchronous open and configure, a repeating preview request, and JPEG
//! stills delivered into the session's image sink. Failures can be scripted
//! and each step can be held back until released, which makes every session
//! state reachable without hardware.
//!
//! The service is cheaply cloneable; clones share state, so a caller can hand
//! one clone to the session manager and keep another to drive and inspect it.

mod pattern;

pub use pattern::{encode_jpeg, synthesize_still, test_pattern};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::backends::camera::types::{
    BackendError, BackendResult, CameraCharacteristics, CaptureRequest, HardwareLevel, ImageFormat,
    OutputTarget, Resolution, SessionId, TargetKind,
};
use crate::backends::camera::{
    CameraDevice, CameraService, CaptureSession, EventSink, ImageSinkWriter,
};

/// What happens when a camera is opened
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OpenBehavior {
    /// Post `Opened` right away
    #[default]
    Succeed,
    /// Post `Error(code)`
    Error(i32),
    /// Post `Disconnected`
    Disconnect,
    /// Wait for [`VirtualCameraService::release_open`]
    Hold,
}

/// What happens when a capture session is requested
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigureBehavior {
    #[default]
    Succeed,
    Fail,
    /// Wait for [`VirtualCameraService::release_configure`]
    Hold,
}

/// What happens when a still is requested
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CaptureBehavior {
    /// Deliver a JPEG into the sink immediately
    #[default]
    Deliver,
    /// Post `CaptureFailed` with this reason
    Fail(String),
    /// Wait for [`VirtualCameraService::deliver_held_captures`]
    Hold,
}

/// Virtual camera setup
#[derive(Debug, Clone)]
pub struct VirtualCameraConfig {
    pub camera_ids: Vec<String>,
    pub hardware_level: HardwareLevel,
    pub preview_sizes: Vec<Resolution>,
    pub still_sizes: Vec<Resolution>,
    pub open: OpenBehavior,
    pub configure: ConfigureBehavior,
    pub capture: CaptureBehavior,
}

impl Default for VirtualCameraConfig {
    fn default() -> Self {
        Self {
            camera_ids: vec!["0".to_string()],
            hardware_level: HardwareLevel::Full,
            preview_sizes: vec![
                Resolution::new(1920, 1080),
                Resolution::new(1280, 720),
                Resolution::new(640, 480),
            ],
            // Kept small so synthesized JPEGs are cheap
            still_sizes: vec![Resolution::new(320, 240), Resolution::new(640, 480)],
            open: OpenBehavior::default(),
            configure: ConfigureBehavior::default(),
            capture: CaptureBehavior::default(),
        }
    }
}

/// A request as seen by the virtual device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub session: SessionId,
    pub request: CaptureRequest,
    pub repeating: bool,
}

/// Resource release as seen by the virtual device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseEvent {
    Session(SessionId),
    Device(SessionId),
    /// The still sink's reader side went away
    Sink(SessionId),
}

struct HeldCapture {
    sink: ImageSinkWriter,
    events: EventSink,
}

#[derive(Default)]
struct VirtualState {
    open_attempts: usize,
    requests: Vec<RecordedRequest>,
    closes: Vec<CloseEvent>,
    configured_outputs: Vec<(TargetKind, Resolution)>,
    held_open: Option<(String, EventSink)>,
    held_configure: Option<(EventSink, Option<ImageSinkWriter>)>,
    held_captures: Vec<HeldCapture>,
    device_events: Option<EventSink>,
    stills_synthesized: u8,
}

struct Shared {
    config: VirtualCameraConfig,
    state: Mutex<VirtualState>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, VirtualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a release; a sink that is already closed is recorded first
    fn record_close(&self, event: CloseEvent, sink: Option<&ImageSinkWriter>, session: SessionId) {
        let mut state = self.state();
        if sink.is_some_and(ImageSinkWriter::is_closed) {
            note_sink_closed(&mut state, session);
        }
        state.closes.push(event);
    }

    fn next_seed(&self) -> u8 {
        let mut state = self.state();
        state.stills_synthesized = state.stills_synthesized.wrapping_add(1);
        state.stills_synthesized
    }

    /// Encode a still and push it into the sink; true if the sink accepted it
    fn deliver_still(&self, sink: &ImageSinkWriter, events: &EventSink) -> bool {
        let seed = self.next_seed();
        let still = match sink.format() {
            ImageFormat::Jpeg => synthesize_still(sink.size(), seed),
        };
        let accepted = match still {
            Ok(image) => sink.try_deliver(image).is_ok(),
            Err(e) => {
                warn!(error = %e, "Virtual still synthesis failed");
                events.capture_failed(e);
                return false;
            }
        };
        events.capture_completed();
        debug!(session = %events.session(), accepted, "Virtual still delivered");
        accepted
    }
}

fn note_sink_closed(state: &mut VirtualState, session: SessionId) {
    let event = CloseEvent::Sink(session);
    if !state.closes.contains(&event) {
        state.closes.push(event);
    }
}

/// Record the sink's closure once its reader goes away
fn watch_sink(shared: Arc<Shared>, sink: ImageSinkWriter, session: SessionId) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        return;
    };
    handle.spawn(async move {
        sink.closed().await;
        note_sink_closed(&mut shared.state(), session);
    });
}

/// Software camera service
#[derive(Clone)]
pub struct VirtualCameraService {
    shared: Arc<Shared>,
}

impl VirtualCameraService {
    pub fn new(config: VirtualCameraConfig) -> Self {
        info!(
            cameras = config.camera_ids.len(),
            level = %config.hardware_level,
            "Creating virtual camera service"
        );
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(VirtualState::default()),
            }),
        }
    }

    /// Number of `open_camera` calls
    pub fn open_attempts(&self) -> usize {
        self.shared.state().open_attempts
    }

    /// Every repeating and one-shot request issued so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared.state().requests.clone()
    }

    /// One-shot still requests issued so far
    pub fn still_requests(&self) -> usize {
        self.shared
            .state()
            .requests
            .iter()
            .filter(|r| !r.repeating)
            .count()
    }

    /// Session, device and sink releases, in order
    pub fn closes(&self) -> Vec<CloseEvent> {
        self.shared.state().closes.clone()
    }

    /// Outputs of the last configured session
    pub fn configured_outputs(&self) -> Vec<(TargetKind, Resolution)> {
        self.shared.state().configured_outputs.clone()
    }

    /// Complete a held open; returns false if nothing was held
    pub fn release_open(&self) -> bool {
        let held = self.shared.state().held_open.take();
        match held {
            Some((camera_id, events)) => self.complete_open(camera_id, events),
            None => false,
        }
    }

    /// Complete a held configure; returns false if nothing was held
    pub fn release_configure(&self) -> bool {
        let held = self.shared.state().held_configure.take();
        match held {
            Some((events, sink)) => events.configured(Box::new(VirtualSession::new(
                Arc::clone(&self.shared),
                events.clone(),
                sink,
            ))),
            None => false,
        }
    }

    /// Deliver every held still; returns how many the sinks accepted
    pub fn deliver_held_captures(&self) -> usize {
        let held = std::mem::take(&mut self.shared.state().held_captures);
        held.iter()
            .filter(|capture| self.shared.deliver_still(&capture.sink, &capture.events))
            .count()
    }

    /// Report a device error on the most recently opened device
    pub fn raise_device_error(&self, code: i32) -> bool {
        let events = self.shared.state().device_events.clone();
        events.is_some_and(|events| events.error(code))
    }

    /// Report a disconnect on the most recently opened device
    pub fn disconnect(&self) -> bool {
        let events = self.shared.state().device_events.clone();
        events.is_some_and(|events| events.disconnected())
    }

    fn complete_open(&self, camera_id: String, events: EventSink) -> bool {
        self.shared.state().device_events = Some(events.clone());
        let device = VirtualDevice {
            id: camera_id,
            shared: Arc::clone(&self.shared),
            events: events.clone(),
            sink: None,
            closed: false,
        };
        events.opened(Box::new(device))
    }
}

impl CameraService for VirtualCameraService {
    fn camera_ids(&self) -> Vec<String> {
        self.shared.config.camera_ids.clone()
    }

    fn characteristics(&self, camera_id: &str) -> BackendResult<CameraCharacteristics> {
        let config = &self.shared.config;
        if !config.camera_ids.iter().any(|id| id == camera_id) {
            return Err(BackendError::DeviceNotFound(camera_id.to_string()));
        }
        Ok(CameraCharacteristics {
            id: camera_id.to_string(),
            hardware_level: config.hardware_level,
            preview_sizes: config.preview_sizes.clone(),
            still_sizes: config.still_sizes.clone(),
        })
    }

    fn open_camera(&self, camera_id: &str, events: EventSink) -> BackendResult<()> {
        if !self.shared.config.camera_ids.iter().any(|id| id == camera_id) {
            return Err(BackendError::DeviceNotFound(camera_id.to_string()));
        }
        self.shared.state().open_attempts += 1;
        info!(camera_id, session = %events.session(), "Opening virtual camera");

        match &self.shared.config.open {
            OpenBehavior::Succeed => {
                self.complete_open(camera_id.to_string(), events);
            }
            OpenBehavior::Error(code) => {
                events.error(*code);
            }
            OpenBehavior::Disconnect => {
                events.disconnected();
            }
            OpenBehavior::Hold => {
                self.shared.state().held_open = Some((camera_id.to_string(), events));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for VirtualCameraService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualCameraService")
            .field("config", &self.shared.config)
            .finish()
    }
}

/// Opened virtual device
struct VirtualDevice {
    id: String,
    shared: Arc<Shared>,
    events: EventSink,
    sink: Option<ImageSinkWriter>,
    closed: bool,
}

impl CameraDevice for VirtualDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn create_capture_session(
        &mut self,
        outputs: Vec<OutputTarget>,
        events: EventSink,
    ) -> BackendResult<()> {
        if self.closed {
            return Err(BackendError::Closed);
        }

        let config = &self.shared.config;
        let supported = outputs.iter().all(|output| match output.kind() {
            TargetKind::PreviewSurface => config.preview_sizes.contains(&output.size()),
            TargetKind::StillImage => config.still_sizes.contains(&output.size()),
        });
        if !supported || outputs.is_empty() {
            warn!(camera_id = %self.id, "Requested outputs not supported by virtual camera");
            events.configure_failed();
            return Ok(());
        }

        let sink = outputs.iter().find_map(|output| match output {
            OutputTarget::StillImageSink(writer) => Some(writer.clone()),
            OutputTarget::PreviewSurface { .. } => None,
        });
        self.shared.state().configured_outputs = outputs
            .iter()
            .map(|output| (output.kind(), output.size()))
            .collect();
        if let Some(sink) = &sink {
            watch_sink(Arc::clone(&self.shared), sink.clone(), self.events.session());
        }
        self.sink = sink.clone();

        match config.configure {
            ConfigureBehavior::Succeed => {
                let session = VirtualSession::new(Arc::clone(&self.shared), events.clone(), sink);
                events.configured(Box::new(session));
            }
            ConfigureBehavior::Fail => {
                events.configure_failed();
            }
            ConfigureBehavior::Hold => {
                self.shared.state().held_configure = Some((events, sink));
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        debug!(camera_id = %self.id, "Virtual device closed");
        let session = self.events.session();
        self.shared
            .record_close(CloseEvent::Device(session), self.sink.as_ref(), session);
    }
}

/// Configured virtual capture session
struct VirtualSession {
    shared: Arc<Shared>,
    events: EventSink,
    sink: Option<ImageSinkWriter>,
    closed: bool,
}

impl VirtualSession {
    fn new(shared: Arc<Shared>, events: EventSink, sink: Option<ImageSinkWriter>) -> Self {
        Self {
            shared,
            events,
            sink,
            closed: false,
        }
    }

    fn record(&self, request: &CaptureRequest, repeating: bool) {
        self.shared.state().requests.push(RecordedRequest {
            session: self.events.session(),
            request: request.clone(),
            repeating,
        });
    }
}

impl CaptureSession for VirtualSession {
    fn set_repeating_request(&mut self, request: CaptureRequest) -> BackendResult<()> {
        if self.closed {
            return Err(BackendError::Closed);
        }
        self.record(&request, true);
        Ok(())
    }

    fn capture(&mut self, request: CaptureRequest) -> BackendResult<()> {
        if self.closed {
            return Err(BackendError::Closed);
        }
        let Some(sink) = self.sink.clone() else {
            return Err(BackendError::RequestRejected(
                "no still image output configured".into(),
            ));
        };
        if !request.targets.contains(&TargetKind::StillImage) {
            return Err(BackendError::RequestRejected(
                "still request must target the image sink".into(),
            ));
        }
        self.record(&request, false);

        match &self.shared.config.capture {
            CaptureBehavior::Deliver => {
                self.shared.deliver_still(&sink, &self.events);
            }
            CaptureBehavior::Fail(reason) => {
                self.events.capture_failed(reason.clone());
            }
            CaptureBehavior::Hold => {
                self.shared.state().held_captures.push(HeldCapture {
                    sink,
                    events: self.events.clone(),
                });
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let session = self.events.session();
        self.shared
            .record_close(CloseEvent::Session(session), self.sink.as_ref(), session);
    }
}
