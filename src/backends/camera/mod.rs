// SPDX-License-Identifier: MPL-2.0

//! Camera service abstraction
//!
//! The host operating system owns the camera stack. This module describes the
//! small slice of it the preview core needs, as three traits:
//!
//! ```text
//! ┌─────────────────────┐
//! │   SessionManager    │  ← state machine, one worker task per session
//! └──────────┬──────────┘
//!            │ open / configure / request
//!            ▼
//! ┌─────────────────────┐      DeviceEvent       ┌──────────────┐
//! │ CameraService trait │ ─────────────────────▶ │  EventSink   │
//! │ CameraDevice trait  │                        └──────────────┘
//! │ CaptureSession trait│ ─── CapturedImage ───▶  ImageSinkWriter
//! └─────────────────────┘
//! ```
//!
//! Open and configure are asynchronous: the call returns immediately and the
//! outcome is posted later through the [`EventSink`] handed in.

pub mod capability;
pub mod events;
pub mod image_sink;
pub mod types;

pub use events::{DeviceEvent, EventSink, event_channel};
pub use image_sink::{ImageSinkReader, ImageSinkWriter, image_sink};
pub use types::*;

/// Entry point of the platform camera stack
pub trait CameraService: Send + Sync {
    /// Enumerate camera identifiers, in platform order
    fn camera_ids(&self) -> Vec<String>;

    /// Read static characteristics of a camera
    fn characteristics(&self, camera_id: &str) -> BackendResult<CameraCharacteristics>;

    /// Start opening a camera
    ///
    /// On success the service later posts [`DeviceEvent::Opened`] carrying the
    /// device, or [`DeviceEvent::Error`] / [`DeviceEvent::Disconnected`].
    /// An `Err` return means the request was rejected synchronously.
    fn open_camera(&self, camera_id: &str, events: EventSink) -> BackendResult<()>;
}

/// An opened camera device
pub trait CameraDevice: Send {
    /// Identifier the device was opened with
    fn id(&self) -> &str;

    /// Start configuring a capture session over a fixed set of outputs
    ///
    /// The outcome is posted as [`DeviceEvent::Configured`] or
    /// [`DeviceEvent::ConfigureFailed`].
    fn create_capture_session(
        &mut self,
        outputs: Vec<OutputTarget>,
        events: EventSink,
    ) -> BackendResult<()>;

    /// Release the device. Must be idempotent.
    fn close(&mut self);
}

/// A configured capture session
pub trait CaptureSession: Send {
    /// Replace the repeating request driving the preview
    fn set_repeating_request(&mut self, request: CaptureRequest) -> BackendResult<()>;

    /// Submit a one-shot request
    ///
    /// Stills end up in the session's image sink; the device side outcome is
    /// posted as [`DeviceEvent::CaptureCompleted`] or
    /// [`DeviceEvent::CaptureFailed`].
    fn capture(&mut self, request: CaptureRequest) -> BackendResult<()>;

    /// Stop all requests and release the session. Must be idempotent.
    fn close(&mut self);
}
