// SPDX-License-Identifier: GPL-3.0-only
// Shared types for the camera service abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};

use super::image_sink::ImageSinkWriter;

/// A (width, height) output size reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Create a new resolution
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel count as u64 so 4K+ sizes never overflow
    pub fn area(&self) -> u64 {
        crate::constants::frame_area(self.width, self.height)
    }

    /// True if this size fits inside `bounds` on both axes
    pub fn fits_within(&self, bounds: Resolution) -> bool {
        self.width <= bounds.width && self.height <= bounds.height
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Hardware support tier reported by the camera service
///
/// Ordered from least to most capable, except that `External` sits between
/// `Limited` and `Full` the way removable cameras usually behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HardwareLevel {
    /// Legacy-only hardware (old camera API shim)
    Legacy,
    /// Limited feature set
    Limited,
    /// Removable/external camera
    External,
    /// Full per-frame control
    #[default]
    Full,
    /// Full plus reprocessing and raw
    Level3,
}

impl HardwareLevel {
    /// Legacy hardware cannot drive a two-output capture session
    pub fn is_legacy(&self) -> bool {
        matches!(self, HardwareLevel::Legacy)
    }
}

impl std::fmt::Display for HardwareLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HardwareLevel::Legacy => write!(f, "LEGACY"),
            HardwareLevel::Limited => write!(f, "LIMITED"),
            HardwareLevel::External => write!(f, "EXTERNAL"),
            HardwareLevel::Full => write!(f, "FULL"),
            HardwareLevel::Level3 => write!(f, "LEVEL_3"),
        }
    }
}

/// Static characteristics of a camera
#[derive(Debug, Clone, PartialEq)]
pub struct CameraCharacteristics {
    pub id: String,
    pub hardware_level: HardwareLevel,
    /// Sizes usable for the preview surface, in platform order
    pub preview_sizes: Vec<Resolution>,
    /// Sizes usable for JPEG still capture, in platform order
    pub still_sizes: Vec<Resolution>,
}

/// Kind of output a size list belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    PreviewSurface,
    StillImage,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::PreviewSurface => write!(f, "preview"),
            TargetKind::StillImage => write!(f, "still image"),
        }
    }
}

/// Encoding of a delivered still image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Jpeg,
}

/// Opaque handle to the renderable surface owned by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewSurface {
    pub id: u64,
}

impl PreviewSurface {
    pub const fn new(id: u64) -> Self {
        Self { id }
    }
}

/// An output bound into a capture session at configuration time
#[derive(Debug, Clone)]
pub enum OutputTarget {
    /// Live preview surface with its buffer size
    PreviewSurface {
        surface: PreviewSurface,
        size: Resolution,
    },
    /// Single-slot still image sink
    StillImageSink(ImageSinkWriter),
}

impl OutputTarget {
    pub fn kind(&self) -> TargetKind {
        match self {
            OutputTarget::PreviewSurface { .. } => TargetKind::PreviewSurface,
            OutputTarget::StillImageSink(_) => TargetKind::StillImage,
        }
    }

    pub fn size(&self) -> Resolution {
        match self {
            OutputTarget::PreviewSurface { size, .. } => *size,
            OutputTarget::StillImageSink(writer) => writer.size(),
        }
    }
}

/// Capture request template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTemplate {
    Preview,
    StillCapture,
}

/// Autofocus mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfMode {
    Off,
    Auto,
    ContinuousPicture,
}

/// Auto-exposure mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeMode {
    Off,
    On,
}

/// 3A control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    Off,
    Auto,
}

/// A capture request built from a template
///
/// Unset controls are left to the template defaults of the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub template: RequestTemplate,
    pub targets: Vec<TargetKind>,
    pub af_mode: Option<AfMode>,
    pub ae_mode: Option<AeMode>,
    pub control_mode: Option<ControlMode>,
}

impl CaptureRequest {
    /// Repeating preview request: continuous-picture AF, AE on, auto 3A
    pub fn preview() -> Self {
        Self {
            template: RequestTemplate::Preview,
            targets: vec![TargetKind::PreviewSurface],
            af_mode: Some(AfMode::ContinuousPicture),
            ae_mode: Some(AeMode::On),
            control_mode: Some(ControlMode::Auto),
        }
    }

    /// One-shot still request into the image sink
    pub fn still_capture() -> Self {
        Self {
            template: RequestTemplate::StillCapture,
            targets: vec![TargetKind::StillImage],
            af_mode: None,
            ae_mode: None,
            control_mode: Some(ControlMode::Auto),
        }
    }
}

/// Encoded still image handed over by the device
///
/// Owning the bytes is what releases the sink slot: once the image has been
/// taken out of the sink the next capture can be delivered.
#[derive(Clone)]
pub struct CapturedImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl CapturedImage {
    /// Take the encoded bytes, releasing the image
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl std::fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedImage")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Identifies one open/configure/dispose cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result type for camera service calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for camera service operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// No camera with this id
    DeviceNotFound(String),
    /// Characteristics could not be read
    CharacteristicsUnavailable(String),
    /// Device or session already closed
    Closed,
    /// Request rejected by the device
    RequestRejected(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::DeviceNotFound(id) => write!(f, "Camera not found: {}", id),
            BackendError::CharacteristicsUnavailable(msg) => {
                write!(f, "Camera characteristics unavailable: {}", msg)
            }
            BackendError::Closed => write!(f, "Camera closed"),
            BackendError::RequestRejected(msg) => write!(f, "Request rejected: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}
