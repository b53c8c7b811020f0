// SPDX-License-Identifier: MPL-2.0

//! Error types for the camera preview core
//!
//! Every error carries a short human-readable message through its `Display`
//! impl. That message is what ends up in front of the user.

use std::fmt;

use crate::backends::camera::types::{BackendError, TargetKind};

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main error type
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Session lifecycle errors
    Session(SessionError),
    /// Still capture errors
    Capture(CaptureError),
    /// Storage/filesystem errors
    Storage(StorageError),
    /// Configuration errors
    Config(String),
}

/// Errors that move a session into the failed state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Hardware tier below the minimum, or no camera at all
    UnsupportedDevice,
    /// Camera permission has not been granted
    PermissionDenied,
    /// The device reported an error while opening (platform error code)
    DeviceOpenError(i32),
    /// The device went away
    DeviceDisconnected,
    /// The capture session could not be configured
    SessionConfigurationFailed,
    /// The device reported no output sizes for a target
    NoSupportedSizes(TargetKind),
    /// Error raised by the camera service itself
    Backend(BackendError),
}

/// Still capture errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// No active session or image sink
    CaptureNotReady,
    /// A previous still capture has not resolved yet
    CaptureInProgress,
    /// The device failed the capture request
    CaptureFailed(String),
}

/// Storage errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No pictures directory could be determined
    NoPicturesDirectory,
    /// Writing the photo failed
    WriteFailed(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Session(e) => write!(f, "{}", e),
            AppError::Capture(e) => write!(f, "{}", e),
            AppError::Storage(e) => write!(f, "{}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::UnsupportedDevice => {
                write!(f, "{}", crate::constants::messages::UNSUPPORTED_DEVICE)
            }
            SessionError::PermissionDenied => write!(f, "Camera permission denied"),
            SessionError::DeviceOpenError(code) => write!(f, "Camera error: {}", code),
            SessionError::DeviceDisconnected => write!(f, "Camera disconnected"),
            SessionError::SessionConfigurationFailed => {
                write!(f, "Session configuration failed")
            }
            SessionError::NoSupportedSizes(kind) => {
                write!(f, "No supported {} sizes", kind)
            }
            SessionError::Backend(e) => write!(f, "{}", e),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::CaptureNotReady => {
                write!(f, "{}", crate::constants::messages::CAMERA_NOT_READY)
            }
            CaptureError::CaptureInProgress => write!(f, "Capture already in progress"),
            CaptureError::CaptureFailed(reason) if reason.is_empty() => {
                write!(f, "{}", crate::constants::messages::CAPTURE_FAILED)
            }
            CaptureError::CaptureFailed(reason) => {
                write!(f, "{}: {}", crate::constants::messages::CAPTURE_FAILED, reason)
            }
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NoPicturesDirectory => {
                write!(f, "Failed to save photo: no pictures directory")
            }
            StorageError::WriteFailed(reason) => write!(f, "Failed to save photo: {}", reason),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for SessionError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for StorageError {}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err)
    }
}

impl From<BackendError> for SessionError {
    fn from(err: BackendError) -> Self {
        SessionError::Backend(err)
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::WriteFailed(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_messages() {
        assert_eq!(CaptureError::CaptureNotReady.to_string(), "Camera not ready");
        assert_eq!(
            CaptureError::CaptureFailed(String::new()).to_string(),
            "Capture failed"
        );
        assert_eq!(
            CaptureError::CaptureFailed("sensor timeout".into()).to_string(),
            "Capture failed: sensor timeout"
        );
    }

    #[test]
    fn test_storage_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: StorageError = io.into();
        assert_eq!(err.to_string(), "Failed to save photo: read-only");
    }
}
