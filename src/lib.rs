// SPDX-License-Identifier: MPL-2.0

//! Camera preview core
//!
//! Opens a camera, streams a live preview into a view surface and captures
//! full-resolution JPEG stills into the public pictures directory.
//!
//! # Architecture
//!
//! - [`backends`]: camera service abstraction, device callbacks, the image
//!   sink and a virtual camera
//! - [`session`]: session lifecycle state machine and its worker task
//! - [`pipelines`]: preview size selection, display transform and still
//!   capture
//! - [`storage`]: image writer for captured stills
//! - [`app`]: controller tying a preview view to the session
//! - [`config`]: tunable settings
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use camera_preview::backends::virtual_camera::{VirtualCameraConfig, VirtualCameraService};
//! use camera_preview::backends::camera::types::PreviewSurface;
//! use camera_preview::{Config, ImageWriter, PreviewController, SurfaceEvent};
//!
//! # async fn run() {
//! let service = Arc::new(VirtualCameraService::new(VirtualCameraConfig::default()));
//! let writer = ImageWriter::default_location().unwrap();
//! let mut controller = PreviewController::new(service, Config::default(), writer);
//!
//! controller.set_permission(true);
//! controller.handle_surface_event(SurfaceEvent::Available {
//!     surface: PreviewSurface::new(1),
//!     width: 1920,
//!     height: 1080,
//! });
//! # }
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod logging;
pub mod pipelines;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use app::{PreviewController, StatusLine, SurfaceEvent};
pub use config::Config;
pub use errors::{AppError, AppResult, CaptureError, SessionError, StorageError};
pub use pipelines::preview::{DisplayRotation, TransformMatrix, compute_transform};
pub use session::{Notice, SessionManager, SessionSnapshot, SessionState};
pub use storage::ImageWriter;
