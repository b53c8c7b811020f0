// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Preview stream sizing
pub mod preview {
    /// Preferred preview width (16:9 at 720p)
    pub const TARGET_WIDTH: u32 = 1280;

    /// Preferred preview height
    pub const TARGET_HEIGHT: u32 = 720;

    /// Largest preview width accepted by the fallback search
    pub const MAX_WIDTH: u32 = 1920;

    /// Largest preview height accepted by the fallback search
    pub const MAX_HEIGHT: u32 = 1080;
}

/// Still image storage
pub mod storage {
    /// Folder created under the public pictures directory
    pub const PHOTO_FOLDER_NAME: &str = "ComposeCamera2Api";

    /// Prefix of every saved photo
    pub const PHOTO_FILE_PREFIX: &str = "IMG_";

    /// chrono format string for the timestamp part of the file name
    pub const PHOTO_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

    /// Extension of saved photos
    pub const PHOTO_EXTENSION: &str = "jpg";
}

/// Timing constants
pub mod timing {
    /// How long a capture status message stays visible
    pub const MESSAGE_DISPLAY_MS: u64 = 3000;
}

/// Still sink configuration
pub mod sink {
    /// At most one undelivered still image at a time
    pub const MAX_IMAGES: usize = 1;

    /// JPEG quality used by the virtual camera encoder
    pub const VIRTUAL_JPEG_QUALITY: u8 = 92;
}

/// User-facing messages
pub mod messages {
    /// Shown once per surface when the hardware tier is too low
    pub const UNSUPPORTED_DEVICE: &str = "Camera2 API is not supported on this device";

    /// Shown when capture is pressed without an active session
    pub const CAMERA_NOT_READY: &str = "Camera not ready";

    /// Generic capture failure
    pub const CAPTURE_FAILED: &str = "Capture failed";
}

/// Returns the area of a `width` x `height` frame without overflowing.
pub fn frame_area(width: u32, height: u32) -> u64 {
    width as u64 * height as u64
}
