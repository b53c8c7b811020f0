// SPDX-License-Identifier: GPL-3.0-only

//! Hardware capability check

use tracing::{debug, info, warn};

use super::CameraService;
use crate::errors::SessionError;

/// Pick the camera to use: `preferred` if it is enumerated, else the first one
pub fn select_camera_id(service: &dyn CameraService, preferred: Option<&str>) -> Option<String> {
    let ids = service.camera_ids();
    if let Some(preferred) = preferred {
        if ids.iter().any(|id| id == preferred) {
            return Some(preferred.to_string());
        }
        warn!(preferred, "Preferred camera not present, using first camera");
    }
    ids.into_iter().next()
}

/// Whether the camera's hardware tier is above legacy
///
/// Unreadable characteristics count as unsupported.
pub fn is_supported(service: &dyn CameraService, camera_id: &str) -> bool {
    match service.characteristics(camera_id) {
        Ok(characteristics) => {
            debug!(
                camera_id,
                level = %characteristics.hardware_level,
                "Camera hardware level"
            );
            !characteristics.hardware_level.is_legacy()
        }
        Err(e) => {
            warn!(camera_id, error = %e, "Could not read camera characteristics");
            false
        }
    }
}

/// Resolve the camera id and check that it can drive the preview
///
/// No enumerated camera is treated the same as legacy hardware.
pub fn check_camera(
    service: &dyn CameraService,
    preferred: Option<&str>,
) -> Result<String, SessionError> {
    let Some(camera_id) = select_camera_id(service, preferred) else {
        warn!("No camera enumerated");
        return Err(SessionError::UnsupportedDevice);
    };

    if !is_supported(service, &camera_id) {
        info!(camera_id = %camera_id, "Camera hardware level not supported");
        return Err(SessionError::UnsupportedDevice);
    }

    Ok(camera_id)
}
