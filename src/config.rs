// SPDX-License-Identifier: GPL-3.0-only

//! Runtime settings for the preview core
//!
//! Hosts that keep their settings as JSON can hand the string to
//! [`Config::from_json`]; missing fields fall back to the defaults.

use serde::{Deserialize, Serialize};

use crate::backends::camera::types::Resolution;
use crate::constants::{preview, timing};
use crate::errors::AppResult;

/// Preview size selection settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSettings {
    /// Size used when the device offers it exactly
    pub target: Resolution,
    /// Upper bound for the largest-area fallback
    pub max: Resolution,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            target: Resolution::new(preview::TARGET_WIDTH, preview::TARGET_HEIGHT),
            max: Resolution::new(preview::MAX_WIDTH, preview::MAX_HEIGHT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera to open; the first enumerated camera when unset or absent
    pub camera_id: Option<String>,
    /// Preview size selection
    pub preview: PreviewSettings,
    /// How long capture status messages stay on screen
    pub message_display_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_id: None,
            preview: PreviewSettings::default(),
            message_display_ms: timing::MESSAGE_DISPLAY_MS,
        }
    }
}

impl Config {
    /// Parse settings from JSON
    pub fn from_json(json: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Status message display time as a `Duration`
    pub fn message_display(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.message_display_ms)
    }
}
