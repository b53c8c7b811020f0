// SPDX-License-Identifier: GPL-3.0-only

//! Preview and still output size selection

use tracing::{debug, info};

use crate::backends::camera::types::{Resolution, TargetKind};
use crate::config::PreviewSettings;
use crate::errors::SessionError;

/// Picks output sizes from the lists a device reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionSelector {
    settings: PreviewSettings,
}

impl ResolutionSelector {
    pub fn new(settings: PreviewSettings) -> Self {
        Self { settings }
    }

    /// Choose the preview stream size
    ///
    /// Exact target match first, then the largest size within the bounds,
    /// then the first listed size. The view size is only logged: the preview
    /// is scaled onto the view by the display transform.
    pub fn preview(
        &self,
        sizes: &[Resolution],
        view_width: u32,
        view_height: u32,
    ) -> Result<Resolution, SessionError> {
        let first = *sizes
            .first()
            .ok_or(SessionError::NoSupportedSizes(TargetKind::PreviewSurface))?;

        debug!(
            available = ?sizes,
            view_width,
            view_height,
            "Selecting preview size"
        );

        if let Some(exact) = sizes.iter().find(|s| **s == self.settings.target) {
            info!(size = %exact, "Using target preview size");
            return Ok(*exact);
        }

        let bounded = largest(sizes.iter().filter(|s| s.fits_within(self.settings.max)));
        let chosen = bounded.unwrap_or(first);
        info!(
            size = %chosen,
            within_bounds = bounded.is_some(),
            "Using fallback preview size"
        );
        Ok(chosen)
    }

    /// Choose the still capture size: the largest area available
    pub fn still(&self, sizes: &[Resolution]) -> Result<Resolution, SessionError> {
        let chosen =
            largest(sizes.iter()).ok_or(SessionError::NoSupportedSizes(TargetKind::StillImage))?;
        info!(size = %chosen, "Using still capture size");
        Ok(chosen)
    }
}

/// Largest area, first encountered wins ties
fn largest<'a>(sizes: impl Iterator<Item = &'a Resolution>) -> Option<Resolution> {
    sizes.fold(None, |best: Option<Resolution>, size| match best {
        Some(best) if best.area() >= size.area() => Some(best),
        _ => Some(*size),
    })
}

/// [`ResolutionSelector::preview`] with default settings
pub fn select_preview(
    sizes: &[Resolution],
    view_width: u32,
    view_height: u32,
) -> Result<Resolution, SessionError> {
    ResolutionSelector::default().preview(sizes, view_width, view_height)
}

/// [`ResolutionSelector::still`] with default settings
pub fn select_still(sizes: &[Resolution]) -> Result<Resolution, SessionError> {
    ResolutionSelector::default().still(sizes)
}
