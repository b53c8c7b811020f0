// SPDX-License-Identifier: GPL-3.0-only

//! Preview stream configuration
//!
//! - [`resolution`]: picks the preview and still output sizes
//! - [`transform`]: maps the preview buffer onto the rotated view

pub mod resolution;
pub mod transform;

pub use resolution::{ResolutionSelector, select_preview, select_still};
pub use transform::{DisplayRotation, RectF, TransformMatrix, compute_transform};
