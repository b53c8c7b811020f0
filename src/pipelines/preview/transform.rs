// SPDX-License-Identifier: GPL-3.0-only

//! Display transform for the preview surface
//!
//! The camera fills its buffers in sensor orientation. When the display is
//! rotated the preview surface has to be counter-rotated and scaled so the
//! image stays upright and covers the whole view. The transform is a pure
//! function of the display rotation, the view size and the stream size, and
//! is recomputed whenever any of them changes.

use tracing::debug;

/// Display rotation relative to the device's natural orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DisplayRotation {
    /// Natural orientation (portrait on phones)
    #[default]
    Rotate0,
    /// 90 degrees (landscape left)
    Rotate90,
    /// 180 degrees (upside down)
    Rotate180,
    /// 270 degrees (landscape right)
    Rotate270,
}

impl DisplayRotation {
    /// Get the rotation in degrees
    pub fn degrees(&self) -> u32 {
        match self {
            DisplayRotation::Rotate0 => 0,
            DisplayRotation::Rotate90 => 90,
            DisplayRotation::Rotate180 => 180,
            DisplayRotation::Rotate270 => 270,
        }
    }
}

impl std::fmt::Display for DisplayRotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Axis-aligned rectangle in view coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RectF {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl RectF {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle anchored at the origin
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center_x(&self) -> f32 {
        (self.left + self.right) * 0.5
    }

    pub fn center_y(&self) -> f32 {
        (self.top + self.bottom) * 0.5
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Move the rectangle by (dx, dy)
    pub fn offset(&mut self, dx: f32, dy: f32) {
        self.left += dx;
        self.right += dx;
        self.top += dy;
        self.bottom += dy;
    }
}

/// 2D affine transform
///
/// Maps `(x, y)` to
/// `(scale_x * x + skew_x * y + trans_x, skew_y * x + scale_y * y + trans_y)`.
/// `post_*` operations apply after the current transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformMatrix {
    pub scale_x: f32,
    pub skew_x: f32,
    pub trans_x: f32,
    pub skew_y: f32,
    pub scale_y: f32,
    pub trans_y: f32,
}

impl Default for TransformMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl TransformMatrix {
    pub const fn identity() -> Self {
        Self {
            scale_x: 1.0,
            skew_x: 0.0,
            trans_x: 0.0,
            skew_y: 0.0,
            scale_y: 1.0,
            trans_y: 0.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Row-major 3x3 values, last row `[0, 0, 1]`
    pub fn values(&self) -> [f32; 9] {
        [
            self.scale_x,
            self.skew_x,
            self.trans_x,
            self.skew_y,
            self.scale_y,
            self.trans_y,
            0.0,
            0.0,
            1.0,
        ]
    }

    /// Map a point through the transform
    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.scale_x * x + self.skew_x * y + self.trans_x,
            self.skew_y * x + self.scale_y * y + self.trans_y,
        )
    }

    /// Replace with the transform stretching `src` onto `dst` on each axis
    ///
    /// An empty `src` resets to identity and returns false.
    pub fn set_rect_to_rect(&mut self, src: &RectF, dst: &RectF) -> bool {
        if src.is_empty() {
            *self = Self::identity();
            return false;
        }
        let sx = dst.width() / src.width();
        let sy = dst.height() / src.height();
        *self = Self {
            scale_x: sx,
            skew_x: 0.0,
            trans_x: dst.left - src.left * sx,
            skew_y: 0.0,
            scale_y: sy,
            trans_y: dst.top - src.top * sy,
        };
        true
    }

    /// Scale about the pivot `(px, py)` after the current transform
    pub fn post_scale(&mut self, sx: f32, sy: f32, px: f32, py: f32) {
        let scale = Self {
            scale_x: sx,
            skew_x: 0.0,
            trans_x: px - sx * px,
            skew_y: 0.0,
            scale_y: sy,
            trans_y: py - sy * py,
        };
        self.post_concat(&scale);
    }

    /// Rotate by `degrees` (clockwise on a y-down screen) about `(px, py)`
    /// after the current transform
    pub fn post_rotate(&mut self, degrees: f32, px: f32, py: f32) {
        let (sin, cos) = snapped_sin_cos(degrees);
        let rotate = Self {
            scale_x: cos,
            skew_x: -sin,
            trans_x: px - cos * px + sin * py,
            skew_y: sin,
            scale_y: cos,
            trans_y: py - sin * px - cos * py,
        };
        self.post_concat(&rotate);
    }

    /// `self = other * self`
    pub fn post_concat(&mut self, other: &TransformMatrix) {
        let a = other;
        let b = *self;
        *self = Self {
            scale_x: a.scale_x * b.scale_x + a.skew_x * b.skew_y,
            skew_x: a.scale_x * b.skew_x + a.skew_x * b.scale_y,
            trans_x: a.scale_x * b.trans_x + a.skew_x * b.trans_y + a.trans_x,
            skew_y: a.skew_y * b.scale_x + a.scale_y * b.skew_y,
            scale_y: a.skew_y * b.skew_x + a.scale_y * b.scale_y,
            trans_y: a.skew_y * b.trans_x + a.scale_y * b.trans_y + a.trans_y,
        };
    }
}

/// sin/cos with values within float noise of zero forced to zero,
/// so quarter turns produce exact matrices
fn snapped_sin_cos(degrees: f32) -> (f32, f32) {
    const NEARLY_ZERO: f32 = 1.0 / (1 << 16) as f32;
    let (sin, cos) = degrees.to_radians().sin_cos();
    let snap = |v: f32| if v.abs() <= NEARLY_ZERO { 0.0 } else { v };
    (snap(sin), snap(cos))
}

/// Compute the preview surface transform
///
/// * 0°: identity
/// * 180°: half turn about the view center
/// * 90°/270°: map the view onto the centered, dimension-swapped buffer rect,
///   fill-scale by `max(view_h / stream_h, view_w / stream_w)`, then turn
///   -90° (for 90°) or +90° (for 270°) about the view center
///
/// Zero-sized views or streams yield identity.
pub fn compute_transform(
    rotation: DisplayRotation,
    view_width: u32,
    view_height: u32,
    stream_width: u32,
    stream_height: u32,
) -> TransformMatrix {
    let mut matrix = TransformMatrix::identity();
    if view_width == 0 || view_height == 0 {
        return matrix;
    }

    let view_w = view_width as f32;
    let view_h = view_height as f32;
    let view_rect = RectF::from_size(view_w, view_h);
    let center_x = view_rect.center_x();
    let center_y = view_rect.center_y();

    match rotation {
        DisplayRotation::Rotate0 => {}
        DisplayRotation::Rotate180 => {
            matrix.post_rotate(180.0, center_x, center_y);
        }
        DisplayRotation::Rotate90 | DisplayRotation::Rotate270 => {
            if stream_width == 0 || stream_height == 0 {
                return matrix;
            }
            let stream_w = stream_width as f32;
            let stream_h = stream_height as f32;

            let mut buffer_rect = RectF::from_size(stream_h, stream_w);
            buffer_rect.offset(
                center_x - buffer_rect.center_x(),
                center_y - buffer_rect.center_y(),
            );
            matrix.set_rect_to_rect(&view_rect, &buffer_rect);

            let scale = (view_h / stream_h).max(view_w / stream_w);
            matrix.post_scale(scale, scale, center_x, center_y);

            let degrees = if rotation == DisplayRotation::Rotate90 {
                -90.0
            } else {
                90.0
            };
            matrix.post_rotate(degrees, center_x, center_y);
        }
    }

    debug!(
        rotation = %rotation,
        view_width,
        view_height,
        stream_width,
        stream_height,
        matrix = ?matrix.values(),
        "Computed preview transform"
    );
    matrix
}
