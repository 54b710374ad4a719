//! Viewport to canvas coordinate mapping.
//!
//! The overlay canvas is displayed at whatever size the layout gives it
//! (including any CSS zoom transform), while its backing store is sized to
//! the video's natural resolution. Pointer events arrive in viewport space
//! and must be scaled into that intrinsic space before they touch the shape
//! model.

use serde::{Deserialize, Serialize};

use crate::shape::Point;

/// Displayed bounding rectangle of the canvas element, in viewport pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasRect {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Displayed width.
    pub width: f64,
    /// Displayed height.
    pub height: f64,
}

impl CanvasRect {
    /// Create a new rectangle.
    #[must_use]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Centre of the rectangle in viewport space.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Whether the rectangle has no displayed area.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_degenerate(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }
}

/// Intrinsic (backing store) size of the canvas in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrinsicSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl IntrinsicSize {
    /// Create a new size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Map a viewport-space pointer position into intrinsic canvas space.
///
/// Must be called per event with a freshly measured `rect`; layout may change
/// between events. A canvas with zero displayed size maps everything to the
/// origin.
#[must_use]
pub fn map_to_canvas(
    viewport_x: f64,
    viewport_y: f64,
    rect: &CanvasRect,
    size: IntrinsicSize,
) -> Point {
    if rect.is_degenerate() {
        return Point::new(0.0, 0.0);
    }

    Point::new(
        (viewport_x - rect.left) * f64::from(size.width) / rect.width,
        (viewport_y - rect.top) * f64::from(size.height) / rect.height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_scaling_returns_rect_relative_coordinates() {
        let rect = CanvasRect::new(20.0, 40.0, 640.0, 360.0);
        let p = map_to_canvas(120.0, 90.0, &rect, IntrinsicSize::new(640, 360));
        assert!((p.x - 100.0).abs() < f64::EPSILON);
        assert!((p.y - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn scales_displayed_to_intrinsic() {
        // 1920x1080 video shown at half size
        let rect = CanvasRect::new(0.0, 0.0, 960.0, 540.0);
        let p = map_to_canvas(480.0, 270.0, &rect, IntrinsicSize::new(1920, 1080));
        assert!((p.x - 960.0).abs() < f64::EPSILON);
        assert!((p.y - 540.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_displayed_size_maps_to_origin() {
        let size = IntrinsicSize::new(640, 360);
        let p = map_to_canvas(10.0, 10.0, &CanvasRect::new(5.0, 5.0, 0.0, 100.0), size);
        assert_eq!(p, Point::new(0.0, 0.0));
        let p = map_to_canvas(10.0, 10.0, &CanvasRect::new(5.0, 5.0, 100.0, 0.0), size);
        assert_eq!(p, Point::new(0.0, 0.0));
    }

    #[test]
    fn rect_center() {
        let rect = CanvasRect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(rect.center(), (60.0, 45.0));
    }
}
