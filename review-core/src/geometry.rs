//! Point-to-segment hit-testing.

use crate::shape::{Point, Shape};

/// Default erase/selection tolerance in canvas pixels.
pub const DEFAULT_TOLERANCE: f64 = 15.0;

/// Squared distance from `p` to the segment `a`-`b`.
///
/// The projection parameter is clamped to `[0, 1]`. A zero-length segment
/// uses a denominator of 1, which makes it behave like a single point.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn distance_sq_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    let denom = if len_sq == 0.0 { 1.0 } else { len_sq };

    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / denom).clamp(0.0, 1.0);
    let proj_x = a.x + t * dx;
    let proj_y = a.y + t * dy;

    let ex = p.x - proj_x;
    let ey = p.y - proj_y;
    ex * ex + ey * ey
}

/// Whether `p` lies within `tolerance` of the segment `a`-`b`.
///
/// NaN distances compare false, so non-finite geometry never hits.
#[must_use]
pub fn near_segment(p: Point, a: Point, b: Point, tolerance: f64) -> bool {
    distance_sq_to_segment(p, a, b) <= tolerance * tolerance
}

/// Whether `p` lies within `tolerance` of any part of `shape`.
#[must_use]
pub fn shape_hit(shape: &Shape, p: Point, tolerance: f64) -> bool {
    match shape {
        Shape::Line { x1, y1, x2, y2 } => {
            near_segment(p, Point::new(*x1, *y1), Point::new(*x2, *y2), tolerance)
        }
        Shape::Freehand { points } => match points.as_slice() {
            [] => false,
            [only] => near_segment(p, *only, *only, tolerance),
            _ => points
                .windows(2)
                .any(|pair| near_segment(p, pair[0], pair[1], tolerance)),
        },
    }
}

/// Index of the topmost shape under `p`, scanning from the end of the list.
#[must_use]
pub fn topmost_hit(shapes: &[Shape], p: Point, tolerance: f64) -> Option<usize> {
    shapes.iter().rposition(|shape| shape_hit(shape, p, tolerance))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn distance_to_segment_interior() {
        let d = distance_sq_to_segment(pt(5.0, 3.0), pt(0.0, 0.0), pt(10.0, 0.0));
        assert!((d - 9.0).abs() < 1e-9);
    }

    #[test]
    fn distance_clamps_beyond_endpoints() {
        let d = distance_sq_to_segment(pt(13.0, 4.0), pt(0.0, 0.0), pt(10.0, 0.0));
        assert!((d - 25.0).abs() < 1e-9);
        let d = distance_sq_to_segment(pt(-3.0, 4.0), pt(0.0, 0.0), pt(10.0, 0.0));
        assert!((d - 25.0).abs() < 1e-9);
    }

    #[test]
    fn zero_length_segment_is_a_circle() {
        let a = pt(50.0, 50.0);
        assert!(near_segment(pt(60.0, 50.0), a, a, DEFAULT_TOLERANCE));
        assert!(near_segment(pt(50.0, 64.9), a, a, DEFAULT_TOLERANCE));
        assert!(!near_segment(pt(50.0, 65.1), a, a, DEFAULT_TOLERANCE));
    }

    #[test]
    fn freehand_tests_every_segment() {
        let stroke = Shape::Freehand {
            points: vec![pt(0.0, 0.0), pt(100.0, 0.0), pt(100.0, 100.0)],
        };
        assert!(shape_hit(&stroke, pt(110.0, 50.0), DEFAULT_TOLERANCE));
        assert!(shape_hit(&stroke, pt(50.0, -10.0), DEFAULT_TOLERANCE));
        assert!(!shape_hit(&stroke, pt(50.0, 50.0), DEFAULT_TOLERANCE));
    }

    #[test]
    fn single_point_freehand_hits_near_point() {
        let dot = Shape::Freehand {
            points: vec![pt(20.0, 20.0)],
        };
        assert!(shape_hit(&dot, pt(25.0, 25.0), DEFAULT_TOLERANCE));
        assert!(!shape_hit(&Shape::Freehand { points: vec![] }, pt(0.0, 0.0), 15.0));
    }

    #[test]
    fn non_finite_line_never_hits() {
        let bad = Shape::Line {
            x1: f64::NAN,
            y1: 0.0,
            x2: 10.0,
            y2: 10.0,
        };
        assert!(!shape_hit(&bad, pt(5.0, 5.0), DEFAULT_TOLERANCE));
    }

    #[test]
    fn topmost_prefers_last_drawn() {
        let shapes = vec![
            Shape::line(0.0, 0.0, 100.0, 0.0),
            Shape::line(0.0, 5.0, 100.0, 5.0),
            Shape::line(0.0, 500.0, 100.0, 500.0),
        ];
        assert_eq!(topmost_hit(&shapes, pt(50.0, 2.0), DEFAULT_TOLERANCE), Some(1));
        assert_eq!(topmost_hit(&shapes, pt(50.0, 250.0), DEFAULT_TOLERANCE), None);
    }
}
