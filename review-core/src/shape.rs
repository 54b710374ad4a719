//! Annotation shapes and the in-memory shape model.
//!
//! Shapes live in intrinsic canvas space (the video's natural resolution),
//! never in displayed pixels, so they survive viewport resizes and zoom.

use serde::{Deserialize, Serialize};

use crate::geometry::{self, DEFAULT_TOLERANCE};

/// A point in intrinsic canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate in canvas pixels.
    pub x: f64,
    /// Y coordinate in canvas pixels.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether both coordinates are finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One annotation, committed or in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    /// A straight line between two endpoints.
    Line {
        /// Start X.
        x1: f64,
        /// Start Y.
        y1: f64,
        /// End X.
        x2: f64,
        /// End Y.
        y2: f64,
    },

    /// A freehand stroke; point order is drawing order.
    Freehand {
        /// Stroke points.
        points: Vec<Point>,
    },
}

impl Shape {
    /// Create a line shape.
    #[must_use]
    pub const fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::Line { x1, y1, x2, y2 }
    }

    /// Create a freehand shape from points.
    #[must_use]
    pub fn freehand(points: impl Into<Vec<Point>>) -> Self {
        Self::Freehand {
            points: points.into(),
        }
    }

    /// Discriminator used in the persisted format.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Line { .. } => "line",
            Self::Freehand { .. } => "freehand",
        }
    }

    /// Whether this shape has enough finite geometry to be painted.
    #[must_use]
    pub fn is_renderable(&self) -> bool {
        match self {
            Self::Line { x1, y1, x2, y2 } => [x1, y1, x2, y2].iter().all(|v| v.is_finite()),
            Self::Freehand { points } => points.len() >= 2 && points.iter().all(Point::is_finite),
        }
    }
}

/// Active drawing tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Straight lines.
    Line,
    /// Freehand strokes.
    #[default]
    Freehand,
    /// Removes the topmost shape under the pointer.
    Eraser,
}

impl Tool {
    /// Parse a tool name as used by UI hosts.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "line" => Some(Self::Line),
            "freehand" | "pen" => Some(Self::Freehand),
            "eraser" => Some(Self::Eraser),
            _ => None,
        }
    }
}

/// The committed shape list plus at most one shape in progress.
#[derive(Debug, Clone)]
pub struct ShapeModel {
    shapes: Vec<Shape>,
    in_progress: Option<Shape>,
    tolerance: f64,
}

impl ShapeModel {
    /// Create an empty model with the default hit tolerance.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tolerance(DEFAULT_TOLERANCE)
    }

    /// Create an empty model with a custom hit tolerance.
    #[must_use]
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            shapes: Vec::new(),
            in_progress: None,
            tolerance,
        }
    }

    /// Start a new shape at `(x, y)`, replacing any unfinished one.
    ///
    /// Lines seed both endpoints at the same point; freehand strokes seed a
    /// one-point path. The eraser never creates shapes.
    pub fn begin_shape(&mut self, tool: Tool, x: f64, y: f64) {
        self.in_progress = match tool {
            Tool::Line => Some(Shape::line(x, y, x, y)),
            Tool::Freehand => Some(Shape::freehand(vec![Point::new(x, y)])),
            Tool::Eraser => None,
        };
    }

    /// Extend the shape in progress; no-op if nothing is being drawn.
    pub fn extend_shape(&mut self, x: f64, y: f64) {
        match &mut self.in_progress {
            Some(Shape::Line { x2, y2, .. }) => {
                *x2 = x;
                *y2 = y;
            }
            Some(Shape::Freehand { points }) => points.push(Point::new(x, y)),
            None => {}
        }
    }

    /// Move the shape in progress onto the committed list.
    ///
    /// Returns `false` when nothing was in progress.
    pub fn commit_shape(&mut self) -> bool {
        match self.in_progress.take() {
            Some(shape) => {
                tracing::debug!("Committed {} shape #{}", shape.kind(), self.shapes.len());
                self.shapes.push(shape);
                true
            }
            None => false,
        }
    }

    /// Drop the shape in progress without committing it.
    pub fn cancel_shape(&mut self) -> bool {
        self.in_progress.take().is_some()
    }

    /// Remove the most recently committed shape.
    pub fn undo(&mut self) -> Option<Shape> {
        self.shapes.pop()
    }

    /// Remove every committed shape.
    pub fn clear(&mut self) {
        self.shapes.clear();
    }

    /// Remove the topmost shape within tolerance of `(x, y)`.
    pub fn erase_at(&mut self, x: f64, y: f64) -> bool {
        let Some(index) = geometry::topmost_hit(&self.shapes, Point::new(x, y), self.tolerance)
        else {
            return false;
        };
        let removed = self.shapes.remove(index);
        tracing::debug!("Erased {} shape #{index}", removed.kind());
        true
    }

    /// Replace the committed list wholesale (used when loading).
    pub fn replace_all(&mut self, shapes: Vec<Shape>) {
        self.in_progress = None;
        self.shapes = shapes;
    }

    /// Committed shapes, oldest first.
    #[must_use]
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// The shape currently being drawn, if any.
    #[must_use]
    pub fn in_progress(&self) -> Option<&Shape> {
        self.in_progress.as_ref()
    }

    /// Whether a shape is being drawn.
    #[must_use]
    pub fn is_drawing(&self) -> bool {
        self.in_progress.is_some()
    }

    /// Number of committed shapes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Whether there are no committed shapes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Hit tolerance in canvas pixels.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

impl Default for ShapeModel {
    fn default() -> Self {
        Self::new()
    }
}
