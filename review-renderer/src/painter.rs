//! Annotation painter.
//!
//! Paints the committed shapes followed by the in-progress shape with one
//! fixed stroke style. Nothing is cached between frames; every call clears
//! and repaints the whole overlay.

use review_core::{IntrinsicSize, Shape, ShapeModel, StrokeStyle};

use crate::surface::Surface;
use crate::RenderResult;

/// Paints a [`ShapeModel`] onto a [`Surface`].
#[derive(Debug, Clone, Default)]
pub struct Painter {
    style: StrokeStyle,
    frame_count: u64,
}

impl Painter {
    /// Create a painter using `style` for every shape.
    #[must_use]
    pub fn new(style: StrokeStyle) -> Self {
        Self {
            style,
            frame_count: 0,
        }
    }

    /// Stroke style in use.
    #[must_use]
    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    /// Number of frames painted.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Paint one frame.
    ///
    /// The surface is first resized to the video's natural size when that
    /// size is known (non-zero) and differs from the current backing store.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be resized.
    pub fn paint_frame(
        &mut self,
        surface: &mut dyn Surface,
        model: &ShapeModel,
        video_size: IntrinsicSize,
    ) -> RenderResult<()> {
        if video_size.width > 0 && video_size.height > 0 && surface.size() != video_size {
            surface.set_size(video_size)?;
        }

        surface.clear();
        surface.apply_stroke_style(&self.style);

        let mut painted = 0usize;
        for shape in model.shapes().iter().chain(model.in_progress()) {
            if Self::paint_shape(surface, shape) {
                painted += 1;
            }
        }

        self.frame_count += 1;
        tracing::trace!(
            "Painted frame {}: {painted} of {} shapes",
            self.frame_count,
            model.len() + usize::from(model.is_drawing())
        );
        Ok(())
    }

    /// Stroke a single shape. Returns false if it was skipped.
    fn paint_shape(surface: &mut dyn Surface, shape: &Shape) -> bool {
        if !shape.is_renderable() {
            return false;
        }

        surface.begin_path();
        match shape {
            Shape::Line { x1, y1, x2, y2 } => {
                surface.move_to(*x1, *y1);
                surface.line_to(*x2, *y2);
            }
            Shape::Freehand { points } => {
                let mut iter = points.iter();
                if let Some(first) = iter.next() {
                    surface.move_to(first.x, first.y);
                }
                for point in iter {
                    surface.line_to(point.x, point.y);
                }
            }
        }
        surface.stroke();
        true
    }
}
