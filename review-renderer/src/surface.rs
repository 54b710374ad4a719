//! Drawing surfaces.
//!
//! [`Surface`] is the small slice of a Canvas 2D context the painter needs.
//! Browser hosts implement it over `CanvasRenderingContext2d`; headless hosts
//! and tests use [`CommandSurface`], which records what would be drawn.

use review_core::{IntrinsicSize, StrokeStyle};
use serde::{Deserialize, Serialize};

use crate::RenderResult;

/// Canvas-2D-like drawing target.
pub trait Surface {
    /// Current backing-store size.
    fn size(&self) -> IntrinsicSize;

    /// Resize the backing store. Resizing clears the surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be resized.
    fn set_size(&mut self, size: IntrinsicSize) -> RenderResult<()>;

    /// Clear the whole surface to transparent.
    fn clear(&mut self);

    /// Set color, width and round caps/joins for subsequent strokes.
    fn apply_stroke_style(&mut self, style: &StrokeStyle);

    /// Start a new path.
    fn begin_path(&mut self);

    /// Move the pen without drawing.
    fn move_to(&mut self, x: f64, y: f64);

    /// Add a segment to the current path.
    fn line_to(&mut self, x: f64, y: f64);

    /// Stroke the current path.
    fn stroke(&mut self);
}

/// A recorded drawing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DrawCommand {
    /// Backing store resized.
    Resize {
        /// New width.
        width: u32,
        /// New height.
        height: u32,
    },
    /// Surface cleared.
    Clear,
    /// Stroke style applied.
    StrokeStyle {
        /// CSS color.
        color: String,
        /// Line width.
        width: f64,
    },
    /// Path started.
    BeginPath,
    /// Pen moved.
    MoveTo {
        /// X.
        x: f64,
        /// Y.
        y: f64,
    },
    /// Segment added.
    LineTo {
        /// X.
        x: f64,
        /// Y.
        y: f64,
    },
    /// Path stroked.
    Stroke,
}

/// Headless surface that records draw calls.
#[derive(Debug, Default)]
pub struct CommandSurface {
    size: IntrinsicSize,
    commands: Vec<DrawCommand>,
}

impl CommandSurface {
    /// Create an empty surface with zero size.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a surface with an initial backing-store size.
    #[must_use]
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            size: IntrinsicSize::new(width, height),
            commands: Vec::new(),
        }
    }

    /// Commands recorded so far.
    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Take the recorded commands, leaving the log empty.
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of strokes recorded.
    #[must_use]
    pub fn stroke_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Stroke))
            .count()
    }

    /// Recorded commands as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> RenderResult<String> {
        serde_json::to_string(&self.commands)
            .map_err(|e| crate::RenderError::Frame(format!("command log: {e}")))
    }
}

impl Surface for CommandSurface {
    fn size(&self) -> IntrinsicSize {
        self.size
    }

    fn set_size(&mut self, size: IntrinsicSize) -> RenderResult<()> {
        self.size = size;
        self.commands.push(DrawCommand::Resize {
            width: size.width,
            height: size.height,
        });
        tracing::debug!("Command surface resized to {}x{}", size.width, size.height);
        Ok(())
    }

    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn apply_stroke_style(&mut self, style: &StrokeStyle) {
        self.commands.push(DrawCommand::StrokeStyle {
            color: style.color.clone(),
            width: style.width,
        });
    }

    fn begin_path(&mut self) {
        self.commands.push(DrawCommand::BeginPath);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.commands.push(DrawCommand::MoveTo { x, y });
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.commands.push(DrawCommand::LineTo { x, y });
    }

    fn stroke(&mut self) {
        self.commands.push(DrawCommand::Stroke);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let mut surface = CommandSurface::with_size(10, 10);
        surface.begin_path();
        surface.move_to(1.0, 2.0);
        surface.line_to(3.0, 4.0);
        surface.stroke();

        assert_eq!(
            surface.commands(),
            &[
                DrawCommand::BeginPath,
                DrawCommand::MoveTo { x: 1.0, y: 2.0 },
                DrawCommand::LineTo { x: 3.0, y: 4.0 },
                DrawCommand::Stroke,
            ]
        );
        assert_eq!(surface.stroke_count(), 1);
    }

    #[test]
    fn resize_updates_size() {
        let mut surface = CommandSurface::new();
        assert_eq!(surface.size(), IntrinsicSize::new(0, 0));
        surface
            .set_size(IntrinsicSize::new(1920, 1080))
            .expect("should resize");
        assert_eq!(surface.size(), IntrinsicSize::new(1920, 1080));
    }

    #[test]
    fn command_log_serializes() {
        let mut surface = CommandSurface::new();
        surface.clear();
        surface.move_to(1.0, 1.0);
        let json = surface.to_json().expect("should serialize");
        assert_eq!(json, r#"[{"op":"clear"},{"op":"moveTo","x":1.0,"y":1.0}]"#);

        assert_eq!(surface.take_commands().len(), 2);
        assert!(surface.commands().is_empty());
    }
}
