//! Interaction and gesture controller.
//!
//! Unifies mouse and multi-touch input into draw, erase, pan and pinch-zoom
//! intents. The controller owns only its input state machine; the shape
//! model and view transform are passed in per event by the session that owns
//! them.
//!
//! ```text
//!            down (draw, pen/line)          up
//!   Idle ───────────────────────▶ Drawing ─────▶ Idle (+ commit)
//!    │ down (pan mode)               up
//!    ├────────────────────────▶ Panning ─────▶ Idle
//!    │ two touches                   up
//!    └────────────────────────▶ Gesturing ───▶ Idle
//! ```

use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::event::{InputEvent, KeyModifiers, PointerEvent, TouchEvent, TouchPhase};
use crate::haptics::Feedback;
use crate::mapper::{map_to_canvas, CanvasRect, IntrinsicSize};
use crate::shape::{ShapeModel, Tool};
use crate::view::ViewTransform;

/// Input state machine mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Nothing in progress (erase drags also stay here).
    #[default]
    Idle,
    /// A shape is being drawn.
    Drawing,
    /// Single-pointer pan.
    Panning,
    /// Two-finger pinch/pan.
    Gesturing,
}

/// Canvas geometry measured by the host at event time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CanvasLayout {
    /// Displayed bounding rectangle (viewport pixels).
    pub rect: CanvasRect,
    /// Intrinsic backing-store size.
    pub size: IntrinsicSize,
}

impl CanvasLayout {
    /// Create a layout.
    #[must_use]
    pub const fn new(rect: CanvasRect, size: IntrinsicSize) -> Self {
        Self { rect, size }
    }
}

/// Editor commands the controller cannot carry out on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Step playback by one frame in the given direction.
    StepFrame(i32),
    /// Toggle play/pause.
    TogglePlay,
}

/// What an input event produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    /// Haptic moments, in the order they happened.
    pub feedback: Vec<Feedback>,
    /// A command for the session to run.
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy)]
struct PanStart {
    pointer: (f64, f64),
    pan: (f64, f64),
}

#[derive(Debug, Clone, Copy)]
struct PinchStart {
    distance: f64,
    zoom: f64,
    pan: (f64, f64),
    /// Midpoint offset from the canvas centre, in unzoomed units.
    offset: (f64, f64),
}

/// Routes pointer, touch and key input to the shape model and view.
#[derive(Debug, Clone)]
pub struct InteractionController {
    mode: InputMode,
    draw_mode: bool,
    tool: Tool,
    erasing: bool,
    pan_start: Option<PanStart>,
    pinch: Option<PinchStart>,
    last_touch_start_ms: Option<u64>,
    /// The last release committed a tap that paints nothing.
    tap_committed: bool,
    double_tap_ms: u64,
    zoom_step: f64,
}

impl InteractionController {
    /// Create a controller in draw mode with the freehand tool.
    #[must_use]
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            mode: InputMode::Idle,
            draw_mode: true,
            tool: Tool::default(),
            erasing: false,
            pan_start: None,
            pinch: None,
            last_touch_start_ms: None,
            tap_committed: false,
            double_tap_ms: config.double_tap_ms,
            zoom_step: config.zoom_step,
        }
    }

    /// Current input mode.
    #[must_use]
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Whether single-pointer input draws (true) or pans (false).
    #[must_use]
    pub fn draw_mode(&self) -> bool {
        self.draw_mode
    }

    /// Switch between drawing and panning.
    pub fn set_draw_mode(&mut self, draw_mode: bool) {
        self.draw_mode = draw_mode;
    }

    /// Active tool.
    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Select a tool. Selecting a tool implies draw mode.
    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
        self.draw_mode = true;
    }

    /// Whether an erase drag is active.
    #[must_use]
    pub fn is_erasing(&self) -> bool {
        self.erasing
    }

    /// Process one input event.
    pub fn handle(
        &mut self,
        event: &InputEvent,
        layout: &CanvasLayout,
        shapes: &mut ShapeModel,
        view: &mut ViewTransform,
    ) -> Outcome {
        let mut out = Outcome::default();
        match event {
            InputEvent::Pointer(pointer) => {
                self.handle_pointer(pointer, layout, shapes, view, &mut out);
            }
            InputEvent::Touch(touch) => self.handle_touch(touch, layout, shapes, view, &mut out),
            InputEvent::Key { key, modifiers } => {
                self.handle_key(key, *modifiers, shapes, view, &mut out);
            }
        }
        out
    }

    fn handle_pointer(
        &mut self,
        pointer: &PointerEvent,
        layout: &CanvasLayout,
        shapes: &mut ShapeModel,
        view: &mut ViewTransform,
        out: &mut Outcome,
    ) {
        let pos = (pointer.x, pointer.y);
        match pointer.phase {
            TouchPhase::Start => self.press(pos, layout, shapes, view, out),
            TouchPhase::Move => self.drag(pos, layout, shapes, view, out),
            TouchPhase::End | TouchPhase::Cancel => self.release(shapes, out),
        }
    }

    fn handle_touch(
        &mut self,
        touch: &TouchEvent,
        layout: &CanvasLayout,
        shapes: &mut ShapeModel,
        view: &mut ViewTransform,
        out: &mut Outcome,
    ) {
        match touch.phase {
            TouchPhase::Start => {
                if touch.is_multi_touch() {
                    self.begin_pinch(touch, layout, shapes, view);
                    return;
                }
                let Some(primary) = touch.primary_touch() else {
                    return;
                };

                if let Some(last) = self.last_touch_start_ms {
                    if touch.timestamp_ms.saturating_sub(last) <= self.double_tap_ms
                        && touch.timestamp_ms >= last
                    {
                        self.last_touch_start_ms = None;
                        self.abort(shapes);
                        self.discard_tap(shapes);
                        self.draw_mode = !self.draw_mode;
                        tracing::debug!("Double tap: draw mode {}", self.draw_mode);
                        return;
                    }
                }
                self.last_touch_start_ms = Some(touch.timestamp_ms);
                self.press((primary.x, primary.y), layout, shapes, view, out);
            }
            TouchPhase::Move => {
                if self.mode == InputMode::Gesturing {
                    self.update_pinch(touch, view);
                } else if let Some(primary) = touch.primary_touch() {
                    self.drag((primary.x, primary.y), layout, shapes, view, out);
                }
            }
            TouchPhase::End | TouchPhase::Cancel => self.release(shapes, out),
        }
    }

    fn handle_key(
        &mut self,
        key: &str,
        modifiers: KeyModifiers,
        shapes: &mut ShapeModel,
        view: &mut ViewTransform,
        out: &mut Outcome,
    ) {
        self.tap_committed = false;
        match key {
            "z" | "Z" if modifiers.ctrl || modifiers.meta => {
                if self.mode != InputMode::Drawing {
                    shapes.undo();
                }
            }
            "ArrowLeft" => out.command = Some(Command::StepFrame(-1)),
            "ArrowRight" => out.command = Some(Command::StepFrame(1)),
            " " => out.command = Some(Command::TogglePlay),
            "d" => self.draw_mode = !self.draw_mode,
            "e" => self.set_tool(Tool::Eraser),
            "l" => self.set_tool(Tool::Line),
            "f" => self.set_tool(Tool::Freehand),
            "0" => view.reset(),
            "+" | "=" => {
                view.zoom_by(self.zoom_step);
            }
            "-" => {
                view.zoom_by(-self.zoom_step);
            }
            _ => {}
        }
    }

    fn press(
        &mut self,
        pos: (f64, f64),
        layout: &CanvasLayout,
        shapes: &mut ShapeModel,
        view: &ViewTransform,
        out: &mut Outcome,
    ) {
        self.tap_committed = false;
        if !self.draw_mode {
            self.mode = InputMode::Panning;
            self.pan_start = Some(PanStart {
                pointer: pos,
                pan: view.pan(),
            });
            return;
        }

        let p = map_to_canvas(pos.0, pos.1, &layout.rect, layout.size);
        if self.tool == Tool::Eraser {
            self.mode = InputMode::Idle;
            self.erasing = true;
            if shapes.erase_at(p.x, p.y) {
                out.feedback.push(Feedback::Erase);
            }
        } else {
            shapes.begin_shape(self.tool, p.x, p.y);
            self.mode = InputMode::Drawing;
            out.feedback.push(Feedback::DrawStart);
        }
    }

    fn drag(
        &mut self,
        pos: (f64, f64),
        layout: &CanvasLayout,
        shapes: &mut ShapeModel,
        view: &mut ViewTransform,
        out: &mut Outcome,
    ) {
        match self.mode {
            InputMode::Drawing => {
                let p = map_to_canvas(pos.0, pos.1, &layout.rect, layout.size);
                shapes.extend_shape(p.x, p.y);
            }
            InputMode::Panning => {
                if let Some(start) = self.pan_start {
                    let zoom = view.zoom();
                    view.set_pan(
                        start.pan.0 + (pos.0 - start.pointer.0) / zoom,
                        start.pan.1 + (pos.1 - start.pointer.1) / zoom,
                    );
                }
            }
            InputMode::Idle if self.erasing => {
                let p = map_to_canvas(pos.0, pos.1, &layout.rect, layout.size);
                if shapes.erase_at(p.x, p.y) {
                    out.feedback.push(Feedback::Erase);
                }
            }
            InputMode::Idle | InputMode::Gesturing => {}
        }
    }

    fn release(&mut self, shapes: &mut ShapeModel, out: &mut Outcome) {
        if self.mode == InputMode::Drawing && shapes.commit_shape() {
            out.feedback.push(Feedback::DrawCommit);
            self.tap_committed = shapes.shapes().last().is_some_and(|s| !s.is_renderable());
        }
        self.reset_gesture();
    }

    /// Drop the invisible shape the first tap of a double-tap committed.
    fn discard_tap(&mut self, shapes: &mut ShapeModel) {
        if std::mem::take(&mut self.tap_committed)
            && shapes.shapes().last().is_some_and(|s| !s.is_renderable())
        {
            shapes.undo();
            tracing::debug!("Discarded tap shape from double tap");
        }
    }

    fn begin_pinch(
        &mut self,
        touch: &TouchEvent,
        layout: &CanvasLayout,
        shapes: &mut ShapeModel,
        view: &ViewTransform,
    ) {
        let Some((distance, midpoint)) = touch.pinch_geometry() else {
            return;
        };
        self.abort(shapes);
        self.last_touch_start_ms = None;

        let zoom = view.zoom();
        let center = layout.rect.center();
        self.pinch = Some(PinchStart {
            distance,
            zoom,
            pan: view.pan(),
            offset: ((midpoint.0 - center.0) / zoom, (midpoint.1 - center.1) / zoom),
        });
        self.mode = InputMode::Gesturing;
        tracing::debug!("Pinch started at zoom {zoom}");
    }

    fn update_pinch(&mut self, touch: &TouchEvent, view: &mut ViewTransform) {
        let (Some(start), Some((distance, _))) = (self.pinch, touch.pinch_geometry()) else {
            return;
        };
        if start.distance <= 0.0 {
            return;
        }

        let new_zoom = view.clamp_zoom(start.zoom * (distance / start.distance));
        let factor = (new_zoom - start.zoom) / new_zoom;
        view.set_pan(
            start.pan.0 - start.offset.0 * factor,
            start.pan.1 - start.offset.1 * factor,
        );
        view.set_zoom(new_zoom);
    }

    /// Drop whatever gesture is pending without committing anything.
    fn abort(&mut self, shapes: &mut ShapeModel) {
        shapes.cancel_shape();
        self.reset_gesture();
    }

    fn reset_gesture(&mut self) {
        self.mode = InputMode::Idle;
        self.erasing = false;
        self.pan_start = None;
        self.pinch = None;
    }
}
