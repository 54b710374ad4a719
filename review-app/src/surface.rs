//! Canvas 2D surface and `requestAnimationFrame` scheduling.

use std::cell::RefCell;
use std::rc::Rc;

use review_core::{CanvasLayout, CanvasRect, IntrinsicSize, StrokeStyle};
use review_renderer::{FrameHandle, FrameScheduler, RenderError, RenderResult, Surface};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, Window};

/// Annotation overlay canvas.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    /// Wrap a canvas element, acquiring its 2D context.
    ///
    /// # Errors
    ///
    /// Returns an error if the 2D context is not available.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")
            .map_err(|_| JsValue::from_str("Failed to get 2D context"))?
            .ok_or_else(|| JsValue::from_str("2D context not available"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| JsValue::from_str("Failed to cast to 2D context"))?;
        Ok(Self { canvas, ctx })
    }
}

/// Measure the canvas as it is displayed right now.
#[must_use]
pub fn measure_layout(canvas: &HtmlCanvasElement) -> CanvasLayout {
    let rect = canvas.get_bounding_client_rect();
    CanvasLayout::new(
        CanvasRect::new(rect.left(), rect.top(), rect.width(), rect.height()),
        IntrinsicSize::new(canvas.width(), canvas.height()),
    )
}

impl Surface for CanvasSurface {
    fn size(&self) -> IntrinsicSize {
        IntrinsicSize::new(self.canvas.width(), self.canvas.height())
    }

    fn set_size(&mut self, size: IntrinsicSize) -> RenderResult<()> {
        self.canvas.set_width(size.width);
        self.canvas.set_height(size.height);
        tracing::debug!("Overlay canvas resized to {}x{}", size.width, size.height);
        Ok(())
    }

    fn clear(&mut self) {
        self.ctx.clear_rect(
            0.0,
            0.0,
            f64::from(self.canvas.width()),
            f64::from(self.canvas.height()),
        );
    }

    fn apply_stroke_style(&mut self, style: &StrokeStyle) {
        self.ctx.set_stroke_style_str(&style.color);
        self.ctx.set_line_width(style.width);
        self.ctx.set_line_cap("round");
        self.ctx.set_line_join("round");
    }

    fn begin_path(&mut self) {
        self.ctx.begin_path();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.ctx.move_to(x, y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.ctx.line_to(x, y);
    }

    fn stroke(&mut self) {
        self.ctx.stroke();
    }
}

type FrameCallback = Closure<dyn FnMut(f64)>;

/// `requestAnimationFrame` scheduler.
///
/// Clones share the callback slot, so the callback can be installed after
/// the scheduler has been handed to a loop.
#[derive(Clone)]
pub struct AnimationFrameScheduler {
    window: Window,
    callback: Rc<RefCell<Option<FrameCallback>>>,
}

impl AnimationFrameScheduler {
    /// Create a scheduler with no callback installed.
    #[must_use]
    pub fn new(window: Window) -> Self {
        Self {
            window,
            callback: Rc::new(RefCell::new(None)),
        }
    }

    /// Install the per-frame callback.
    pub fn set_callback(&self, callback: impl FnMut(f64) + 'static) {
        let closure = Closure::wrap(Box::new(callback) as Box<dyn FnMut(f64)>);
        *self.callback.borrow_mut() = Some(closure);
    }
}

impl FrameScheduler for AnimationFrameScheduler {
    fn request_frame(&self) -> RenderResult<FrameHandle> {
        let callback = self.callback.borrow();
        let closure = callback
            .as_ref()
            .ok_or_else(|| RenderError::Scheduler("no frame callback installed".to_string()))?;
        let id = self
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref())
            .map_err(|e| RenderError::Scheduler(format!("{e:?}")))?;
        Ok(FrameHandle::new(id))
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        if let Err(e) = self.window.cancel_animation_frame(handle.id()) {
            tracing::warn!("cancelAnimationFrame failed: {e:?}");
        }
    }
}
