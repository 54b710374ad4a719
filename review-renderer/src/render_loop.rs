//! Continuous annotation render loop.
//!
//! The loop repaints the overlay on every display frame for as long as the
//! editor is mounted, whether or not the video is playing or anything
//! changed. Hosts supply a [`FrameScheduler`] (`requestAnimationFrame` in
//! browsers) and call [`RenderLoop::on_frame`] from the frame callback.
//!
//! Schedulers are expected to fire callbacks in request order. The capture
//! pipeline relies on this: the annotation loop is started before any
//! recording loop, so the overlay is painted before it is composited.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use review_core::{IntrinsicSize, ShapeModel, StrokeStyle};

use crate::painter::Painter;
use crate::surface::Surface;
use crate::RenderResult;

/// Handle for a requested frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(i32);

impl FrameHandle {
    /// Wrap a platform frame id.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Platform frame id.
    #[must_use]
    pub const fn id(self) -> i32 {
        self.0
    }
}

/// Requests and cancels per-frame callbacks.
pub trait FrameScheduler {
    /// Request a callback on the next display frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform refuses the request.
    fn request_frame(&self) -> RenderResult<FrameHandle>;

    /// Cancel a previously requested callback. Unknown handles are ignored.
    fn cancel_frame(&self, handle: FrameHandle);
}

#[derive(Debug, Default)]
struct ManualQueue {
    next_id: i32,
    pending: VecDeque<FrameHandle>,
    requested: usize,
    cancelled: usize,
}

/// Scheduler driven by the host instead of a display clock.
///
/// Clones share one FIFO queue, so several loops can be stepped in the order
/// they requested frames.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    queue: Rc<RefCell<ManualQueue>>,
}

impl ManualScheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the oldest outstanding request.
    #[must_use]
    pub fn next_due(&self) -> Option<FrameHandle> {
        self.queue.borrow_mut().pending.pop_front()
    }

    /// Outstanding requests in firing order.
    #[must_use]
    pub fn pending(&self) -> Vec<FrameHandle> {
        self.queue.borrow().pending.iter().copied().collect()
    }

    /// Whether no request is outstanding.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queue.borrow().pending.is_empty()
    }

    /// Total requests made.
    #[must_use]
    pub fn requested_count(&self) -> usize {
        self.queue.borrow().requested
    }

    /// Total cancellations made.
    #[must_use]
    pub fn cancelled_count(&self) -> usize {
        self.queue.borrow().cancelled
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&self) -> RenderResult<FrameHandle> {
        let mut queue = self.queue.borrow_mut();
        queue.next_id += 1;
        queue.requested += 1;
        let handle = FrameHandle(queue.next_id);
        queue.pending.push_back(handle);
        Ok(handle)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        let mut queue = self.queue.borrow_mut();
        queue.pending.retain(|h| *h != handle);
        queue.cancelled += 1;
    }
}

/// Repaints the annotation overlay once per frame.
///
/// Dropping the loop cancels its outstanding frame.
pub struct RenderLoop {
    scheduler: Box<dyn FrameScheduler>,
    painter: Painter,
    pending: Option<FrameHandle>,
    running: bool,
}

impl RenderLoop {
    /// Create a stopped loop.
    #[must_use]
    pub fn new(scheduler: Box<dyn FrameScheduler>, style: StrokeStyle) -> Self {
        Self {
            scheduler,
            painter: Painter::new(style),
            pending: None,
            running: false,
        }
    }

    /// Start the loop by requesting the first frame. No-op if running.
    ///
    /// # Errors
    ///
    /// Returns an error if the first frame cannot be scheduled.
    pub fn start(&mut self) -> RenderResult<()> {
        if self.running {
            return Ok(());
        }
        self.running = true;
        tracing::debug!("Annotation render loop started");
        self.schedule()
    }

    /// Frame callback: paint, then request the next frame.
    ///
    /// A failed paint is logged and the loop keeps running.
    ///
    /// # Errors
    ///
    /// Returns the paint error, or a scheduling error.
    pub fn on_frame(
        &mut self,
        surface: &mut dyn Surface,
        model: &ShapeModel,
        video_size: IntrinsicSize,
    ) -> RenderResult<()> {
        self.pending = None;
        if !self.running {
            return Ok(());
        }

        let painted = self.painter.paint_frame(surface, model, video_size);
        if let Err(e) = &painted {
            tracing::warn!("Annotation frame failed: {e}");
        }
        self.schedule()?;
        painted
    }

    /// Frame callback for a tick where the model is locked by another
    /// borrow: keep the previous frame and request the next one.
    ///
    /// # Errors
    ///
    /// Returns a scheduling error.
    pub fn skip_frame(&mut self) -> RenderResult<()> {
        self.pending = None;
        if !self.running {
            return Ok(());
        }
        tracing::trace!("Annotation frame skipped");
        self.schedule()
    }

    /// Stop the loop and cancel the outstanding frame.
    pub fn stop(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_frame(handle);
        }
        if self.running {
            self.running = false;
            tracing::debug!(
                "Annotation render loop stopped after {} frames",
                self.painter.frame_count()
            );
        }
    }

    /// Whether the loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Outstanding frame request, if any.
    #[must_use]
    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending
    }

    /// Frames painted so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.painter.frame_count()
    }

    fn schedule(&mut self) -> RenderResult<()> {
        match self.scheduler.request_frame() {
            Ok(handle) => {
                self.pending = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running = false;
                Err(e)
            }
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for RenderLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderLoop")
            .field("pending", &self.pending)
            .field("running", &self.running)
            .field("frames", &self.painter.frame_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::CommandSurface;
    use crate::RenderError;

    struct FailingScheduler;

    impl FrameScheduler for FailingScheduler {
        fn request_frame(&self) -> RenderResult<FrameHandle> {
            Err(RenderError::Scheduler("no window".to_string()))
        }

        fn cancel_frame(&self, _handle: FrameHandle) {}
    }

    #[test]
    fn runs_continuously_until_stopped() {
        let scheduler = ManualScheduler::new();
        let mut render = RenderLoop::new(Box::new(scheduler.clone()), StrokeStyle::default());
        let mut surface = CommandSurface::new();
        let model = ShapeModel::new();

        render.start().expect("should start");
        for _ in 0..3 {
            let due = scheduler.next_due().expect("frame requested");
            assert_eq!(render.pending_frame(), Some(due));
            render
                .on_frame(&mut surface, &model, IntrinsicSize::new(64, 64))
                .expect("should paint");
        }
        assert_eq!(render.frame_count(), 3);
        assert_eq!(scheduler.pending().len(), 1);

        render.stop();
        assert!(scheduler.is_idle());
        assert!(!render.is_running());
    }

    #[test]
    fn start_is_idempotent() {
        let scheduler = ManualScheduler::new();
        let mut render = RenderLoop::new(Box::new(scheduler.clone()), StrokeStyle::default());
        render.start().expect("should start");
        render.start().expect("should start");
        assert_eq!(scheduler.requested_count(), 1);
    }

    #[test]
    fn drop_cancels_outstanding_frame() {
        let scheduler = ManualScheduler::new();
        {
            let mut render =
                RenderLoop::new(Box::new(scheduler.clone()), StrokeStyle::default());
            render.start().expect("should start");
            assert!(!scheduler.is_idle());
        }
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.cancelled_count(), 1);
    }

    #[test]
    fn late_callback_after_stop_does_nothing() {
        let scheduler = ManualScheduler::new();
        let mut render = RenderLoop::new(Box::new(scheduler.clone()), StrokeStyle::default());
        let mut surface = CommandSurface::new();
        render.start().expect("should start");
        render.stop();

        render
            .on_frame(&mut surface, &ShapeModel::new(), IntrinsicSize::new(8, 8))
            .expect("should ignore");
        assert!(surface.commands().is_empty());
        assert!(scheduler.is_idle());
    }

    #[test]
    fn skipped_frame_keeps_loop_alive() {
        let scheduler = ManualScheduler::new();
        let mut render = RenderLoop::new(Box::new(scheduler.clone()), StrokeStyle::default());
        render.start().expect("should start");

        let _ = scheduler.next_due();
        render.skip_frame().expect("should reschedule");
        assert_eq!(render.frame_count(), 0);
        assert_eq!(scheduler.pending().len(), 1);
        assert_eq!(render.pending_frame(), scheduler.pending().first().copied());
    }

    #[test]
    fn scheduler_failure_stops_loop() {
        let mut render = RenderLoop::new(Box::new(FailingScheduler), StrokeStyle::default());
        assert!(matches!(render.start(), Err(RenderError::Scheduler(_))));
        assert!(!render.is_running());
    }
}
