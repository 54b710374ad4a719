//! # Review Renderer
//!
//! Drawing engine and capture pipeline for the video review editor.
//!
//! ## Frame flow
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │          FrameScheduler (rAF, FIFO)          │
//! ├──────────────────────┬───────────────────────┤
//! │ RenderLoop           │ CapturePipeline       │
//! │ - Painter            │ - composite frame     │
//! │ - Surface (2D)       │ - MediaBackend        │
//! │                      │ - Recorder            │
//! └──────────────────────┴───────────────────────┘
//! ```
//!
//! The annotation loop paints the overlay every frame; while recording, the
//! capture loop composites video, overlay and facecam into the recorded
//! stream after the overlay has been painted.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod capture;
pub mod error;
pub mod painter;
pub mod render_loop;
pub mod surface;

pub use capture::{
    CaptureConfig, CapturePipeline, CaptureState, CompositeLayout, LayerRect, MediaBackend,
    MediaStream, MediaTrack, RecordedMedia, Recorder,
};
pub use error::{CaptureError, CaptureResult, RenderError, RenderResult};
pub use painter::Painter;
pub use render_loop::{FrameHandle, FrameScheduler, ManualScheduler, RenderLoop};
pub use surface::{CommandSurface, DrawCommand, Surface};
