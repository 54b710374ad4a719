//! # Review Core
//!
//! Core logic for the coach video-review editor: an annotation overlay drawn
//! on top of a video, with touch and mouse input, zoom/pan and frame-accurate
//! playback control. Platform independent; hosts plug in storage, haptics and
//! the video element through traits.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               EditorSession                 │
//! ├─────────────────────────────────────────────┤
//! │  Interaction      │  Shape Model            │
//! │  - Mouse / touch  │  - Line / freehand      │
//! │  - Pinch / pan    │  - Hit-testing, erase   │
//! │  - Double tap     │  - Undo / clear         │
//! ├─────────────────────────────────────────────┤
//! │  Coordinate Map   │  Playback               │
//! │  - CSS → canvas   │  - Frame stepping       │
//! ├─────────────────────────────────────────────┤
//! │  AppContext: BlobStorage, ReviewNotifier,   │
//! │              Haptics, EditorConfig          │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod geometry;
pub mod haptics;
pub mod interaction;
pub mod mapper;
pub mod persist;
pub mod playback;
pub mod session;
pub mod shape;
pub mod storage;
pub mod view;

pub use config::{EditorConfig, FacecamLayout, HapticPatterns, StrokeStyle};
pub use context::AppContext;
pub use error::{ReviewError, ReviewResult};
pub use event::{InputEvent, KeyModifiers, PointerEvent, TouchEvent, TouchPhase, TouchPoint};
pub use haptics::{Feedback, Haptics, NoHaptics};
pub use interaction::{CanvasLayout, Command, InputMode, InteractionController, Outcome};
pub use mapper::{map_to_canvas, CanvasRect, IntrinsicSize};
pub use persist::{decode_shapes, decode_shapes_lenient, encode_shapes};
pub use playback::{PlaybackController, PlaybackState, VideoSource};
pub use session::{EditorSession, SessionId, SessionStore};
pub use shape::{Point, Shape, ShapeModel, Tool};
#[cfg(feature = "std")]
pub use storage::FsBlobStore;
pub use storage::{BlobStorage, MemoryBlobStore, NoopNotifier, ReviewNotifier};
pub use view::ViewTransform;

/// Review core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
