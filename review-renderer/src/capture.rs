//! Commentary recording pipeline.
//!
//! Records the reviewed video with its annotation overlay, a facecam inset
//! and microphone audio into one file. Each frame, an offscreen compositor
//! draws the video, then the overlay canvas, then the facecam; a recorder
//! encodes the compositor's stream together with the microphone track.
//!
//! ```text
//!            start()                       stop() / teardown()
//!  Idle ───────────────► RequestingPermissions ──► Recording ──────────► Idle
//!   ▲                          │  any failure
//!   └──────────────────────────┘  (tracks acquired so far are stopped)
//! ```
//!
//! The pipeline owns every stream it acquires. Whatever path leaves
//! `Recording` (stop, teardown, drop) cancels the compositor frame and stops
//! all tracks; release failures are only logged.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use review_core::{EditorConfig, FacecamLayout, IntrinsicSize, SessionStore};
use serde::{Deserialize, Serialize};

use crate::render_loop::{FrameHandle, FrameScheduler};
use crate::{CaptureError, CaptureResult};

/// Aspect ratio assumed for a camera that has not reported its size yet.
const DEFAULT_CAMERA_ASPECT: f64 = 4.0 / 3.0;

/// Settings for the recording pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Preferred recorder MIME type.
    pub mime_type: String,
    /// Compositor frame rate.
    pub fps: u32,
    /// Facecam placement.
    pub facecam: FacecamLayout,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::from_editor(&EditorConfig::default())
    }
}

impl CaptureConfig {
    /// Derive capture settings from the editor configuration.
    #[must_use]
    pub fn from_editor(config: &EditorConfig) -> Self {
        Self {
            mime_type: config.recording_mime.clone(),
            fps: config.capture_fps,
            facecam: config.facecam,
        }
    }
}

/// Rectangle in compositor output pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// Where each layer goes in one composited frame.
///
/// The video and the annotation overlay both cover the whole output; the
/// facecam sits in the bottom-right corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeLayout {
    /// Output size, equal to the video's natural size.
    pub output: IntrinsicSize,
    /// Facecam inset, if it fits.
    pub facecam: Option<LayerRect>,
}

impl CompositeLayout {
    /// Compute the layout for a video and an optional camera frame size.
    ///
    /// The facecam keeps the camera's aspect ratio. It is omitted when the
    /// output has no size or the inset would not fit inside the margins.
    #[must_use]
    pub fn compute(
        video: IntrinsicSize,
        camera: Option<IntrinsicSize>,
        facecam: &FacecamLayout,
    ) -> Self {
        let out_w = f64::from(video.width);
        let out_h = f64::from(video.height);

        let aspect = camera
            .filter(|c| c.width > 0 && c.height > 0)
            .map_or(DEFAULT_CAMERA_ASPECT, |c| {
                f64::from(c.width) / f64::from(c.height)
            });
        let width = out_w * facecam.width_fraction;
        let height = width / aspect;
        let x = out_w - width - facecam.margin;
        let y = out_h - height - facecam.margin;

        let fits = width > 0.0 && height > 0.0 && x >= 0.0 && y >= 0.0;
        Self {
            output: video,
            facecam: fits.then_some(LayerRect {
                x,
                y,
                width,
                height,
            }),
        }
    }
}

/// One media track (audio or video).
pub trait MediaTrack {
    /// Track kind, `"audio"` or `"video"`.
    fn kind(&self) -> &str;

    /// Stop the track, releasing the device. Stopping twice is harmless.
    fn stop(&self);

    /// Whether the track is still producing media.
    fn is_live(&self) -> bool;
}

/// A set of media tracks from one source.
pub trait MediaStream {
    /// Tracks in this stream.
    fn tracks(&self) -> Vec<Rc<dyn MediaTrack>>;

    /// Video frame size, if the stream carries video and knows it.
    fn frame_size(&self) -> Option<IntrinsicSize>;

    /// Platform access for backends that need the concrete stream.
    fn as_any(&self) -> &dyn Any;

    /// Stop every track.
    fn stop_all(&self) {
        for track in self.tracks() {
            track.stop();
        }
    }

    /// Whether any track is still live.
    fn is_live(&self) -> bool {
        self.tracks().iter().any(|t| t.is_live())
    }
}

/// A finished recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMedia {
    /// Encoded bytes.
    pub bytes: Vec<u8>,
    /// MIME type reported by the recorder.
    pub mime_type: String,
}

impl RecordedMedia {
    /// File extension for the recorded container.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        let base = self.mime_type.split(';').next().unwrap_or_default().trim();
        match base {
            "video/mp4" | "audio/mp4" => "mp4",
            "video/x-matroska" => "mkv",
            "video/ogg" | "audio/ogg" => "ogg",
            _ => "webm",
        }
    }

    /// Store the recording under the session's video.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Upload`] if the storage write fails.
    pub async fn store(self, store: &SessionStore) -> CaptureResult<String> {
        let extension = self.extension();
        let key = store
            .save_recording(self.bytes, &self.mime_type, extension)
            .await?;
        Ok(key)
    }
}

/// An encoder consuming a composited stream.
#[async_trait(?Send)]
pub trait Recorder {
    /// Flush buffered data and return the finished file.
    async fn finish(&mut self) -> CaptureResult<RecordedMedia>;

    /// Stop without producing output.
    fn abort(&mut self);
}

/// Platform media services.
#[async_trait(?Send)]
pub trait MediaBackend {
    /// Ask for microphone access.
    async fn acquire_microphone(&self) -> CaptureResult<Rc<dyn MediaStream>>;

    /// Ask for camera access.
    async fn acquire_camera(&self) -> CaptureResult<Rc<dyn MediaStream>>;

    /// Start capturing the compositor output at `fps`.
    ///
    /// # Errors
    ///
    /// Returns an error if the compositor cannot be captured.
    fn composite_stream(&self, fps: u32) -> CaptureResult<Rc<dyn MediaStream>>;

    /// Draw one composited frame: video, overlay, then facecam.
    ///
    /// # Errors
    ///
    /// Returns an error if drawing fails.
    fn composite_frame(&self, layout: &CompositeLayout) -> CaptureResult<()>;

    /// Start encoding the composited video with the microphone audio.
    async fn start_recorder(
        &self,
        video: &Rc<dyn MediaStream>,
        audio: &Rc<dyn MediaStream>,
        mime_type: &str,
    ) -> CaptureResult<Box<dyn Recorder>>;

    /// The pipeline stopped `camera`; drop anything still showing it.
    fn camera_released(&self, _camera: &dyn MediaStream) {}
}

/// Pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureState {
    /// Nothing acquired.
    Idle,
    /// Waiting on device permission prompts.
    RequestingPermissions,
    /// Recording.
    Recording,
}

struct ActiveCapture {
    microphone: Rc<dyn MediaStream>,
    camera: Rc<dyn MediaStream>,
    composite: Rc<dyn MediaStream>,
    recorder: Box<dyn Recorder>,
}

impl ActiveCapture {
    fn release(&self, backend: &dyn MediaBackend) {
        self.microphone.stop_all();
        self.camera.stop_all();
        self.composite.stop_all();
        backend.camera_released(self.camera.as_ref());
    }
}

/// Streams obtained so far by one start attempt.
#[derive(Default)]
struct Acquired {
    streams: Vec<Rc<dyn MediaStream>>,
    camera: Option<Rc<dyn MediaStream>>,
}

impl Acquired {
    fn release(&self, backend: &dyn MediaBackend) {
        for stream in &self.streams {
            stream.stop_all();
        }
        if let Some(camera) = &self.camera {
            backend.camera_released(camera.as_ref());
        }
    }
}

/// Drives one commentary recording at a time.
///
/// Methods take `&self` so that a host can tear the pipeline down while a
/// `start` or `stop` is suspended on a device prompt or recorder flush.
pub struct CapturePipeline {
    backend: Rc<dyn MediaBackend>,
    scheduler: Box<dyn FrameScheduler>,
    config: CaptureConfig,
    state: Cell<CaptureState>,
    /// Bumped by every start and teardown; a start only installs its
    /// capture while it still holds the latest attempt.
    attempt: Cell<u64>,
    active: RefCell<Option<ActiveCapture>>,
    pending: Cell<Option<FrameHandle>>,
    frames: Cell<u64>,
}

impl CapturePipeline {
    /// Create an idle pipeline.
    #[must_use]
    pub fn new(
        backend: Rc<dyn MediaBackend>,
        scheduler: Box<dyn FrameScheduler>,
        config: CaptureConfig,
    ) -> Self {
        Self {
            backend,
            scheduler,
            config,
            state: Cell::new(CaptureState::Idle),
            attempt: Cell::new(0),
            active: RefCell::new(None),
            pending: Cell::new(None),
            frames: Cell::new(0),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CaptureState {
        self.state.get()
    }

    /// Whether a recording is in progress.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.state.get() == CaptureState::Recording
    }

    /// Outstanding compositor frame, if any.
    #[must_use]
    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending.get()
    }

    /// Frames composited in the current or last recording.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames.get()
    }

    /// Capture settings.
    #[must_use]
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Acquire microphone, camera and compositor stream, start the recorder
    /// and schedule the first composite frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline is not idle, a device is refused or
    /// missing, or the recorder cannot start. Everything acquired before the
    /// failure is released and the pipeline is idle again.
    pub async fn start(&self) -> CaptureResult<()> {
        let state = self.state.get();
        if state != CaptureState::Idle {
            return Err(CaptureError::InvalidState(format!(
                "cannot start while {state:?}"
            )));
        }
        let attempt = self.attempt.get() + 1;
        self.attempt.set(attempt);
        self.state.set(CaptureState::RequestingPermissions);
        self.frames.set(0);
        tracing::debug!("Capture attempt {attempt} requesting permissions");

        let mut acquired = Acquired::default();
        let mut active = match self.acquire(attempt, &mut acquired).await {
            Ok(active) => active,
            Err(e) => {
                acquired.release(self.backend.as_ref());
                if self.owns(attempt) {
                    self.state.set(CaptureState::Idle);
                }
                tracing::warn!("Capture attempt {attempt} failed to start: {e}");
                return Err(e);
            }
        };

        if !self.owns(attempt) {
            active.recorder.abort();
            active.release(self.backend.as_ref());
            return Err(Self::torn_down());
        }

        *self.active.borrow_mut() = Some(active);
        self.state.set(CaptureState::Recording);
        if let Err(e) = self.schedule() {
            self.teardown();
            return Err(e);
        }
        tracing::info!(
            "Recording started ({}, {} fps)",
            self.config.mime_type,
            self.config.fps
        );
        Ok(())
    }

    /// Compositor frame callback: draw one frame, then request the next.
    ///
    /// Does nothing unless recording. A failed composite is logged and the
    /// pipeline keeps recording.
    ///
    /// # Errors
    ///
    /// Returns the composite error, or a scheduling error.
    pub fn on_frame(&self, video_size: IntrinsicSize) -> CaptureResult<()> {
        self.pending.set(None);
        if !self.is_recording() {
            return Ok(());
        }

        let camera_size = self
            .active
            .borrow()
            .as_ref()
            .and_then(|a| a.camera.frame_size());
        let layout = CompositeLayout::compute(video_size, camera_size, &self.config.facecam);

        let drawn = self.backend.composite_frame(&layout);
        match &drawn {
            Ok(()) => {
                self.frames.set(self.frames.get() + 1);
                tracing::trace!("Composited frame {}", self.frames.get());
            }
            Err(e) => tracing::warn!("Composite frame failed: {e}"),
        }
        self.schedule()?;
        drawn
    }

    /// Stop recording and return the finished media.
    ///
    /// The frame loop is cancelled and every track is stopped before the
    /// recorder is flushed, so devices are released even if the flush
    /// stalls or fails.
    ///
    /// # Errors
    ///
    /// Returns an error if not recording or the recorder fails to finalize.
    pub async fn stop(&self) -> CaptureResult<RecordedMedia> {
        if !self.is_recording() {
            let state = self.state.get();
            return Err(CaptureError::InvalidState(format!(
                "cannot stop while {state:?}"
            )));
        }

        self.cancel_frame();
        let taken = self.active.borrow_mut().take();
        self.state.set(CaptureState::Idle);
        let Some(mut active) = taken else {
            return Err(CaptureError::InvalidState("no active recording".to_string()));
        };
        active.release(self.backend.as_ref());

        let finished = active.recorder.finish().await;
        match &finished {
            Ok(media) => tracing::info!(
                "Recording stopped: {} bytes of {} after {} frames",
                media.bytes.len(),
                media.mime_type,
                self.frames.get()
            ),
            Err(e) => tracing::warn!("Recording failed to finalize: {e}"),
        }
        finished
    }

    /// Force-stop: abort the recorder, stop every track and cancel the
    /// pending frame. A start still waiting on a prompt is abandoned and
    /// releases what it acquired when it resumes. Safe to call in any state.
    pub fn teardown(&self) {
        self.cancel_frame();
        self.attempt.set(self.attempt.get() + 1);
        let previous = self.state.replace(CaptureState::Idle);
        let taken = match self.active.try_borrow_mut() {
            Ok(mut active) => active.take(),
            Err(_) => {
                tracing::warn!("Capture teardown while pipeline busy");
                None
            }
        };

        if let Some(mut active) = taken {
            active.recorder.abort();
            active.release(self.backend.as_ref());
            tracing::info!("Recording aborted");
        } else if previous == CaptureState::RequestingPermissions {
            tracing::debug!("Capture torn down while requesting permissions");
        }
    }

    async fn acquire(
        &self,
        attempt: u64,
        acquired: &mut Acquired,
    ) -> CaptureResult<ActiveCapture> {
        let microphone = self.backend.acquire_microphone().await?;
        acquired.streams.push(Rc::clone(&microphone));
        self.ensure_starting(attempt)?;

        let camera = self.backend.acquire_camera().await?;
        acquired.streams.push(Rc::clone(&camera));
        acquired.camera = Some(Rc::clone(&camera));
        self.ensure_starting(attempt)?;

        let composite = self.backend.composite_stream(self.config.fps)?;
        acquired.streams.push(Rc::clone(&composite));

        let recorder = self
            .backend
            .start_recorder(&composite, &microphone, &self.config.mime_type)
            .await?;

        Ok(ActiveCapture {
            microphone,
            camera,
            composite,
            recorder,
        })
    }

    /// Whether `attempt` is still the live start request.
    fn owns(&self, attempt: u64) -> bool {
        self.attempt.get() == attempt && self.state.get() == CaptureState::RequestingPermissions
    }

    fn ensure_starting(&self, attempt: u64) -> CaptureResult<()> {
        if self.owns(attempt) {
            Ok(())
        } else {
            Err(Self::torn_down())
        }
    }
    fn torn_down() -> CaptureError {
        CaptureError::InvalidState("capture torn down while starting".to_string())
    }

    fn schedule(&self) -> CaptureResult<()> {
        let handle = self.scheduler.request_frame()?;
        self.pending.set(Some(handle));
        Ok(())
    }

    fn cancel_frame(&self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_frame(handle);
        }
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for CapturePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturePipeline")
            .field("state", &self.state.get())
            .field("attempt", &self.attempt.get())
            .field("pending", &self.pending.get())
            .field("frames", &self.frames.get())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn facecam_sits_bottom_right_with_camera_aspect() {
        let layout = CompositeLayout::compute(
            IntrinsicSize::new(1280, 720),
            Some(IntrinsicSize::new(640, 480)),
            &FacecamLayout::default(),
        );
        assert_eq!(layout.output, IntrinsicSize::new(1280, 720));

        let cam = layout.facecam.expect("should fit");
        assert!((cam.width - 320.0).abs() < EPSILON);
        assert!((cam.height - 240.0).abs() < EPSILON);
        assert!((cam.x - (1280.0 - 320.0 - 16.0)).abs() < EPSILON);
        assert!((cam.y - (720.0 - 240.0 - 16.0)).abs() < EPSILON);
    }

    #[test]
    fn widescreen_camera_keeps_its_aspect() {
        let layout = CompositeLayout::compute(
            IntrinsicSize::new(1000, 1000),
            Some(IntrinsicSize::new(1920, 1080)),
            &FacecamLayout::default(),
        );
        let cam = layout.facecam.expect("should fit");
        assert!((cam.width / cam.height - 1920.0 / 1080.0).abs() < EPSILON);
    }

    #[test]
    fn unknown_camera_size_uses_default_aspect() {
        let layout = CompositeLayout::compute(
            IntrinsicSize::new(800, 600),
            Some(IntrinsicSize::new(0, 0)),
            &FacecamLayout::default(),
        );
        let cam = layout.facecam.expect("should fit");
        assert!((cam.width / cam.height - DEFAULT_CAMERA_ASPECT).abs() < EPSILON);
    }

    #[test]
    fn facecam_omitted_when_output_too_small() {
        let empty =
            CompositeLayout::compute(IntrinsicSize::default(), None, &FacecamLayout::default());
        assert!(empty.facecam.is_none());

        // 5px inset cannot fit inside 16px margins
        let tiny =
            CompositeLayout::compute(IntrinsicSize::new(20, 20), None, &FacecamLayout::default());
        assert!(tiny.facecam.is_none());
    }

    #[test]
    fn extension_follows_mime_type() {
        let media = |mime: &str| RecordedMedia {
            bytes: Vec::new(),
            mime_type: mime.to_string(),
        };
        assert_eq!(media("video/webm").extension(), "webm");
        assert_eq!(media("video/webm;codecs=vp9,opus").extension(), "webm");
        assert_eq!(media("video/mp4").extension(), "mp4");
        assert_eq!(media("").extension(), "webm");
    }

    #[test]
    fn capture_config_follows_editor_config() {
        let editor = EditorConfig {
            capture_fps: 24,
            recording_mime: "video/mp4".to_string(),
            ..EditorConfig::default()
        };
        let config = CaptureConfig::from_editor(&editor);
        assert_eq!(config.fps, 24);
        assert_eq!(config.mime_type, "video/mp4");
        assert_eq!(CaptureConfig::default().fps, 30);
    }
}
