//! Editor session: one open video with its annotations.
//!
//! The session exclusively owns the shape model, view transform and input
//! state for the lifetime of the editor. Saves are whole-list snapshots;
//! loads treat missing or corrupt data as an empty annotation set.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::AppContext;
use crate::event::InputEvent;
use crate::haptics::Feedback;
use crate::interaction::{CanvasLayout, Command, InteractionController, Outcome};
use crate::persist::{decode_shapes_lenient, encode_shapes};
use crate::playback::{PlaybackController, PlaybackState, VideoSource};
use crate::shape::{Shape, ShapeModel, Tool};
use crate::storage::{annotation_key, recording_key, validate_video_id, ANNOTATION_CONTENT_TYPE};
use crate::view::ViewTransform;
use crate::ReviewResult;

/// Unique identifier for an editor session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new unique session ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage operations for one session's video.
///
/// Owns clones of everything a write needs, so hosts that keep the session
/// in a `RefCell` can release the borrow before awaiting storage.
#[derive(Debug, Clone)]
pub struct SessionStore {
    id: SessionId,
    video_id: String,
    ctx: AppContext,
}

impl SessionStore {
    /// Video the store writes for.
    #[must_use]
    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    /// Fetch and leniently decode the saved annotations.
    pub async fn load_annotations(&self) -> Vec<Shape> {
        let key = match annotation_key(&self.video_id) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Session {}: {e}", self.id);
                return Vec::new();
            }
        };
        match self.ctx.storage().get(&key).await {
            Ok(Some(bytes)) => decode_shapes_lenient(&bytes),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Session {}: annotation load failed: {e}", self.id);
                Vec::new()
            }
        }
    }

    /// Write `shapes` as the annotation snapshot, then fire the
    /// review-complete signal.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the storage write fails.
    pub async fn save_annotations(&self, shapes: &[Shape]) -> ReviewResult<()> {
        let key = annotation_key(&self.video_id)?;
        let json = encode_shapes(shapes)?;
        self.ctx
            .storage()
            .put(&key, json.into_bytes(), ANNOTATION_CONTENT_TYPE)
            .await?;
        tracing::info!("Session {} saved {} shapes", self.id, shapes.len());
        self.ctx.notifier().review_complete(&self.video_id);
        Ok(())
    }

    /// Write a finished recording. Returns its storage key.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub async fn save_recording(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        extension: &str,
    ) -> ReviewResult<String> {
        let key = recording_key(&self.video_id, extension)?;
        let size = bytes.len();
        self.ctx.storage().put(&key, bytes, mime_type).await?;
        tracing::info!("Session {} stored recording ({size} bytes) at {key}", self.id);
        Ok(key)
    }
}

/// An open editor for one video.
#[derive(Debug)]
pub struct EditorSession {
    id: SessionId,
    video_id: String,
    ctx: AppContext,
    shapes: ShapeModel,
    view: ViewTransform,
    controller: InteractionController,
    playback: PlaybackController,
    saved: Vec<Shape>,
}

impl EditorSession {
    /// Open a session for `video_id` with an empty shape list.
    ///
    /// # Errors
    ///
    /// Returns an error if the video id cannot be used as a storage key.
    pub fn open(ctx: AppContext, video_id: &str) -> ReviewResult<Self> {
        validate_video_id(video_id)?;
        let config = ctx.config();
        let session = Self {
            id: SessionId::new(),
            video_id: video_id.to_string(),
            shapes: ShapeModel::with_tolerance(config.hit_tolerance),
            view: ViewTransform::new(config.min_zoom, config.max_zoom),
            controller: InteractionController::new(config),
            playback: PlaybackController::new(config),
            saved: Vec::new(),
            ctx,
        };
        tracing::info!("Session {} opened for video {video_id}", session.id);
        Ok(session)
    }

    /// Load saved annotations, replacing the current list.
    ///
    /// Missing, unreadable or corrupt data loads as an empty list. Returns the
    /// number of shapes loaded.
    pub async fn load(&mut self) -> usize {
        let shapes = self.store().load_annotations().await;
        self.install_loaded(shapes)
    }

    /// Save the committed shape list as one snapshot.
    ///
    /// On success the review-complete signal is fired without waiting for
    /// it. No retry is attempted on failure.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the storage write fails.
    pub async fn save(&mut self) -> ReviewResult<()> {
        let snapshot = self.snapshot();
        self.store().save_annotations(&snapshot).await?;
        self.mark_saved(snapshot);
        Ok(())
    }

    /// Store a finished commentary recording.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub async fn save_recording(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        extension: &str,
    ) -> ReviewResult<String> {
        self.store().save_recording(bytes, mime_type, extension).await
    }

    /// Storage handle that outlives any borrow of the session.
    #[must_use]
    pub fn store(&self) -> SessionStore {
        SessionStore {
            id: self.id,
            video_id: self.video_id.clone(),
            ctx: self.ctx.clone(),
        }
    }

    /// Copy of the committed shape list, for a detached save.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Shape> {
        self.shapes.shapes().to_vec()
    }

    /// Record `snapshot` as the last saved state.
    pub fn mark_saved(&mut self, snapshot: Vec<Shape>) {
        self.saved = snapshot;
    }

    /// Replace the current list with loaded shapes. Returns how many.
    pub fn install_loaded(&mut self, shapes: Vec<Shape>) -> usize {
        let count = shapes.len();
        self.saved.clone_from(&shapes);
        self.shapes.replace_all(shapes);
        tracing::debug!("Session {} loaded {count} shapes", self.id);
        count
    }

    /// Route an input event, playing haptics and running editor commands.
    pub fn handle_input(
        &mut self,
        event: &InputEvent,
        layout: &CanvasLayout,
        video: &mut dyn VideoSource,
    ) -> Outcome {
        let outcome = self
            .controller
            .handle(event, layout, &mut self.shapes, &mut self.view);

        for feedback in &outcome.feedback {
            self.feedback(*feedback);
        }
        match outcome.command {
            Some(Command::StepFrame(direction)) => self.step_frame(video, direction),
            Some(Command::TogglePlay) => {
                self.playback.toggle_play(video);
            }
            None => {}
        }
        outcome
    }

    /// Step playback one frame and pulse the frame-step haptic.
    pub fn step_frame(&mut self, video: &mut dyn VideoSource, direction: i32) {
        let feedback = self.playback.step_frame(video, direction);
        self.feedback(feedback);
    }

    /// Toggle play/pause. Returns whether the video is now playing.
    pub fn toggle_play(&mut self, video: &mut dyn VideoSource) -> bool {
        self.playback.toggle_play(video)
    }

    /// Set the playback rate (clamped). Returns the applied rate.
    pub fn set_playback_rate(&mut self, video: &mut dyn VideoSource, rate: f64) -> f64 {
        self.playback.set_rate(video, rate)
    }

    /// Seek the video (clamped).
    pub fn seek(&mut self, video: &mut dyn VideoSource, time: f64) {
        self.playback.seek(video, time);
    }

    /// Refresh mirrored playback state.
    pub fn sync_playback(&mut self, video: &dyn VideoSource) -> PlaybackState {
        self.playback.sync(video)
    }

    /// Undo the last committed shape.
    pub fn undo(&mut self) -> bool {
        self.shapes.undo().is_some()
    }

    /// Remove all shapes.
    pub fn clear(&mut self) {
        self.shapes.clear();
    }

    /// Select the active tool.
    pub fn set_tool(&mut self, tool: Tool) {
        self.controller.set_tool(tool);
    }

    /// Switch between drawing and panning.
    pub fn set_draw_mode(&mut self, draw_mode: bool) {
        self.controller.set_draw_mode(draw_mode);
    }

    /// Zoom in one step.
    pub fn zoom_in(&mut self) -> f64 {
        self.view.zoom_by(self.ctx.config().zoom_step)
    }

    /// Zoom out one step.
    pub fn zoom_out(&mut self) -> f64 {
        self.view.zoom_by(-self.ctx.config().zoom_step)
    }

    /// Reset zoom and pan.
    pub fn reset_view(&mut self) {
        self.view.reset();
    }

    /// Whether the committed list differs from the last load or save.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.shapes.shapes() != self.saved.as_slice()
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Video this session annotates.
    #[must_use]
    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    /// Shape model (read-only).
    #[must_use]
    pub fn shapes(&self) -> &ShapeModel {
        &self.shapes
    }

    /// View transform.
    #[must_use]
    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    /// Interaction controller state.
    #[must_use]
    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    /// Shared application context.
    #[must_use]
    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    fn feedback(&self, feedback: Feedback) {
        let pattern = self.ctx.config().haptics.pattern_for(feedback);
        self.ctx.haptics().vibrate(pattern);
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        tracing::info!("Session {} closed", self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use async_trait::async_trait;

    use super::*;
    use crate::event::{TouchEvent, TouchPhase, TouchPoint};
    use crate::haptics::Haptics;
    use crate::mapper::{CanvasRect, IntrinsicSize};
    use crate::playback::tests::FakeVideo;
    use crate::storage::{BlobStorage, MemoryBlobStore, ReviewNotifier};
    use crate::{EditorConfig, ReviewError};

    #[derive(Default)]
    struct RecordingHaptics(RefCell<Vec<Vec<u32>>>);

    impl Haptics for RecordingHaptics {
        fn vibrate(&self, pattern: &[u32]) {
            self.0.borrow_mut().push(pattern.to_vec());
        }
    }

    /// Queues signals instead of delivering them, like a host whose
    /// notification request is still in flight.
    #[derive(Default)]
    struct QueuedNotifier {
        queued: RefCell<Vec<String>>,
    }

    impl ReviewNotifier for QueuedNotifier {
        fn review_complete(&self, video_id: &str) {
            self.queued.borrow_mut().push(video_id.to_string());
        }
    }

    struct FailingStore;

    #[async_trait(?Send)]
    impl BlobStorage for FailingStore {
        async fn put(&self, _key: &str, _bytes: Vec<u8>, _ct: &str) -> ReviewResult<()> {
            Err(ReviewError::Storage("offline".to_string()))
        }
        async fn get(&self, _key: &str) -> ReviewResult<Option<Vec<u8>>> {
            Err(ReviewError::Storage("offline".to_string()))
        }
    }

    fn layout() -> CanvasLayout {
        CanvasLayout::new(
            CanvasRect::new(0.0, 0.0, 640.0, 360.0),
            IntrinsicSize::new(640, 360),
        )
    }

    fn draw_line(
        session: &mut EditorSession,
        video: &mut FakeVideo,
        from: (f64, f64),
        to: (f64, f64),
    ) {
        session.set_tool(Tool::Line);
        let layout = layout();
        let events = [
            InputEvent::pointer(TouchPhase::Start, from.0, from.1),
            InputEvent::pointer(TouchPhase::Move, to.0, to.1),
            InputEvent::pointer(TouchPhase::End, to.0, to.1),
        ];
        for event in &events {
            session.handle_input(event, &layout, video);
        }
    }

    #[tokio::test]
    async fn draw_save_reload_scenario() {
        let store = Rc::new(MemoryBlobStore::new());
        let ctx = AppContext::new(store.clone());
        let mut video = FakeVideo::new(640, 360, 10.0);

        let mut session = EditorSession::open(ctx.clone(), "video-1").expect("open");
        draw_line(&mut session, &mut video, (10.0, 10.0), (100.0, 100.0));
        assert!(session.has_unsaved_changes());
        session.save().await.expect("save");
        assert!(!session.has_unsaved_changes());
        drop(session);

        let stored = store.blob("annotations/video-1.json").expect("blob written");
        assert_eq!(stored.content_type, "application/json");

        let mut reopened = EditorSession::open(ctx, "video-1").expect("open");
        assert_eq!(reopened.load().await, 1);
        assert_eq!(
            reopened.shapes().shapes(),
            &[Shape::line(10.0, 10.0, 100.0, 100.0)]
        );
    }

    #[tokio::test]
    async fn missing_or_corrupt_annotations_load_empty() {
        let store = Rc::new(MemoryBlobStore::new());
        let ctx = AppContext::new(store.clone());

        let mut session = EditorSession::open(ctx.clone(), "fresh").expect("open");
        assert_eq!(session.load().await, 0);

        store.insert("annotations/broken.json", "{{{not json", "application/json");
        let mut session = EditorSession::open(ctx, "broken").expect("open");
        assert_eq!(session.load().await, 0);
        assert!(session.shapes().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_on_load_is_empty_and_save_is_retryable() {
        let ctx = AppContext::new(Rc::new(FailingStore));
        let mut session = EditorSession::open(ctx, "v").expect("open");
        assert_eq!(session.load().await, 0);

        let mut video = FakeVideo::new(640, 360, 1.0);
        draw_line(&mut session, &mut video, (0.0, 0.0), (10.0, 10.0));
        let err = session.save().await.expect_err("save should fail");
        assert!(err.is_retryable());
        assert!(session.has_unsaved_changes());
        assert_eq!(session.shapes().len(), 1);
    }

    #[tokio::test]
    async fn save_completes_while_notification_is_outstanding() {
        let store = Rc::new(MemoryBlobStore::new());
        let notifier = Rc::new(QueuedNotifier::default());
        let ctx = AppContext::new(store.clone()).with_notifier(notifier.clone());

        let mut session = EditorSession::open(ctx, "v2").expect("open");
        session.save().await.expect("save should not wait on the notifier");
        assert_eq!(notifier.queued.borrow().as_slice(), &["v2".to_string()]);
        assert_eq!(
            store.blob("annotations/v2.json").map(|b| b.bytes),
            Some(b"[]".to_vec())
        );
    }

    #[tokio::test]
    async fn failed_save_sends_no_signal() {
        let notifier = Rc::new(QueuedNotifier::default());
        let ctx = AppContext::new(Rc::new(FailingStore)).with_notifier(notifier.clone());
        let mut session = EditorSession::open(ctx, "v").expect("open");
        assert!(session.save().await.is_err());
        assert!(notifier.queued.borrow().is_empty());
    }

    #[tokio::test]
    async fn detached_save_leaves_session_usable() {
        let store = Rc::new(MemoryBlobStore::new());
        let session = Rc::new(RefCell::new(
            EditorSession::open(AppContext::new(store.clone()), "shared").expect("open"),
        ));
        let mut video = FakeVideo::new(640, 360, 10.0);
        draw_line(&mut session.borrow_mut(), &mut video, (0.0, 0.0), (10.0, 10.0));

        let (writer, snapshot) = {
            let s = session.borrow();
            (s.store(), s.snapshot())
        };
        let pending = writer.save_annotations(&snapshot);

        // Input keeps flowing while the write is outstanding.
        draw_line(&mut session.borrow_mut(), &mut video, (20.0, 20.0), (30.0, 30.0));
        pending.await.expect("save");
        session.borrow_mut().mark_saved(snapshot);

        assert!(session.borrow().has_unsaved_changes());
        let saved = store.blob("annotations/shared.json").expect("written");
        assert_eq!(decode_shapes_lenient(&saved.bytes).len(), 1);
    }

    #[tokio::test]
    async fn recording_store_is_independent_of_session_lifetime() {
        let store = Rc::new(MemoryBlobStore::new());
        let session = EditorSession::open(AppContext::new(store.clone()), "v4").expect("open");
        let writer = session.store();
        drop(session);

        let key = writer
            .save_recording(vec![9], "video/mp4", "mp4")
            .await
            .expect("stored");
        assert_eq!(key, "recordings/v4.mp4");
        assert_eq!(writer.video_id(), "v4");
    }

    #[tokio::test]
    async fn recording_is_stored_under_video_key() {
        let store = Rc::new(MemoryBlobStore::new());
        let session = EditorSession::open(AppContext::new(store.clone()), "v3").expect("open");
        let key = session
            .save_recording(vec![1, 2, 3], "video/webm", "webm")
            .await
            .expect("stored");
        assert_eq!(key, "recordings/v3.webm");
        assert_eq!(store.blob(&key).map(|b| b.bytes), Some(vec![1, 2, 3]));
    }

    #[test]
    fn invalid_video_id_is_rejected() {
        let err = EditorSession::open(AppContext::in_memory(), "a/b").expect_err("invalid");
        assert!(matches!(err, ReviewError::InvalidVideoId(_)));
    }

    #[test]
    fn haptics_follow_interaction() {
        let haptics = Rc::new(RecordingHaptics::default());
        let ctx = AppContext::in_memory().with_haptics(haptics.clone());
        let mut session = EditorSession::open(ctx, "v").expect("open");
        let mut video = FakeVideo::new(640, 360, 10.0);

        draw_line(&mut session, &mut video, (10.0, 10.0), (50.0, 50.0));
        session.handle_input(&InputEvent::key("ArrowRight"), &layout(), &mut video);

        assert_eq!(
            haptics.0.borrow().as_slice(),
            &[vec![10u32], vec![15u32], vec![5u32]]
        );
        assert!((video.time - 1.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn space_toggles_playback() {
        let mut session = EditorSession::open(AppContext::in_memory(), "v").expect("open");
        let mut video = FakeVideo::new(640, 360, 10.0);
        session.handle_input(&InputEvent::key(" "), &layout(), &mut video);
        assert!(!video.paused);
    }

    #[test]
    fn config_flows_into_session() {
        let config = EditorConfig {
            hit_tolerance: 2.0,
            ..EditorConfig::default()
        };
        let ctx = AppContext::in_memory().with_config(config);
        let mut session = EditorSession::open(ctx, "v").expect("open");
        let mut video = FakeVideo::new(640, 360, 10.0);
        draw_line(&mut session, &mut video, (0.0, 0.0), (100.0, 0.0));

        session.set_tool(Tool::Eraser);
        let touch = InputEvent::Touch(TouchEvent::new(
            TouchPhase::Start,
            vec![TouchPoint::new(0, 50.0, 10.0)],
            0,
        ));
        session.handle_input(&touch, &layout(), &mut video);
        assert_eq!(session.shapes().len(), 1, "10px is outside a 2px tolerance");
    }

    #[test]
    fn zoom_buttons_step_and_clamp() {
        let mut session = EditorSession::open(AppContext::in_memory(), "v").expect("open");
        assert!((session.zoom_in() - 1.25).abs() < 1e-9);
        for _ in 0..20 {
            session.zoom_in();
        }
        assert!((session.view().zoom() - 3.0).abs() < 1e-9);
        session.reset_view();
        assert!(session.view().is_identity());
        for _ in 0..20 {
            session.zoom_out();
        }
        assert!((session.view().zoom() - 0.5).abs() < 1e-9);
    }
}
