//! # Review Editor WASM Application
//!
//! WASM bindings for the coach video-review editor: an annotation overlay
//! canvas on top of a `<video>` element, with commentary recording.
//!
//! ## Usage
//!
//! Build for WASM:
//! ```bash
//! wasm-pack build --target web review-app
//! ```
//!
//! Then import in JavaScript:
//! ```javascript
//! import init, { ReviewEditor } from './pkg/review_app.js';
//!
//! await init();
//! const editor = new ReviewEditor(
//!     'overlay', 'player', videoId,
//!     (key, bytes, type) => upload(key, bytes, type),
//!     (key) => download(key),
//!     (videoId) => markReviewed(videoId),
//! );
//! await editor.load();
//!
//! overlay.addEventListener('touchstart', (e) => editor.handleTouch(e));
//! overlay.addEventListener('mousedown', (e) => editor.handleMouse(e));
//! window.addEventListener('keydown', (e) => editor.handleKey(e));
//! overlay.style.transform = editor.cssTransform();
//! ```
//!
//! The annotation render loop starts in the constructor and runs until
//! `editor.free()`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod media;
pub mod platform;
pub mod surface;

use std::{cell::RefCell, rc::Rc};

use review_core::{
    AppContext, EditorConfig, EditorSession, InputEvent, KeyModifiers, NoopNotifier,
    ReviewNotifier, SessionStore, TouchEvent, TouchPhase, TouchPoint, Tool, VideoSource,
};
use review_renderer::{CaptureConfig, CapturePipeline, RenderLoop};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{HtmlCanvasElement, HtmlVideoElement};

use crate::media::WebMediaBackend;
use crate::platform::{HtmlVideoSource, JsBlobStorage, JsNotifier, NavigatorHaptics};
use crate::surface::{measure_layout, AnimationFrameScheduler, CanvasSurface};

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init_wasm() {
    console_error_panic_hook::set_once();
    tracing::info!("Review editor WASM initialized");
}

fn js_error(e: &impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn element_by_id<T: JsCast>(document: &web_sys::Document, id: &str) -> Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("Element '{id}' not found")))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("Element '{id}' has the wrong type")))
}

type SessionHandle = Rc<RefCell<EditorSession>>;

/// The video review editor.
#[wasm_bindgen]
pub struct ReviewEditor {
    session: SessionHandle,
    store: SessionStore,
    video: HtmlVideoSource,
    overlay: HtmlCanvasElement,
    render: Rc<RefCell<RenderLoop>>,
    capture: Rc<CapturePipeline>,
}

#[wasm_bindgen]
impl ReviewEditor {
    /// Open the editor for `video_id` on the given overlay canvas and video
    /// element.
    ///
    /// `put(key, bytes, contentType)` and `get(key)` are the storage
    /// callbacks; `notify(videoId)` is called after each successful save.
    /// `config_json` optionally overrides editor defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an element is missing, the video id is invalid or
    /// the config does not parse.
    #[wasm_bindgen(constructor)]
    pub fn new(
        canvas_id: &str,
        video_element_id: &str,
        video_id: &str,
        put: js_sys::Function,
        get: js_sys::Function,
        notify: Option<js_sys::Function>,
        config_json: Option<String>,
    ) -> Result<ReviewEditor, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window object"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("No document object"))?;

        let overlay: HtmlCanvasElement = element_by_id(&document, canvas_id)?;
        let video_element: HtmlVideoElement = element_by_id(&document, video_element_id)?;

        let config = match config_json {
            Some(json) => EditorConfig::from_json(&json).map_err(|e| js_error(&e))?,
            None => EditorConfig::default(),
        };
        let notifier: Rc<dyn ReviewNotifier> = match notify {
            Some(callback) => Rc::new(JsNotifier::new(callback)),
            None => Rc::new(NoopNotifier),
        };
        let ctx = AppContext::new(Rc::new(JsBlobStorage::new(put, get)))
            .with_notifier(notifier)
            .with_haptics(Rc::new(NavigatorHaptics::new(window.navigator())))
            .with_config(config.clone());

        let session = EditorSession::open(ctx, video_id).map_err(|e| js_error(&e))?;
        let store = session.store();
        let session = Rc::new(RefCell::new(session));
        let video = HtmlVideoSource::new(video_element.clone());

        // Annotation loop: started first so it paints before any capture
        // composite on the same tick.
        let render_scheduler = AnimationFrameScheduler::new(window.clone());
        let render = Rc::new(RefCell::new(RenderLoop::new(
            Box::new(render_scheduler.clone()),
            config.stroke.clone(),
        )));
        {
            let render = Rc::downgrade(&render);
            let session = Rc::clone(&session);
            let video = video.clone();
            let mut surface = CanvasSurface::new(overlay.clone())?;
            render_scheduler.set_callback(move |_timestamp| {
                let Some(render) = render.upgrade() else {
                    return;
                };
                let Ok(mut render) = render.try_borrow_mut() else {
                    return;
                };
                let result = match session.try_borrow() {
                    Ok(session) => {
                        render.on_frame(&mut surface, session.shapes(), video.natural_size())
                    }
                    Err(_) => render.skip_frame(),
                };
                if let Err(e) = result {
                    tracing::warn!("Annotation frame: {e}");
                }
            });
        }
        render.borrow_mut().start().map_err(|e| js_error(&e))?;

        let backend = WebMediaBackend::new(
            window.navigator(),
            document,
            video_element,
            overlay.clone(),
        )?;
        let capture_scheduler = AnimationFrameScheduler::new(window);
        let capture = Rc::new(CapturePipeline::new(
            Rc::new(backend),
            Box::new(capture_scheduler.clone()),
            CaptureConfig::from_editor(&config),
        ));
        {
            let capture = Rc::downgrade(&capture);
            let video = video.clone();
            capture_scheduler.set_callback(move |_timestamp| {
                if let Some(capture) = capture.upgrade() {
                    if let Err(e) = capture.on_frame(video.natural_size()) {
                        tracing::warn!("Capture frame: {e}");
                    }
                }
            });
        }

        Ok(Self {
            session,
            store,
            video,
            overlay,
            render,
            capture,
        })
    }

    /// Load saved annotations. Resolves to the number of shapes loaded.
    #[must_use]
    pub fn load(&self) -> js_sys::Promise {
        let session = Rc::clone(&self.session);
        let store = self.store.clone();
        future_to_promise(async move {
            let shapes = store.load_annotations().await;
            let count = session
                .try_borrow_mut()
                .map_err(|_| JsValue::from_str("Editor is busy"))?
                .install_loaded(shapes);
            #[allow(clippy::cast_precision_loss)]
            Ok(JsValue::from_f64(count as f64))
        })
    }

    /// Save the annotation list as it is now. Editing continues while the
    /// upload is in flight.
    #[must_use]
    pub fn save(&self) -> js_sys::Promise {
        let snapshot = match self.session.try_borrow() {
            Ok(session) => session.snapshot(),
            Err(_) => return js_sys::Promise::reject(&JsValue::from_str("Editor is busy")),
        };
        let session = Rc::clone(&self.session);
        let store = self.store.clone();
        future_to_promise(async move {
            store
                .save_annotations(&snapshot)
                .await
                .map_err(|e| js_error(&e))?;
            match session.try_borrow_mut() {
                Ok(mut session) => session.mark_saved(snapshot),
                Err(_) => tracing::debug!("Saved snapshot not recorded; editor busy"),
            }
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Handle a DOM touch event on the overlay.
    #[wasm_bindgen(js_name = handleTouch)]
    pub fn handle_touch(&mut self, event: &web_sys::TouchEvent) {
        let Some(phase) = TouchPhase::from_event_type(&event.type_()) else {
            return;
        };
        let list = event.touches();
        let touches = (0..list.length())
            .filter_map(|i| list.get(i))
            .map(|t| {
                TouchPoint::new(
                    t.identifier().unsigned_abs(),
                    f64::from(t.client_x()),
                    f64::from(t.client_y()),
                )
            })
            .collect();

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let timestamp_ms = event.time_stamp().max(0.0) as u64;

        event.prevent_default();
        self.dispatch(&InputEvent::Touch(TouchEvent::new(phase, touches, timestamp_ms)));
    }

    /// Handle a DOM mouse event on the overlay.
    #[wasm_bindgen(js_name = handleMouse)]
    pub fn handle_mouse(&mut self, event: &web_sys::MouseEvent) {
        let Some(phase) = TouchPhase::from_event_type(&event.type_()) else {
            return;
        };
        self.dispatch(&InputEvent::pointer(
            phase,
            f64::from(event.client_x()),
            f64::from(event.client_y()),
        ));
    }

    /// Handle a DOM keydown event.
    #[wasm_bindgen(js_name = handleKey)]
    pub fn handle_key(&mut self, event: &web_sys::KeyboardEvent) {
        let key = event.key();
        if key == " " || key.starts_with("Arrow") {
            event.prevent_default();
        }
        self.dispatch(&InputEvent::Key {
            key,
            modifiers: KeyModifiers {
                shift: event.shift_key(),
                ctrl: event.ctrl_key(),
                alt: event.alt_key(),
                meta: event.meta_key(),
            },
        });
    }

    /// Select a tool: `"line"`, `"freehand"` or `"eraser"`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown tool names.
    #[wasm_bindgen(js_name = setTool)]
    pub fn set_tool(&mut self, name: &str) -> Result<(), JsValue> {
        let tool = Tool::from_name(name)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown tool '{name}'")))?;
        self.with_session(|s| s.set_tool(tool));
        Ok(())
    }

    /// Switch between drawing (`true`) and panning (`false`).
    #[wasm_bindgen(js_name = setDrawMode)]
    pub fn set_draw_mode(&mut self, draw_mode: bool) {
        self.with_session(|s| s.set_draw_mode(draw_mode));
    }

    /// Whether pointer input draws.
    #[wasm_bindgen(js_name = drawMode)]
    #[must_use]
    pub fn draw_mode(&self) -> bool {
        self.session
            .try_borrow()
            .map(|s| s.controller().draw_mode())
            .unwrap_or(true)
    }

    /// Undo the last shape.
    pub fn undo(&mut self) -> bool {
        self.with_session(EditorSession::undo).unwrap_or(false)
    }

    /// Remove every shape.
    pub fn clear(&mut self) {
        self.with_session(EditorSession::clear);
    }

    /// Zoom in one step. Returns the new zoom.
    #[wasm_bindgen(js_name = zoomIn)]
    pub fn zoom_in(&mut self) -> f64 {
        self.with_session(EditorSession::zoom_in).unwrap_or(1.0)
    }

    /// Zoom out one step. Returns the new zoom.
    #[wasm_bindgen(js_name = zoomOut)]
    pub fn zoom_out(&mut self) -> f64 {
        self.with_session(EditorSession::zoom_out).unwrap_or(1.0)
    }

    /// Reset zoom and pan.
    #[wasm_bindgen(js_name = resetView)]
    pub fn reset_view(&mut self) {
        self.with_session(EditorSession::reset_view);
    }

    /// CSS transform to apply to the video container.
    #[wasm_bindgen(js_name = cssTransform)]
    #[must_use]
    pub fn css_transform(&self) -> String {
        self.session.try_borrow().map_or_else(
            |_| "none".to_string(),
            |s| {
                let view = s.view();
                let (x, y) = view.pan();
                format!("scale({}) translate({x}px, {y}px)", view.zoom())
            },
        )
    }

    /// Step one frame backwards (`-1`) or forwards (`1`).
    #[wasm_bindgen(js_name = stepFrame)]
    pub fn step_frame(&mut self, direction: i32) {
        let mut video = self.video.clone();
        self.with_session(|s| s.step_frame(&mut video, direction));
    }

    /// Toggle play/pause. Returns whether the video is now playing.
    #[wasm_bindgen(js_name = togglePlay)]
    pub fn toggle_play(&mut self) -> bool {
        let mut video = self.video.clone();
        self.with_session(|s| s.toggle_play(&mut video))
            .unwrap_or(false)
    }

    /// Set the playback rate. Returns the applied (clamped) rate.
    #[wasm_bindgen(js_name = setPlaybackRate)]
    pub fn set_playback_rate(&mut self, rate: f64) -> f64 {
        let mut video = self.video.clone();
        self.with_session(|s| s.set_playback_rate(&mut video, rate))
            .unwrap_or_else(|| video.playback_rate())
    }

    /// Seek to `time` seconds (clamped to the video).
    pub fn seek(&mut self, time: f64) {
        let mut video = self.video.clone();
        self.with_session(|s| s.seek(&mut video, time));
    }

    /// Playback state as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the editor is busy.
    #[wasm_bindgen(js_name = playbackState)]
    pub fn playback_state(&mut self) -> Result<String, JsValue> {
        let video = self.video.clone();
        let state = self
            .with_session(|s| s.sync_playback(&video))
            .ok_or_else(|| JsValue::from_str("Editor is busy"))?;
        serde_json::to_string(&state).map_err(|e| js_error(&e))
    }

    /// Number of committed shapes.
    #[wasm_bindgen(js_name = shapeCount)]
    #[must_use]
    pub fn shape_count(&self) -> usize {
        self.session.try_borrow().map_or(0, |s| s.shapes().len())
    }

    /// Committed shapes in the persisted JSON format.
    ///
    /// # Errors
    ///
    /// Returns an error if the editor is busy or encoding fails.
    #[wasm_bindgen(js_name = shapesJson)]
    pub fn shapes_json(&self) -> Result<String, JsValue> {
        let session = self
            .session
            .try_borrow()
            .map_err(|_| JsValue::from_str("Editor is busy"))?;
        review_core::encode_shapes(session.shapes().shapes()).map_err(|e| js_error(&e))
    }

    /// Whether there are changes since the last load or save.
    #[wasm_bindgen(js_name = hasUnsavedChanges)]
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.session
            .try_borrow()
            .map(|s| s.has_unsaved_changes())
            .unwrap_or(false)
    }

    /// Start recording commentary. Rejects with a readable message if a
    /// device is refused or unavailable.
    #[wasm_bindgen(js_name = startRecording)]
    #[must_use]
    pub fn start_recording(&self) -> js_sys::Promise {
        let capture = Rc::clone(&self.capture);
        future_to_promise(async move {
            capture.start().await.map_err(|e| js_error(&e))?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Stop recording and store the file. Resolves to the storage key.
    #[wasm_bindgen(js_name = stopRecording)]
    #[must_use]
    pub fn stop_recording(&self) -> js_sys::Promise {
        let capture = Rc::clone(&self.capture);
        let store = self.store.clone();
        future_to_promise(async move {
            let media = capture.stop().await.map_err(|e| js_error(&e))?;
            let key = media.store(&store).await.map_err(|e| js_error(&e))?;
            Ok(JsValue::from_str(&key))
        })
    }

    /// Abandon the current recording, releasing every device.
    #[wasm_bindgen(js_name = cancelRecording)]
    pub fn cancel_recording(&self) {
        self.capture.teardown();
    }

    /// Recording state: `"idle"`, `"requestingPermissions"` or `"recording"`.
    #[wasm_bindgen(js_name = recordingState)]
    #[must_use]
    pub fn recording_state(&self) -> String {
        serde_json::to_value(self.capture.state())
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// Annotation frames painted so far.
    #[wasm_bindgen(js_name = frameCount)]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.render.try_borrow().map_or(0, |r| r.frame_count())
    }
}

impl ReviewEditor {
    /// Route one input event through the session with a fresh layout.
    fn dispatch(&mut self, event: &InputEvent) {
        let layout = measure_layout(&self.overlay);
        let mut video = self.video.clone();
        if self
            .with_session(|s| s.handle_input(event, &layout, &mut video))
            .is_none()
        {
            tracing::debug!("Input dropped while the editor is busy");
        }
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut EditorSession) -> R) -> Option<R> {
        self.session.try_borrow_mut().ok().map(|mut s| f(&mut s))
    }
}

impl Drop for ReviewEditor {
    fn drop(&mut self) {
        self.capture.teardown();
        if let Ok(mut render) = self.render.try_borrow_mut() {
            render.stop();
        }
    }
}
