//! Browser media capture: `getUserMedia`, an offscreen compositor canvas
//! and `MediaRecorder`.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use review_core::IntrinsicSize;
use review_renderer::{
    CaptureError, CaptureResult, CompositeLayout, MediaBackend, MediaStream, MediaTrack,
    RecordedMedia, Recorder,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    BlobEvent, BlobPropertyBag, CanvasRenderingContext2d, Document, HtmlCanvasElement,
    HtmlVideoElement, MediaRecorder, MediaRecorderOptions, MediaStreamConstraints,
    MediaStreamTrack, MediaStreamTrackState, Navigator, RecordingState,
};

/// Fallback container when the configured MIME type is unsupported.
const FALLBACK_MIME: &str = "video/webm";

fn js_message(e: &JsValue) -> String {
    js_sys::Reflect::get(e, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .or_else(|| e.as_string())
        .unwrap_or_else(|| format!("{e:?}"))
}

/// Map a `getUserMedia` rejection to a capture error.
fn device_error(e: &JsValue, device: &str) -> CaptureError {
    let name = js_sys::Reflect::get(e, &JsValue::from_str("name"))
        .ok()
        .and_then(|n| n.as_string())
        .unwrap_or_default();
    match name.as_str() {
        "NotAllowedError" | "SecurityError" => CaptureError::permission_denied(device),
        _ => CaptureError::DeviceUnavailable(format!("{device}: {}", js_message(e))),
    }
}

/// One `MediaStreamTrack`.
pub struct WebTrack {
    track: MediaStreamTrack,
    kind: String,
}

impl MediaTrack for WebTrack {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn stop(&self) {
        self.track.stop();
    }

    fn is_live(&self) -> bool {
        self.track.ready_state() == MediaStreamTrackState::Live
    }
}

/// A browser `MediaStream`.
pub struct WebStream {
    stream: web_sys::MediaStream,
}

impl WebStream {
    /// The underlying stream.
    #[must_use]
    pub fn stream(&self) -> &web_sys::MediaStream {
        &self.stream
    }

    fn raw_tracks(&self) -> Vec<MediaStreamTrack> {
        self.stream
            .get_tracks()
            .iter()
            .filter_map(|t| t.dyn_into::<MediaStreamTrack>().ok())
            .collect()
    }
}

impl MediaStream for WebStream {
    fn tracks(&self) -> Vec<Rc<dyn MediaTrack>> {
        self.raw_tracks()
            .into_iter()
            .map(|track| {
                let kind = track.kind();
                Rc::new(WebTrack { track, kind }) as Rc<dyn MediaTrack>
            })
            .collect()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn frame_size(&self) -> Option<IntrinsicSize> {
        let track = self.raw_tracks().into_iter().find(|t| t.kind() == "video")?;
        let settings = track.get_settings();
        let read = |field: &str| {
            js_sys::Reflect::get(&settings, &JsValue::from_str(field))
                .ok()
                .and_then(|v| v.as_f64())
        };
        let (width, height) = (read("width")?, read("height")?);
        Some(IntrinsicSize::new(width as u32, height as u32))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Capture backend for one editor: the reviewed video, its overlay canvas
/// and an offscreen compositor.
pub struct WebMediaBackend {
    navigator: Navigator,
    document: Document,
    video: HtmlVideoElement,
    overlay: HtmlCanvasElement,
    compositor: HtmlCanvasElement,
    compositor_ctx: CanvasRenderingContext2d,
    camera_preview: RefCell<Option<HtmlVideoElement>>,
}

impl WebMediaBackend {
    /// Create a backend compositing `video` and `overlay`.
    ///
    /// # Errors
    ///
    /// Returns an error if the compositor canvas cannot be created.
    pub fn new(
        navigator: Navigator,
        document: Document,
        video: HtmlVideoElement,
        overlay: HtmlCanvasElement,
    ) -> Result<Self, JsValue> {
        let compositor = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| JsValue::from_str("Element is not a canvas"))?;
        let compositor_ctx = compositor
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2D context not available"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| JsValue::from_str("Failed to cast to 2D context"))?;

        Ok(Self {
            navigator,
            document,
            video,
            overlay,
            compositor,
            compositor_ctx,
            camera_preview: RefCell::new(None),
        })
    }

    async fn user_media(&self, audio: bool, device: &str) -> CaptureResult<Rc<dyn MediaStream>> {
        let devices = self.navigator.media_devices().map_err(|_| {
            CaptureError::DeviceUnavailable("media devices unsupported".to_string())
        })?;

        let constraints = MediaStreamConstraints::new();
        constraints.set_audio(&JsValue::from_bool(audio));
        constraints.set_video(&JsValue::from_bool(!audio));

        let promise = devices
            .get_user_media_with_constraints(&constraints)
            .map_err(|e| device_error(&e, device))?;
        let stream = JsFuture::from(promise)
            .await
            .map_err(|e| device_error(&e, device))?
            .dyn_into::<web_sys::MediaStream>()
            .map_err(|_| CaptureError::DeviceUnavailable(format!("{device}: not a stream")))?;

        tracing::debug!("Acquired {device}");
        Ok(Rc::new(WebStream { stream }))
    }

    fn web_stream(stream: &Rc<dyn MediaStream>) -> CaptureResult<&WebStream> {
        stream
            .as_any()
            .downcast_ref::<WebStream>()
            .ok_or_else(|| CaptureError::Recorder("foreign media stream".to_string()))
    }

    fn draw_layer_error(e: &JsValue) -> CaptureError {
        CaptureError::DeviceUnavailable(format!("composite: {}", js_message(e)))
    }
}

#[async_trait(?Send)]
impl MediaBackend for WebMediaBackend {
    async fn acquire_microphone(&self) -> CaptureResult<Rc<dyn MediaStream>> {
        self.user_media(true, "microphone").await
    }

    async fn acquire_camera(&self) -> CaptureResult<Rc<dyn MediaStream>> {
        let camera = self.user_media(false, "camera").await?;

        // The facecam is drawn from a hidden, muted preview element
        let preview = self
            .document
            .create_element("video")
            .map_err(|e| Self::draw_layer_error(&e))?
            .dyn_into::<HtmlVideoElement>()
            .map_err(|_| CaptureError::DeviceUnavailable("camera preview".to_string()))?;
        preview.set_muted(true);
        preview.set_src_object(Some(Self::web_stream(&camera)?.stream()));
        if let Ok(promise) = preview.play() {
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = JsFuture::from(promise).await {
                    tracing::warn!("Camera preview failed to play: {e:?}");
                }
            });
        }
        *self.camera_preview.borrow_mut() = Some(preview);
        Ok(camera)
    }

    fn composite_stream(&self, fps: u32) -> CaptureResult<Rc<dyn MediaStream>> {
        let stream = self
            .compositor
            .capture_stream_with_frame_request_rate(f64::from(fps))
            .map_err(|e| CaptureError::DeviceUnavailable(js_message(&e)))?;
        Ok(Rc::new(WebStream { stream }))
    }

    fn composite_frame(&self, layout: &CompositeLayout) -> CaptureResult<()> {
        let size = layout.output;
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        if self.compositor.width() != size.width || self.compositor.height() != size.height {
            self.compositor.set_width(size.width);
            self.compositor.set_height(size.height);
        }
        let (w, h) = (f64::from(size.width), f64::from(size.height));

        let ctx = &self.compositor_ctx;
        ctx.draw_image_with_html_video_element_and_dw_and_dh(&self.video, 0.0, 0.0, w, h)
            .map_err(|e| Self::draw_layer_error(&e))?;
        ctx.draw_image_with_html_canvas_element_and_dw_and_dh(&self.overlay, 0.0, 0.0, w, h)
            .map_err(|e| Self::draw_layer_error(&e))?;

        if let (Some(rect), Some(preview)) = (layout.facecam, self.camera_preview.borrow().as_ref())
        {
            ctx.draw_image_with_html_video_element_and_dw_and_dh(
                preview,
                rect.x,
                rect.y,
                rect.width,
                rect.height,
            )
            .map_err(|e| Self::draw_layer_error(&e))?;
        }
        Ok(())
    }

    async fn start_recorder(
        &self,
        video: &Rc<dyn MediaStream>,
        audio: &Rc<dyn MediaStream>,
        mime_type: &str,
    ) -> CaptureResult<Box<dyn Recorder>> {
        let recorder_error = |e: JsValue| CaptureError::Recorder(js_message(&e));

        let combined = web_sys::MediaStream::new().map_err(recorder_error)?;
        for track in Self::web_stream(video)?
            .raw_tracks()
            .into_iter()
            .chain(Self::web_stream(audio)?.raw_tracks())
        {
            combined.add_track(&track);
        }

        let mime = if MediaRecorder::is_type_supported(mime_type) {
            mime_type
        } else {
            tracing::warn!("{mime_type} unsupported, recording as {FALLBACK_MIME}");
            FALLBACK_MIME
        };
        let options = MediaRecorderOptions::new();
        options.set_mime_type(mime);
        let recorder =
            MediaRecorder::new_with_media_stream_and_media_recorder_options(&combined, &options)
                .map_err(recorder_error)?;

        WebRecorder::start(recorder, mime).map(|r| Box::new(r) as Box<dyn Recorder>)
    }

    fn camera_released(&self, camera: &dyn MediaStream) {
        let Some(released) = camera.as_any().downcast_ref::<WebStream>() else {
            return;
        };
        let mut slot = self.camera_preview.borrow_mut();
        let showing = slot
            .as_ref()
            .and_then(|preview| preview.src_object())
            .is_some_and(|current| js_sys::Object::is(&current, released.stream()));
        if showing {
            if let Some(preview) = slot.take() {
                preview.set_src_object(None);
                tracing::debug!("Camera preview detached");
            }
        }
    }
}

impl Drop for WebMediaBackend {
    fn drop(&mut self) {
        if let Some(preview) = self.camera_preview.borrow_mut().take() {
            preview.set_src_object(None);
        }
    }
}

/// `MediaRecorder` collecting its chunks in memory.
pub struct WebRecorder {
    recorder: MediaRecorder,
    mime_type: String,
    chunks: Rc<RefCell<Vec<web_sys::Blob>>>,
    _on_data: Closure<dyn FnMut(BlobEvent)>,
}

impl WebRecorder {
    fn start(recorder: MediaRecorder, mime_type: &str) -> CaptureResult<Self> {
        let chunks = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&chunks);
        let on_data = Closure::wrap(Box::new(move |event: BlobEvent| {
            if let Some(blob) = event.data() {
                sink.borrow_mut().push(blob);
            }
        }) as Box<dyn FnMut(BlobEvent)>);
        recorder.set_ondataavailable(Some(on_data.as_ref().unchecked_ref()));

        recorder
            .start()
            .map_err(|e| CaptureError::Recorder(js_message(&e)))?;
        Ok(Self {
            recorder,
            mime_type: mime_type.to_string(),
            chunks,
            _on_data: on_data,
        })
    }

    fn detach(&self) {
        self.recorder.set_ondataavailable(None);
        self.recorder.set_onstop(None);
    }
}

#[async_trait(?Send)]
impl Recorder for WebRecorder {
    async fn finish(&mut self) -> CaptureResult<RecordedMedia> {
        // Stopping every input track ends the recorder on its own; its final
        // chunk has then already been delivered.
        if self.recorder.state() != RecordingState::Inactive {
            let recorder = self.recorder.clone();
            let stopped = js_sys::Promise::new(&mut |resolve, _reject| {
                let on_stop = Closure::once_into_js(move || {
                    if let Err(e) = resolve.call0(&JsValue::NULL) {
                        tracing::warn!("Recorder stop callback failed: {e:?}");
                    }
                });
                recorder.set_onstop(Some(on_stop.unchecked_ref()));
            });
            self.recorder
                .stop()
                .map_err(|e| CaptureError::Recorder(js_message(&e)))?;
            JsFuture::from(stopped)
                .await
                .map_err(|e| CaptureError::Recorder(js_message(&e)))?;
        }
        self.detach();

        let parts: js_sys::Array = self.chunks.borrow_mut().drain(..).collect();
        let bag = BlobPropertyBag::new();
        bag.set_type(&self.mime_type);
        let blob = web_sys::Blob::new_with_blob_sequence_and_options(&parts, &bag)
            .map_err(|e| CaptureError::Recorder(js_message(&e)))?;
        let buffer = JsFuture::from(blob.array_buffer())
            .await
            .map_err(|e| CaptureError::Recorder(js_message(&e)))?;

        Ok(RecordedMedia {
            bytes: js_sys::Uint8Array::new(&buffer).to_vec(),
            mime_type: self.mime_type.clone(),
        })
    }

    fn abort(&mut self) {
        self.detach();
        if let Err(e) = self.recorder.stop() {
            tracing::debug!("Recorder already inactive: {e:?}");
        }
        self.chunks.borrow_mut().clear();
    }
}
