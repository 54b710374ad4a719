//! Browser implementations of the editor's collaborators: the video
//! element, vibration, and JavaScript storage callbacks.

use async_trait::async_trait;
use review_core::{
    BlobStorage, Haptics, IntrinsicSize, ReviewError, ReviewNotifier, ReviewResult, VideoSource,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{HtmlVideoElement, Navigator};

/// The reviewed `<video>` element.
#[derive(Clone)]
pub struct HtmlVideoSource {
    element: HtmlVideoElement,
}

impl HtmlVideoSource {
    /// Wrap a video element.
    #[must_use]
    pub fn new(element: HtmlVideoElement) -> Self {
        Self { element }
    }
}

impl VideoSource for HtmlVideoSource {
    fn natural_size(&self) -> IntrinsicSize {
        IntrinsicSize::new(self.element.video_width(), self.element.video_height())
    }

    fn current_time(&self) -> f64 {
        self.element.current_time()
    }

    fn duration(&self) -> f64 {
        self.element.duration()
    }

    fn playback_rate(&self) -> f64 {
        self.element.playback_rate()
    }

    fn is_paused(&self) -> bool {
        self.element.paused()
    }

    fn seek(&mut self, time: f64) {
        self.element.set_current_time(time);
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.element.set_playback_rate(rate);
    }

    fn play(&mut self) {
        match self.element.play() {
            Ok(promise) => wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = JsFuture::from(promise).await {
                    tracing::warn!("Video play rejected: {e:?}");
                }
            }),
            Err(e) => tracing::warn!("Video play failed: {e:?}"),
        }
    }

    fn pause(&mut self) {
        if let Err(e) = self.element.pause() {
            tracing::warn!("Video pause failed: {e:?}");
        }
    }
}

/// Vibration through `navigator.vibrate`, where the browser has it.
pub struct NavigatorHaptics {
    navigator: Navigator,
    supported: bool,
}

impl NavigatorHaptics {
    /// Check the navigator for vibration support.
    #[must_use]
    pub fn new(navigator: Navigator) -> Self {
        let supported = js_sys::Reflect::has(&navigator, &JsValue::from_str("vibrate"))
            .unwrap_or(false);
        if !supported {
            tracing::debug!("Vibration unsupported; haptics disabled");
        }
        Self {
            navigator,
            supported,
        }
    }
}

impl Haptics for NavigatorHaptics {
    fn vibrate(&self, pattern: &[u32]) {
        if !self.supported || pattern.is_empty() {
            return;
        }
        let array: js_sys::Array = pattern.iter().map(|ms| JsValue::from(*ms)).collect();
        self.navigator.vibrate_with_pattern(&array);
    }
}

fn storage_error(e: &JsValue) -> ReviewError {
    ReviewError::Storage(e.as_string().unwrap_or_else(|| format!("{e:?}")))
}

/// Await a callback's return value, whether or not it is a promise.
async fn settle(value: JsValue) -> Result<JsValue, JsValue> {
    JsFuture::from(js_sys::Promise::resolve(&value)).await
}

/// Blob storage backed by JavaScript callbacks.
///
/// `put(key, bytes: Uint8Array, contentType)` and `get(key)` may return
/// promises. `get` resolves to a `Uint8Array`, a string, or null/undefined
/// when nothing is stored.
pub struct JsBlobStorage {
    put: js_sys::Function,
    get: js_sys::Function,
}

impl JsBlobStorage {
    /// Wrap the host's put/get callbacks.
    #[must_use]
    pub fn new(put: js_sys::Function, get: js_sys::Function) -> Self {
        Self { put, get }
    }
}

#[async_trait(?Send)]
impl BlobStorage for JsBlobStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> ReviewResult<()> {
        let data = js_sys::Uint8Array::from(bytes.as_slice());
        let result = self
            .put
            .call3(
                &JsValue::NULL,
                &JsValue::from_str(key),
                &data,
                &JsValue::from_str(content_type),
            )
            .map_err(|e| storage_error(&e))?;
        settle(result).await.map_err(|e| storage_error(&e))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> ReviewResult<Option<Vec<u8>>> {
        let result = self
            .get
            .call1(&JsValue::NULL, &JsValue::from_str(key))
            .map_err(|e| storage_error(&e))?;
        let value = settle(result).await.map_err(|e| storage_error(&e))?;

        if value.is_null() || value.is_undefined() {
            return Ok(None);
        }
        if let Some(text) = value.as_string() {
            return Ok(Some(text.into_bytes()));
        }
        Ok(Some(js_sys::Uint8Array::new(&value).to_vec()))
    }
}

/// Review-complete notifier backed by a JavaScript callback `(videoId)`.
///
/// The callback runs immediately; if it returns a promise, the promise is
/// settled in the background and a rejection is only logged.
pub struct JsNotifier {
    callback: js_sys::Function,
}

impl JsNotifier {
    /// Wrap the host's callback.
    #[must_use]
    pub fn new(callback: js_sys::Function) -> Self {
        Self { callback }
    }
}

impl ReviewNotifier for JsNotifier {
    fn review_complete(&self, video_id: &str) {
        let result = match self
            .callback
            .call1(&JsValue::NULL, &JsValue::from_str(video_id))
        {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Review-complete notification failed: {}", storage_error(&e));
                return;
            }
        };
        let video_id = video_id.to_string();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = settle(result).await {
                tracing::warn!(
                    "Review-complete notification for {video_id} rejected: {}",
                    storage_error(&e)
                );
            }
        });
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn storage_errors_keep_js_message() {
        let err = storage_error(&JsValue::from_str("quota exceeded"));
        assert_eq!(err.to_string(), "Storage error: quota exceeded");
    }
}
