//! Renderer and capture error types.

use thiserror::Error;

/// Result type for drawing operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Errors that can occur while drawing annotations.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Frame scheduling failed.
    #[error("Frame scheduling failed: {0}")]
    Scheduler(String),

    /// Rendering frame failed.
    #[error("Frame render failed: {0}")]
    Frame(String),
}

/// Errors that can occur while recording commentary.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The user or platform refused access to a device.
    #[error("Permission denied for {device}")]
    PermissionDenied {
        /// Device that was refused ("microphone" or "camera").
        device: String,
    },

    /// No usable device or capture support on this platform.
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The recorder failed to start or finalize.
    #[error("Recorder error: {0}")]
    Recorder(String),

    /// Operation not valid in the current pipeline state.
    #[error("Invalid capture state: {0}")]
    InvalidState(String),

    /// The finished recording could not be stored.
    #[error("Upload failed: {0}")]
    Upload(String),
}

impl CaptureError {
    /// Permission failure for a named device.
    #[must_use]
    pub fn permission_denied(device: impl Into<String>) -> Self {
        Self::PermissionDenied {
            device: device.into(),
        }
    }
}

impl From<RenderError> for CaptureError {
    fn from(e: RenderError) -> Self {
        Self::DeviceUnavailable(e.to_string())
    }
}

impl From<review_core::ReviewError> for CaptureError {
    fn from(e: review_core::ReviewError) -> Self {
        Self::Upload(e.to_string())
    }
}
