//! Zoom and pan state for the editor viewport.

use serde::{Deserialize, Serialize};

/// Ephemeral zoom/pan state. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    zoom: f64,
    pan_x: f64,
    pan_y: f64,
    min_zoom: f64,
    max_zoom: f64,
}

impl ViewTransform {
    /// Identity transform with the given zoom bounds.
    #[must_use]
    pub fn new(min_zoom: f64, max_zoom: f64) -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            min_zoom,
            max_zoom,
        }
    }

    /// Current zoom factor.
    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Current pan offset in viewport pixels.
    #[must_use]
    pub fn pan(&self) -> (f64, f64) {
        (self.pan_x, self.pan_y)
    }

    /// Clamp `zoom` to the configured bounds.
    #[must_use]
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.zoom;
        }
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    /// Set the zoom, clamped. Landing exactly on 1.0 recentres the view.
    #[allow(clippy::float_cmp)]
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        self.zoom = self.clamp_zoom(zoom);
        if self.zoom == 1.0 {
            self.pan_x = 0.0;
            self.pan_y = 0.0;
        }
        self.zoom
    }

    /// Adjust the zoom by `delta`.
    pub fn zoom_by(&mut self, delta: f64) -> f64 {
        self.set_zoom(self.zoom + delta)
    }

    /// Set the pan offset.
    pub fn set_pan(&mut self, pan_x: f64, pan_y: f64) {
        self.pan_x = pan_x;
        self.pan_y = pan_y;
    }

    /// Back to zoom 1, no pan.
    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }

    /// Whether the view is at identity.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_identity(&self) -> bool {
        self.zoom == 1.0 && self.pan_x == 0.0 && self.pan_y == 0.0
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::new(0.5, 3.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_is_clamped() {
        let mut view = ViewTransform::default();
        assert!((view.set_zoom(10.0) - 3.0).abs() < f64::EPSILON);
        assert!((view.set_zoom(0.01) - 0.5).abs() < f64::EPSILON);
        assert!((view.zoom_by(-100.0) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn zoom_back_to_one_resets_pan() {
        let mut view = ViewTransform::default();
        view.set_zoom(2.0);
        view.set_pan(40.0, -20.0);
        view.set_zoom(1.0);
        assert_eq!(view.pan(), (0.0, 0.0));
        assert!(view.is_identity());
    }

    #[test]
    fn zoom_elsewhere_keeps_pan() {
        let mut view = ViewTransform::default();
        view.set_zoom(2.0);
        view.set_pan(40.0, -20.0);
        view.set_zoom(1.5);
        assert_eq!(view.pan(), (40.0, -20.0));
    }

    #[test]
    fn nan_zoom_is_ignored() {
        let mut view = ViewTransform::default();
        view.set_zoom(2.0);
        view.set_zoom(f64::NAN);
        assert!((view.zoom() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reset_returns_to_identity() {
        let mut view = ViewTransform::default();
        view.set_zoom(2.5);
        view.set_pan(3.0, 4.0);
        view.reset();
        assert!(view.is_identity());
    }
}
