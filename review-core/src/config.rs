//! Editor configuration.
//!
//! Every field has a default, so hosts can pass a partial JSON override.

use serde::{Deserialize, Serialize};

use crate::geometry::DEFAULT_TOLERANCE;
use crate::{ReviewError, ReviewResult};

/// Fixed stroke style shared by every shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeStyle {
    /// CSS color string.
    pub color: String,
    /// Line width in canvas pixels.
    pub width: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: "#ff3b30".to_string(),
            width: 4.0,
        }
    }
}

/// Vibration patterns in milliseconds (on, off, on, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HapticPatterns {
    /// Pointer down that starts a stroke.
    pub draw_start: Vec<u32>,
    /// Stroke committed on pointer up.
    pub draw_commit: Vec<u32>,
    /// One frame step.
    pub frame_step: Vec<u32>,
    /// A shape was erased.
    pub erase: Vec<u32>,
}

impl Default for HapticPatterns {
    fn default() -> Self {
        Self {
            draw_start: vec![10],
            draw_commit: vec![15],
            frame_step: vec![5],
            erase: vec![10, 30, 10],
        }
    }
}

/// Placement of the facecam inside the recorded composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacecamLayout {
    /// Facecam width as a fraction of the output width.
    pub width_fraction: f64,
    /// Gap between the facecam and the output edges, in output pixels.
    pub margin: f64,
}

impl Default for FacecamLayout {
    fn default() -> Self {
        Self {
            width_fraction: 0.25,
            margin: 16.0,
        }
    }
}

/// Configuration for an editor session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Erase hit tolerance in canvas pixels.
    pub hit_tolerance: f64,
    /// Smallest allowed zoom.
    pub min_zoom: f64,
    /// Largest allowed zoom.
    pub max_zoom: f64,
    /// Zoom change per zoom-in/zoom-out step.
    pub zoom_step: f64,
    /// Two touch starts closer than this toggle draw mode.
    pub double_tap_ms: u64,
    /// Stroke style for all shapes.
    pub stroke: StrokeStyle,
    /// Seconds moved per frame step.
    pub frame_step_secs: f64,
    /// Slowest playback rate.
    pub min_playback_rate: f64,
    /// Fastest playback rate.
    pub max_playback_rate: f64,
    /// Haptic feedback patterns.
    pub haptics: HapticPatterns,
    /// Facecam overlay placement.
    pub facecam: FacecamLayout,
    /// Compositing frame rate for recordings.
    pub capture_fps: u32,
    /// Preferred recording container.
    pub recording_mime: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            hit_tolerance: DEFAULT_TOLERANCE,
            min_zoom: 0.5,
            max_zoom: 3.0,
            zoom_step: 0.25,
            double_tap_ms: 300,
            stroke: StrokeStyle::default(),
            frame_step_secs: 1.0 / 30.0,
            min_playback_rate: 0.25,
            max_playback_rate: 2.0,
            haptics: HapticPatterns::default(),
            facecam: FacecamLayout::default(),
            capture_fps: 30,
            recording_mime: "video/webm".to_string(),
        }
    }
}

impl EditorConfig {
    /// Parse a (possibly partial) JSON override.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, a field has the wrong type,
    /// or the resulting values fail [`EditorConfig::validate`].
    pub fn from_json(json: &str) -> ReviewResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that bounds are ordered and every numeric setting is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> ReviewResult<()> {
        positive("hit_tolerance", self.hit_tolerance)?;
        positive("min_zoom", self.min_zoom)?;
        positive("max_zoom", self.max_zoom)?;
        positive("zoom_step", self.zoom_step)?;
        positive("stroke.width", self.stroke.width)?;
        positive("frame_step_secs", self.frame_step_secs)?;
        positive("min_playback_rate", self.min_playback_rate)?;
        positive("max_playback_rate", self.max_playback_rate)?;
        positive("facecam.width_fraction", self.facecam.width_fraction)?;

        if self.min_zoom > self.max_zoom {
            return Err(invalid(format!(
                "min_zoom {} exceeds max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.min_playback_rate > self.max_playback_rate {
            return Err(invalid(format!(
                "min_playback_rate {} exceeds max_playback_rate {}",
                self.min_playback_rate, self.max_playback_rate
            )));
        }
        if self.facecam.width_fraction > 1.0 {
            return Err(invalid("facecam.width_fraction must be at most 1".to_string()));
        }
        if !self.facecam.margin.is_finite() || self.facecam.margin < 0.0 {
            return Err(invalid("facecam.margin must be finite and non-negative".to_string()));
        }
        if self.double_tap_ms == 0 {
            return Err(invalid("double_tap_ms must be positive".to_string()));
        }
        if self.capture_fps == 0 {
            return Err(invalid("capture_fps must be positive".to_string()));
        }
        Ok(())
    }
}

fn invalid(message: String) -> ReviewError {
    ReviewError::InvalidConfig(message)
}

fn positive(field: &str, value: f64) -> ReviewResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{field} must be finite and positive, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_editor_behaviour() {
        let config = EditorConfig::default();
        assert!((config.hit_tolerance - 15.0).abs() < f64::EPSILON);
        assert!((config.min_zoom - 0.5).abs() < f64::EPSILON);
        assert!((config.max_zoom - 3.0).abs() < f64::EPSILON);
        assert_eq!(config.double_tap_ms, 300);
        assert_eq!(config.haptics.draw_start, vec![10]);
        assert_eq!(config.haptics.draw_commit, vec![15]);
        assert_eq!(config.haptics.frame_step, vec![5]);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config =
            EditorConfig::from_json(r##"{"hit_tolerance": 20.0, "stroke": {"color": "#00ff00"}}"##)
                .expect("should parse");
        assert!((config.hit_tolerance - 20.0).abs() < f64::EPSILON);
        assert_eq!(config.stroke.color, "#00ff00");
        assert!((config.stroke.width - 4.0).abs() < f64::EPSILON);
        assert_eq!(config.double_tap_ms, 300);
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(EditorConfig::from_json(r#"{"double_tap_ms": "soon"}"#).is_err());
        assert!(EditorConfig::from_json("not json").is_err());
    }

    #[test]
    fn default_config_is_valid() {
        EditorConfig::default().validate().expect("defaults should validate");
    }

    #[test]
    fn inverted_zoom_bounds_are_rejected() {
        let err = EditorConfig::from_json(r#"{"max_zoom": 0.4}"#).expect_err("should reject");
        assert!(matches!(err, ReviewError::InvalidConfig(_)));
        assert!(err.to_string().contains("max_zoom"));
    }

    #[test]
    fn inverted_rate_bounds_are_rejected() {
        let err = EditorConfig::from_json(r#"{"min_playback_rate": 3.0}"#)
            .expect_err("should reject");
        assert!(matches!(err, ReviewError::InvalidConfig(_)));
    }

    #[test]
    fn non_positive_settings_are_rejected() {
        for json in [
            r#"{"zoom_step": 0.0}"#,
            r#"{"hit_tolerance": -1.0}"#,
            r#"{"double_tap_ms": 0}"#,
            r#"{"capture_fps": 0}"#,
            r#"{"frame_step_secs": 0.0}"#,
            r#"{"facecam": {"width_fraction": 1.5}}"#,
        ] {
            assert!(
                matches!(EditorConfig::from_json(json), Err(ReviewError::InvalidConfig(_))),
                "{json} should be rejected"
            );
        }
    }
}
