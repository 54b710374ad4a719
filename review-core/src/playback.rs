//! Playback mirroring and frame-stepping control.

use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::haptics::Feedback;
use crate::mapper::IntrinsicSize;

/// The video element the editor overlays.
pub trait VideoSource {
    /// Natural (encoded) resolution; zero before metadata loads.
    fn natural_size(&self) -> IntrinsicSize;
    /// Current playback position in seconds.
    fn current_time(&self) -> f64;
    /// Total duration in seconds; may be NaN or infinite before metadata loads.
    fn duration(&self) -> f64;
    /// Current playback rate.
    fn playback_rate(&self) -> f64;
    /// Whether playback is paused.
    fn is_paused(&self) -> bool;
    /// Seek to a position in seconds.
    fn seek(&mut self, time: f64);
    /// Change the playback rate.
    fn set_playback_rate(&mut self, rate: f64);
    /// Start playback.
    fn play(&mut self);
    /// Pause playback.
    fn pause(&mut self);
}

/// Snapshot of the video element's playback state. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Position in seconds.
    pub current_time: f64,
    /// Duration in seconds (0 when unknown).
    pub duration: f64,
    /// Whether the video is playing.
    pub is_playing: bool,
    /// Playback rate.
    pub playback_rate: f64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            duration: 0.0,
            is_playing: false,
            playback_rate: 1.0,
        }
    }
}

impl PlaybackState {
    /// Mirror the video source.
    pub fn sync_from(&mut self, source: &dyn VideoSource) {
        let duration = source.duration();
        self.current_time = source.current_time();
        self.duration = if duration.is_finite() { duration } else { 0.0 };
        self.is_playing = !source.is_paused();
        self.playback_rate = source.playback_rate();
    }
}

/// Playback commands issued from the editor toolbar and keyboard.
#[derive(Debug, Clone)]
pub struct PlaybackController {
    state: PlaybackState,
    frame_step: f64,
    min_rate: f64,
    max_rate: f64,
}

impl PlaybackController {
    /// Create a controller from editor configuration.
    #[must_use]
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            state: PlaybackState::default(),
            frame_step: config.frame_step_secs,
            min_rate: config.min_playback_rate,
            max_rate: config.max_playback_rate,
        }
    }

    /// Last mirrored state.
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Refresh the mirrored state from the video.
    pub fn sync(&mut self, source: &dyn VideoSource) -> PlaybackState {
        self.state.sync_from(source);
        self.state
    }

    /// Play if paused, pause if playing.
    pub fn toggle_play(&mut self, source: &mut dyn VideoSource) -> bool {
        if source.is_paused() {
            source.play();
        } else {
            source.pause();
        }
        self.sync(source).is_playing
    }

    /// Pause and move one frame forward (`direction > 0`) or back.
    pub fn step_frame(&mut self, source: &mut dyn VideoSource, direction: i32) -> Feedback {
        source.pause();
        let delta = f64::from(direction.signum()) * self.frame_step;
        let now = source.current_time();
        let target = Self::clamp_time(&*source, now + delta);
        source.seek(target);
        self.sync(source);
        tracing::trace!("Frame step to {target:.3}s");
        Feedback::FrameStep
    }

    /// Seek to `time`, clamped to the video's bounds.
    pub fn seek(&mut self, source: &mut dyn VideoSource, time: f64) {
        let target = Self::clamp_time(&*source, time);
        source.seek(target);
        self.sync(source);
    }

    /// Change the playback rate, clamped to the configured range.
    pub fn set_rate(&mut self, source: &mut dyn VideoSource, rate: f64) -> f64 {
        let rate = if rate.is_finite() {
            rate.clamp(self.min_rate, self.max_rate)
        } else {
            1.0
        };
        source.set_playback_rate(rate);
        self.sync(source);
        rate
    }

    fn clamp_time(source: &dyn VideoSource, time: f64) -> f64 {
        let duration = source.duration();
        let time = if time.is_finite() { time.max(0.0) } else { 0.0 };
        if duration.is_finite() && duration > 0.0 {
            time.min(duration)
        } else {
            time
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// In-memory video used by tests across the crate.
    #[derive(Debug, Clone)]
    pub(crate) struct FakeVideo {
        pub(crate) size: IntrinsicSize,
        pub(crate) time: f64,
        pub(crate) duration: f64,
        pub(crate) rate: f64,
        pub(crate) paused: bool,
    }

    impl FakeVideo {
        pub(crate) fn new(width: u32, height: u32, duration: f64) -> Self {
            Self {
                size: IntrinsicSize::new(width, height),
                time: 0.0,
                duration,
                rate: 1.0,
                paused: true,
            }
        }
    }

    impl VideoSource for FakeVideo {
        fn natural_size(&self) -> IntrinsicSize {
            self.size
        }
        fn current_time(&self) -> f64 {
            self.time
        }
        fn duration(&self) -> f64 {
            self.duration
        }
        fn playback_rate(&self) -> f64 {
            self.rate
        }
        fn is_paused(&self) -> bool {
            self.paused
        }
        fn seek(&mut self, time: f64) {
            self.time = time;
        }
        fn set_playback_rate(&mut self, rate: f64) {
            self.rate = rate;
        }
        fn play(&mut self) {
            self.paused = false;
        }
        fn pause(&mut self) {
            self.paused = true;
        }
    }

    #[test]
    fn step_frame_pauses_and_moves_one_frame() {
        let mut video = FakeVideo::new(640, 360, 10.0);
        video.paused = false;
        video.time = 1.0;
        let mut controller = PlaybackController::new(&EditorConfig::default());

        let feedback = controller.step_frame(&mut video, 1);
        assert_eq!(feedback, Feedback::FrameStep);
        assert!(video.paused);
        assert!((video.time - (1.0 + 1.0 / 30.0)).abs() < 1e-9);

        controller.step_frame(&mut video, -1);
        assert!((video.time - 1.0).abs() < 1e-9);
    }

    #[test]
    fn step_frame_clamps_to_bounds() {
        let mut video = FakeVideo::new(640, 360, 2.0);
        let mut controller = PlaybackController::new(&EditorConfig::default());
        controller.step_frame(&mut video, -1);
        assert!(video.time.abs() < f64::EPSILON);

        video.time = 2.0;
        controller.step_frame(&mut video, 1);
        assert!((video.time - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_duration_only_clamps_below() {
        let mut video = FakeVideo::new(640, 360, f64::NAN);
        let mut controller = PlaybackController::new(&EditorConfig::default());
        controller.seek(&mut video, 42.0);
        assert!((video.time - 42.0).abs() < f64::EPSILON);
        assert!(controller.state().duration.abs() < f64::EPSILON);
    }

    #[test]
    fn rate_is_clamped() {
        let mut video = FakeVideo::new(640, 360, 5.0);
        let mut controller = PlaybackController::new(&EditorConfig::default());
        assert!((controller.set_rate(&mut video, 8.0) - 2.0).abs() < f64::EPSILON);
        assert!((controller.set_rate(&mut video, 0.0) - 0.25).abs() < f64::EPSILON);
        assert!((controller.set_rate(&mut video, f64::NAN) - 1.0).abs() < f64::EPSILON);
        assert!((video.rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn toggle_play_mirrors_state() {
        let mut video = FakeVideo::new(640, 360, 5.0);
        let mut controller = PlaybackController::new(&EditorConfig::default());
        assert!(controller.toggle_play(&mut video));
        assert!(controller.state().is_playing);
        assert!(!controller.toggle_play(&mut video));
    }
}
