//! Advisory haptic feedback.

use crate::config::HapticPatterns;

/// Interaction moments that may trigger a vibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    /// A stroke started.
    DrawStart,
    /// A stroke was committed.
    DrawCommit,
    /// Playback moved by one frame.
    FrameStep,
    /// A shape was erased.
    Erase,
}

impl HapticPatterns {
    /// Vibration pattern for a feedback moment.
    #[must_use]
    pub fn pattern_for(&self, feedback: Feedback) -> &[u32] {
        match feedback {
            Feedback::DrawStart => &self.draw_start,
            Feedback::DrawCommit => &self.draw_commit,
            Feedback::FrameStep => &self.frame_step,
            Feedback::Erase => &self.erase,
        }
    }
}

/// Platform vibration support.
///
/// Implementations must return quietly when the platform cannot vibrate.
pub trait Haptics {
    /// Play a vibration pattern (alternating on/off milliseconds).
    fn vibrate(&self, pattern: &[u32]);
}

/// Haptics for platforms without a vibration motor.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn vibrate(&self, _pattern: &[u32]) {}
}
