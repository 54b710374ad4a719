//! Input events for editor interaction.
//!
//! All positions are in viewport (client) coordinates; the interaction
//! controller maps them into canvas space per event.

use serde::{Deserialize, Serialize};

/// Phase of a pointer or touch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchPhase {
    /// Touch started (finger down).
    Start,
    /// Touch moved (finger dragging).
    Move,
    /// Touch ended (finger up).
    End,
    /// Touch cancelled (e.g., palm rejection).
    Cancel,
}

impl TouchPhase {
    /// Phase for a DOM touch, mouse or pointer event type. `None` for event
    /// types the editor does not handle.
    #[must_use]
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "touchstart" | "mousedown" | "pointerdown" => Some(Self::Start),
            "touchmove" | "mousemove" | "pointermove" => Some(Self::Move),
            "touchend" | "mouseup" | "pointerup" => Some(Self::End),
            "touchcancel" | "mouseleave" | "pointercancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// A single touch point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    /// Touch identifier (for multi-touch).
    pub id: u32,
    /// X position in viewport coordinates.
    pub x: f64,
    /// Y position in viewport coordinates.
    pub y: f64,
}

impl TouchPoint {
    /// Create a touch point.
    #[must_use]
    pub const fn new(id: u32, x: f64, y: f64) -> Self {
        Self { id, x, y }
    }
}

/// A touch event with every finger currently on the surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchEvent {
    /// Phase of this touch event.
    pub phase: TouchPhase,
    /// All current touch points. For `End` these are the fingers still down.
    pub touches: Vec<TouchPoint>,
    /// Timestamp in milliseconds.
    pub timestamp_ms: u64,
}

impl TouchEvent {
    /// Create a new touch event.
    #[must_use]
    pub fn new(phase: TouchPhase, touches: Vec<TouchPoint>, timestamp_ms: u64) -> Self {
        Self {
            phase,
            touches,
            timestamp_ms,
        }
    }

    /// Get the primary (first) touch point.
    #[must_use]
    pub fn primary_touch(&self) -> Option<&TouchPoint> {
        self.touches.first()
    }

    /// Check if this is a multi-touch event.
    #[must_use]
    pub fn is_multi_touch(&self) -> bool {
        self.touches.len() > 1
    }

    /// Distance between the first two touches and their midpoint.
    #[must_use]
    pub fn pinch_geometry(&self) -> Option<(f64, (f64, f64))> {
        let [a, b, ..] = self.touches.as_slice() else {
            return None;
        };
        let distance = (b.x - a.x).hypot(b.y - a.y);
        let midpoint = ((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
        Some((distance, midpoint))
    }
}

/// A mouse (or pen) pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Phase of this pointer event.
    pub phase: TouchPhase,
    /// X position in viewport coordinates.
    pub x: f64,
    /// Y position in viewport coordinates.
    pub y: f64,
}

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct KeyModifiers {
    /// Shift key pressed.
    pub shift: bool,
    /// Control key pressed.
    pub ctrl: bool,
    /// Alt/Option key pressed.
    pub alt: bool,
    /// Meta/Command key pressed.
    pub meta: bool,
}

/// All input events the editor can receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InputEvent {
    /// Raw touch event.
    Touch(TouchEvent),

    /// Mouse pointer event.
    Pointer(PointerEvent),

    /// Keyboard event (key down only).
    Key {
        /// DOM key name (e.g. `"ArrowLeft"`, `"z"`).
        key: String,
        /// Active modifier keys.
        modifiers: KeyModifiers,
    },
}

impl InputEvent {
    /// Build a mouse pointer event.
    #[must_use]
    pub fn pointer(phase: TouchPhase, x: f64, y: f64) -> Self {
        Self::Pointer(PointerEvent { phase, x, y })
    }

    /// Build a key event without modifiers.
    #[must_use]
    pub fn key(key: &str) -> Self {
        Self::Key {
            key: key.to_string(),
            modifiers: KeyModifiers::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_from_dom_event_types() {
        assert_eq!(TouchPhase::from_event_type("touchstart"), Some(TouchPhase::Start));
        assert_eq!(TouchPhase::from_event_type("mousemove"), Some(TouchPhase::Move));
        assert_eq!(TouchPhase::from_event_type("pointerup"), Some(TouchPhase::End));
        assert_eq!(TouchPhase::from_event_type("touchcancel"), Some(TouchPhase::Cancel));
        assert_eq!(TouchPhase::from_event_type("mouseleave"), Some(TouchPhase::Cancel));
        assert_eq!(TouchPhase::from_event_type("click"), None);
    }

    #[test]
    fn pinch_geometry_needs_two_touches() {
        let one = TouchEvent::new(TouchPhase::Start, vec![TouchPoint::new(0, 0.0, 0.0)], 0);
        assert!(one.pinch_geometry().is_none());

        let two = TouchEvent::new(
            TouchPhase::Start,
            vec![TouchPoint::new(0, 0.0, 0.0), TouchPoint::new(1, 30.0, 40.0)],
            0,
        );
        let (distance, mid) = two.pinch_geometry().expect("two touches");
        assert!((distance - 50.0).abs() < 1e-9);
        assert_eq!(mid, (15.0, 20.0));
    }

    #[test]
    fn input_event_json_shape() {
        let json = serde_json::to_string(&InputEvent::pointer(TouchPhase::Move, 1.0, 2.0))
            .expect("serialize");
        assert!(json.contains(r#""type":"Pointer""#));
        assert!(json.contains(r#""phase":"move""#));
    }
}
