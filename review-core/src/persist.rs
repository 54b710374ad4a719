//! Annotation persistence format.
//!
//! A saved annotation set is a single JSON array of shapes:
//!
//! ```text
//! [
//!   {"type":"line","x1":10.0,"y1":10.0,"x2":100.0,"y2":100.0},
//!   {"type":"freehand","points":[{"x":1.0,"y":2.0},{"x":3.0,"y":4.0}]}
//! ]
//! ```

use crate::{ReviewError, ReviewResult, Shape};

/// Serialize a shape list to the persisted JSON array.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_shapes(shapes: &[Shape]) -> ReviewResult<String> {
    serde_json::to_string(shapes).map_err(ReviewError::Serialization)
}

/// Parse a persisted JSON array, rejecting any malformed entry.
///
/// # Errors
///
/// Returns an error if the document or any entry is invalid.
pub fn decode_shapes(json: &str) -> ReviewResult<Vec<Shape>> {
    serde_json::from_str(json).map_err(ReviewError::Serialization)
}

/// Parse persisted annotations, treating anything unusable as "no shapes".
///
/// A document that is not a JSON array yields an empty list. Entries that do
/// not parse as a shape are dropped so one bad record cannot hide the rest.
#[must_use]
pub fn decode_shapes_lenient(bytes: &[u8]) -> Vec<Shape> {
    let entries: Vec<serde_json::Value> = match serde_json::from_slice(bytes) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Ignoring unreadable annotations: {e}");
            return Vec::new();
        }
    };

    let total = entries.len();
    let shapes: Vec<Shape> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(shape) => Some(shape),
            Err(e) => {
                tracing::warn!("Dropping malformed annotation #{index}: {e}");
                None
            }
        })
        .collect();

    if shapes.len() < total {
        tracing::warn!("Loaded {} of {total} annotations", shapes.len());
    }
    shapes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;

    #[test]
    fn encodes_documented_format() {
        let json = encode_shapes(&[
            Shape::line(10.0, 10.0, 100.0, 100.0),
            Shape::freehand(vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)]),
        ])
        .expect("encode");

        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(
            value,
            serde_json::json!([
                {"type": "line", "x1": 10.0, "y1": 10.0, "x2": 100.0, "y2": 100.0},
                {"type": "freehand", "points": [{"x": 1.0, "y": 2.0}, {"x": 3.0, "y": 4.0}]}
            ])
        );
    }

    #[test]
    fn empty_list_round_trips() {
        let json = encode_shapes(&[]).expect("encode");
        assert_eq!(json, "[]");
        assert!(decode_shapes(&json).expect("decode").is_empty());
    }

    #[test]
    fn accepts_integer_coordinates() {
        let shapes = decode_shapes(r#"[{"type":"line","x1":1,"y1":2,"x2":3,"y2":4}]"#)
            .expect("decode");
        assert_eq!(shapes, vec![Shape::line(1.0, 2.0, 3.0, 4.0)]);
    }

    #[test]
    fn strict_decode_rejects_bad_entries() {
        assert!(decode_shapes(r#"[{"type":"circle","r":4}]"#).is_err());
        assert!(decode_shapes("{}").is_err());
    }

    #[test]
    fn lenient_decode_treats_garbage_as_empty() {
        assert!(decode_shapes_lenient(b"not json").is_empty());
        assert!(decode_shapes_lenient(b"").is_empty());
        assert!(decode_shapes_lenient(br#"{"type":"line"}"#).is_empty());
    }

    #[test]
    fn lenient_decode_drops_only_bad_entries() {
        let json = br#"[
            {"type":"line","x1":0,"y1":0,"x2":5,"y2":5},
            {"type":"line","x1":"oops","y1":0,"x2":5,"y2":5},
            {"type":"freehand"},
            {"type":"freehand","points":[{"x":1,"y":1},{"x":2,"y":2}]},
            42
        ]"#;
        let shapes = decode_shapes_lenient(json);
        assert_eq!(
            shapes,
            vec![
                Shape::line(0.0, 0.0, 5.0, 5.0),
                Shape::freehand(vec![Point::new(1.0, 1.0), Point::new(2.0, 2.0)]),
            ]
        );
    }
}
