//! Analyzer output adapters.
//!
//! Each adapter is a pure function from a raw analyzer payload to a
//! normalized [`MLAnalysisResult`]. Adapters tolerate the known layout
//! variants of their analyzer, rename equivalent fields, and never invent
//! data: a missing field stays absent, and an unrecognized structure yields
//! `success=false` with an empty data object rather than an error.

pub mod human;
pub mod object;
pub mod ocr;
pub mod scene;
pub mod speech;

pub use human::adapt_human_analysis;
pub use object::adapt_object_tracking;
pub use ocr::adapt_ocr;
pub use scene::adapt_scene_detection;
pub use speech::adapt_speech;

use rumi_models::BBox;
use serde_json::Value;

/// Pull the first present key out of an object.
pub(crate) fn first_key<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| value.get(*k))
}

/// Parse a bounding box from any of the shapes analyzers emit:
/// `{x, y, width, height}`, `{x1, y1, x2, y2}`, or `[x1, y1, x2, y2]`.
pub(crate) fn parse_bbox(value: &Value) -> Option<BBox> {
    if let Some(arr) = value.as_array() {
        if arr.len() == 4 {
            let coords: Option<Vec<f64>> = arr.iter().map(|v| v.as_f64()).collect();
            let c = coords?;
            return Some(BBox { x: c[0], y: c[1], width: (c[2] - c[0]).abs(), height: (c[3] - c[1]).abs() });
        }
        return None;
    }

    let obj = value.as_object()?;
    let num = |k: &str| obj.get(k).and_then(|v| v.as_f64());

    if let (Some(x), Some(y), Some(w), Some(h)) = (num("x"), num("y"), num("width"), num("height")) {
        return Some(BBox { x, y, width: w, height: h });
    }
    if let (Some(x1), Some(y1), Some(x2), Some(y2)) = (num("x1"), num("y1"), num("x2"), num("y2")) {
        return Some(BBox { x: x1, y: y1, width: (x2 - x1).abs(), height: (y2 - y1).abs() });
    }
    None
}

/// Confidence with a 0.5 default where the analyzer omitted it.
pub(crate) fn confidence_or_default(value: &Value, keys: &[&str]) -> f64 {
    first_key(value, keys).and_then(|v| v.as_f64()).unwrap_or(0.5).clamp(0.0, 1.0)
}
