//! Object tracker adapter.
//!
//! Accepts the tracker's three historical top-level layouts
//! (`objectAnnotations`, `detections`, `results`) and normalizes them into
//! per-track detection lists keyed by frame index or timestamp.

use rumi_models::{BBox, MLAnalysisResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::{confidence_or_default, first_key, parse_bbox};

pub const MODEL_NAME: &str = "object_tracking";

/// One detection of a tracked object in a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackDetection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
}

/// A tracked object across frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_id: Option<i64>,
    pub detections: Vec<TrackDetection>,
}

/// Normalized object-tracking payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedTracks {
    pub tracks: Vec<Track>,
}

/// Normalize raw object tracker output.
pub fn adapt_object_tracking(raw: &Value) -> MLAnalysisResult {
    let Some(annotations) = first_key(raw, &["objectAnnotations", "detections", "results", "tracks"])
        .and_then(|v| v.as_array())
    else {
        warn!("Object tracker output missing annotation list");
        return MLAnalysisResult::failed(MODEL_NAME, "unrecognized object tracker structure");
    };

    let mut tracks = Vec::with_capacity(annotations.len());
    for annotation in annotations {
        let Some(class) = first_key(annotation, &["class", "entity", "label", "name"])
            .and_then(|v| v.as_str())
        else {
            continue;
        };

        let track_id = first_key(annotation, &["track_id", "trackId", "id"]).and_then(|v| v.as_i64());
        let confidence = confidence_or_default(annotation, &["confidence", "score"]);

        let detections = first_key(annotation, &["frames", "detections"])
            .and_then(|v| v.as_array())
            .map(|frames| {
                frames
                    .iter()
                    .map(|f| TrackDetection {
                        frame: first_key(f, &["frame_index", "frameIndex", "frame"]).and_then(|v| v.as_u64()),
                        timestamp: first_key(f, &["timestamp", "time", "timeOffset"]).and_then(|v| v.as_f64()),
                        confidence: first_key(f, &["confidence", "score"])
                            .and_then(|v| v.as_f64())
                            .unwrap_or(confidence)
                            .clamp(0.0, 1.0),
                        bbox: first_key(f, &["bbox", "box", "normalizedBoundingBox"]).and_then(parse_bbox),
                    })
                    .collect()
            })
            .unwrap_or_default();

        tracks.push(Track { class: class.to_string(), track_id, detections });
    }

    match serde_json::to_value(NormalizedTracks { tracks }) {
        Ok(data) => MLAnalysisResult::ok(MODEL_NAME, data),
        Err(e) => MLAnalysisResult::failed(MODEL_NAME, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_adapt_object_annotations_layout() {
        let raw = json!({
            "objectAnnotations": [{
                "entity": "person",
                "trackId": 3,
                "confidence": 0.92,
                "frames": [
                    {"frameIndex": 0, "timestamp": 0.0, "bbox": {"x": 0.0, "y": 0.0, "width": 100.0, "height": 200.0}},
                    {"frameIndex": 30, "timestamp": 1.0}
                ]
            }]
        });
        let result = adapt_object_tracking(&raw);
        assert!(result.success);

        let tracks: NormalizedTracks = serde_json::from_value(result.data).unwrap();
        assert_eq!(tracks.tracks.len(), 1);
        assert_eq!(tracks.tracks[0].class, "person");
        assert_eq!(tracks.tracks[0].track_id, Some(3));
        assert_eq!(tracks.tracks[0].detections.len(), 2);
        assert!(tracks.tracks[0].detections[0].bbox.is_some());
        assert!(tracks.tracks[0].detections[1].bbox.is_none());
    }

    #[test]
    fn test_adapt_detections_layout() {
        let raw = json!({
            "detections": [{
                "class": "dog",
                "detections": [{"frame": 5, "confidence": 0.7}]
            }]
        });
        let result = adapt_object_tracking(&raw);
        assert!(result.success);
        let tracks: NormalizedTracks = serde_json::from_value(result.data).unwrap();
        assert_eq!(tracks.tracks[0].class, "dog");
        assert_eq!(tracks.tracks[0].detections[0].confidence, 0.7);
    }

    #[test]
    fn test_adapt_unrecognized_structure() {
        let result = adapt_object_tracking(&json!({"something": "else"}));
        assert!(!result.success);
        assert!(result.data.is_object());
        assert!(result.error.is_some());
    }

    #[test]
    fn test_classless_annotations_skipped() {
        let raw = json!({"results": [{"confidence": 0.9}]});
        let result = adapt_object_tracking(&raw);
        assert!(result.success);
        let tracks: NormalizedTracks = serde_json::from_value(result.data).unwrap();
        assert!(tracks.tracks.is_empty());
    }
}
