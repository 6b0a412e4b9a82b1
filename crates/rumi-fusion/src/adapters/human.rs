//! Human analyzer adapter (face / pose / gesture / expression).
//!
//! The analyzer emits one record per sampled frame. Expression labels come
//! through both `expression` and `emotion` keys and gestures through
//! `gesture` and `label`, depending on the analyzer version.

use rumi_models::{BBox, MLAnalysisResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::{confidence_or_default, first_key, parse_bbox};

pub const MODEL_NAME: &str = "human_analysis";

/// An expression detection within a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionRecord {
    pub emotion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
    pub confidence: f64,
}

/// A gesture detection within a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureRecord {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub confidence: f64,
}

/// A body pose detection within a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
    pub confidence: f64,
}

/// Per-frame human analysis record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanFrame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub face_count: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expressions: Vec<ExpressionRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gestures: Vec<GestureRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub poses: Vec<PoseRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gaze_variance: Option<f64>,
}

/// Normalized human-analysis payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedHuman {
    pub frames: Vec<HumanFrame>,
}

/// Normalize raw human analyzer output.
pub fn adapt_human_analysis(raw: &Value) -> MLAnalysisResult {
    let Some(frames) = first_key(raw, &["frames", "frame_results", "results"]).and_then(|v| v.as_array())
    else {
        warn!("Human analyzer output missing frame list");
        return MLAnalysisResult::failed(MODEL_NAME, "unrecognized human analyzer structure");
    };

    let mut normalized = Vec::with_capacity(frames.len());
    for frame in frames {
        let expressions = collect_records(frame, &["expressions", "emotions"], |rec| {
            let emotion = first_key(rec, &["expression", "emotion", "label"])?.as_str()?;
            Some(ExpressionRecord {
                emotion: emotion.to_string(),
                valence: rec.get("valence").and_then(|v| v.as_f64()),
                intensity: rec.get("intensity").and_then(|v| v.as_f64()),
                confidence: confidence_or_default(rec, &["confidence", "score"]),
            })
        });

        let gestures = collect_records(frame, &["gestures"], |rec| {
            let label = first_key(rec, &["gesture", "label", "name"])?.as_str()?;
            Some(GestureRecord {
                label: label.to_string(),
                target: rec.get("target").and_then(|v| v.as_str()).map(str::to_string),
                confidence: confidence_or_default(rec, &["confidence", "score"]),
            })
        });

        let poses = collect_records(frame, &["poses", "bodies"], |rec| {
            Some(PoseRecord {
                bbox: first_key(rec, &["bbox", "box"]).and_then(parse_bbox),
                confidence: confidence_or_default(rec, &["confidence", "score"]),
            })
        });

        let face_count = first_key(frame, &["face_count", "faces"])
            .map(|v| match v {
                Value::Number(n) => n.as_u64().unwrap_or(0) as u32,
                Value::Array(a) => a.len() as u32,
                _ => 0,
            })
            .unwrap_or(0);

        normalized.push(HumanFrame {
            frame: first_key(frame, &["frame", "frame_index", "frameIndex"]).and_then(|v| v.as_u64()),
            timestamp: first_key(frame, &["timestamp", "time"]).and_then(|v| v.as_f64()),
            face_count,
            expressions,
            gestures,
            poses,
            gaze_variance: first_key(frame, &["gaze_variance", "gazeVariance"]).and_then(|v| v.as_f64()),
        });
    }

    match serde_json::to_value(NormalizedHuman { frames: normalized }) {
        Ok(data) => MLAnalysisResult::ok(MODEL_NAME, data),
        Err(e) => MLAnalysisResult::failed(MODEL_NAME, e.to_string()),
    }
}

fn collect_records<T>(frame: &Value, keys: &[&str], mut parse: impl FnMut(&Value) -> Option<T>) -> Vec<T> {
    first_key(frame, keys)
        .and_then(|v| v.as_array())
        .map(|records| records.iter().filter_map(|r| parse(r)).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_adapt_human_frames() {
        let raw = json!({
            "frames": [{
                "frame": 10,
                "timestamp": 2.0,
                "faces": [{"bbox": [0, 0, 50, 50]}],
                "expressions": [{"emotion": "happy", "confidence": 0.8, "intensity": 0.6}],
                "gestures": [{"gesture": "thumbs_up", "confidence": 0.7, "target": "camera"}],
                "poses": [{"bbox": {"x": 0.0, "y": 0.0, "width": 100.0, "height": 300.0}, "confidence": 0.9}]
            }]
        });
        let result = adapt_human_analysis(&raw);
        assert!(result.success);

        let human: NormalizedHuman = serde_json::from_value(result.data).unwrap();
        let frame = &human.frames[0];
        assert_eq!(frame.face_count, 1);
        assert_eq!(frame.expressions[0].emotion, "happy");
        assert_eq!(frame.gestures[0].label, "thumbs_up");
        assert_eq!(frame.gestures[0].target.as_deref(), Some("camera"));
        assert!(frame.poses[0].bbox.is_some());
    }

    #[test]
    fn test_expression_key_variant() {
        let raw = json!({
            "results": [{"frame": 0, "emotions": [{"expression": "surprised", "score": 0.6}]}]
        });
        let result = adapt_human_analysis(&raw);
        let human: NormalizedHuman = serde_json::from_value(result.data).unwrap();
        assert_eq!(human.frames[0].expressions[0].emotion, "surprised");
        assert_eq!(human.frames[0].expressions[0].confidence, 0.6);
    }

    #[test]
    fn test_adapt_human_unrecognized() {
        let result = adapt_human_analysis(&json!([1, 2, 3]));
        assert!(!result.success);
    }
}
