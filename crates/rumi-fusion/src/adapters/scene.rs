//! Scene detector adapter.

use rumi_models::MLAnalysisResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::first_key;

pub const MODEL_NAME: &str = "scene_detection";

/// One detected shot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shot {
    pub start_time: f64,
    pub end_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_frame: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_frame: Option<u64>,
    /// Transition into this shot (`cut` when the detector does not say).
    #[serde(default = "default_transition")]
    pub transition: String,
}

fn default_transition() -> String {
    "cut".to_string()
}

/// Normalized scene-detection payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedScenes {
    pub shots: Vec<Shot>,
}

/// Normalize raw scene detector output (`{shots: [...]}` or `{scenes: [...]}`).
pub fn adapt_scene_detection(raw: &Value) -> MLAnalysisResult {
    let Some(shots) = first_key(raw, &["shots", "scenes"]).and_then(|v| v.as_array()) else {
        warn!("Scene detector output missing shot list");
        return MLAnalysisResult::failed(MODEL_NAME, "unrecognized scene detector structure");
    };

    let mut normalized = Vec::with_capacity(shots.len());
    for shot in shots {
        let (Some(start_time), Some(end_time)) = (
            first_key(shot, &["start_time", "startTime", "start"]).and_then(|v| v.as_f64()),
            first_key(shot, &["end_time", "endTime", "end"]).and_then(|v| v.as_f64()),
        ) else {
            continue;
        };

        normalized.push(Shot {
            start_time,
            end_time,
            start_frame: first_key(shot, &["start_frame", "startFrame"]).and_then(|v| v.as_u64()),
            end_frame: first_key(shot, &["end_frame", "endFrame"]).and_then(|v| v.as_u64()),
            transition: first_key(shot, &["transition", "kind"])
                .and_then(|v| v.as_str())
                .unwrap_or("cut")
                .to_string(),
        });
    }

    match serde_json::to_value(NormalizedScenes { shots: normalized }) {
        Ok(data) => MLAnalysisResult::ok(MODEL_NAME, data),
        Err(e) => MLAnalysisResult::failed(MODEL_NAME, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_adapt_shots() {
        let raw = json!({
            "shots": [
                {"start_time": 0.0, "end_time": 2.5, "start_frame": 0, "end_frame": 75},
                {"startTime": 2.5, "endTime": 6.0, "transition": "dissolve"}
            ]
        });
        let result = adapt_scene_detection(&raw);
        assert!(result.success);

        let scenes: NormalizedScenes = serde_json::from_value(result.data).unwrap();
        assert_eq!(scenes.shots.len(), 2);
        assert_eq!(scenes.shots[0].transition, "cut");
        assert_eq!(scenes.shots[1].transition, "dissolve");
        assert_eq!(scenes.shots[0].end_frame, Some(75));
    }

    #[test]
    fn test_adapt_scenes_key_variant() {
        let raw = json!({"scenes": [{"start": 0.0, "end": 1.0}]});
        let result = adapt_scene_detection(&raw);
        assert!(result.success);
        let scenes: NormalizedScenes = serde_json::from_value(result.data).unwrap();
        assert_eq!(scenes.shots.len(), 1);
    }

    #[test]
    fn test_adapt_unrecognized() {
        let result = adapt_scene_detection(&json!({"cuts": [1.0, 2.0]}));
        assert!(!result.success);
    }

    #[test]
    fn test_timeless_shot_skipped() {
        let raw = json!({"shots": [{"start_frame": 0}]});
        let result = adapt_scene_detection(&raw);
        let scenes: NormalizedScenes = serde_json::from_value(result.data).unwrap();
        assert!(scenes.shots.is_empty());
    }
}
