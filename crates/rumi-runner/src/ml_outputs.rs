//! Loading pre-populated analyzer outputs from disk.
//!
//! Analyzer runs happen outside this process. Their raw outputs land in
//! `<ml_dir>/<video_id>/<model>.json` and flow through the adapters here.
//! A missing or malformed file degrades that modality, never the pipeline.

use std::collections::BTreeMap;
use std::path::Path;

use rumi_fusion::adapters;
use rumi_models::{MLAnalysisResult, VideoId, VideoMetadata, EXPECTED_ANALYZERS};
use tracing::{info, warn};

use crate::error::{RunnerError, RunnerResult};

/// Load and adapt every analyzer output present for a video.
pub fn load_ml_results(
    ml_dir: &Path,
    video_id: &VideoId,
) -> BTreeMap<String, MLAnalysisResult> {
    let video_dir = ml_dir.join(video_id.as_str());
    let mut results = BTreeMap::new();

    for model in EXPECTED_ANALYZERS {
        let path = video_dir.join(format!("{}.json", model));
        let raw = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => {
                warn!(model, path = %path.display(), "Analyzer output not found");
                continue;
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(model, error = %e, "Analyzer output is not valid JSON");
                results.insert(
                    model.to_string(),
                    MLAnalysisResult::failed(model, format!("invalid JSON: {}", e)),
                );
                continue;
            }
        };

        let adapted = match model {
            "object_tracking" => adapters::adapt_object_tracking(&value),
            "speech" => adapters::adapt_speech(&value),
            "human_analysis" => adapters::adapt_human_analysis(&value),
            "ocr" => adapters::adapt_ocr(&value),
            "scene_detection" => adapters::adapt_scene_detection(&value),
            _ => unreachable!("unknown analyzer {model}"),
        };
        results.insert(model.to_string(), adapted);
    }

    info!(video_id = %video_id, loaded = results.len(), "Analyzer outputs loaded");
    results
}

/// Load stored metadata for legacy mode (`<ml_dir>/<video_id>/metadata.json`).
pub fn load_metadata(ml_dir: &Path, video_id: &VideoId) -> RunnerResult<VideoMetadata> {
    let path = ml_dir.join(video_id.as_str()).join("metadata.json");
    let raw = std::fs::read_to_string(&path).map_err(|_| {
        RunnerError::ml_pipeline(format!(
            "no metadata found for video {} at {}",
            video_id,
            path.display()
        ))
    })?;
    let metadata: VideoMetadata = serde_json::from_str(&raw)?;
    Ok(metadata)
}
