//! Per-video FPS context registry.
//!
//! A single video flows through four distinct frame-rate contexts: the
//! original encode (24-60 fps), adaptive frame extraction (2-5 fps),
//! model-internal sampling, and the 1 Hz aggregation used for output
//! buckets. Frame indices only convert to seconds through the original
//! fps; everything else is sampling metadata that must never leak into a
//! comparison.
//!
//! The registry is process-wide, initialized on demand, and write-once per
//! video id.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Conservative fallback when a video has no registered contexts.
pub const DEFAULT_ORIGINAL_FPS: f64 = 30.0;
/// Fallback extraction rate matching the historical pipeline default.
pub const DEFAULT_EXTRACTION_FPS: f64 = 1.0;

/// Frame-rate contexts recorded for one video.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct FpsContexts {
    /// The fps the video was encoded at. Sole basis for frame conversion.
    pub original_fps: f64,
    /// Rate frames were extracted at for ML analysis.
    pub extraction_fps: f64,
    /// Model-internal sampling rates by analyzer name. Metadata only.
    #[serde(default)]
    pub sampling_fps: HashMap<String, f64>,
    /// Aggregation rate for per-second output buckets.
    pub aggregation_fps: f64,
}

impl FpsContexts {
    /// Contexts for a video with a known original fps.
    pub fn with_original(original_fps: f64, extraction_fps: f64) -> Self {
        Self {
            original_fps,
            extraction_fps,
            sampling_fps: HashMap::new(),
            aggregation_fps: 1.0,
        }
    }

    /// Conservative defaults used when no registry entry exists.
    pub fn conservative() -> Self {
        Self::with_original(DEFAULT_ORIGINAL_FPS, DEFAULT_EXTRACTION_FPS)
    }
}

impl Default for FpsContexts {
    fn default() -> Self {
        Self::conservative()
    }
}

fn registry() -> &'static RwLock<HashMap<String, FpsContexts>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, FpsContexts>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register fps contexts for a video. Write-once: a second registration for
/// the same id is ignored with a warning.
pub fn register(video_id: &str, contexts: FpsContexts) {
    if contexts.original_fps <= 0.0 {
        warn!(video_id, fps = contexts.original_fps, "Refusing non-positive original fps");
        return;
    }
    let mut map = registry().write().expect("fps registry poisoned");
    if map.contains_key(video_id) {
        warn!(video_id, "FPS contexts already registered, keeping first registration");
        return;
    }
    map.insert(video_id.to_string(), contexts);
}

/// Look up fps contexts for a video, falling back to conservative defaults
/// with a warning when the video was never registered.
pub fn contexts_for(video_id: &str) -> FpsContexts {
    let map = registry().read().expect("fps registry poisoned");
    match map.get(video_id) {
        Some(contexts) => contexts.clone(),
        None => {
            warn!(
                video_id,
                original_fps = DEFAULT_ORIGINAL_FPS,
                extraction_fps = DEFAULT_EXTRACTION_FPS,
                "No FPS registry entry, using conservative defaults"
            );
            FpsContexts::conservative()
        }
    }
}

/// The original fps for a video, used for frame index conversion.
pub fn original_fps(video_id: &str) -> f64 {
    contexts_for(video_id).original_fps
}

/// Convert a frame index at the video's original fps to seconds.
pub fn frame_to_seconds(video_id: &str, frame: u64) -> f64 {
    crate::timestamp::frame_to_seconds(frame, original_fps(video_id))
}
