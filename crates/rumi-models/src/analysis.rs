//! Analysis result models: per-analyzer outputs and the unified record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::markers::TemporalMarkers;
use crate::timeline::Timeline;
use crate::video::{VideoId, VideoMetadata};

/// The analyzers the pipeline expects output from.
pub const EXPECTED_ANALYZERS: [&str; 5] = ["object_tracking", "speech", "human_analysis", "ocr", "scene_detection"];

/// The seven structured analyses the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    CreativeDensity,
    EmotionalJourney,
    PersonFraming,
    ScenePacing,
    SpeechAnalysis,
    VisualOverlay,
    MetadataAnalysis,
}

impl AnalysisType {
    /// Fixed execution order for the LLM orchestrator.
    pub const ALL: [AnalysisType; 7] = [
        AnalysisType::CreativeDensity,
        AnalysisType::EmotionalJourney,
        AnalysisType::PersonFraming,
        AnalysisType::ScenePacing,
        AnalysisType::SpeechAnalysis,
        AnalysisType::VisualOverlay,
        AnalysisType::MetadataAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::CreativeDensity => "creative_density",
            AnalysisType::EmotionalJourney => "emotional_journey",
            AnalysisType::PersonFraming => "person_framing",
            AnalysisType::ScenePacing => "scene_pacing",
            AnalysisType::SpeechAnalysis => "speech_analysis",
            AnalysisType::VisualOverlay => "visual_overlay",
            AnalysisType::MetadataAnalysis => "metadata_analysis",
        }
    }

    /// Per-analysis LLM timeout in seconds. Visual overlay gets the
    /// largest budget; its contexts run biggest.
    pub fn timeout_secs(&self) -> u64 {
        match self {
            AnalysisType::EmotionalJourney | AnalysisType::SpeechAnalysis => 90,
            AnalysisType::VisualOverlay => 120,
            _ => 60,
        }
    }

    /// Legacy block-name prefix used by historical prompt outputs.
    pub fn legacy_prefix(&self) -> &'static str {
        match self {
            AnalysisType::CreativeDensity => "density",
            AnalysisType::EmotionalJourney => "emotional",
            AnalysisType::PersonFraming => "framing",
            AnalysisType::ScenePacing => "pacing",
            AnalysisType::SpeechAnalysis => "speech",
            AnalysisType::VisualOverlay => "overlay",
            AnalysisType::MetadataAnalysis => "metadata",
        }
    }
}

impl std::fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized output of one perceptual analyzer.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MLAnalysisResult {
    pub model_name: String,
    #[serde(default)]
    pub model_version: String,
    pub success: bool,
    /// Normalized analyzer payload. Always a valid JSON object, even on
    /// failure.
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall time the analyzer took, seconds.
    #[serde(default)]
    pub processing_time: f64,
}

impl MLAnalysisResult {
    /// Successful result with normalized data.
    pub fn ok(model_name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            model_name: model_name.into(),
            model_version: String::new(),
            success: true,
            data,
            error: None,
            processing_time: 0.0,
        }
    }

    /// Failed result carrying an empty-but-valid data object.
    pub fn failed(model_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            model_version: String::new(),
            success: false,
            data: serde_json::json!({}),
            error: Some(error.into()),
            processing_time: 0.0,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = version.into();
        self
    }

    pub fn with_processing_time(mut self, seconds: f64) -> Self {
        self.processing_time = seconds;
        self
    }
}

/// The fused per-video record: metadata, unified timeline, analyzer
/// outputs, and optional temporal markers.
///
/// Constructed once all adapters complete, extended with markers, then
/// treated as read-only by feature extraction and prompt building.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UnifiedAnalysis {
    pub video_id: VideoId,
    pub metadata: VideoMetadata,
    pub timeline: Timeline,
    /// Keyed by model name; BTreeMap keeps serialization deterministic.
    pub ml_results: BTreeMap<String, MLAnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal_markers: Option<TemporalMarkers>,
    pub created_at: DateTime<Utc>,
}

impl UnifiedAnalysis {
    pub fn new(
        metadata: VideoMetadata,
        timeline: Timeline,
        ml_results: BTreeMap<String, MLAnalysisResult>,
    ) -> Self {
        Self {
            video_id: metadata.video_id.clone(),
            metadata,
            timeline,
            ml_results,
            temporal_markers: None,
            created_at: Utc::now(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.metadata.duration_seconds
    }

    /// True when every expected analyzer produced a successful result.
    pub fn is_complete(&self) -> bool {
        EXPECTED_ANALYZERS
            .iter()
            .all(|name| self.ml_results.get(*name).map(|r| r.success).unwrap_or(false))
    }

    /// Per-analyzer success map for the final report.
    pub fn completion_status(&self) -> BTreeMap<String, bool> {
        EXPECTED_ANALYZERS
            .iter()
            .map(|name| {
                let ok = self.ml_results.get(*name).map(|r| r.success).unwrap_or(false);
                (name.to_string(), ok)
            })
            .collect()
    }

    /// Fraction of expected analyzers that succeeded, in [0, 1].
    pub fn data_completeness(&self) -> f64 {
        let ok = EXPECTED_ANALYZERS
            .iter()
            .filter(|name| self.ml_results.get(**name).map(|r| r.success).unwrap_or(false))
            .count();
        ok as f64 / EXPECTED_ANALYZERS.len() as f64
    }
}
