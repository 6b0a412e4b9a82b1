//! Prompt context assembly.
//!
//! Each analysis receives `{precomputed_metrics, timelines, metadata,
//! duration}` with the timelines projected down to the modalities that
//! analysis actually reads. The compact serialization must stay under
//! 200 KB; oversized contexts walk a compression ladder and record the
//! level that finally fit.

use std::collections::BTreeMap;

use rumi_fusion::FeatureBundle;
use rumi_models::{AnalysisType, Modality, TemporalMarkers, TimelineEntry, UnifiedAnalysis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Compact-JSON size budget for a context, bytes.
pub const CONTEXT_SIZE_LIMIT: usize = 200 * 1024;
/// Per-modality entry cap applied at the second compression tier.
const CAP_PER_MODALITY: usize = 50;
/// Object-timeline downsample budget for person framing.
const FRAMING_OBJECT_BUDGET: usize = 30;

/// Compression applied to fit the size budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionLevel {
    None,
    DropDescriptions,
    CapEntries,
    SummaryCounts,
}

/// The assembled context for one analysis.
#[derive(Debug, Clone, Serialize)]
pub struct PromptContext {
    pub precomputed_metrics: serde_json::Value,
    pub timelines: BTreeMap<&'static str, serde_json::Value>,
    pub metadata: serde_json::Value,
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal_markers: Option<TemporalMarkers>,
    #[serde(skip)]
    pub compression: CompressionLevel,
}

impl PromptContext {
    /// Compact serialized form sent to the model.
    pub fn to_compact_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn size_bytes(&self) -> usize {
        self.to_compact_json().len()
    }
}

/// Modalities each analysis reads.
fn modalities_for(analysis: AnalysisType) -> &'static [Modality] {
    match analysis {
        AnalysisType::CreativeDensity => {
            &[Modality::TextOverlay, Modality::Sticker, Modality::SceneChange, Modality::Object]
        }
        AnalysisType::EmotionalJourney => &[Modality::Expression, Modality::Gesture],
        AnalysisType::PersonFraming => &[Modality::Object, Modality::Pose, Modality::Expression],
        AnalysisType::ScenePacing => &[Modality::SceneChange],
        AnalysisType::SpeechAnalysis => &[Modality::Speech, Modality::Gesture],
        AnalysisType::VisualOverlay => {
            &[Modality::TextOverlay, Modality::Sticker, Modality::Speech, Modality::Gesture]
        }
        AnalysisType::MetadataAnalysis => &[],
    }
}

/// Build the context for one analysis, applying compression tiers until the
/// compact serialization fits the budget.
pub fn build_context(
    analysis: &UnifiedAnalysis,
    analysis_type: AnalysisType,
    bundle: &FeatureBundle,
    include_markers: bool,
) -> PromptContext {
    let tiers = [
        CompressionLevel::None,
        CompressionLevel::DropDescriptions,
        CompressionLevel::CapEntries,
        CompressionLevel::SummaryCounts,
    ];

    let mut context = assemble(analysis, analysis_type, bundle, include_markers, tiers[0]);
    for tier in tiers.into_iter().skip(1) {
        if context.size_bytes() <= CONTEXT_SIZE_LIMIT {
            break;
        }
        warn!(
            analysis = %analysis_type,
            size_kb = context.size_bytes() / 1024,
            tier = ?tier,
            "Context over budget, escalating compression"
        );
        context = assemble(analysis, analysis_type, bundle, include_markers, tier);
    }

    debug!(
        analysis = %analysis_type,
        size_kb = context.size_bytes() / 1024,
        compression = ?context.compression,
        "Prompt context assembled"
    );
    context
}

fn assemble(
    analysis: &UnifiedAnalysis,
    analysis_type: AnalysisType,
    bundle: &FeatureBundle,
    include_markers: bool,
    level: CompressionLevel,
) -> PromptContext {
    let mut timelines = BTreeMap::new();

    for modality in modalities_for(analysis_type) {
        let mut entries: Vec<&TimelineEntry> = analysis.timeline.by_modality(*modality).collect();

        // Person framing reads a downsampled object timeline regardless of
        // compression tier.
        if analysis_type == AnalysisType::PersonFraming && *modality == Modality::Object {
            entries = downsample(entries, FRAMING_OBJECT_BUDGET);
        }

        let value = match level {
            CompressionLevel::SummaryCounts => serde_json::json!({ "count": entries.len() }),
            CompressionLevel::CapEntries => {
                let capped = downsample(entries, CAP_PER_MODALITY);
                serde_json::to_value(capped).unwrap_or_default()
            }
            _ => serde_json::to_value(entries).unwrap_or_default(),
        };
        timelines.insert(modality.as_str(), value);
    }

    let mut metadata = serde_json::to_value(&analysis.metadata).unwrap_or_default();
    if level >= CompressionLevel::DropDescriptions {
        if let Some(obj) = metadata.as_object_mut() {
            obj.remove("description");
        }
    }

    PromptContext {
        precomputed_metrics: bundle.data.clone(),
        timelines,
        metadata,
        duration: analysis.duration(),
        temporal_markers: if include_markers { analysis.temporal_markers.clone() } else { None },
        compression: level,
    }
}

/// Evenly spaced subset of at most `budget` entries, order preserved.
fn downsample<T>(entries: Vec<T>, budget: usize) -> Vec<T> {
    if entries.len() <= budget || budget == 0 {
        return entries;
    }
    let step = entries.len() as f64 / budget as f64;
    let mut picked = Vec::with_capacity(budget);
    let mut next = 0.0;
    for (i, entry) in entries.into_iter().enumerate() {
        if i as f64 >= next && picked.len() < budget {
            picked.push(entry);
            next += step;
        }
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumi_models::{
        MLAnalysisResult, Payload, Timeline, Timestamp, VideoMetadata, WarningCounters,
    };
    use std::collections::BTreeMap as Map;

    fn analysis_with_objects(count: usize) -> UnifiedAnalysis {
        let metadata = VideoMetadata::new("ctx-test", "https://example.com/v", 60.0)
            .with_description("a caption with words");
        let mut timeline = Timeline::new();
        for i in 0..count {
            timeline.insert(TimelineEntry::new(
                Timestamp::new(i as f64 * 60.0 / count.max(1) as f64).unwrap(),
                None,
                Payload::Object {
                    class: "person".into(),
                    confidence: 0.9,
                    bbox: None,
                    track_id: Some(i as i64),
                },
            ));
        }
        UnifiedAnalysis::new(metadata, timeline, Map::<String, MLAnalysisResult>::new())
    }

    fn bundle() -> FeatureBundle {
        let analysis = analysis_with_objects(0);
        let (bundles, _warnings): (_, WarningCounters) =
            rumi_fusion::compute_all(&analysis, &rumi_fusion::PrecomputeConfig::default());
        bundles[&AnalysisType::PersonFraming].clone()
    }

    #[test]
    fn test_framing_object_timeline_downsampled() {
        let analysis = analysis_with_objects(200);
        let context = build_context(&analysis, AnalysisType::PersonFraming, &bundle(), false);
        let objects = context.timelines["object"].as_array().unwrap();
        assert!(objects.len() <= 30);
        assert_eq!(context.compression, CompressionLevel::None);
    }

    #[test]
    fn test_metadata_analysis_gets_no_timelines() {
        let analysis = analysis_with_objects(5);
        let context = build_context(&analysis, AnalysisType::MetadataAnalysis, &bundle(), false);
        assert!(context.timelines.is_empty());
        assert_eq!(context.duration, 60.0);
    }

    #[test]
    fn test_markers_included_when_requested() {
        let mut analysis = analysis_with_objects(1);
        analysis.temporal_markers =
            Some(rumi_models::TemporalMarkers::empty(analysis.video_id.clone(), 60.0));
        let with = build_context(&analysis, AnalysisType::CreativeDensity, &bundle(), true);
        let without = build_context(&analysis, AnalysisType::CreativeDensity, &bundle(), false);
        assert!(with.temporal_markers.is_some());
        assert!(without.temporal_markers.is_none());
    }

    #[test]
    fn test_downsample_keeps_order_and_bounds() {
        let entries: Vec<usize> = (0..100).collect();
        let picked = downsample(entries, 10);
        assert_eq!(picked.len(), 10);
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(picked[0], 0);
    }

    #[test]
    fn test_compact_json_is_parseable() {
        let analysis = analysis_with_objects(3);
        let context = build_context(&analysis, AnalysisType::CreativeDensity, &bundle(), false);
        let parsed: serde_json::Value = serde_json::from_str(&context.to_compact_json()).unwrap();
        assert!(parsed.get("precomputed_metrics").is_some());
        assert!(parsed.get("duration").is_some());
    }
}
