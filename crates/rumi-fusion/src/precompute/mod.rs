//! Precompute engine: seven deterministic feature extractors over the
//! unified timeline.
//!
//! Each extractor is a pure function of `(Timeline, VideoMetadata)`. The
//! dispatcher isolates them: a panicking extractor yields a fallback bundle
//! with minimal counts instead of aborting the pipeline. Extraction can run
//! sequentially or on a bounded blocking pool.

pub mod creative_density;
pub mod emotional_journey;
pub mod metadata_analysis;
pub mod person_framing;
pub mod scene_pacing;
pub mod speech;
pub mod stats;
pub mod visual_overlay;

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use rumi_models::{AnalysisType, Modality, Timeline, UnifiedAnalysis, VideoMetadata, WarningCounters};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, error};

/// Tunable constants for the extractors.
#[derive(Debug, Clone)]
pub struct PrecomputeConfig {
    /// Weights for engagement, hook strength, hashtag relevance.
    pub viral_weights: (f64, f64, f64),
    /// Weights for bbox area, placement, contrast in the readability score.
    pub readability_weights: (f64, f64, f64),
    /// Run extractors on a bounded blocking pool.
    pub parallel: bool,
    /// Worker cap for the parallel path.
    pub max_workers: usize,
}

impl Default for PrecomputeConfig {
    fn default() -> Self {
        Self {
            viral_weights: (0.5, 0.3, 0.2),
            readability_weights: (0.4, 0.4, 0.2),
            parallel: false,
            max_workers: num_cpus::get().min(4),
        }
    }
}

/// One analysis's features, ready for prompt context assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureBundle {
    pub analysis: AnalysisType,
    /// The extractor's typed features, serialized.
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
    /// Fraction of expected analyzers that fed this bundle.
    pub data_completeness: f64,
}

impl FeatureBundle {
    fn from_features<T: Serialize>(
        analysis: AnalysisType,
        features: &T,
        data_completeness: f64,
    ) -> Self {
        match serde_json::to_value(features) {
            Ok(data) => Self { analysis, data, error: None, fallback: false, data_completeness },
            Err(e) => Self::fallback_for(analysis, &Timeline::new(), e.to_string(), data_completeness),
        }
    }

    /// Minimal-counts bundle emitted when an extractor fails.
    fn fallback_for(
        analysis: AnalysisType,
        timeline: &Timeline,
        error: String,
        data_completeness: f64,
    ) -> Self {
        let mut per_modality = BTreeMap::new();
        for modality in [
            Modality::SceneChange,
            Modality::Object,
            Modality::Pose,
            Modality::Expression,
            Modality::Gesture,
            Modality::TextOverlay,
            Modality::Sticker,
            Modality::Speech,
        ] {
            per_modality.insert(modality.as_str(), timeline.by_modality(modality).count());
        }
        Self {
            analysis,
            data: serde_json::json!({
                "total_entries": timeline.len(),
                "entries_by_modality": per_modality,
            }),
            error: Some(error),
            fallback: true,
            data_completeness,
        }
    }
}

/// Run one extractor, containing any panic.
fn compute_one(
    analysis_type: AnalysisType,
    timeline: &Timeline,
    metadata: &VideoMetadata,
    completeness: f64,
    config: &PrecomputeConfig,
) -> FeatureBundle {
    let result = catch_unwind(AssertUnwindSafe(|| match analysis_type {
        AnalysisType::CreativeDensity => FeatureBundle::from_features(
            analysis_type,
            &creative_density::compute(timeline, metadata),
            completeness,
        ),
        AnalysisType::EmotionalJourney => FeatureBundle::from_features(
            analysis_type,
            &emotional_journey::compute(timeline, metadata),
            completeness,
        ),
        AnalysisType::PersonFraming => FeatureBundle::from_features(
            analysis_type,
            &person_framing::compute(timeline, metadata),
            completeness,
        ),
        AnalysisType::ScenePacing => FeatureBundle::from_features(
            analysis_type,
            &scene_pacing::compute(timeline, metadata),
            completeness,
        ),
        AnalysisType::SpeechAnalysis => FeatureBundle::from_features(
            analysis_type,
            &speech::compute(timeline, metadata),
            completeness,
        ),
        AnalysisType::VisualOverlay => FeatureBundle::from_features(
            analysis_type,
            &visual_overlay::compute(timeline, metadata, config),
            completeness,
        ),
        AnalysisType::MetadataAnalysis => FeatureBundle::from_features(
            analysis_type,
            &metadata_analysis::compute(timeline, metadata, config),
            completeness,
        ),
    }));

    match result {
        Ok(bundle) => bundle,
        Err(_) => {
            error!(analysis = %analysis_type, "Feature extractor panicked, emitting fallback bundle");
            FeatureBundle::fallback_for(
                analysis_type,
                timeline,
                "extractor panicked".to_string(),
                completeness,
            )
        }
    }
}

/// Compute all seven feature bundles sequentially.
pub fn compute_all(
    analysis: &UnifiedAnalysis,
    config: &PrecomputeConfig,
) -> (BTreeMap<AnalysisType, FeatureBundle>, WarningCounters) {
    let mut warnings = WarningCounters::new();
    let completeness = analysis.data_completeness();

    let mut bundles = BTreeMap::new();
    for analysis_type in AnalysisType::ALL {
        let bundle =
            compute_one(analysis_type, &analysis.timeline, &analysis.metadata, completeness, config);
        if bundle.fallback {
            warnings.precompute_fallback += 1;
        }
        debug!(analysis = %analysis_type, fallback = bundle.fallback, "Feature bundle computed");
        bundles.insert(analysis_type, bundle);
    }
    (bundles, warnings)
}

/// Compute all seven feature bundles on a bounded blocking pool.
///
/// Results assemble deterministically regardless of completion order, and
/// every analysis gets a bundle: a task that dies mid-flight yields the
/// same fallback shape a panicking extractor would.
pub async fn compute_all_parallel(
    analysis: Arc<UnifiedAnalysis>,
    config: PrecomputeConfig,
) -> (BTreeMap<AnalysisType, FeatureBundle>, WarningCounters) {
    let semaphore = Arc::new(Semaphore::new(config.max_workers.max(1)));
    let completeness = analysis.data_completeness();
    let config = Arc::new(config);

    let handles: Vec<(AnalysisType, tokio::task::JoinHandle<FeatureBundle>)> = AnalysisType::ALL
        .into_iter()
        .map(|analysis_type| {
            let analysis = Arc::clone(&analysis);
            let config = Arc::clone(&config);
            let semaphore = Arc::clone(&semaphore);
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let blocking_analysis = Arc::clone(&analysis);
                tokio::task::spawn_blocking(move || {
                    compute_one(
                        analysis_type,
                        &blocking_analysis.timeline,
                        &blocking_analysis.metadata,
                        completeness,
                        &config,
                    )
                })
                .await
                .unwrap_or_else(|e| {
                    error!(analysis = %analysis_type, error = %e, "Blocking precompute task died");
                    FeatureBundle::fallback_for(
                        analysis_type,
                        &analysis.timeline,
                        format!("task failed: {}", e),
                        completeness,
                    )
                })
            });
            (analysis_type, handle)
        })
        .collect();

    join_bundles(handles, &analysis.timeline, completeness).await
}

/// Await per-analysis tasks, substituting a fallback bundle for any task
/// that panicked or was aborted so every analysis type stays present.
async fn join_bundles(
    handles: Vec<(AnalysisType, tokio::task::JoinHandle<FeatureBundle>)>,
    timeline: &Timeline,
    completeness: f64,
) -> (BTreeMap<AnalysisType, FeatureBundle>, WarningCounters) {
    let mut warnings = WarningCounters::new();
    let mut bundles = BTreeMap::new();
    for (analysis_type, handle) in handles {
        let bundle = match handle.await {
            Ok(bundle) => bundle,
            Err(e) => {
                error!(analysis = %analysis_type, error = %e, "Precompute task join error");
                FeatureBundle::fallback_for(
                    analysis_type,
                    timeline,
                    format!("task failed: {}", e),
                    completeness,
                )
            }
        };
        if bundle.fallback {
            warnings.precompute_fallback += 1;
        }
        bundles.insert(analysis_type, bundle);
    }
    (bundles, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumi_models::{MLAnalysisResult, Payload, Timestamp, TimelineEntry};

    fn sample_analysis() -> UnifiedAnalysis {
        let metadata = VideoMetadata::new("precompute-test", "https://example.com/v", 10.0);
        let mut timeline = Timeline::new();
        timeline.insert(TimelineEntry::new(
            Timestamp::new(1.0).unwrap(),
            Timestamp::new(3.0),
            Payload::Speech {
                text: "hello world".into(),
                language: "en".into(),
                confidence: 0.9,
                words: Vec::new(),
            },
        ));
        let mut results = BTreeMap::new();
        results.insert(
            "speech".to_string(),
            MLAnalysisResult::ok("speech", serde_json::json!({})),
        );
        UnifiedAnalysis::new(metadata, timeline, results)
    }

    #[test]
    fn test_all_seven_bundles_produced() {
        let analysis = sample_analysis();
        let (bundles, warnings) = compute_all(&analysis, &PrecomputeConfig::default());
        assert_eq!(bundles.len(), 7);
        assert_eq!(warnings.precompute_fallback, 0);
        for bundle in bundles.values() {
            assert!(!bundle.fallback);
            assert!(bundle.data.is_object());
        }
    }

    #[test]
    fn test_speech_bundle_values() {
        let analysis = sample_analysis();
        let (bundles, _) = compute_all(&analysis, &PrecomputeConfig::default());
        let speech = &bundles[&AnalysisType::SpeechAnalysis];
        assert_eq!(speech.data["word_count"], 2);
        assert!((speech.data["speech_coverage"].as_f64().unwrap() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_data_completeness_propagates() {
        let analysis = sample_analysis();
        let (bundles, _) = compute_all(&analysis, &PrecomputeConfig::default());
        // Only one of five analyzers present.
        for bundle in bundles.values() {
            assert!((bundle.data_completeness - 0.2).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_parallel_matches_sequential_set() {
        let analysis = Arc::new(sample_analysis());
        let (parallel, _) =
            compute_all_parallel(Arc::clone(&analysis), PrecomputeConfig::default()).await;
        let (sequential, _) = compute_all(&analysis, &PrecomputeConfig::default());
        assert_eq!(parallel.len(), sequential.len());
        assert_eq!(
            parallel.keys().collect::<Vec<_>>(),
            sequential.keys().collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_aborted_task_still_yields_all_bundles() {
        let analysis = sample_analysis();
        let config = PrecomputeConfig::default();
        let completeness = analysis.data_completeness();

        // One task parks forever and gets aborted; the rest run normally.
        let handles: Vec<(AnalysisType, tokio::task::JoinHandle<FeatureBundle>)> =
            AnalysisType::ALL
                .into_iter()
                .map(|analysis_type| {
                    let timeline = analysis.timeline.clone();
                    let metadata = analysis.metadata.clone();
                    let config = config.clone();
                    let handle = tokio::spawn(async move {
                        if analysis_type == AnalysisType::ScenePacing {
                            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                        }
                        compute_one(analysis_type, &timeline, &metadata, completeness, &config)
                    });
                    (analysis_type, handle)
                })
                .collect();
        handles
            .iter()
            .find(|(t, _)| *t == AnalysisType::ScenePacing)
            .unwrap()
            .1
            .abort();

        let (bundles, warnings) = join_bundles(handles, &analysis.timeline, completeness).await;

        assert_eq!(bundles.len(), AnalysisType::ALL.len());
        for analysis_type in AnalysisType::ALL {
            assert!(bundles.contains_key(&analysis_type), "missing {}", analysis_type);
        }
        let aborted = &bundles[&AnalysisType::ScenePacing];
        assert!(aborted.fallback);
        assert!(aborted.error.is_some());
        assert!(warnings.precompute_fallback >= 1);
    }
}
