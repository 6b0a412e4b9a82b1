//! Pipeline wiring: metadata, fusion, markers, precompute, LLM analyses,
//! and the final report.

use std::collections::BTreeMap;
use std::sync::Arc;

use rumi_fusion::{build_unified_analysis, extract_markers, FeatureBundle, PrecomputeConfig};
use rumi_insight::{
    AnalysisOutcome, CancelToken, LlmClient, Orchestrator, OrchestratorConfig,
};
use rumi_models::{fps, AnalysisType, UnifiedAnalysis, VideoId, VideoMetadata, WarningCounters};
use rumi_storage::InsightStore;
use serde_json::json;
use tracing::info;

use crate::config::Settings;
use crate::error::{RunnerError, RunnerResult};
use crate::ml_outputs;
use crate::progress;
use crate::source::VideoSource;

/// Result of a full pipeline run.
#[derive(Debug)]
pub struct PipelineReport {
    pub video_id: VideoId,
    pub success: bool,
    pub outcomes: Vec<AnalysisOutcome>,
    pub warnings: WarningCounters,
    pub summary: serde_json::Value,
}

/// The pipeline, generic over the LLM capability and video source so tests
/// run against stubs.
pub struct Pipeline<C: LlmClient> {
    settings: Settings,
    store: InsightStore,
    client: C,
}

impl<C: LlmClient> Pipeline<C> {
    pub fn new(settings: Settings, client: C) -> Self {
        let store = InsightStore::new(
            settings.unified_dir.clone(),
            settings.temporal_dir.clone(),
            settings.insights_dir.clone(),
        );
        Self { settings, store, client }
    }

    /// Full pipeline from a video URL: scrape metadata, then process.
    pub async fn run_url(
        &self,
        video_url: &str,
        source: &dyn VideoSource,
        cancel: &CancelToken,
    ) -> RunnerResult<PipelineReport> {
        progress::step("scraping_metadata", 0);
        let metadata = source.scrape(video_url).await?;
        progress::ok(&format!("Video ID: {}", metadata.video_id));

        self.run_with_metadata(metadata, cancel).await
    }

    /// Legacy mode: metadata and analyzer outputs already on disk.
    pub async fn run_video_id(
        &self,
        video_id: &str,
        cancel: &CancelToken,
    ) -> RunnerResult<PipelineReport> {
        let video_id = VideoId::from_string(video_id);
        let metadata = ml_outputs::load_metadata(&self.settings.ml_dir, &video_id)?;
        self.run_with_metadata(metadata, cancel).await
    }

    async fn run_with_metadata(
        &self,
        metadata: VideoMetadata,
        cancel: &CancelToken,
    ) -> RunnerResult<PipelineReport> {
        metadata.validate().map_err(RunnerError::Video)?;
        if metadata.duration_seconds > self.settings.max_video_duration {
            return Err(RunnerError::Video(format!(
                "video {} runs {:.0}s, over the {:.0}s limit",
                metadata.video_id, metadata.duration_seconds, self.settings.max_video_duration
            )));
        }

        fps::register(
            metadata.video_id.as_str(),
            fps::FpsContexts::with_original(
                metadata.original_fps.unwrap_or(fps::DEFAULT_ORIGINAL_FPS),
                fps::DEFAULT_EXTRACTION_FPS,
            ),
        );

        progress::step("loading_ml_outputs", 20);
        let ml_results = ml_outputs::load_ml_results(&self.settings.ml_dir, &metadata.video_id);

        progress::step("building_timeline", 50);
        let (mut analysis, mut warnings) = build_unified_analysis(metadata, ml_results);
        if self.settings.strict_mode && warnings.input_shape > 0 {
            return Err(RunnerError::ml_pipeline(format!(
                "strict mode: {} analyzer outputs had unrecognized structure",
                warnings.input_shape
            )));
        }

        progress::step("generating_temporal_markers", 60);
        let (markers, marker_warnings) = extract_markers(&analysis);
        warnings.merge(&marker_warnings);
        self.store.save_markers(&markers).await?;
        analysis.temporal_markers = Some(markers);

        progress::step("computing_features", 62);
        let (bundles, precompute_warnings) = self.compute_features(&analysis).await;
        warnings.merge(&precompute_warnings);

        progress::step("saving_analysis", 65);
        self.store.save_unified(&analysis).await?;

        progress::step("running_claude_prompts", 70);
        let orchestrator = Orchestrator::new(
            // The client is borrowed per run via a thin forwarder below.
            ClientRef(&self.client),
            self.store.clone(),
            OrchestratorConfig {
                prompt_delay: self.settings.prompt_delay,
                temporal_markers_enabled: self.settings.temporal_markers_enabled,
                timeout_override: None,
            },
        );
        let (outcomes, llm_warnings) = orchestrator.run(&analysis, &bundles, cancel).await;
        warnings.merge(&llm_warnings);

        if self.settings.strict_mode && warnings.schema_violation > 0 {
            return Err(RunnerError::external_api(format!(
                "strict mode: {} responses violated the block schema",
                warnings.schema_violation
            )));
        }

        progress::step("generating_report", 95);
        let report = build_report(
            &analysis,
            &outcomes,
            &warnings,
            self.settings.output_format_version,
        );
        progress::step("completed", 100);
        info!(video_id = %analysis.video_id, "Pipeline complete");

        Ok(PipelineReport {
            video_id: analysis.video_id.clone(),
            success: report["success"].as_bool().unwrap_or(false),
            outcomes,
            warnings,
            summary: report,
        })
    }

    async fn compute_features(
        &self,
        analysis: &UnifiedAnalysis,
    ) -> (BTreeMap<AnalysisType, FeatureBundle>, WarningCounters) {
        let config = PrecomputeConfig {
            parallel: self.settings.use_ml_precompute,
            ..PrecomputeConfig::default()
        };
        if config.parallel {
            rumi_fusion::compute_all_parallel(Arc::new(analysis.clone()), config).await
        } else {
            rumi_fusion::compute_all(analysis, &config)
        }
    }
}

/// Borrow-forwarding wrapper so the orchestrator can own its client value
/// while the pipeline keeps the real one.
struct ClientRef<'a, C: LlmClient>(&'a C);

#[async_trait::async_trait]
impl<'a, C: LlmClient> LlmClient for ClientRef<'a, C> {
    async fn send_prompt(
        &self,
        prompt: &str,
        context: &rumi_insight::CallContext,
        timeout: std::time::Duration,
    ) -> rumi_insight::InsightResult<rumi_insight::LlmResponse> {
        self.0.send_prompt(prompt, context, timeout).await
    }
}

/// Final JSON summary: per-analysis status, warning counters, and overall
/// success.
fn build_report(
    analysis: &UnifiedAnalysis,
    outcomes: &[AnalysisOutcome],
    warnings: &WarningCounters,
    version: crate::config::OutputFormatVersion,
) -> serde_json::Value {
    let successful = outcomes.iter().filter(|o| o.success).count();
    let all_succeeded = successful == outcomes.len() && !outcomes.is_empty();

    // The v1 summary is the flat legacy shape older consumers parse.
    if version == crate::config::OutputFormatVersion::V1 {
        return json!({
            "success": true,
            "video_id": analysis.video_id,
            "prompts_completed": successful,
            "prompts_total": outcomes.len(),
            "warning_total": warnings.total(),
        });
    }

    let analyses: BTreeMap<String, serde_json::Value> = outcomes
        .iter()
        .map(|o| {
            (
                o.analysis.to_string(),
                json!({
                    "success": o.success,
                    "blocks_present": o.blocks_present.len(),
                    "blocks_missing": o.blocks_missing,
                    "markers_included": o.rollout.markers_included,
                    "processing_time": o.processing_time,
                    "error": o.error,
                }),
            )
        })
        .collect();

    // Per-call LLM failures are local: the pipeline itself succeeded if it
    // ran to completion, and the per-analysis statuses carry the detail.
    json!({
        "success": true,
        "all_analyses_succeeded": all_succeeded,
        "video_id": analysis.video_id,
        "duration": analysis.duration(),
        "timeline_entries": analysis.timeline.len(),
        "ml_completion": analysis.completion_status(),
        "data_completeness": analysis.data_completeness(),
        "temporal_markers_generated": analysis.temporal_markers.is_some(),
        "analyses_successful": successful,
        "analyses_total": outcomes.len(),
        "analyses": analyses,
        "warnings": warnings,
        "warning_total": warnings.total(),
    })
}
