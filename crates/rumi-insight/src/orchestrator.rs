//! LLM orchestration: the seven analyses in fixed order.
//!
//! Each analysis builds its context, calls the LLM capability under a
//! per-analysis timeout, validates the response, and persists the result
//! before the next analysis begins. Calls are strictly sequential with a
//! fixed delay between them. One analysis failing never aborts the rest;
//! cancellation is honored between analyses and already-persisted results
//! survive it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rumi_fusion::FeatureBundle;
use rumi_models::{AnalysisType, UnifiedAnalysis, WarningCounters};
use rumi_storage::InsightStore;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::client::{CallContext, LlmClient, TokenUsage};
use crate::context::{build_context, CompressionLevel};
use crate::prompts::build_prompt;
use crate::validator::validate_response;

/// Cooperative cancellation flag checked between analyses.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why temporal markers were or were not included in a call's context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutDecision {
    pub markers_included: bool,
    pub reason: String,
}

/// Orchestrator tuning.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Delay inserted between consecutive analyses.
    pub prompt_delay: Duration,
    /// Whether temporal markers go into the contexts at all.
    pub temporal_markers_enabled: bool,
    /// Override applied on top of the per-analysis timeout defaults.
    pub timeout_override: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { prompt_delay: Duration::from_secs(5), temporal_markers_enabled: true, timeout_override: None }
    }
}

/// Per-analysis outcome, also the shape persisted to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub analysis: AnalysisType,
    pub success: bool,
    pub blocks_present: Vec<String>,
    pub blocks_missing: Vec<String>,
    pub data: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub rollout: RolloutDecision,
    pub compression: CompressionLevel,
    /// Wall time of the LLM call, seconds.
    pub processing_time: f64,
}

/// Runs the seven analyses against an LLM capability and a store.
pub struct Orchestrator<C: LlmClient> {
    client: C,
    store: InsightStore,
    config: OrchestratorConfig,
}

impl<C: LlmClient> Orchestrator<C> {
    pub fn new(client: C, store: InsightStore, config: OrchestratorConfig) -> Self {
        Self { client, store, config }
    }

    /// Run all analyses in the fixed order. Returns every outcome produced
    /// before completion or cancellation, plus accumulated warnings.
    pub async fn run(
        &self,
        analysis: &UnifiedAnalysis,
        bundles: &BTreeMap<AnalysisType, FeatureBundle>,
        cancel: &CancelToken,
    ) -> (Vec<AnalysisOutcome>, WarningCounters) {
        let mut outcomes = Vec::new();
        let mut warnings = WarningCounters::new();
        let total = AnalysisType::ALL.len();

        for (index, analysis_type) in AnalysisType::ALL.into_iter().enumerate() {
            if cancel.is_cancelled() {
                info!(completed = outcomes.len(), "Cancellation requested, stopping analyses");
                break;
            }

            info!(
                analysis = %analysis_type,
                position = index + 1,
                total,
                "Running analysis"
            );

            let outcome = self
                .run_one(analysis, analysis_type, bundles, &mut warnings)
                .await;

            if !outcome.success {
                warnings.llm_failure += 1;
            }

            // Persist before the next analysis starts. A storage failure is
            // fatal for this result only.
            if let Err(e) = self
                .store
                .save_insight(&analysis.video_id, analysis_type, &outcome)
                .await
            {
                error!(analysis = %analysis_type, error = %e, "Failed to persist analysis result");
            }
            outcomes.push(outcome);

            if index + 1 < total && !cancel.is_cancelled() && !self.config.prompt_delay.is_zero() {
                tokio::time::sleep(self.config.prompt_delay).await;
            }
        }

        (outcomes, warnings)
    }

    async fn run_one(
        &self,
        analysis: &UnifiedAnalysis,
        analysis_type: AnalysisType,
        bundles: &BTreeMap<AnalysisType, FeatureBundle>,
        warnings: &mut WarningCounters,
    ) -> AnalysisOutcome {
        let rollout = self.rollout_decision(analysis);

        // A missing bundle still produces a context; the extractors always
        // emit one per analysis, so this is a defensive empty.
        let empty_bundle;
        let bundle = match bundles.get(&analysis_type) {
            Some(b) => b,
            None => {
                warn!(analysis = %analysis_type, "Feature bundle missing, using empty metrics");
                empty_bundle = FeatureBundle {
                    analysis: analysis_type,
                    data: serde_json::json!({}),
                    error: None,
                    fallback: true,
                    data_completeness: 0.0,
                };
                &empty_bundle
            }
        };

        let context = build_context(analysis, analysis_type, bundle, rollout.markers_included);
        if context.compression != CompressionLevel::None {
            warnings.size_overflow += 1;
        }
        let prompt = build_prompt(analysis_type, &context.to_compact_json());

        let timeout = self
            .config
            .timeout_override
            .unwrap_or_else(|| Duration::from_secs(analysis_type.timeout_secs()));

        let mut call_context = CallContext::new();
        call_context.insert("video_id".to_string(), analysis.video_id.to_string());
        call_context.insert("prompt_type".to_string(), analysis_type.to_string());

        let started = std::time::Instant::now();
        // Outer timeout bounds the whole call including the capability's
        // internal retries.
        let result = tokio::time::timeout(
            timeout,
            self.client.send_prompt(&prompt, &call_context, timeout),
        )
        .await;
        let processing_time = started.elapsed().as_secs_f64();

        match result {
            Ok(Ok(response)) if response.success => {
                let validated = validate_response(&response.response_text, analysis_type, warnings);
                info!(
                    analysis = %analysis_type,
                    blocks = validated.blocks_present.len(),
                    elapsed_s = format!("{:.1}", processing_time),
                    "Analysis completed"
                );
                AnalysisOutcome {
                    analysis: analysis_type,
                    success: true,
                    blocks_present: validated.blocks_present,
                    blocks_missing: validated.blocks_missing,
                    data: validated.data,
                    usage: response.usage,
                    error: None,
                    rollout,
                    compression: context.compression,
                    processing_time,
                }
            }
            Ok(Ok(response)) => self.failed_outcome(
                analysis_type,
                response.error.unwrap_or_else(|| "LLM reported failure".to_string()),
                rollout,
                context.compression,
                processing_time,
            ),
            Ok(Err(e)) => self.failed_outcome(
                analysis_type,
                e.to_string(),
                rollout,
                context.compression,
                processing_time,
            ),
            Err(_) => self.failed_outcome(
                analysis_type,
                "timeout".to_string(),
                rollout,
                context.compression,
                processing_time,
            ),
        }
    }

    fn failed_outcome(
        &self,
        analysis_type: AnalysisType,
        error: String,
        rollout: RolloutDecision,
        compression: CompressionLevel,
        processing_time: f64,
    ) -> AnalysisOutcome {
        error!(analysis = %analysis_type, %error, "Analysis failed");
        AnalysisOutcome {
            analysis: analysis_type,
            success: false,
            blocks_present: Vec::new(),
            blocks_missing: crate::prompts::CANONICAL_BLOCKS.iter().map(|b| b.to_string()).collect(),
            data: serde_json::Map::new(),
            usage: None,
            error: Some(error),
            rollout,
            compression,
            processing_time,
        }
    }

    fn rollout_decision(&self, analysis: &UnifiedAnalysis) -> RolloutDecision {
        if !self.config.temporal_markers_enabled {
            RolloutDecision { markers_included: false, reason: "disabled".to_string() }
        } else if analysis.temporal_markers.is_none() {
            RolloutDecision { markers_included: false, reason: "no_markers_available".to_string() }
        } else {
            RolloutDecision { markers_included: true, reason: "included".to_string() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{LlmResponse, StubLlmClient};
    use crate::error::InsightResult;
    use async_trait::async_trait;
    use rumi_fusion::PrecomputeConfig;
    use rumi_models::{MLAnalysisResult, Timeline, VideoMetadata};
    use tempfile::TempDir;

    fn sample_analysis() -> UnifiedAnalysis {
        let metadata = VideoMetadata::new("orch-test", "https://example.com/v", 10.0);
        let mut analysis = UnifiedAnalysis::new(
            metadata,
            Timeline::new(),
            BTreeMap::<String, MLAnalysisResult>::new(),
        );
        analysis.temporal_markers =
            Some(rumi_models::TemporalMarkers::empty(analysis.video_id.clone(), 10.0));
        analysis
    }

    fn bundles(analysis: &UnifiedAnalysis) -> BTreeMap<AnalysisType, FeatureBundle> {
        rumi_fusion::compute_all(analysis, &PrecomputeConfig::default()).0
    }

    fn fast_config() -> OrchestratorConfig {
        OrchestratorConfig { prompt_delay: Duration::ZERO, ..Default::default() }
    }

    #[tokio::test]
    async fn test_all_seven_run_and_persist() {
        let dir = TempDir::new().unwrap();
        let store = InsightStore::rooted_at(dir.path());
        let analysis = sample_analysis();
        let orchestrator = Orchestrator::new(StubLlmClient::complete(), store.clone(), fast_config());

        let (outcomes, warnings) =
            orchestrator.run(&analysis, &bundles(&analysis), &CancelToken::new()).await;

        assert_eq!(outcomes.len(), 7);
        assert!(outcomes.iter().all(|o| o.success));
        assert_eq!(warnings.llm_failure, 0);

        // One file per analysis at the documented path.
        for analysis_type in AnalysisType::ALL {
            let path = store.insight_path(&analysis.video_id, analysis_type);
            assert!(path.exists(), "missing {}", path.display());
            let record: serde_json::Value =
                serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
            assert_eq!(record["success"], true);
            assert!(record.get("blocks_present").is_some());
            assert!(record.get("blocks_missing").is_some());
        }
    }

    #[tokio::test]
    async fn test_partial_response_persisted_as_success() {
        let dir = TempDir::new().unwrap();
        let store = InsightStore::rooted_at(dir.path());
        let analysis = sample_analysis();
        let client =
            StubLlmClient::with_response(r#"Sure! {"CoreMetrics":{"confidence":0.9}}"#);
        let orchestrator = Orchestrator::new(client, store, fast_config());

        let (outcomes, warnings) =
            orchestrator.run(&analysis, &bundles(&analysis), &CancelToken::new()).await;

        let first = &outcomes[0];
        assert!(first.success);
        assert_eq!(first.blocks_present, vec!["CoreMetrics"]);
        assert_eq!(first.blocks_missing.len(), 5);
        assert!(warnings.schema_violation > 0);
    }

    struct FailingClient;

    #[async_trait]
    impl LlmClient for FailingClient {
        async fn send_prompt(
            &self,
            _prompt: &str,
            _context: &CallContext,
            _timeout: Duration,
        ) -> InsightResult<LlmResponse> {
            Ok(LlmResponse::failed("boom"))
        }
    }

    #[tokio::test]
    async fn test_failure_isolated_per_call() {
        let dir = TempDir::new().unwrap();
        let store = InsightStore::rooted_at(dir.path());
        let analysis = sample_analysis();
        let orchestrator = Orchestrator::new(FailingClient, store, fast_config());

        let (outcomes, warnings) =
            orchestrator.run(&analysis, &bundles(&analysis), &CancelToken::new()).await;

        // All seven still ran; each recorded its failure.
        assert_eq!(outcomes.len(), 7);
        assert!(outcomes.iter().all(|o| !o.success));
        assert_eq!(warnings.llm_failure, 7);
    }

    struct SlowClient;

    #[async_trait]
    impl LlmClient for SlowClient {
        async fn send_prompt(
            &self,
            _prompt: &str,
            _context: &CallContext,
            _timeout: Duration,
        ) -> InsightResult<LlmResponse> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(LlmResponse::ok("late", None))
        }
    }

    #[tokio::test]
    async fn test_timeout_recorded_and_pipeline_continues() {
        let dir = TempDir::new().unwrap();
        let store = InsightStore::rooted_at(dir.path());
        let analysis = sample_analysis();
        let config = OrchestratorConfig {
            prompt_delay: Duration::ZERO,
            timeout_override: Some(Duration::from_millis(50)),
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(SlowClient, store, config);

        let (outcomes, _) =
            orchestrator.run(&analysis, &bundles(&analysis), &CancelToken::new()).await;
        assert_eq!(outcomes.len(), 7);
        assert!(outcomes.iter().all(|o| o.error.as_deref() == Some("timeout")));
    }

    #[tokio::test]
    async fn test_cancellation_stops_between_analyses() {
        let dir = TempDir::new().unwrap();
        let store = InsightStore::rooted_at(dir.path());
        let analysis = sample_analysis();
        let orchestrator = Orchestrator::new(StubLlmClient::complete(), store, fast_config());

        let cancel = CancelToken::new();
        cancel.cancel();
        let (outcomes, _) = orchestrator.run(&analysis, &bundles(&analysis), &cancel).await;
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_rollout_decision_reasons() {
        let dir = TempDir::new().unwrap();
        let store = InsightStore::rooted_at(dir.path());

        let mut no_markers = sample_analysis();
        no_markers.temporal_markers = None;
        let orchestrator =
            Orchestrator::new(StubLlmClient::complete(), store, fast_config());
        let (outcomes, _) =
            orchestrator.run(&no_markers, &bundles(&no_markers), &CancelToken::new()).await;
        assert!(outcomes.iter().all(|o| !o.rollout.markers_included));
        assert_eq!(outcomes[0].rollout.reason, "no_markers_available");
    }
}
