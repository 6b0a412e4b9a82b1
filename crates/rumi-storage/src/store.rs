//! On-disk layout for analysis outputs.
//!
//! ```text
//! unified_analysis/<video_id>.json
//! temporal_markers/<video_id>_<unix_ts>.json
//! insights/<video_id>/<analysis>/<analysis>_result.json
//! ```

use std::path::{Path, PathBuf};

use rumi_models::{AnalysisType, TemporalMarkers, UnifiedAnalysis, VideoId};
use serde::Serialize;
use tracing::info;

use crate::atomic::write_json_atomic;
use crate::error::StorageResult;

/// Persists pipeline outputs under a set of base directories.
#[derive(Debug, Clone)]
pub struct InsightStore {
    unified_dir: PathBuf,
    temporal_dir: PathBuf,
    insights_dir: PathBuf,
}

impl InsightStore {
    pub fn new(
        unified_dir: impl Into<PathBuf>,
        temporal_dir: impl Into<PathBuf>,
        insights_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            unified_dir: unified_dir.into(),
            temporal_dir: temporal_dir.into(),
            insights_dir: insights_dir.into(),
        }
    }

    /// Store rooted at a single output directory, using the stable layout.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(
            root.join("unified_analysis"),
            root.join("temporal_markers"),
            root.join("insights"),
        )
    }

    /// Path of the unified analysis file for a video.
    pub fn unified_path(&self, video_id: &VideoId) -> PathBuf {
        self.unified_dir.join(format!("{}.json", video_id))
    }

    /// Path of a temporal markers snapshot stamped with a unix timestamp.
    pub fn temporal_path(&self, video_id: &VideoId, unix_ts: i64) -> PathBuf {
        self.temporal_dir.join(format!("{}_{}.json", video_id, unix_ts))
    }

    /// Path of one analysis's persisted LLM result.
    pub fn insight_path(&self, video_id: &VideoId, analysis: AnalysisType) -> PathBuf {
        self.insights_dir
            .join(video_id.as_str())
            .join(analysis.as_str())
            .join(format!("{}_result.json", analysis))
    }

    /// Persist the unified analysis atomically.
    pub async fn save_unified(&self, analysis: &UnifiedAnalysis) -> StorageResult<PathBuf> {
        let path = self.unified_path(&analysis.video_id);
        write_json_atomic(&path, analysis).await?;
        info!(video_id = %analysis.video_id, path = %path.display(), "Unified analysis saved");
        Ok(path)
    }

    /// Persist a temporal markers snapshot atomically.
    pub async fn save_markers(&self, markers: &TemporalMarkers) -> StorageResult<PathBuf> {
        let path = self.temporal_path(
            &markers.metadata.video_id,
            markers.metadata.generated_at.timestamp(),
        );
        write_json_atomic(&path, markers).await?;
        info!(video_id = %markers.metadata.video_id, path = %path.display(), "Temporal markers saved");
        Ok(path)
    }

    /// Persist one analysis's result record atomically.
    pub async fn save_insight<T: Serialize>(
        &self,
        video_id: &VideoId,
        analysis: AnalysisType,
        result: &T,
    ) -> StorageResult<PathBuf> {
        let path = self.insight_path(video_id, analysis);
        write_json_atomic(&path, result).await?;
        info!(%video_id, %analysis, path = %path.display(), "Insight result saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumi_models::{Timeline, VideoMetadata};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn sample_analysis() -> UnifiedAnalysis {
        let metadata = VideoMetadata::new("store-test", "https://example.com/v", 10.0);
        UnifiedAnalysis::new(metadata, Timeline::new(), BTreeMap::new())
    }

    #[test]
    fn test_layout_paths() {
        let store = InsightStore::rooted_at("/out");
        let id = VideoId::from_string("vid123");
        assert_eq!(
            store.unified_path(&id),
            PathBuf::from("/out/unified_analysis/vid123.json")
        );
        assert_eq!(
            store.temporal_path(&id, 1700000000),
            PathBuf::from("/out/temporal_markers/vid123_1700000000.json")
        );
        assert_eq!(
            store.insight_path(&id, AnalysisType::ScenePacing),
            PathBuf::from("/out/insights/vid123/scene_pacing/scene_pacing_result.json")
        );
    }

    #[tokio::test]
    async fn test_save_unified_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = InsightStore::rooted_at(dir.path());
        let analysis = sample_analysis();

        let path = store.save_unified(&analysis).await.unwrap();
        let loaded: UnifiedAnalysis =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(loaded.video_id, analysis.video_id);
    }

    #[tokio::test]
    async fn test_save_markers() {
        let dir = TempDir::new().unwrap();
        let store = InsightStore::rooted_at(dir.path());
        let markers = TemporalMarkers::empty(VideoId::from_string("store-test"), 10.0);

        let path = store.save_markers(&markers).await.unwrap();
        assert!(path.exists());
        let loaded: TemporalMarkers =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(loaded.metadata.duration, 10.0);
    }

    #[tokio::test]
    async fn test_save_insight_result() {
        let dir = TempDir::new().unwrap();
        let store = InsightStore::rooted_at(dir.path());
        let id = VideoId::from_string("store-test");

        let path = store
            .save_insight(&id, AnalysisType::CreativeDensity, &serde_json::json!({"success": true}))
            .await
            .unwrap();
        assert!(path.ends_with("insights/store-test/creative_density/creative_density_result.json"));
    }
}
