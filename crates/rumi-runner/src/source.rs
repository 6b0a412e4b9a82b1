//! Video metadata acquisition.
//!
//! Scraping is an external collaborator: the pipeline consumes it through
//! the [`VideoSource`] trait so tests can swap in fixtures. The live
//! implementation drives the Apify TikTok scraper actor.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rumi_models::{VideoId, VideoMetadata, VideoStats};
use serde_json::Value;
use tracing::info;

use crate::error::{RunnerError, RunnerResult};

const APIFY_ACTOR: &str = "clockworks~tiktok-scraper";

/// Capability that resolves a video URL to its metadata.
#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn scrape(&self, video_url: &str) -> RunnerResult<VideoMetadata>;
}

/// Apify-backed scraper.
pub struct ApifyClient {
    token: String,
    client: Client,
}

impl ApifyClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into(), client: Client::new() }
    }

    fn endpoint(&self) -> String {
        format!(
            "https://api.apify.com/v2/acts/{}/run-sync-get-dataset-items?token={}",
            APIFY_ACTOR, self.token
        )
    }
}

#[async_trait]
impl VideoSource for ApifyClient {
    async fn scrape(&self, video_url: &str) -> RunnerResult<VideoMetadata> {
        info!(url = video_url, "Scraping video metadata");

        let body = serde_json::json!({ "postURLs": [video_url], "resultsPerPage": 1 });
        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| RunnerError::external_api(format!("Apify request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RunnerError::external_api(format!("Apify returned {}: {}", status, text)));
        }

        let items: Vec<Value> = response
            .json()
            .await
            .map_err(|e| RunnerError::external_api(format!("Apify response parse failed: {}", e)))?;
        let item = items
            .first()
            .ok_or_else(|| RunnerError::external_api("Apify returned no items"))?;

        parse_scraped_item(item, video_url)
    }
}

/// Map a scraped item into [`VideoMetadata`]. Field names follow the
/// scraper's output; absences stay absent.
pub fn parse_scraped_item(item: &Value, video_url: &str) -> RunnerResult<VideoMetadata> {
    let video_id = item
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RunnerError::external_api("scraped item has no id"))?;

    let video_meta = item.get("videoMeta").cloned().unwrap_or(Value::Null);
    let duration = video_meta
        .get("duration")
        .and_then(|v| v.as_f64())
        .or_else(|| item.get("duration").and_then(|v| v.as_f64()))
        .unwrap_or(0.0);

    let num = |key: &str| item.get(key).and_then(|v| v.as_u64()).unwrap_or(0);

    let mut metadata = VideoMetadata::new(VideoId::from_string(video_id), video_url, duration)
        .with_description(item.get("text").and_then(|v| v.as_str()).unwrap_or(""))
        .with_stats(VideoStats {
            views: num("playCount"),
            likes: num("diggCount"),
            comments: num("commentCount"),
            shares: num("shareCount"),
            saves: num("collectCount"),
        });

    metadata.author = item
        .pointer("/authorMeta/name")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    metadata.original_fps = video_meta.get("fps").and_then(|v| v.as_f64());
    metadata.width = video_meta.get("width").and_then(|v| v.as_u64()).map(|v| v as u32);
    metadata.height = video_meta.get("height").and_then(|v| v.as_u64()).map(|v| v as u32);
    metadata.frame_count = video_meta.get("frameCount").and_then(|v| v.as_u64());
    metadata.created_at = item
        .get("createTimeISO")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<DateTime<Utc>>().ok());

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_scraped_item() {
        let item = json!({
            "id": "7515739984452701457",
            "text": "my video #fyp",
            "playCount": 1000, "diggCount": 100, "commentCount": 10,
            "shareCount": 5, "collectCount": 2,
            "authorMeta": {"name": "creator"},
            "videoMeta": {"duration": 33.0, "fps": 30.0, "width": 1080, "height": 1920},
            "createTimeISO": "2025-06-01T12:00:00Z"
        });
        let metadata = parse_scraped_item(&item, "https://tiktok.com/v/1").unwrap();
        assert_eq!(metadata.video_id.as_str(), "7515739984452701457");
        assert_eq!(metadata.duration_seconds, 33.0);
        assert_eq!(metadata.original_fps, Some(30.0));
        assert_eq!(metadata.stats.views, 1000);
        assert_eq!(metadata.author, "creator");
        assert!(metadata.created_at.is_some());
    }

    #[test]
    fn test_parse_rejects_missing_id() {
        assert!(parse_scraped_item(&json!({"text": "no id"}), "u").is_err());
    }
}
