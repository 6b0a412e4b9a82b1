//! Video metadata models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a processed video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Engagement counters scraped with the video.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct VideoStats {
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub shares: u64,
    #[serde(default)]
    pub saves: u64,
}

impl VideoStats {
    /// Total interactions divided by views, 0.0 when the video has no views.
    pub fn engagement_rate(&self) -> f64 {
        if self.views == 0 {
            return 0.0;
        }
        (self.likes + self.comments + self.shares + self.saves) as f64 / self.views as f64
    }
}

/// Static metadata for a scraped video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoMetadata {
    /// Unique video ID
    pub video_id: VideoId,

    /// Original video URL
    pub url: String,

    /// Duration in seconds; must be positive for a processable video
    pub duration_seconds: f64,

    /// Original encode fps, when the scraper reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_fps: Option<f64>,

    /// Total frame count, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<u64>,

    /// Frame dimensions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Caption / description text
    #[serde(default)]
    pub description: String,

    /// Author handle
    #[serde(default)]
    pub author: String,

    /// Engagement counters
    #[serde(default)]
    pub stats: VideoStats,

    /// Publish timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl VideoMetadata {
    /// Create metadata with the required fields; everything else defaults.
    pub fn new(video_id: impl Into<VideoId>, url: impl Into<String>, duration_seconds: f64) -> Self {
        Self {
            video_id: video_id.into(),
            url: url.into(),
            duration_seconds,
            original_fps: None,
            frame_count: None,
            width: None,
            height: None,
            description: String::new(),
            author: String::new(),
            stats: VideoStats::default(),
            created_at: None,
        }
    }

    /// Set the original fps.
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.original_fps = Some(fps);
        self
    }

    /// Set the caption text.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the engagement counters.
    pub fn with_stats(mut self, stats: VideoStats) -> Self {
        self.stats = stats;
        self
    }

    /// Validate the invariants a processable video must satisfy.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.duration_seconds > 0.0) {
            return Err(format!(
                "video {} has non-positive duration {}",
                self.video_id, self.duration_seconds
            ));
        }
        if let Some(fps) = self.original_fps {
            if !(fps > 0.0) {
                return Err(format!("video {} has non-positive fps {}", self.video_id, fps));
            }
        }
        Ok(())
    }

    /// Fraction of the frame a bbox of the given area covers, if dimensions
    /// are known.
    pub fn frame_area(&self) -> Option<f64> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(w as f64 * h as f64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_duration() {
        let meta = VideoMetadata::new("vid1", "https://example.com/v/1", 30.0);
        assert!(meta.validate().is_ok());

        let bad = VideoMetadata::new("vid2", "https://example.com/v/2", 0.0);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_validate_fps() {
        let meta = VideoMetadata::new("vid3", "u", 30.0).with_fps(-1.0);
        assert!(meta.validate().is_err());
    }

    #[test]
    fn test_engagement_rate() {
        let stats = VideoStats { views: 1000, likes: 80, comments: 10, shares: 5, saves: 5, };
        assert!((stats.engagement_rate() - 0.1).abs() < 1e-9);
        assert_eq!(VideoStats::default().engagement_rate(), 0.0);
    }
}
