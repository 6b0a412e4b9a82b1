//! Temporal marker structures.
//!
//! Temporal markers are a bounded summary of early-video and CTA-window
//! events that primes the language model with timing structure. The
//! serialized form has a soft target of 100 KB and a hard cap of 180 KB,
//! leaving headroom under the 200 KB request limit.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::timeline::TextSizeClass;
use crate::video::VideoId;

/// Soft serialized-size target, kilobytes.
pub const SOFT_LIMIT_KB: usize = 100;
/// Hard serialized-size cap, kilobytes.
pub const HARD_LIMIT_KB: usize = 180;
/// Per-second density counts are clamped to this many events.
pub const MAX_DENSITY_PER_SECOND: u32 = 10;
/// Marker texts are truncated to this many characters.
pub const MAX_TEXT_LENGTH: usize = 50;

/// A ranked on-screen text event inside the first five seconds.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TextMoment {
    pub time: f64,
    pub text: String,
    pub size: TextSizeClass,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_cta: bool,
}

/// A gesture event inside the first five seconds.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GestureMoment {
    pub time: f64,
    pub gesture: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// First sighting (or high-confidence sighting) of an object class.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ObjectAppearance {
    pub time: f64,
    pub object: String,
    pub confidence: f64,
}

/// A call-to-action text inside the CTA window.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CtaAppearance {
    pub time: f64,
    pub text: String,
    pub size: TextSizeClass,
    pub confidence: f64,
}

/// An object emphasized during the CTA window.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ObjectFocus {
    pub time: f64,
    pub object: String,
    pub confidence: f64,
}

/// Structured markers for the opening five seconds.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FirstFiveSeconds {
    /// Events per second for seconds 0..5, each clamped to 10.
    pub density_progression: [u32; 5],
    pub text_moments: Vec<TextMoment>,
    /// Dominant emotion per second, `"neutral"` when nothing was detected.
    pub emotion_sequence: [String; 5],
    pub gesture_moments: Vec<GestureMoment>,
    pub object_appearances: Vec<ObjectAppearance>,
}

impl Default for FirstFiveSeconds {
    fn default() -> Self {
        Self {
            density_progression: [0; 5],
            text_moments: Vec::new(),
            emotion_sequence: std::array::from_fn(|_| "neutral".to_string()),
            gesture_moments: Vec::new(),
            object_appearances: Vec::new(),
        }
    }
}

/// Structured markers for the closing CTA window.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CtaWindow {
    /// Human-readable range like `"8.5-10.0s"`.
    pub time_range: String,
    pub cta_appearances: Vec<CtaAppearance>,
    /// Gesture label -> whether it landed within half a second of a CTA.
    pub gesture_sync: BTreeMap<String, bool>,
    /// Absent in the legacy marker shape; defaults keep old files readable.
    #[serde(default)]
    pub object_focus: Vec<ObjectFocus>,
}

/// Provenance block for a markers snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MarkerMetadata {
    pub video_id: VideoId,
    pub duration: f64,
    pub generated_at: DateTime<Utc>,
}

/// Bounded temporal summary handed to the language model.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TemporalMarkers {
    pub first_5_seconds: FirstFiveSeconds,
    pub cta_window: CtaWindow,
    pub metadata: MarkerMetadata,
}

impl TemporalMarkers {
    /// The canonical empty-but-valid structure, used whenever extraction
    /// fails or size reduction cannot converge.
    pub fn empty(video_id: VideoId, duration: f64) -> Self {
        let (cta_start, cta_end) = cta_window_bounds(duration);
        Self {
            first_5_seconds: FirstFiveSeconds::default(),
            cta_window: CtaWindow {
                time_range: crate::timestamp::format_range(cta_start, cta_end),
                ..CtaWindow::default()
            },
            metadata: MarkerMetadata { video_id, duration, generated_at: Utc::now() },
        }
    }

    /// Compact serialized size in bytes.
    pub fn serialized_size(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(usize::MAX)
    }

    pub fn within_soft_limit(&self) -> bool {
        self.serialized_size() <= SOFT_LIMIT_KB * 1024
    }

    pub fn within_hard_limit(&self) -> bool {
        self.serialized_size() <= HARD_LIMIT_KB * 1024
    }
}

/// CTA window bounds: the final 15% of the video, widened to at least 3 s
/// and capped at 15 s.
pub fn cta_window_bounds(duration: f64) -> (f64, f64) {
    let duration = duration.max(0.0);
    let mut window = duration * 0.15;
    window = window.max(3.0).min(15.0).min(duration);
    ((duration - window).max(0.0), duration)
}

/// Truncate marker text to the 50-character budget, with an ellipsis, after
/// collapsing internal whitespace.
pub fn truncate_text(text: &str) -> String {
    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_TEXT_LENGTH {
        let head: String = collapsed.chars().take(MAX_TEXT_LENGTH - 3).collect();
        format!("{}...", head)
    } else {
        collapsed
    }
}
