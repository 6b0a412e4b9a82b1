//! Metadata analysis features: caption, hashtags, engagement, and a viral
//! potential estimate.

use chrono::{Datelike, Timelike};
use rumi_models::{lexicon, Timeline, VideoMetadata};
use serde::{Deserialize, Serialize};

use super::PrecomputeConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataAnalysisFeatures {
    pub caption_length: usize,
    pub caption_word_count: usize,
    pub hashtag_count: usize,
    pub hashtags: Vec<String>,
    pub emoji_count: usize,
    pub mention_count: usize,
    pub mentions: Vec<String>,
    pub engagement_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_hour: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_weekday: Option<String>,
    /// `minimal`, `moderate`, `heavy`, or `spam` by hashtag count.
    pub hashtag_strategy: String,
    /// `storytelling`, `direct`, `question`, `list`, or `minimal`.
    pub caption_style: String,
    /// `high`, `medium`, `low`, or `none` from the urgency lexicon.
    pub urgency_level: String,
    /// `hook_payoff`, `tutorial`, `story_arc`, `reaction`, `challenge`, or `other`.
    pub viral_formula: String,
    /// Weighted engagement / hook / hashtag composite in [0, 1].
    pub viral_potential_score: f64,
    pub confidence: f64,
}

pub fn compute(
    timeline: &Timeline,
    metadata: &VideoMetadata,
    config: &PrecomputeConfig,
) -> MetadataAnalysisFeatures {
    let caption = metadata.description.as_str();
    let words: Vec<&str> = caption.split_whitespace().collect();

    let hashtags: Vec<String> = words
        .iter()
        .filter(|w| w.starts_with('#') && w.len() > 1)
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '#').to_string())
        .filter(|w| w.len() > 1)
        .collect();
    let mentions: Vec<String> = words
        .iter()
        .filter(|w| w.starts_with('@') && w.len() > 1)
        .map(|w| w.to_string())
        .collect();
    let emoji_count = caption.chars().filter(|c| is_emoji(*c)).count();

    let engagement_rate = metadata.stats.engagement_rate();
    let hashtag_count = hashtags.len();

    let caption_style = classify_caption_style(caption, &words);
    let viral_formula = classify_viral_formula(caption, &caption_style, timeline, metadata);

    // Composite score: engagement saturates at 15%, hook strength comes
    // from caption hooks plus opening density, hashtag relevance peaks in
    // the 3-7 band.
    let hook_strength = hook_strength(caption, timeline);
    let hashtag_relevance = hashtag_relevance(hashtag_count);
    let (w_engagement, w_hook, w_hashtag) = config.viral_weights;
    let viral_potential_score = ((engagement_rate / 0.15).min(1.0) * w_engagement
        + hook_strength * w_hook
        + hashtag_relevance * w_hashtag)
        .clamp(0.0, 1.0);

    MetadataAnalysisFeatures {
        caption_length: caption.chars().count(),
        caption_word_count: words.len(),
        hashtag_count,
        hashtags,
        emoji_count,
        mention_count: mentions.len(),
        mentions,
        engagement_rate,
        publish_hour: metadata.created_at.map(|t| t.hour()),
        publish_weekday: metadata.created_at.map(|t| t.weekday().to_string()),
        hashtag_strategy: classify_hashtag_strategy(hashtag_count).to_string(),
        caption_style,
        urgency_level: lexicon::urgency_level(caption).to_string(),
        viral_formula,
        viral_potential_score,
        confidence: if caption.is_empty() && metadata.stats.views == 0 { 0.4 } else { 0.85 },
    }
}

fn classify_hashtag_strategy(count: usize) -> &'static str {
    match count {
        0..=2 => "minimal",
        3..=7 => "moderate",
        8..=15 => "heavy",
        _ => "spam",
    }
}

fn classify_caption_style(caption: &str, words: &[&str]) -> String {
    let sentences = caption
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();

    let style = if words.len() < 5 {
        "minimal"
    } else if caption.contains('?') {
        "question"
    } else if caption.lines().filter(|l| {
        let t = l.trim_start();
        t.starts_with(['-', '*'])
            || t.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false)
    }).count() >= 2
    {
        "list"
    } else if sentences >= 3 {
        "storytelling"
    } else {
        "direct"
    };
    style.to_string()
}

fn classify_viral_formula(
    caption: &str,
    caption_style: &str,
    timeline: &Timeline,
    metadata: &VideoMetadata,
) -> String {
    let lowered = caption.to_lowercase();

    let formula = if lowered.contains("how to") || lowered.contains("tutorial") {
        "tutorial"
    } else if lowered.contains("challenge") {
        "challenge"
    } else if lowered.contains("react") {
        "reaction"
    } else if lexicon::matches_lexicon(caption, lexicon::HOOK) || has_front_loaded_density(timeline, metadata) {
        "hook_payoff"
    } else if caption_style == "storytelling" {
        "story_arc"
    } else {
        "other"
    };
    formula.to_string()
}

/// A video whose opening two seconds carry a dense burst of events reads as
/// a hook regardless of the caption.
fn has_front_loaded_density(timeline: &Timeline, metadata: &VideoMetadata) -> bool {
    let opening: usize = (0..2).map(|s| timeline.count_in_second(s)).sum();
    let total = timeline.len();
    total > 0 && opening >= 4 && metadata.duration_seconds > 4.0
}

fn hook_strength(caption: &str, timeline: &Timeline) -> f64 {
    let mut strength: f64 = 0.0;
    if lexicon::matches_lexicon(caption, lexicon::HOOK) {
        strength += 0.6;
    }
    let opening: usize = (0..3).map(|s| timeline.count_in_second(s)).sum();
    strength += (opening as f64 / 10.0).min(0.4);
    strength.min(1.0)
}

fn hashtag_relevance(count: usize) -> f64 {
    match count {
        0 => 0.1,
        1..=2 => 0.5,
        3..=7 => 1.0,
        8..=15 => 0.5,
        _ => 0.1,
    }
}

/// Rough emoji detection over the common Unicode emoji blocks.
fn is_emoji(c: char) -> bool {
    matches!(u32::from(c),
        0x1F300..=0x1FAFF | 0x2600..=0x27BF | 0x1F1E6..=0x1F1FF | 0xFE0F | 0x2764
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rumi_models::VideoStats;

    fn config() -> PrecomputeConfig {
        PrecomputeConfig::default()
    }

    fn metadata_with_caption(caption: &str) -> VideoMetadata {
        VideoMetadata::new("v", "u", 30.0).with_description(caption)
    }

    #[test]
    fn test_hashtag_extraction_and_strategy() {
        let meta = metadata_with_caption("my day #fyp #viral #cooking @friend");
        let features = compute(&Timeline::new(), &meta, &config());
        assert_eq!(features.hashtag_count, 3);
        assert_eq!(features.hashtag_strategy, "moderate");
        assert_eq!(features.mention_count, 1);
    }

    #[test]
    fn test_hashtag_spam() {
        let tags: String = (0..20).map(|i| format!("#t{} ", i)).collect();
        let meta = metadata_with_caption(&tags);
        let features = compute(&Timeline::new(), &meta, &config());
        assert_eq!(features.hashtag_strategy, "spam");
    }

    #[test]
    fn test_caption_styles() {
        let question = compute(&Timeline::new(), &metadata_with_caption("what would you pick for this one?"), &config());
        assert_eq!(question.caption_style, "question");

        let minimal = compute(&Timeline::new(), &metadata_with_caption("vibes"), &config());
        assert_eq!(minimal.caption_style, "minimal");

        let story = compute(
            &Timeline::new(),
            &metadata_with_caption("I walked in. Nobody was there. Then everything changed and I knew."),
            &config(),
        );
        assert_eq!(story.caption_style, "storytelling");
    }

    #[test]
    fn test_engagement_and_publish_fields() {
        let mut meta = metadata_with_caption("hello there friends");
        meta.stats = VideoStats { views: 10_000, likes: 900, comments: 50, shares: 40, saves: 10 };
        meta.created_at = Some(chrono::Utc.with_ymd_and_hms(2025, 6, 6, 18, 30, 0).unwrap());
        let features = compute(&Timeline::new(), &meta, &config());
        assert!((features.engagement_rate - 0.1).abs() < 1e-9);
        assert_eq!(features.publish_hour, Some(18));
        assert_eq!(features.publish_weekday.as_deref(), Some("Fri"));
    }

    #[test]
    fn test_viral_formula_tutorial() {
        let meta = metadata_with_caption("How to make perfect pasta in five minutes with this method");
        let features = compute(&Timeline::new(), &meta, &config());
        assert_eq!(features.viral_formula, "tutorial");
    }

    #[test]
    fn test_viral_score_bounds() {
        let mut meta = metadata_with_caption("wait for it #a #b #c #d");
        meta.stats = VideoStats { views: 100, likes: 90, comments: 10, shares: 5, saves: 5 };
        let features = compute(&Timeline::new(), &meta, &config());
        assert!(features.viral_potential_score > 0.5);
        assert!(features.viral_potential_score <= 1.0);
    }

    #[test]
    fn test_urgency() {
        let meta = metadata_with_caption("last chance to grab this");
        let features = compute(&Timeline::new(), &meta, &config());
        assert_eq!(features.urgency_level, "high");
    }
}
