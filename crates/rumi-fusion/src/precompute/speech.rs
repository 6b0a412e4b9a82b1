//! Speech analysis features: rate, pauses, hooks, and delivery patterns.

use std::collections::BTreeMap;

use rumi_models::{lexicon, Modality, Payload, Timeline, VideoMetadata};
use serde::{Deserialize, Serialize};

use super::stats;

/// Window width for per-segment speech rates, seconds.
const WPM_WINDOW: f64 = 10.0;
/// Minimum gap treated as a pause, seconds.
const PAUSE_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pause {
    pub start: f64,
    pub duration: f64,
    /// `dramatic` (>2 s), `strategic` (1-2 s), `breath` (0.5-1 s), or `micro`.
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepeatedPhrase {
    pub phrase: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechAnalysisFeatures {
    pub word_count: usize,
    /// Words per second of actual speech time.
    pub speech_density: f64,
    /// Fraction of the video containing speech.
    pub speech_coverage: f64,
    pub speech_rate_wpm: f64,
    /// Words-per-minute per 10-second window.
    pub wpm_by_segment: Vec<f64>,
    pub pause_analysis: Vec<Pause>,
    pub filler_word_ratio: f64,
    /// Hook lexicon matches inside the first ten seconds.
    pub hook_phrases: Vec<String>,
    /// CTA lexicon matches inside the final 30% of the video.
    pub cta_phrases: Vec<String>,
    /// Phrases of two to five words spoken at least twice.
    pub repetition_patterns: Vec<RepeatedPhrase>,
    /// Window indices with wpm at least one sigma above the mean.
    pub speech_bursts: Vec<usize>,
    /// Normalized energy proxy per window, from wpm.
    pub energy_level_windows: Vec<f64>,
    /// Fraction of timed words landing within 0.3 s of a gesture.
    pub gesture_sync_ratio: f64,
    pub confidence: f64,
}

pub fn compute(timeline: &Timeline, metadata: &VideoMetadata) -> SpeechAnalysisFeatures {
    let duration = metadata.duration_seconds;

    struct Segment<'a> {
        start: f64,
        end: f64,
        text: &'a str,
        words: &'a [rumi_models::SpeechWord],
    }

    let segments: Vec<Segment> = timeline
        .by_modality(Modality::Speech)
        .filter_map(|entry| match &entry.payload {
            Payload::Speech { text, words, .. } => Some(Segment {
                start: entry.start.seconds(),
                end: entry.end.map(|e| e.seconds()).unwrap_or(entry.start.seconds()),
                text,
                words,
            }),
            _ => None,
        })
        .collect();

    let all_words: Vec<String> = segments
        .iter()
        .flat_map(|s| s.text.split_whitespace())
        .map(|w| {
            w.to_lowercase()
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_string()
        })
        .filter(|w| !w.is_empty())
        .collect();
    let word_count = all_words.len();

    let speech_seconds: f64 = segments.iter().map(|s| (s.end - s.start).max(0.0)).sum();
    let speech_coverage = if duration > 0.0 { (speech_seconds / duration).min(1.0) } else { 0.0 };
    let speech_density = if speech_seconds > 0.0 { word_count as f64 / speech_seconds } else { 0.0 };
    let speech_rate_wpm = speech_density * 60.0;

    // Words-per-minute per window, attributing each segment's words to the
    // window its start falls in.
    let windows = ((duration / WPM_WINDOW).ceil() as usize).max(1);
    let mut words_per_window = vec![0usize; windows];
    for segment in &segments {
        let idx = ((segment.start / WPM_WINDOW) as usize).min(windows - 1);
        words_per_window[idx] += segment.text.split_whitespace().count();
    }
    let wpm_by_segment: Vec<f64> =
        words_per_window.iter().map(|w| *w as f64 * 60.0 / WPM_WINDOW).collect();

    // Pauses between consecutive segments.
    let mut sorted: Vec<(f64, f64)> = segments.iter().map(|s| (s.start, s.end)).collect();
    sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    let pause_analysis: Vec<Pause> = sorted
        .windows(2)
        .filter_map(|w| {
            let gap = w[1].0 - w[0].1;
            (gap > PAUSE_THRESHOLD).then(|| Pause {
                start: w[0].1,
                duration: gap,
                kind: classify_pause(gap).to_string(),
            })
        })
        .collect();

    let filler_count: usize = segments
        .iter()
        .map(|s| lexicon::count_word_matches(s.text, lexicon::FILLER))
        .sum();

    // Hook phrases in the opening, CTA phrases in the closing 30%.
    let cta_zone_start = duration * 0.7;
    let mut hook_phrases = Vec::new();
    let mut cta_phrases = Vec::new();
    for segment in &segments {
        if segment.start < 10.0 {
            if let Some(phrase) = lexicon::first_match(segment.text, lexicon::HOOK) {
                hook_phrases.push(phrase.to_string());
            }
        }
        if segment.start >= cta_zone_start {
            if let Some(phrase) = lexicon::first_match(segment.text, lexicon::CTA) {
                cta_phrases.push(phrase.to_string());
            }
        }
    }
    hook_phrases.dedup();
    cta_phrases.dedup();

    // Burst and energy windows.
    let wpm_mean = stats::mean(&wpm_by_segment);
    let wpm_std = stats::std_dev(&wpm_by_segment);
    let speech_bursts: Vec<usize> = wpm_by_segment
        .iter()
        .enumerate()
        .filter(|(_, wpm)| wpm_std > 0.0 && **wpm >= wpm_mean + wpm_std)
        .map(|(i, _)| i)
        .collect();
    let wpm_max = wpm_by_segment.iter().copied().fold(0.0, f64::max);
    let energy_level_windows: Vec<f64> = wpm_by_segment
        .iter()
        .map(|wpm| if wpm_max > 0.0 { wpm / wpm_max } else { 0.0 })
        .collect();

    // Word-gesture synchrony over timed words.
    let gesture_times: Vec<f64> = timeline
        .by_modality(Modality::Gesture)
        .map(|e| e.start.seconds())
        .collect();
    let word_times: Vec<f64> = segments
        .iter()
        .flat_map(|s| s.words.iter().map(|w| w.start))
        .collect();
    let gesture_sync_ratio = stats::alignment_ratio(&word_times, &gesture_times, 0.3);

    SpeechAnalysisFeatures {
        word_count,
        speech_density,
        speech_coverage,
        speech_rate_wpm,
        wpm_by_segment,
        pause_analysis,
        filler_word_ratio: if word_count > 0 { filler_count as f64 / word_count as f64 } else { 0.0 },
        hook_phrases,
        cta_phrases,
        repetition_patterns: repetition_patterns(&all_words),
        speech_bursts,
        energy_level_windows,
        gesture_sync_ratio,
        confidence: if segments.is_empty() { 0.3 } else { 0.9 },
    }
}

fn classify_pause(gap: f64) -> &'static str {
    if gap > 2.0 {
        "dramatic"
    } else if gap >= 1.0 {
        "strategic"
    } else if gap >= 0.5 {
        "breath"
    } else {
        "micro"
    }
}

/// Phrases of two to five words repeated at least twice, longest-first so a
/// repeated long phrase suppresses its own sub-phrases.
fn repetition_patterns(words: &[String]) -> Vec<RepeatedPhrase> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for len in 2..=5usize {
        if words.len() < len {
            break;
        }
        for window in words.windows(len) {
            let phrase = window.join(" ");
            *counts.entry(phrase).or_insert(0) += 1;
        }
    }

    let mut repeated: Vec<RepeatedPhrase> = counts
        .into_iter()
        .filter(|(_, count)| *count >= 2)
        .map(|(phrase, count)| RepeatedPhrase { phrase, count })
        .collect();

    repeated.sort_by(|a, b| {
        let a_len = a.phrase.split(' ').count();
        let b_len = b.phrase.split(' ').count();
        b_len.cmp(&a_len).then(b.count.cmp(&a.count))
    });

    // Drop sub-phrases of an already reported longer repetition.
    let mut kept: Vec<RepeatedPhrase> = Vec::new();
    for candidate in repeated {
        if !kept.iter().any(|k| k.phrase.contains(&candidate.phrase)) {
            kept.push(candidate);
        }
    }
    kept.truncate(10);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumi_models::{SpeechWord, Timestamp, TimelineEntry};

    fn speech(start: f64, end: f64, text: &str) -> TimelineEntry {
        TimelineEntry::new(
            Timestamp::new(start).unwrap(),
            Timestamp::new(end),
            Payload::Speech {
                text: text.to_string(),
                language: "en".into(),
                confidence: 0.9,
                words: Vec::new(),
            },
        )
    }

    fn timeline_of(entries: Vec<TimelineEntry>) -> Timeline {
        let mut t = Timeline::new();
        for e in entries {
            t.insert(e);
        }
        t
    }

    #[test]
    fn test_minimal_video_counts() {
        // One segment 1.0-3.0 "hello world" on a 10 s video.
        let metadata = VideoMetadata::new("v", "u", 10.0);
        let timeline = timeline_of(vec![speech(1.0, 3.0, "hello world")]);
        let features = compute(&timeline, &metadata);
        assert_eq!(features.word_count, 2);
        assert!((features.speech_coverage - 0.2).abs() < 1e-9);
        assert!((features.speech_density - 1.0).abs() < 1e-9);
        assert!((features.speech_rate_wpm - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_pause_classification() {
        let metadata = VideoMetadata::new("v", "u", 20.0);
        let timeline = timeline_of(vec![
            speech(0.0, 1.0, "one"),
            speech(1.7, 2.0, "two"),   // 0.7 gap -> breath
            speech(3.5, 4.0, "three"), // 1.5 gap -> strategic
            speech(7.0, 8.0, "four"),  // 3.0 gap -> dramatic
        ]);
        let features = compute(&timeline, &metadata);
        let kinds: Vec<&str> = features.pause_analysis.iter().map(|p| p.kind.as_str()).collect();
        assert_eq!(kinds, vec!["breath", "strategic", "dramatic"]);
    }

    #[test]
    fn test_filler_ratio() {
        let metadata = VideoMetadata::new("v", "u", 10.0);
        let timeline = timeline_of(vec![speech(0.0, 2.0, "um this is like really good")]);
        let features = compute(&timeline, &metadata);
        assert!((features.filler_word_ratio - 2.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_hook_and_cta_zones() {
        let metadata = VideoMetadata::new("v", "u", 30.0);
        let timeline = timeline_of(vec![
            speech(1.0, 3.0, "wait for it, this gets wild"),
            speech(25.0, 28.0, "make sure to follow for part two"),
            // CTA phrase too early counts for neither list
            speech(12.0, 14.0, "subscribe maybe"),
        ]);
        let features = compute(&timeline, &metadata);
        assert_eq!(features.hook_phrases, vec!["wait for it".to_string()]);
        assert!(!features.cta_phrases.is_empty());
    }

    #[test]
    fn test_repetition_patterns() {
        let words: Vec<String> =
            "small business tips small business tips for you".split(' ').map(String::from).collect();
        let repeated = repetition_patterns(&words);
        assert!(repeated.iter().any(|r| r.phrase == "small business tips" && r.count == 2));
        // Sub-phrase "small business" is suppressed by the longer phrase.
        assert!(!repeated.iter().any(|r| r.phrase == "small business"));
    }

    #[test]
    fn test_gesture_sync_ratio() {
        let metadata = VideoMetadata::new("v", "u", 10.0);
        let mut timeline = Timeline::new();
        timeline.insert(TimelineEntry::new(
            Timestamp::new(1.0).unwrap(),
            Timestamp::new(2.0),
            Payload::Speech {
                text: "look here".into(),
                language: "en".into(),
                confidence: 0.9,
                words: vec![
                    SpeechWord { word: "look".into(), start: 1.0, end: 1.3, confidence: 0.9 },
                    SpeechWord { word: "here".into(), start: 1.5, end: 1.8, confidence: 0.9 },
                ],
            },
        ));
        timeline.insert(TimelineEntry::new(
            Timestamp::new(1.1).unwrap(),
            None,
            Payload::Gesture { label: "pointing".into(), target: None, confidence: 0.9 },
        ));
        let features = compute(&timeline, &metadata);
        // "look" at 1.0 is within 0.3 s of the gesture at 1.1; "here" is not.
        assert!((features.gesture_sync_ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_speech() {
        let metadata = VideoMetadata::new("v", "u", 10.0);
        let features = compute(&Timeline::new(), &metadata);
        assert_eq!(features.word_count, 0);
        assert_eq!(features.speech_coverage, 0.0);
        assert!(features.confidence < 0.5);
    }
}
