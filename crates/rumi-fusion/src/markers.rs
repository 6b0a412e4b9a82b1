//! Temporal marker extraction.
//!
//! Derives the bounded first-5-seconds and CTA-window summaries from a
//! unified analysis. Extraction is infallible: any internal failure yields
//! the canonical empty structure with the video id and duration intact.

use std::collections::{BTreeMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};

use rumi_models::{
    cta_window_bounds, lexicon, markers::truncate_text, markers::MAX_DENSITY_PER_SECOND,
    markers::SOFT_LIMIT_KB, CtaAppearance, CtaWindow, FirstFiveSeconds, GestureMoment,
    MarkerMetadata, ObjectAppearance, ObjectFocus, Payload, TemporalMarkers, TextCategory,
    TextMoment, Timeline, UnifiedAnalysis, WarningCounters,
};
use tracing::{debug, error, warn};

/// Initial per-list event budget; halved on size overflow.
const INITIAL_TOP_K: usize = 8;

/// Extract temporal markers from a unified analysis.
///
/// Never fails. On any internal error the canonical empty structure is
/// returned and logged, and the size-overflow counter records the event.
pub fn extract_markers(analysis: &UnifiedAnalysis) -> (TemporalMarkers, WarningCounters) {
    let mut warnings = WarningCounters::new();
    let video_id = analysis.video_id.clone();
    let duration = analysis.duration();

    let extracted = catch_unwind(AssertUnwindSafe(|| extract_with_size_control(analysis, &mut warnings)));

    match extracted {
        Ok(markers) => (markers, warnings),
        Err(_) => {
            error!(%video_id, "Temporal marker extraction panicked, emitting empty markers");
            warnings.size_overflow += 1;
            (TemporalMarkers::empty(video_id, duration), warnings)
        }
    }
}

/// Run extraction, halving the per-list budget until the serialized size
/// fits the soft target; fall back to the empty structure when even the
/// smallest budget exceeds the hard cap.
fn extract_with_size_control(
    analysis: &UnifiedAnalysis,
    warnings: &mut WarningCounters,
) -> TemporalMarkers {
    let mut top_k = INITIAL_TOP_K;

    loop {
        let markers = extract_once(analysis, top_k);
        let size_kb = markers.serialized_size() / 1024;

        if markers.within_soft_limit() {
            debug!(video_id = %analysis.video_id, size_kb, top_k, "Temporal markers within size target");
            return markers;
        }

        warn!(
            video_id = %analysis.video_id,
            size_kb,
            top_k,
            "Temporal markers exceed {} KB target, reducing",
            SOFT_LIMIT_KB
        );
        warnings.size_overflow += 1;

        if top_k <= 1 {
            // Budget exhausted; the hard cap decides between the reduced
            // structure and the canonical empty one.
            if markers.within_hard_limit() {
                return markers;
            }
            error!(video_id = %analysis.video_id, "Markers exceed hard cap at minimum budget, emitting empty");
            return TemporalMarkers::empty(analysis.video_id.clone(), analysis.duration());
        }
        top_k /= 2;
    }
}

/// One extraction pass at a fixed per-list budget.
fn extract_once(analysis: &UnifiedAnalysis, top_k: usize) -> TemporalMarkers {
    let timeline = &analysis.timeline;
    let duration = analysis.duration();

    TemporalMarkers {
        first_5_seconds: FirstFiveSeconds {
            density_progression: density_progression(timeline),
            text_moments: text_moments(timeline, top_k),
            emotion_sequence: emotion_sequence(timeline),
            gesture_moments: gesture_moments(timeline, top_k),
            object_appearances: object_appearances(timeline, top_k),
        },
        cta_window: cta_window(timeline, duration, top_k),
        metadata: MarkerMetadata {
            video_id: analysis.video_id.clone(),
            duration,
            generated_at: chrono::Utc::now(),
        },
    }
}

/// Per-second event counts over the first five seconds, clamped to 10.
fn density_progression(timeline: &Timeline) -> [u32; 5] {
    std::array::from_fn(|second| {
        (timeline.count_in_second(second) as u32).min(MAX_DENSITY_PER_SECOND)
    })
}

/// Top-K text moments, ranked by size class then confidence.
fn text_moments(timeline: &Timeline, top_k: usize) -> Vec<TextMoment> {
    let mut moments: Vec<TextMoment> = timeline
        .in_range(0.0, 5.0)
        .filter_map(|entry| match &entry.payload {
            Payload::TextOverlay { text, size_class, category, confidence, .. } => Some(TextMoment {
                time: entry.start.seconds(),
                text: truncate_text(text),
                size: *size_class,
                confidence: *confidence,
                is_cta: *category == TextCategory::Cta,
            }),
            _ => None,
        })
        .collect();

    moments.sort_by(|a, b| {
        b.size
            .rank()
            .cmp(&a.size.rank())
            .then(b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal))
    });
    moments.truncate(top_k);
    moments.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal));
    moments
}

/// Dominant emotion for each of the first five seconds.
fn emotion_sequence(timeline: &Timeline) -> [String; 5] {
    std::array::from_fn(|second| {
        let mut best: Option<(&str, f64)> = None;
        for entry in timeline.in_range(second as f64, second as f64 + 1.0) {
            if let Payload::Expression { emotion, intensity, .. } = &entry.payload {
                if best.map(|(_, score)| *intensity > score).unwrap_or(true) {
                    best = Some((emotion, *intensity));
                }
            }
        }
        best.map(|(emotion, _)| emotion.to_string()).unwrap_or_else(|| "neutral".to_string())
    })
}

/// Top-K gesture moments by confidence.
fn gesture_moments(timeline: &Timeline, top_k: usize) -> Vec<GestureMoment> {
    let mut moments: Vec<GestureMoment> = timeline
        .in_range(0.0, 5.0)
        .filter_map(|entry| match &entry.payload {
            Payload::Gesture { label, target, confidence } if label != "unknown" => {
                Some(GestureMoment {
                    time: entry.start.seconds(),
                    gesture: label.clone(),
                    confidence: *confidence,
                    target: target.clone(),
                })
            }
            _ => None,
        })
        .collect();

    moments.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    moments.truncate(top_k);
    moments.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal));
    moments
}

/// Top-K object appearances, ranked by confidence with the first sighting
/// of a class breaking ties over repeats.
fn object_appearances(timeline: &Timeline, top_k: usize) -> Vec<ObjectAppearance> {
    let mut seen_classes: HashSet<&str> = HashSet::new();
    let mut appearances: Vec<(bool, ObjectAppearance)> = Vec::new();

    for entry in timeline.in_range(0.0, 5.0) {
        if let Payload::Object { class, confidence, .. } = &entry.payload {
            let novel = seen_classes.insert(class.as_str());
            appearances.push((
                novel,
                ObjectAppearance {
                    time: entry.start.seconds(),
                    object: class.clone(),
                    confidence: *confidence,
                },
            ));
        }
    }

    appearances.sort_by(|(a_novel, a), (b_novel, b)| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b_novel.cmp(a_novel))
    });
    let mut result: Vec<ObjectAppearance> =
        appearances.into_iter().take(top_k).map(|(_, a)| a).collect();
    result.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal));
    result
}

/// CTA-window markers: appearances, gesture alignment, and object focus.
fn cta_window(timeline: &Timeline, duration: f64, top_k: usize) -> CtaWindow {
    let (start, end) = cta_window_bounds(duration);

    let mut cta_appearances: Vec<CtaAppearance> = timeline
        .in_range(start, end + f64::EPSILON)
        .filter_map(|entry| match &entry.payload {
            Payload::TextOverlay { text, size_class, category, confidence, .. } => {
                let is_cta = *category == TextCategory::Cta
                    || lexicon::matches_lexicon(text, lexicon::CTA);
                is_cta.then(|| CtaAppearance {
                    time: entry.start.seconds(),
                    text: truncate_text(text),
                    size: *size_class,
                    confidence: *confidence,
                })
            }
            _ => None,
        })
        .collect();
    cta_appearances.truncate(top_k);

    // A gesture syncs with the CTA when it lands within half a second of
    // any appearance.
    let mut gesture_sync: BTreeMap<String, bool> = BTreeMap::new();
    for entry in timeline.in_range(start, end + f64::EPSILON) {
        if let Payload::Gesture { label, .. } = &entry.payload {
            if label == "unknown" {
                continue;
            }
            let synced = cta_appearances
                .iter()
                .any(|cta| (cta.time - entry.start.seconds()).abs() <= 0.5);
            let slot = gesture_sync.entry(label.clone()).or_insert(false);
            *slot = *slot || synced;
        }
    }

    let mut object_focus: Vec<ObjectFocus> = timeline
        .in_range(start, end + f64::EPSILON)
        .filter_map(|entry| match &entry.payload {
            Payload::Object { class, confidence, .. } => Some(ObjectFocus {
                time: entry.start.seconds(),
                object: class.clone(),
                confidence: *confidence,
            }),
            _ => None,
        })
        .collect();
    object_focus.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    object_focus.truncate(top_k.min(5));
    object_focus.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal));

    CtaWindow {
        time_range: rumi_models::timestamp::format_range(start, end),
        cta_appearances,
        gesture_sync,
        object_focus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumi_models::{
        MLAnalysisResult, Payload, TextPosition, TextSizeClass, Timestamp, TimelineEntry,
        VideoMetadata,
    };
    use std::collections::BTreeMap;

    fn analysis_with(entries: Vec<TimelineEntry>, duration: f64) -> UnifiedAnalysis {
        let metadata = VideoMetadata::new("marker-test", "https://example.com/v", duration);
        let mut timeline = Timeline::new();
        for entry in entries {
            timeline.insert(entry);
        }
        UnifiedAnalysis::new(metadata, timeline, BTreeMap::<String, MLAnalysisResult>::new())
    }

    fn text_entry(start: f64, text: &str, size: TextSizeClass, category: TextCategory) -> TimelineEntry {
        TimelineEntry::new(
            Timestamp::new(start).unwrap(),
            None,
            Payload::TextOverlay {
                text: text.to_string(),
                bbox: None,
                size_class: size,
                position: TextPosition::default(),
                category,
                confidence: 0.8,
            },
        )
    }

    fn gesture_entry(start: f64, label: &str, confidence: f64) -> TimelineEntry {
        TimelineEntry::new(
            Timestamp::new(start).unwrap(),
            None,
            Payload::Gesture { label: label.to_string(), target: None, confidence },
        )
    }

    #[test]
    fn test_density_progression_counts_and_caps() {
        // 30 overlays in second 1, nothing elsewhere.
        let mut entries = Vec::new();
        for i in 0..30 {
            entries.push(text_entry(
                1.0 + i as f64 * 0.03,
                "x",
                TextSizeClass::S,
                TextCategory::Other,
            ));
        }
        let analysis = analysis_with(entries, 10.0);
        let (markers, _) = extract_markers(&analysis);
        assert_eq!(markers.first_5_seconds.density_progression, [0, 10, 0, 0, 0]);
    }

    #[test]
    fn test_text_moments_rank_by_size_then_confidence() {
        let entries = vec![
            text_entry(0.5, "small", TextSizeClass::S, TextCategory::Other),
            text_entry(1.5, "huge", TextSizeClass::Xl, TextCategory::Headline),
            text_entry(2.5, "medium", TextSizeClass::M, TextCategory::Other),
        ];
        let analysis = analysis_with(entries, 10.0);
        let (markers, _) = extract_markers(&analysis);

        // All three fit under the budget; output is time-ordered.
        assert_eq!(markers.first_5_seconds.text_moments.len(), 3);
        assert_eq!(markers.first_5_seconds.text_moments[0].text, "small");

        // With a budget of one, only the XL text survives the ranking.
        let survivors = text_moments(&analysis.timeline, 1);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].text, "huge");
    }

    #[test]
    fn test_emotion_sequence_defaults_to_neutral() {
        let entries = vec![TimelineEntry::new(
            Timestamp::new(2.2).unwrap(),
            None,
            Payload::Expression { emotion: "happy".into(), valence: 0.8, intensity: 0.9 },
        )];
        let analysis = analysis_with(entries, 10.0);
        let (markers, _) = extract_markers(&analysis);
        assert_eq!(
            markers.first_5_seconds.emotion_sequence,
            ["neutral", "neutral", "happy", "neutral", "neutral"]
        );
    }

    #[test]
    fn test_cta_window_and_gesture_sync() {
        // 10 s video: CTA window is [7, 10].
        let entries = vec![
            text_entry(8.0, "follow me", TextSizeClass::M, TextCategory::Cta),
            gesture_entry(8.3, "pointing", 0.9),
            gesture_entry(9.9, "wave", 0.8),
        ];
        let analysis = analysis_with(entries, 10.0);
        let (markers, _) = extract_markers(&analysis);

        assert_eq!(markers.cta_window.time_range, "7.0-10.0s");
        assert_eq!(markers.cta_window.cta_appearances.len(), 1);
        assert_eq!(markers.cta_window.gesture_sync.get("pointing"), Some(&true));
        assert_eq!(markers.cta_window.gesture_sync.get("wave"), Some(&false));
    }

    #[test]
    fn test_cta_lexicon_match_without_category() {
        let entries = vec![text_entry(9.0, "link in bio", TextSizeClass::L, TextCategory::Other)];
        let analysis = analysis_with(entries, 10.0);
        let (markers, _) = extract_markers(&analysis);
        assert_eq!(markers.cta_window.cta_appearances.len(), 1);
    }

    #[test]
    fn test_object_novelty_breaks_confidence_ties() {
        // Three person detections and one dog, all at the same confidence.
        let mut entries = Vec::new();
        for i in 0..3 {
            entries.push(TimelineEntry::new(
                Timestamp::new(0.5 + i as f64).unwrap(),
                None,
                Payload::Object { class: "person".into(), confidence: 0.9, bbox: None, track_id: None },
            ));
        }
        entries.push(TimelineEntry::new(
            Timestamp::new(3.0).unwrap(),
            None,
            Payload::Object { class: "dog".into(), confidence: 0.9, bbox: None, track_id: None },
        ));
        let analysis = analysis_with(entries, 10.0);

        // Budget of two: the first person sighting and the novel dog beat
        // the repeat person hits.
        let picks = object_appearances(&analysis.timeline, 2);
        let classes: Vec<&str> = picks.iter().map(|p| p.object.as_str()).collect();
        assert!(classes.contains(&"dog"));
        assert!(classes.contains(&"person"));
        assert_eq!(picks[0].time, 0.5);
    }

    #[test]
    fn test_overflow_reduces_then_stays_under_hard_cap() {
        // 500 long overlays inside the first five seconds.
        let mut entries = Vec::new();
        for i in 0..500 {
            entries.push(text_entry(
                (i as f64 * 0.01) % 5.0,
                &format!("overlay text number {} with quite a lot of characters in it", i),
                TextSizeClass::L,
                TextCategory::Other,
            ));
        }
        let analysis = analysis_with(entries, 10.0);
        let (markers, _) = extract_markers(&analysis);

        assert_eq!(markers.first_5_seconds.density_progression, [10, 10, 10, 10, 10]);
        assert!(markers.within_hard_limit());
        assert!(markers.first_5_seconds.text_moments.len() <= INITIAL_TOP_K);
    }

    #[test]
    fn test_empty_timeline_gives_valid_markers() {
        let analysis = analysis_with(Vec::new(), 30.0);
        let (markers, warnings) = extract_markers(&analysis);
        assert_eq!(markers.first_5_seconds.density_progression, [0; 5]);
        assert_eq!(markers.metadata.duration, 30.0);
        assert_eq!(warnings.size_overflow, 0);
    }
}
