//! Visual overlay features: on-screen text rhythm, clutter, and alignment
//! with speech and CTA moments.

use std::collections::BTreeMap;

use rumi_models::{
    cta_window_bounds, lexicon, Modality, Payload, TextCategory, Timeline, VideoMetadata,
    VerticalPosition,
};
use serde::{Deserialize, Serialize};

use super::stats;
use super::PrecomputeConfig;

/// Window width for clutter buckets, seconds.
const CLUTTER_WINDOW: f64 = 5.0;
/// Detections of the same text within this gap merge into one appearance.
const MERGE_GAP: f64 = 1.5;

/// One merged on-screen appearance of a text.
struct Appearance {
    text: String,
    start: f64,
    end: f64,
    area: f64,
    vertical: VerticalPosition,
    is_cta: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayRhythm {
    pub mean_interval: f64,
    pub interval_std: f64,
    /// Windows with three or more appearances inside two seconds.
    pub burst_count: usize,
    /// Fraction of seconds with no overlay on screen.
    pub breathing_room_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadabilityComponents {
    /// Mean bbox area fraction across appearances.
    pub avg_area_fraction: f64,
    /// Fraction of appearances in the safe middle band.
    pub middle_band_ratio: f64,
    /// Weighted readability score in [0, 1].
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CtaReinforcement {
    pub text_count: usize,
    pub gesture_count: usize,
    pub sticker_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualOverlayFeatures {
    pub avg_texts_per_second: f64,
    pub unique_text_count: usize,
    /// Seconds until the first overlay, or the full duration if none appear.
    pub time_to_first_text: f64,
    pub avg_text_display_duration: f64,
    pub overlay_rhythm: OverlayRhythm,
    /// Appearance counts per 5-second window.
    pub clutter_timeline: Vec<usize>,
    pub readability: ReadabilityComponents,
    /// Appearance counts keyed top / middle / bottom.
    pub text_position_distribution: BTreeMap<String, usize>,
    /// Variance of size-class ranks across appearances.
    pub text_size_variance: f64,
    /// Co-occurring elements within half a second of CTA appearances.
    pub cta_reinforcement: CtaReinforcement,
    /// Appearance counts per semantic bucket.
    pub text_semantic_groups: BTreeMap<String, usize>,
    /// Fraction of overlays echoed in speech within one second.
    pub text_speech_alignment: f64,
    pub confidence: f64,
}

pub fn compute(
    timeline: &Timeline,
    metadata: &VideoMetadata,
    config: &PrecomputeConfig,
) -> VisualOverlayFeatures {
    let duration = metadata.duration_seconds;
    let frame_area = metadata.frame_area();

    // Collect raw detections, then merge consecutive sightings of the same
    // text into appearances. OCR samples frames, so one overlay shows up as
    // a run of detections.
    struct Detection {
        text: String,
        time: f64,
        area: f64,
        size_rank: u8,
        vertical: VerticalPosition,
        is_cta: bool,
    }

    let mut detections: Vec<Detection> = timeline
        .by_modality(Modality::TextOverlay)
        .filter_map(|entry| match &entry.payload {
            Payload::TextOverlay { text, bbox, size_class, position, category, .. } => {
                Some(Detection {
                    text: text.trim().to_lowercase(),
                    time: entry.start.seconds(),
                    area: bbox.map(|b| b.area()).unwrap_or(0.0),
                    size_rank: size_class.rank(),
                    vertical: position.vertical,
                    is_cta: *category == TextCategory::Cta
                        || lexicon::matches_lexicon(text, lexicon::CTA),
                })
            }
            _ => None,
        })
        .collect();
    detections.sort_by(|a, b| {
        a.text
            .cmp(&b.text)
            .then(a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut appearances: Vec<Appearance> = Vec::new();
    let mut size_ranks: Vec<f64> = Vec::new();
    for detection in &detections {
        size_ranks.push(detection.size_rank as f64);
        match appearances.last_mut() {
            Some(last)
                if last.text == detection.text && detection.time - last.end <= MERGE_GAP =>
            {
                last.end = detection.time;
                last.area = last.area.max(detection.area);
            }
            _ => appearances.push(Appearance {
                text: detection.text.clone(),
                start: detection.time,
                end: detection.time,
                area: detection.area,
                vertical: detection.vertical,
                is_cta: detection.is_cta,
            }),
        }
    }
    appearances.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));

    let unique_texts: std::collections::BTreeSet<&str> =
        appearances.iter().map(|a| a.text.as_str()).collect();

    let appearance_starts: Vec<f64> = appearances.iter().map(|a| a.start).collect();
    let intervals = stats::inter_event_intervals(&appearance_starts);

    let burst_count = appearance_starts
        .windows(3)
        .filter(|w| w[2] - w[0] <= 2.0)
        .count();

    let occupied_seconds = stats::per_second_counts(
        appearances.iter().flat_map(|a| {
            let span = (a.end - a.start).max(0.0) as usize;
            (0..=span).map(move |offset| a.start + offset as f64)
        }),
        duration,
    );
    let empty_seconds = occupied_seconds.iter().filter(|c| **c == 0).count();

    let display_durations: Vec<f64> =
        appearances.iter().map(|a| (a.end - a.start).max(0.0)).collect();

    let mut position_distribution: BTreeMap<String, usize> = BTreeMap::new();
    for appearance in &appearances {
        let key = match appearance.vertical {
            VerticalPosition::Top => "top",
            VerticalPosition::Middle => "middle",
            VerticalPosition::Bottom => "bottom",
        };
        *position_distribution.entry(key.to_string()).or_insert(0) += 1;
    }

    // CTA reinforcement: other elements within half a second of a CTA
    // appearance, counted across the CTA window.
    let (cta_start, cta_end) = cta_window_bounds(duration);
    let cta_times: Vec<f64> = appearances
        .iter()
        .filter(|a| a.is_cta && a.start >= cta_start && a.start <= cta_end)
        .map(|a| a.start)
        .collect();
    let near_cta = |time: f64| cta_times.iter().any(|t| (t - time).abs() <= 0.5);
    let cta_reinforcement = CtaReinforcement {
        text_count: appearances
            .iter()
            .filter(|a| !a.is_cta && near_cta(a.start))
            .count(),
        gesture_count: timeline
            .by_modality(Modality::Gesture)
            .filter(|e| near_cta(e.start.seconds()))
            .count(),
        sticker_count: timeline
            .by_modality(Modality::Sticker)
            .filter(|e| near_cta(e.start.seconds()))
            .count(),
    };

    let mut semantic_groups: BTreeMap<String, usize> = BTreeMap::new();
    for appearance in &appearances {
        let bucket = if lexicon::matches_lexicon(&appearance.text, lexicon::PRODUCT_MENTIONS) {
            "product_mentions"
        } else if lexicon::urgency_level(&appearance.text) != "none" {
            "urgency_phrases"
        } else if lexicon::matches_lexicon(&appearance.text, lexicon::SOCIAL_PROOF) {
            "social_proof"
        } else if appearance.text.contains('?') {
            "questions"
        } else {
            "other"
        };
        *semantic_groups.entry(bucket.to_string()).or_insert(0) += 1;
    }

    // Overlay-speech echo: an appearance aligns when any of its words is
    // spoken inside a one-second window around its start.
    let speech_words: Vec<(f64, String)> = timeline
        .by_modality(Modality::Speech)
        .filter_map(|entry| match &entry.payload {
            Payload::Speech { text, .. } => Some((entry.start.seconds(), text.to_lowercase())),
            _ => None,
        })
        .collect();
    let aligned = appearances
        .iter()
        .filter(|a| {
            speech_words.iter().any(|(time, text)| {
                (a.start - time).abs() <= 1.0
                    && a.text.split_whitespace().any(|w| w.len() > 2 && text.contains(w))
            })
        })
        .count();

    let avg_area_fraction = frame_area
        .filter(|fa| *fa > 0.0)
        .map(|fa| stats::mean(&appearances.iter().map(|a| a.area / fa).collect::<Vec<_>>()))
        .unwrap_or(0.0);
    let middle_band_ratio = if appearances.is_empty() {
        0.0
    } else {
        appearances.iter().filter(|a| a.vertical != VerticalPosition::Top).count() as f64
            / appearances.len() as f64
    };

    VisualOverlayFeatures {
        avg_texts_per_second: if duration > 0.0 { appearances.len() as f64 / duration } else { 0.0 },
        unique_text_count: unique_texts.len(),
        time_to_first_text: appearance_starts.first().copied().unwrap_or(duration),
        avg_text_display_duration: stats::mean(&display_durations),
        overlay_rhythm: OverlayRhythm {
            mean_interval: stats::mean(&intervals),
            interval_std: stats::std_dev(&intervals),
            burst_count,
            breathing_room_ratio: if duration >= 1.0 {
                empty_seconds as f64 / duration.ceil()
            } else {
                0.0
            },
        },
        clutter_timeline: stats::windowed_counts(
            appearance_starts.iter().copied(),
            duration,
            CLUTTER_WINDOW,
        ),
        readability: ReadabilityComponents {
            avg_area_fraction,
            middle_band_ratio,
            score: readability_score(avg_area_fraction, middle_band_ratio, config),
        },
        text_position_distribution: position_distribution,
        text_size_variance: stats::variance(&size_ranks),
        cta_reinforcement,
        text_semantic_groups: semantic_groups,
        text_speech_alignment: if appearances.is_empty() {
            0.0
        } else {
            aligned as f64 / appearances.len() as f64
        },
        confidence: if detections.is_empty() { 0.3 } else { 0.85 },
    }
}

/// Weighted readability score in [0, 1].
///
/// Weights come from [`PrecomputeConfig::readability_weights`]. OCR output
/// carries no contrast signal, so the score renormalizes over the area and
/// placement components; the contrast weight applies only when a future
/// analyzer provides one.
fn readability_score(avg_area_fraction: f64, middle_band_ratio: f64, config: &PrecomputeConfig) -> f64 {
    let (w_area, w_position, _w_contrast) = config.readability_weights;
    let available = w_area + w_position;
    if available <= 0.0 {
        return 0.0;
    }
    let area_component = (avg_area_fraction.min(0.2) / 0.2) * w_area;
    ((area_component + middle_band_ratio * w_position) / available).clamp(0.0, 1.0)
}
