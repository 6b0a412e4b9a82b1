//! Emotional journey features: valence over time, peaks, and transitions.

use std::collections::BTreeMap;

use rumi_models::{vocab, Modality, Payload, Timeline, VideoMetadata};
use serde::{Deserialize, Serialize};

use super::stats;

/// Window width for emotion aggregation, seconds.
const WINDOW: f64 = 5.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionalPeak {
    pub time: f64,
    pub emotion: String,
    pub valence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeakRhythm {
    pub mean_spacing: f64,
    pub spacing_variance: f64,
    /// `regular` when spacing variance stays under a quarter of the mean.
    pub regularity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionalJourneyFeatures {
    /// Dominant emotion per 5-second window.
    pub emotion_sequence: Vec<String>,
    /// Standard deviation of per-window valence.
    pub emotion_variability: f64,
    /// Emotion transitions divided by window count.
    pub emotion_change_rate: f64,
    pub positive_ratio: f64,
    pub negative_ratio: f64,
    pub neutral_ratio: f64,
    pub emotion_valence_curve: Vec<f64>,
    /// Top five windows by absolute valence.
    pub emotional_peaks: Vec<EmotionalPeak>,
    /// First-order transition counts keyed `"from->to"`.
    pub emotion_transition_matrix: BTreeMap<String, u32>,
    pub peak_rhythm: PeakRhythm,
    /// Fraction of emotional peaks with a gesture within one second.
    pub emotion_gesture_alignment: f64,
    /// `ascending`, `descending`, `u-shaped`, or `flat`.
    pub emotional_trajectory: String,
    pub confidence: f64,
}

pub fn compute(timeline: &Timeline, metadata: &VideoMetadata) -> EmotionalJourneyFeatures {
    let duration = metadata.duration_seconds;
    let windows = ((duration / WINDOW).ceil() as usize).max(1);

    // Dominant emotion and mean valence per window.
    let mut emotion_sequence = Vec::with_capacity(windows);
    let mut valence_curve = Vec::with_capacity(windows);
    for w in 0..windows {
        let (start, end) = (w as f64 * WINDOW, (w + 1) as f64 * WINDOW);
        let mut intensity_by_emotion: BTreeMap<&str, f64> = BTreeMap::new();
        let mut valences = Vec::new();

        for entry in timeline.in_range(start, end) {
            if let Payload::Expression { emotion, valence, intensity } = &entry.payload {
                *intensity_by_emotion.entry(emotion.as_str()).or_insert(0.0) += intensity;
                valences.push(*valence);
            }
        }

        let dominant = intensity_by_emotion
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(emotion, _)| emotion.to_string())
            .unwrap_or_else(|| "neutral".to_string());
        emotion_sequence.push(dominant);
        valence_curve.push(stats::mean(&valences));
    }

    let transitions = stats::transition_count(&emotion_sequence);
    let counted = emotion_sequence.len() as f64;

    let positive = emotion_sequence.iter().filter(|e| vocab::is_positive_emotion(e)).count() as f64;
    let negative = emotion_sequence.iter().filter(|e| vocab::is_negative_emotion(e)).count() as f64;

    // Top five windows by |valence|.
    let abs_valence: Vec<f64> = valence_curve.iter().map(|v| v.abs()).collect();
    let mut emotional_peaks: Vec<EmotionalPeak> = stats::top_k_indices(&abs_valence, 5)
        .into_iter()
        .filter(|i| abs_valence[*i] > 0.0)
        .map(|i| EmotionalPeak {
            time: i as f64 * WINDOW,
            emotion: emotion_sequence[i].clone(),
            valence: valence_curve[i],
        })
        .collect();
    emotional_peaks.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal));

    let peak_times: Vec<f64> = emotional_peaks.iter().map(|p| p.time).collect();
    let spacings = stats::inter_event_intervals(&peak_times);
    let mean_spacing = stats::mean(&spacings);
    let spacing_variance = stats::variance(&spacings);

    let gesture_times: Vec<f64> = timeline
        .by_modality(Modality::Gesture)
        .map(|e| e.start.seconds())
        .collect();

    EmotionalJourneyFeatures {
        emotion_variability: stats::std_dev(&valence_curve),
        emotion_change_rate: transitions as f64 / counted,
        positive_ratio: positive / counted,
        negative_ratio: negative / counted,
        neutral_ratio: (counted - positive - negative) / counted,
        emotion_transition_matrix: stats::transition_counts(&emotion_sequence),
        peak_rhythm: PeakRhythm {
            mean_spacing,
            spacing_variance,
            regularity: if !spacings.is_empty() && spacing_variance < mean_spacing * 0.25 {
                "regular".to_string()
            } else if spacings.is_empty() {
                "none".to_string()
            } else {
                "irregular".to_string()
            },
        },
        emotion_gesture_alignment: stats::alignment_ratio(&peak_times, &gesture_times, 1.0),
        emotional_trajectory: classify_trajectory(&valence_curve).to_string(),
        emotional_peaks,
        emotion_sequence,
        emotion_valence_curve: valence_curve,
        confidence: if timeline.by_modality(Modality::Expression).next().is_some() { 0.85 } else { 0.3 },
    }
}

/// Fit the valence curve and classify its shape.
fn classify_trajectory(curve: &[f64]) -> &'static str {
    if curve.len() < 2 {
        return "flat";
    }
    let slope = stats::regression_slope(curve);
    let quad = stats::quadratic_coefficient(curve);
    let spread = stats::std_dev(curve);

    if spread < 0.05 {
        "flat"
    } else if quad > 0.02 && curve.len() >= 3 {
        "u-shaped"
    } else if slope > 0.02 {
        "ascending"
    } else if slope < -0.02 {
        "descending"
    } else {
        "flat"
    }
}
