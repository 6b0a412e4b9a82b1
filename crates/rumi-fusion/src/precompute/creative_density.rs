//! Creative density features: how much is happening on screen, second by
//! second, and where the weight of it sits.

use std::collections::BTreeMap;

use rumi_models::{Modality, Timeline, VideoMetadata};
use serde::{Deserialize, Serialize};

use super::stats;

/// Modalities that count as creative elements.
const DENSITY_MODALITIES: [Modality; 4] =
    [Modality::TextOverlay, Modality::Sticker, Modality::SceneChange, Modality::Object];

/// One second of the density curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityBucket {
    pub second: usize,
    pub count: usize,
    /// Modality contributing the most events this second.
    pub dominant: Option<Modality>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralPatterns {
    /// Density peaks at 4+ events within the first two seconds.
    pub strong_opening_hook: bool,
    /// Monotone rising density over at least five buckets.
    pub crescendo: bool,
    /// Half or more of all events land in the first third.
    pub front_loaded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreativeDensityFeatures {
    pub avg_density: f64,
    pub max_density: usize,
    pub min_density: usize,
    pub std_density: f64,
    pub total_elements: usize,
    pub elements_per_second: f64,
    pub density_curve: Vec<DensityBucket>,
    /// std / mean of the per-second counts.
    pub volatility: f64,
    /// `front_loaded`, `even`, `back_loaded`, or `oscillating`.
    pub acceleration_pattern: String,
    /// Seconds where three or more modalities coincide.
    pub multi_modal_peaks: Vec<usize>,
    pub empty_seconds: usize,
    /// `minimal`, `medium`, or `heavy` by elements/sec.
    pub density_classification: String,
    pub structural_patterns: StructuralPatterns,
    pub confidence: f64,
}

pub fn compute(timeline: &Timeline, metadata: &VideoMetadata) -> CreativeDensityFeatures {
    let duration = metadata.duration_seconds;
    let seconds = duration.ceil().max(1.0) as usize;

    // Per-second counts per modality.
    let mut per_modality: BTreeMap<Modality, Vec<usize>> = BTreeMap::new();
    for modality in DENSITY_MODALITIES {
        let counts = stats::per_second_counts(
            timeline.by_modality(modality).map(|e| e.start.seconds()),
            duration,
        );
        per_modality.insert(modality, counts);
    }

    let totals: Vec<usize> = (0..seconds)
        .map(|i| per_modality.values().map(|c| c.get(i).copied().unwrap_or(0)).sum())
        .collect();
    let totals_f: Vec<f64> = totals.iter().map(|c| *c as f64).collect();

    let density_curve: Vec<DensityBucket> = (0..seconds)
        .map(|i| {
            let dominant = per_modality
                .iter()
                .map(|(m, c)| (*m, c.get(i).copied().unwrap_or(0)))
                .filter(|(_, c)| *c > 0)
                .max_by_key(|(_, c)| *c)
                .map(|(m, _)| m);
            DensityBucket { second: i, count: totals[i], dominant }
        })
        .collect();

    let total_elements: usize = totals.iter().sum();
    let avg = stats::mean(&totals_f);
    let std = stats::std_dev(&totals_f);
    let elements_per_second = total_elements as f64 / duration.max(1e-9);

    let multi_modal_peaks: Vec<usize> = (0..seconds)
        .filter(|i| {
            let active = per_modality
                .values()
                .filter(|c| c.get(*i).copied().unwrap_or(0) > 0)
                .count();
            active >= 3
        })
        .collect();

    let first_third: usize = totals.iter().take(seconds / 3).sum();
    let last_third: usize = totals.iter().skip(seconds - seconds / 3).sum();

    CreativeDensityFeatures {
        avg_density: avg,
        max_density: totals.iter().copied().max().unwrap_or(0),
        min_density: totals.iter().copied().min().unwrap_or(0),
        std_density: std,
        total_elements,
        elements_per_second,
        volatility: if avg > 0.0 { std / avg } else { 0.0 },
        acceleration_pattern: acceleration_pattern(&totals_f, first_third, last_third, total_elements),
        multi_modal_peaks,
        empty_seconds: totals.iter().filter(|c| **c == 0).count(),
        density_classification: classify_density(elements_per_second).to_string(),
        structural_patterns: StructuralPatterns {
            strong_opening_hook: totals.iter().take(2).copied().max().unwrap_or(0) >= 4,
            crescendo: has_crescendo(&totals),
            front_loaded: total_elements > 0 && first_third * 2 >= total_elements,
        },
        density_curve,
        confidence: if timeline.is_empty() { 0.3 } else { 0.9 },
    }
}

fn classify_density(elements_per_second: f64) -> &'static str {
    if elements_per_second < 0.5 {
        "minimal"
    } else if elements_per_second <= 1.5 {
        "medium"
    } else {
        "heavy"
    }
}

fn acceleration_pattern(totals: &[f64], first: usize, last: usize, total: usize) -> String {
    if total == 0 {
        return "even".to_string();
    }

    // Many direction changes read as oscillation before front/back weighting.
    let direction_changes = totals
        .windows(2)
        .map(|w| (w[1] - w[0]).signum())
        .collect::<Vec<f64>>()
        .windows(2)
        .filter(|s| s[0] != 0.0 && s[1] != 0.0 && s[0] != s[1])
        .count();
    if totals.len() >= 6 && direction_changes as f64 >= totals.len() as f64 * 0.5 {
        return "oscillating".to_string();
    }

    let first_f = first as f64 / total as f64;
    let last_f = last as f64 / total as f64;
    if first_f > last_f + 0.15 {
        "front_loaded".to_string()
    } else if last_f > first_f + 0.15 {
        "back_loaded".to_string()
    } else {
        "even".to_string()
    }
}

fn has_crescendo(totals: &[usize]) -> bool {
    if totals.len() < 5 {
        return false;
    }
    totals.windows(2).filter(|w| w[1] >= w[0]).count() == totals.len() - 1
        && totals.last() > totals.first()
}
