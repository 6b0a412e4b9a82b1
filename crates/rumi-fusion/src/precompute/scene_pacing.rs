//! Scene pacing features derived from shot boundaries.

use rumi_models::{Modality, Timeline, VideoMetadata};
use serde::{Deserialize, Serialize};

use super::stats;

/// Window width for pacing curves, seconds.
const PACING_WINDOW: f64 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MontageSegment {
    pub start: f64,
    pub end: f64,
    pub avg_shot_duration: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenePacingFeatures {
    pub total_shots: usize,
    pub avg_shot_duration: f64,
    pub min_shot_duration: f64,
    pub max_shot_duration: f64,
    pub shot_duration_variance: f64,
    pub shots_per_minute: f64,
    /// `rapid`, `fast`, `moderate`, or `slow` by average shot duration.
    pub pacing_classification: String,
    /// `consistent`, `variable`, or `erratic` by duration variance.
    pub rhythm_consistency: String,
    /// Regression slope of cuts across 10-second windows.
    pub acceleration_score: f64,
    /// Cuts per 10-second window.
    pub pacing_curve: Vec<usize>,
    /// Window indices with cut counts at least one sigma above the mean.
    pub cut_density_zones: Vec<usize>,
    /// Contiguous windows whose average shot runs under 1.5 seconds.
    pub montage_segments: Vec<MontageSegment>,
    pub confidence: f64,
}

pub fn compute(timeline: &Timeline, metadata: &VideoMetadata) -> ScenePacingFeatures {
    let duration = metadata.duration_seconds;

    let mut cut_times: Vec<f64> = timeline
        .by_modality(Modality::SceneChange)
        .map(|e| e.start.seconds())
        .collect();
    cut_times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    // Shot boundaries: each scene change starts a shot; the video end
    // closes the last one.
    let mut boundaries = cut_times.clone();
    if boundaries.first().map(|t| *t > 0.0).unwrap_or(true) {
        boundaries.insert(0, 0.0);
    }
    boundaries.push(duration);
    let durations: Vec<f64> = boundaries
        .windows(2)
        .map(|w| (w[1] - w[0]).max(0.0))
        .filter(|d| *d > 0.0)
        .collect();

    let total_shots = durations.len();
    let avg = stats::mean(&durations);
    let var = stats::variance(&durations);

    let pacing_curve = stats::windowed_counts(cut_times.iter().copied(), duration, PACING_WINDOW);
    let curve_f: Vec<f64> = pacing_curve.iter().map(|c| *c as f64).collect();
    let curve_mean = stats::mean(&curve_f);
    let curve_std = stats::std_dev(&curve_f);

    let cut_density_zones: Vec<usize> = pacing_curve
        .iter()
        .enumerate()
        .filter(|(_, c)| **c as f64 >= curve_mean + curve_std && **c > 0)
        .map(|(i, _)| i)
        .collect();

    ScenePacingFeatures {
        total_shots,
        avg_shot_duration: avg,
        min_shot_duration: durations.iter().copied().fold(f64::INFINITY, f64::min).min(duration),
        max_shot_duration: durations.iter().copied().fold(0.0, f64::max),
        shot_duration_variance: var,
        shots_per_minute: if duration > 0.0 { total_shots as f64 * 60.0 / duration } else { 0.0 },
        pacing_classification: classify_pacing(avg).to_string(),
        rhythm_consistency: classify_rhythm(var, avg).to_string(),
        acceleration_score: stats::regression_slope(&curve_f),
        montage_segments: montage_segments(&boundaries, duration),
        pacing_curve,
        cut_density_zones,
        confidence: if cut_times.is_empty() { 0.3 } else { 0.9 },
    }
}

fn classify_pacing(avg_shot_duration: f64) -> &'static str {
    if avg_shot_duration <= 0.0 {
        "slow"
    } else if avg_shot_duration < 2.0 {
        "rapid"
    } else if avg_shot_duration < 4.0 {
        "fast"
    } else if avg_shot_duration < 8.0 {
        "moderate"
    } else {
        "slow"
    }
}

fn classify_rhythm(variance: f64, avg: f64) -> &'static str {
    if avg <= 0.0 {
        return "consistent";
    }
    let relative = variance / (avg * avg);
    if relative < 0.25 {
        "consistent"
    } else if relative < 1.0 {
        "variable"
    } else {
        "erratic"
    }
}

/// Contiguous stretches of shots averaging under 1.5 seconds.
fn montage_segments(boundaries: &[f64], duration: f64) -> Vec<MontageSegment> {
    let mut segments = Vec::new();
    let mut run_start: Option<f64> = None;
    let mut run_durations: Vec<f64> = Vec::new();

    for w in boundaries.windows(2) {
        let shot = (w[1] - w[0]).max(0.0);
        if shot > 0.0 && shot < 1.5 {
            if run_start.is_none() {
                run_start = Some(w[0]);
            }
            run_durations.push(shot);
        } else {
            flush_run(&mut segments, &mut run_start, &mut run_durations, w[0]);
        }
    }
    flush_run(&mut segments, &mut run_start, &mut run_durations, duration);
    segments
}

fn flush_run(
    segments: &mut Vec<MontageSegment>,
    run_start: &mut Option<f64>,
    run_durations: &mut Vec<f64>,
    end: f64,
) {
    if let Some(start) = run_start.take() {
        // A single quick cut is not a montage.
        if run_durations.len() >= 3 {
            segments.push(MontageSegment {
                start,
                end,
                avg_shot_duration: stats::mean(run_durations),
            });
        }
        run_durations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumi_models::{Payload, SceneChangeKind, Timestamp, TimelineEntry};

    fn cut(start: f64, shot_id: u32) -> TimelineEntry {
        TimelineEntry::new(
            Timestamp::new(start).unwrap(),
            None,
            Payload::SceneChange { change: SceneChangeKind::Cut, shot_id },
        )
    }

    fn timeline_of(cuts: &[f64]) -> Timeline {
        let mut t = Timeline::new();
        for (i, c) in cuts.iter().enumerate() {
            t.insert(cut(*c, i as u32));
        }
        t
    }

    #[test]
    fn test_no_cuts_single_shot() {
        let metadata = VideoMetadata::new("v", "u", 30.0);
        let features = compute(&Timeline::new(), &metadata);
        assert_eq!(features.total_shots, 1);
        assert_eq!(features.avg_shot_duration, 30.0);
        assert_eq!(features.pacing_classification, "slow");
    }

    #[test]
    fn test_shot_durations_and_classification() {
        let metadata = VideoMetadata::new("v", "u", 12.0);
        // Cuts at 3, 6, 9 -> shots of 3s each.
        let features = compute(&timeline_of(&[3.0, 6.0, 9.0]), &metadata);
        assert_eq!(features.total_shots, 4);
        assert!((features.avg_shot_duration - 3.0).abs() < 1e-9);
        assert_eq!(features.pacing_classification, "fast");
        assert_eq!(features.rhythm_consistency, "consistent");
        assert_eq!(features.shots_per_minute, 20.0);
    }

    #[test]
    fn test_rapid_pacing() {
        let metadata = VideoMetadata::new("v", "u", 5.0);
        let cuts: Vec<f64> = (1..10).map(|i| i as f64 * 0.5).collect();
        let features = compute(&timeline_of(&cuts), &metadata);
        assert_eq!(features.pacing_classification, "rapid");
    }

    #[test]
    fn test_montage_detection() {
        let metadata = VideoMetadata::new("v", "u", 20.0);
        // Quick cuts 10.0..14.0 every second, slow elsewhere.
        let features = compute(&timeline_of(&[5.0, 10.0, 11.0, 12.0, 13.0, 14.0]), &metadata);
        assert_eq!(features.montage_segments.len(), 1);
        let segment = &features.montage_segments[0];
        assert!(segment.start >= 10.0 && segment.end <= 14.5);
        assert!(segment.avg_shot_duration < 1.5);
    }

    #[test]
    fn test_pacing_curve_windows() {
        let metadata = VideoMetadata::new("v", "u", 30.0);
        let features = compute(&timeline_of(&[1.0, 2.0, 3.0, 25.0]), &metadata);
        assert_eq!(features.pacing_curve.len(), 3);
        assert_eq!(features.pacing_curve[0], 3);
        assert_eq!(features.pacing_curve[2], 1);
        assert!(features.cut_density_zones.contains(&0));
    }
}
