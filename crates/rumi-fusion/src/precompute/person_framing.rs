//! Person framing features: how much of the video a human occupies, and how
//! the camera relates to them over time.

use std::collections::BTreeMap;

use rumi_models::{Modality, Payload, Timeline, VideoMetadata};
use serde::{Deserialize, Serialize};

use super::stats;

/// Shot type inferred from subject bbox coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotType {
    Close,
    Medium,
    Far,
    Absent,
}

impl ShotType {
    fn from_coverage(coverage: f64) -> Self {
        if coverage > 0.35 {
            ShotType::Close
        } else if coverage >= 0.1 {
            ShotType::Medium
        } else {
            ShotType::Far
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ShotType::Close => "close",
            ShotType::Medium => "medium",
            ShotType::Far => "far",
            ShotType::Absent => "absent",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonFramingFeatures {
    /// Fraction of seconds with at least one visible face.
    pub face_screen_time_ratio: f64,
    /// Fraction of seconds with a person object on screen.
    pub person_screen_time_ratio: f64,
    /// Seconds classified close / medium / far.
    pub shot_type_distribution: BTreeMap<String, usize>,
    /// Shot-type transitions divided by seconds.
    pub framing_volatility: f64,
    /// Stretches with no face and no person.
    pub subject_absence_count: usize,
    pub longest_absence_duration: f64,
    /// `steady`, `moderate`, or `unsteady` from gaze variance.
    pub gaze_steadiness: String,
    /// First-third versus last-third framing comparison.
    pub temporal_evolution: String,
    pub confidence: f64,
}

pub fn compute(timeline: &Timeline, metadata: &VideoMetadata) -> PersonFramingFeatures {
    let duration = metadata.duration_seconds;
    let seconds = duration.ceil().max(1.0) as usize;
    let frame_area = metadata.frame_area();

    // Per-second presence and coverage.
    let mut face_present = vec![false; seconds];
    let mut person_present = vec![false; seconds];
    let mut coverage = vec![0.0f64; seconds];
    let mut gaze_variances = Vec::new();

    for entry in timeline.entries() {
        let second = entry.start.second_index().min(seconds - 1);
        match &entry.payload {
            Payload::Pose { bbox, face_visible, gaze_variance, .. } => {
                if *face_visible {
                    face_present[second] = true;
                }
                if let Some(v) = gaze_variance {
                    gaze_variances.push(*v);
                }
                if let Some(bbox) = bbox {
                    coverage[second] = coverage[second].max(bbox_coverage(bbox, frame_area));
                }
            }
            Payload::Object { class, bbox, .. } if class == "person" => {
                person_present[second] = true;
                if let Some(bbox) = bbox {
                    coverage[second] = coverage[second].max(bbox_coverage(bbox, frame_area));
                }
            }
            _ => {}
        }
    }

    // Per-second shot types where a subject is present.
    let shot_types: Vec<ShotType> = (0..seconds)
        .map(|i| {
            if !face_present[i] && !person_present[i] {
                ShotType::Absent
            } else {
                ShotType::from_coverage(coverage[i])
            }
        })
        .collect();

    let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
    for shot in shot_types.iter().filter(|s| **s != ShotType::Absent) {
        *distribution.entry(shot.as_str().to_string()).or_insert(0) += 1;
    }

    let transitions = shot_types
        .windows(2)
        .filter(|w| w[0] != w[1] && w[0] != ShotType::Absent && w[1] != ShotType::Absent)
        .count();

    // Absence runs.
    let mut absence_count = 0usize;
    let mut longest_absence = 0usize;
    let mut run = 0usize;
    for shot in &shot_types {
        if *shot == ShotType::Absent {
            run += 1;
            longest_absence = longest_absence.max(run);
        } else {
            if run > 0 {
                absence_count += 1;
            }
            run = 0;
        }
    }
    if run > 0 {
        absence_count += 1;
    }

    let mean_gaze = stats::mean(&gaze_variances);
    let gaze_steadiness = if gaze_variances.is_empty() {
        "unknown"
    } else if mean_gaze < 0.1 {
        "steady"
    } else if mean_gaze < 0.3 {
        "moderate"
    } else {
        "unsteady"
    };

    let has_subject_data = timeline.by_modality(Modality::Pose).next().is_some()
        || timeline
            .by_modality(Modality::Object)
            .any(|e| matches!(&e.payload, Payload::Object { class, .. } if class == "person"));

    PersonFramingFeatures {
        face_screen_time_ratio: face_present.iter().filter(|p| **p).count() as f64 / seconds as f64,
        person_screen_time_ratio: person_present.iter().filter(|p| **p).count() as f64
            / seconds as f64,
        shot_type_distribution: distribution,
        framing_volatility: transitions as f64 / seconds as f64,
        subject_absence_count: absence_count,
        longest_absence_duration: longest_absence as f64,
        gaze_steadiness: gaze_steadiness.to_string(),
        temporal_evolution: temporal_evolution(&shot_types, &person_present, &face_present)
            .to_string(),
        confidence: if has_subject_data { 0.85 } else { 0.3 },
    }
}

/// Coverage fraction of the frame. Normalized bboxes (all sides <= 1) are
/// taken at face value; pixel bboxes need known frame dimensions.
fn bbox_coverage(bbox: &rumi_models::BBox, frame_area: Option<f64>) -> f64 {
    if bbox.width <= 1.0 && bbox.height <= 1.0 {
        return bbox.area().min(1.0);
    }
    match frame_area {
        Some(area) if area > 0.0 => (bbox.area() / area).min(1.0),
        _ => 0.0,
    }
}

/// Compare the first and last thirds of the video for framing direction.
fn temporal_evolution(
    shot_types: &[ShotType],
    person_present: &[bool],
    face_present: &[bool],
) -> &'static str {
    let n = shot_types.len();
    if n < 3 {
        return "consistent_approach";
    }
    let third = n / 3;

    let closeness = |slice: &[ShotType]| -> f64 {
        let scored: Vec<f64> = slice
            .iter()
            .filter(|s| **s != ShotType::Absent)
            .map(|s| match s {
                ShotType::Close => 2.0,
                ShotType::Medium => 1.0,
                _ => 0.0,
            })
            .collect();
        stats::mean(&scored)
    };
    let presence = |slice: &[bool]| -> f64 {
        slice.iter().filter(|p| **p).count() as f64 / slice.len().max(1) as f64
    };

    let first_close = closeness(&shot_types[..third]);
    let last_close = closeness(&shot_types[n - third..]);
    let first_person = presence(&person_present[..third]).max(presence(&face_present[..third]));
    let last_person = presence(&person_present[n - third..]).max(presence(&face_present[n - third..]));

    if first_person < 0.3 && last_person > 0.6 {
        "product_to_person"
    } else if first_person > 0.6 && last_person < 0.3 {
        "person_to_product"
    } else if first_person > 0.6 && last_person > 0.6 && presence(&person_present[third..n - third]) < 0.3
    {
        "bookend_pattern"
    } else if last_close > first_close + 0.4 {
        "increasing_intimacy"
    } else if first_close > last_close + 0.4 {
        "decreasing_intimacy"
    } else {
        "consistent_approach"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumi_models::{BBox, Timestamp, TimelineEntry};

    fn person(start: f64, coverage_side: f64) -> TimelineEntry {
        TimelineEntry::new(
            Timestamp::new(start).unwrap(),
            None,
            Payload::Object {
                class: "person".into(),
                confidence: 0.9,
                bbox: Some(BBox { x: 0.0, y: 0.0, width: coverage_side, height: 1.0 }),
                track_id: Some(1),
            },
        )
    }

    fn face(start: f64) -> TimelineEntry {
        TimelineEntry::new(
            Timestamp::new(start).unwrap(),
            None,
            Payload::Pose { bbox: None, confidence: 0.9, face_visible: true, gaze_variance: Some(0.05) },
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
    fn test_screen_time_ratios() {
        let metadata = VideoMetadata::new("v", "u", 10.0);
        let timeline = timeline_of(vec![face(0.5), face(1.5), person(3.5, 0.2)]);
        let features = compute(&timeline, &metadata);
        assert!((features.face_screen_time_ratio - 0.2).abs() < 1e-9);
        assert!((features.person_screen_time_ratio - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_shot_type_thresholds() {
        let metadata = VideoMetadata::new("v", "u", 3.0);
        let timeline = timeline_of(vec![
            person(0.5, 0.5),  // coverage 0.5 -> close
            person(1.5, 0.2),  // coverage 0.2 -> medium
            person(2.5, 0.05), // coverage 0.05 -> far
        ]);
        let features = compute(&timeline, &metadata);
        assert_eq!(features.shot_type_distribution["close"], 1);
        assert_eq!(features.shot_type_distribution["medium"], 1);
        assert_eq!(features.shot_type_distribution["far"], 1);
    }

    #[test]
    fn test_absence_runs() {
        let metadata = VideoMetadata::new("v", "u", 6.0);
        let timeline = timeline_of(vec![face(0.5), face(4.5)]);
        let features = compute(&timeline, &metadata);
        // Absent seconds 1-3 and 5: two runs, longest three seconds.
        assert_eq!(features.subject_absence_count, 2);
        assert_eq!(features.longest_absence_duration, 3.0);
    }

    #[test]
    fn test_gaze_steadiness() {
        let metadata = VideoMetadata::new("v", "u", 2.0);
        let features = compute(&timeline_of(vec![face(0.5)]), &metadata);
        assert_eq!(features.gaze_steadiness, "steady");
    }

    #[test]
    fn test_no_subject_low_confidence() {
        let metadata = VideoMetadata::new("v", "u", 10.0);
        let features = compute(&Timeline::new(), &metadata);
        assert!(features.confidence < 0.5);
        assert_eq!(features.face_screen_time_ratio, 0.0);
    }
}
