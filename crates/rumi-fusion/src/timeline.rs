//! Unified timeline assembly.
//!
//! Takes the normalized analyzer results and fuses them into a single
//! time-ordered timeline. Modality builders run in a fixed order so that
//! entries sharing a start second always serialize identically:
//! scene_change, object, pose, expression, gesture, text_overlay, sticker,
//! speech. A failure inside one builder logs an error and contributes zero
//! entries; it never aborts the build.

use std::collections::BTreeMap;

use rumi_models::{
    lexicon, vocab, HorizontalPosition, MLAnalysisResult, Modality, Payload, SceneChangeKind,
    TextCategory, TextPosition, Timeline, TimelineEntry, Timestamp, UnifiedAnalysis,
    VerticalPosition, VideoMetadata, WarningCounters, EXPECTED_ANALYZERS,
};
use tracing::{debug, error, warn};

use crate::adapters::{human, object, ocr, scene, speech};

/// Assembles a [`UnifiedAnalysis`] from normalized analyzer results.
pub struct TimelineBuilder {
    warnings: WarningCounters,
}

impl Default for TimelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self { warnings: WarningCounters::new() }
    }

    /// Build the unified analysis. Returns the fused record together with
    /// the warning counters accumulated during assembly.
    pub fn build(
        mut self,
        metadata: VideoMetadata,
        ml_results: BTreeMap<String, MLAnalysisResult>,
    ) -> (UnifiedAnalysis, WarningCounters) {
        let duration = metadata.duration_seconds;
        let mut timeline = Timeline::new();

        for name in EXPECTED_ANALYZERS {
            match ml_results.get(name) {
                None => {
                    warn!(analyzer = name, "Analyzer output absent");
                    self.warnings.missing_modality += 1;
                }
                Some(result) if !result.success => {
                    warn!(analyzer = name, error = ?result.error, "Analyzer reported failure");
                    self.warnings.input_shape += 1;
                }
                Some(_) => {}
            }
        }

        // Fixed cross-modality order; see Modality::BUILD_ORDER.
        self.run_builder("scene_change", &mut timeline, |b, t| {
            b.build_scene_changes(&ml_results, &metadata, t)
        });
        self.run_builder("object", &mut timeline, |b, t| {
            b.build_objects(&ml_results, &metadata, t)
        });
        self.run_builder("pose", &mut timeline, |b, t| {
            b.build_poses(&ml_results, &metadata, t)
        });
        self.run_builder("expression", &mut timeline, |b, t| {
            b.build_expressions(&ml_results, &metadata, t)
        });
        self.run_builder("gesture", &mut timeline, |b, t| {
            b.build_gestures(&ml_results, &metadata, t)
        });
        self.run_builder("text_overlay", &mut timeline, |b, t| {
            b.build_text_overlays(&ml_results, &metadata, t)
        });
        self.run_builder("sticker", &mut timeline, |b, t| {
            b.build_stickers(&ml_results, &metadata, t)
        });
        self.run_builder("speech", &mut timeline, |b, t| {
            b.build_speech(&ml_results, &metadata, t)
        });

        debug!(
            video_id = %metadata.video_id,
            entries = timeline.len(),
            duration,
            "Unified timeline assembled"
        );

        let analysis = UnifiedAnalysis::new(metadata, timeline, ml_results);
        (analysis, self.warnings)
    }

    fn run_builder(
        &mut self,
        name: &str,
        timeline: &mut Timeline,
        f: impl FnOnce(&mut Self, &mut Timeline) -> Result<usize, crate::error::FusionError>,
    ) {
        match f(self, timeline) {
            Ok(count) => debug!(builder = name, entries = count, "Modality builder finished"),
            Err(e) => {
                error!(builder = name, error = %e, "Modality builder failed, contributing no entries");
                self.warnings.input_shape += 1;
            }
        }
    }

    /// Resolve a detection's time from explicit seconds or a frame index at
    /// the video's original fps, then apply the clamp/drop policy.
    fn resolve_start(
        &mut self,
        metadata: &VideoMetadata,
        timestamp: Option<f64>,
        frame: Option<u64>,
    ) -> Option<Timestamp> {
        let seconds = match (timestamp, frame) {
            (Some(s), _) => s,
            (None, Some(f)) => rumi_models::fps::frame_to_seconds(metadata.video_id.as_str(), f),
            (None, None) => {
                self.warnings.timestamp_parse += 1;
                return None;
            }
        };
        self.admit_seconds(seconds, metadata.duration_seconds)
    }

    /// Drop negatives, clamp overshoots, admit everything else.
    fn admit_seconds(&mut self, seconds: f64, duration: f64) -> Option<Timestamp> {
        if !seconds.is_finite() || seconds < 0.0 {
            warn!(seconds, "Dropping entry with invalid start");
            self.warnings.timestamp_parse += 1;
            return None;
        }
        if seconds > duration {
            warn!(seconds, duration, "Clamping entry start to video duration");
            self.warnings.clamped += 1;
            return Timestamp::new(duration);
        }
        Timestamp::new(seconds)
    }

    /// Clamp an optional end and swap it with start when reversed.
    fn admit_end(&mut self, start: Timestamp, end: f64, duration: f64) -> (Timestamp, Option<Timestamp>) {
        let Some(end) = self.admit_seconds(end, duration) else {
            return (start, None);
        };
        if end < start {
            warn!(
                start = start.seconds(),
                end = end.seconds(),
                "Entry end precedes start, swapping"
            );
            self.warnings.clamped += 1;
            (end, Some(start))
        } else {
            (start, Some(end))
        }
    }

    fn build_scene_changes(
        &mut self,
        ml_results: &BTreeMap<String, MLAnalysisResult>,
        metadata: &VideoMetadata,
        timeline: &mut Timeline,
    ) -> Result<usize, crate::error::FusionError> {
        let Some(data) = successful_data(ml_results, scene::MODEL_NAME) else {
            return Ok(0);
        };
        let scenes: scene::NormalizedScenes = serde_json::from_value(data.clone())?;

        let mut count = 0;
        for (shot_id, shot) in scenes.shots.iter().enumerate() {
            let Some(start) = self.admit_seconds(shot.start_time, metadata.duration_seconds) else {
                continue;
            };
            let change = match shot.transition.as_str() {
                "dissolve" => SceneChangeKind::Dissolve,
                "fade" => SceneChangeKind::Fade,
                _ => SceneChangeKind::Cut,
            };
            timeline.insert(TimelineEntry::new(
                start,
                None,
                Payload::SceneChange { change, shot_id: shot_id as u32 },
            ));
            count += 1;
        }
        Ok(count)
    }

    fn build_objects(
        &mut self,
        ml_results: &BTreeMap<String, MLAnalysisResult>,
        metadata: &VideoMetadata,
        timeline: &mut Timeline,
    ) -> Result<usize, crate::error::FusionError> {
        let Some(data) = successful_data(ml_results, object::MODEL_NAME) else {
            return Ok(0);
        };
        let tracks: object::NormalizedTracks = serde_json::from_value(data.clone())?;

        let mut count = 0;
        for track in &tracks.tracks {
            for detection in &track.detections {
                let Some(start) = self.resolve_start(metadata, detection.timestamp, detection.frame)
                else {
                    continue;
                };
                timeline.insert(TimelineEntry::new(
                    start,
                    None,
                    Payload::Object {
                        class: track.class.clone(),
                        confidence: detection.confidence,
                        bbox: detection.bbox,
                        track_id: track.track_id,
                    },
                ));
                count += 1;
            }
        }
        Ok(count)
    }

    fn build_poses(
        &mut self,
        ml_results: &BTreeMap<String, MLAnalysisResult>,
        metadata: &VideoMetadata,
        timeline: &mut Timeline,
    ) -> Result<usize, crate::error::FusionError> {
        let Some(data) = successful_data(ml_results, human::MODEL_NAME) else {
            return Ok(0);
        };
        let frames: human::NormalizedHuman = serde_json::from_value(data.clone())?;

        let mut count = 0;
        for frame in &frames.frames {
            if frame.poses.is_empty() && frame.face_count == 0 {
                continue;
            }
            let Some(start) = self.resolve_start(metadata, frame.timestamp, frame.frame) else {
                continue;
            };
            let pose = frame.poses.first();
            timeline.insert(TimelineEntry::new(
                start,
                None,
                Payload::Pose {
                    bbox: pose.and_then(|p| p.bbox),
                    confidence: pose.map(|p| p.confidence).unwrap_or(0.5),
                    face_visible: frame.face_count > 0,
                    gaze_variance: frame.gaze_variance,
                },
            ));
            count += 1;
        }
        Ok(count)
    }

    fn build_expressions(
        &mut self,
        ml_results: &BTreeMap<String, MLAnalysisResult>,
        metadata: &VideoMetadata,
        timeline: &mut Timeline,
    ) -> Result<usize, crate::error::FusionError> {
        let Some(data) = successful_data(ml_results, human::MODEL_NAME) else {
            return Ok(0);
        };
        let frames: human::NormalizedHuman = serde_json::from_value(data.clone())?;

        let mut count = 0;
        for frame in &frames.frames {
            for expression in &frame.expressions {
                let Some(start) = self.resolve_start(metadata, frame.timestamp, frame.frame) else {
                    continue;
                };
                let emotion = vocab::standardize_emotion(&expression.emotion).to_string();
                let valence = expression
                    .valence
                    .unwrap_or_else(|| vocab::emotion_valence(&emotion))
                    .clamp(-1.0, 1.0);
                let intensity = expression
                    .intensity
                    .unwrap_or(expression.confidence)
                    .clamp(0.0, 1.0);
                timeline.insert(TimelineEntry::new(
                    start,
                    None,
                    Payload::Expression { emotion, valence, intensity },
                ));
                count += 1;
            }
        }
        Ok(count)
    }

    fn build_gestures(
        &mut self,
        ml_results: &BTreeMap<String, MLAnalysisResult>,
        metadata: &VideoMetadata,
        timeline: &mut Timeline,
    ) -> Result<usize, crate::error::FusionError> {
        let Some(data) = successful_data(ml_results, human::MODEL_NAME) else {
            return Ok(0);
        };
        let frames: human::NormalizedHuman = serde_json::from_value(data.clone())?;

        let mut count = 0;
        for frame in &frames.frames {
            for gesture in &frame.gestures {
                let Some(start) = self.resolve_start(metadata, frame.timestamp, frame.frame) else {
                    continue;
                };
                timeline.insert(TimelineEntry::new(
                    start,
                    None,
                    Payload::Gesture {
                        label: vocab::standardize_gesture(&gesture.label).to_string(),
                        target: gesture.target.clone(),
                        confidence: gesture.confidence,
                    },
                ));
                count += 1;
            }
        }
        Ok(count)
    }

    fn build_text_overlays(
        &mut self,
        ml_results: &BTreeMap<String, MLAnalysisResult>,
        metadata: &VideoMetadata,
        timeline: &mut Timeline,
    ) -> Result<usize, crate::error::FusionError> {
        let Some(data) = successful_data(ml_results, ocr::MODEL_NAME) else {
            return Ok(0);
        };
        let frames: ocr::NormalizedOcr = serde_json::from_value(data.clone())?;
        let frame_area = metadata.frame_area();

        let mut count = 0;
        for frame in &frames.frames {
            for text in &frame.texts {
                let Some(start) = self.resolve_start(metadata, frame.timestamp, frame.frame) else {
                    continue;
                };
                let size_class = vocab::classify_text_size(text.bbox.as_ref(), frame_area);
                let category = text.category.unwrap_or_else(|| infer_category(&text.text));
                let position = text
                    .bbox
                    .as_ref()
                    .map(|bbox| grid_position(bbox, metadata))
                    .unwrap_or_default();

                timeline.insert(TimelineEntry::new(
                    start,
                    None,
                    Payload::TextOverlay {
                        text: text.text.clone(),
                        bbox: text.bbox,
                        size_class,
                        position,
                        category,
                        confidence: text.confidence,
                    },
                ));
                count += 1;
            }
        }
        Ok(count)
    }

    fn build_stickers(
        &mut self,
        ml_results: &BTreeMap<String, MLAnalysisResult>,
        metadata: &VideoMetadata,
        timeline: &mut Timeline,
    ) -> Result<usize, crate::error::FusionError> {
        let Some(data) = successful_data(ml_results, ocr::MODEL_NAME) else {
            return Ok(0);
        };
        let frames: ocr::NormalizedOcr = serde_json::from_value(data.clone())?;

        let mut count = 0;
        for frame in &frames.frames {
            for sticker in &frame.stickers {
                let Some(start) = self.resolve_start(metadata, frame.timestamp, frame.frame) else {
                    continue;
                };
                timeline.insert(TimelineEntry::new(
                    start,
                    None,
                    Payload::Sticker { sticker: sticker.sticker.clone(), bbox: sticker.bbox },
                ));
                count += 1;
            }
        }
        Ok(count)
    }

    fn build_speech(
        &mut self,
        ml_results: &BTreeMap<String, MLAnalysisResult>,
        metadata: &VideoMetadata,
        timeline: &mut Timeline,
    ) -> Result<usize, crate::error::FusionError> {
        let Some(result) = ml_results.get(speech::MODEL_NAME).filter(|r| r.success) else {
            return Ok(0);
        };
        let normalized: speech::NormalizedSpeech = serde_json::from_value(result.data.clone())?;
        let duration = metadata.duration_seconds;

        let mut count = 0;
        for segment in &normalized.segments {
            let Some(start) = self.admit_seconds(segment.start, duration) else {
                continue;
            };
            let (start, end) = self.admit_end(start, segment.end, duration);
            timeline.insert(TimelineEntry::new(
                start,
                end,
                Payload::Speech {
                    text: segment.text.clone(),
                    language: normalized.language.clone(),
                    confidence: segment.confidence,
                    words: segment.words.clone(),
                },
            ));
            count += 1;
        }
        Ok(count)
    }
}

/// Data of a successful analyzer result, if present.
fn successful_data<'a>(
    ml_results: &'a BTreeMap<String, MLAnalysisResult>,
    name: &str,
) -> Option<&'a serde_json::Value> {
    ml_results.get(name).filter(|r| r.success).map(|r| &r.data)
}

/// Build a unified analysis and warning counters from metadata and results.
///
/// This is the crate's main entry point for assembly.
pub fn build_unified_analysis(
    metadata: VideoMetadata,
    ml_results: BTreeMap<String, MLAnalysisResult>,
) -> (UnifiedAnalysis, WarningCounters) {
    TimelineBuilder::new().build(metadata, ml_results)
}

/// Infer an overlay category from its text when the analyzer gave none.
fn infer_category(text: &str) -> TextCategory {
    let trimmed = text.trim();
    if lexicon::matches_lexicon(trimmed, lexicon::CTA) {
        TextCategory::Cta
    } else if trimmed.starts_with('#') {
        TextCategory::Hashtag
    } else if trimmed.chars().all(|c| c.is_ascii_digit() || c == '%' || c == '$' || c == '.') && !trimmed.is_empty() {
        TextCategory::Number
    } else {
        TextCategory::Other
    }
}

/// Map a bbox center into the 3x3 position grid.
fn grid_position(bbox: &rumi_models::BBox, metadata: &VideoMetadata) -> TextPosition {
    let (Some(width), Some(height)) = (metadata.width, metadata.height) else {
        return TextPosition::default();
    };
    let (width, height) = (width as f64, height as f64);

    let vertical = match bbox.center_y() / height {
        y if y < 1.0 / 3.0 => VerticalPosition::Top,
        y if y > 2.0 / 3.0 => VerticalPosition::Bottom,
        _ => VerticalPosition::Middle,
    };
    let horizontal = match bbox.center_x() / width {
        x if x < 1.0 / 3.0 => HorizontalPosition::Left,
        x if x > 2.0 / 3.0 => HorizontalPosition::Right,
        _ => HorizontalPosition::Center,
    };
    TextPosition { vertical, horizontal }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(duration: f64) -> VideoMetadata {
        VideoMetadata::new("timeline-test", "https://example.com/v", duration)
    }

    fn speech_result(segments: serde_json::Value) -> MLAnalysisResult {
        crate::adapters::adapt_speech(&json!({ "language": "en", "segments": segments }))
    }

    #[test]
    fn test_single_speech_segment() {
        let mut results = BTreeMap::new();
        results.insert(
            speech::MODEL_NAME.to_string(),
            speech_result(json!([{"start": 1.0, "end": 3.0, "text": "hello world"}])),
        );

        let (analysis, warnings) = build_unified_analysis(metadata(10.0), results);
        assert_eq!(analysis.timeline.len(), 1);
        assert_eq!(analysis.timeline.entries()[0].start.seconds(), 1.0);
        assert_eq!(warnings.clamped, 0);
        // Four of five analyzers absent
        assert_eq!(warnings.missing_modality, 4);
    }

    #[test]
    fn test_clamp_and_drop_policy() {
        // Starts -0.1 (dropped), 0.0, 5.0, 100.0 (clamped) on a 10 s video.
        let mut results = BTreeMap::new();
        results.insert(
            speech::MODEL_NAME.to_string(),
            speech_result(json!([
                {"start": -0.1, "end": 0.5, "text": "dropped"},
                {"start": 0.0, "end": 0.5, "text": "kept"},
                {"start": 5.0, "end": 6.0, "text": "kept"},
                {"start": 100.0, "end": 101.0, "text": "clamped"}
            ])),
        );

        let (analysis, warnings) = build_unified_analysis(metadata(10.0), results);
        let starts: Vec<f64> =
            analysis.timeline.entries().iter().map(|e| e.start.seconds()).collect();
        assert_eq!(starts, vec![0.0, 5.0, 10.0]);
        assert_eq!(warnings.timestamp_parse, 1);
        assert!(warnings.clamped >= 1);
    }

    #[test]
    fn test_end_before_start_swapped() {
        let mut results = BTreeMap::new();
        results.insert(
            speech::MODEL_NAME.to_string(),
            speech_result(json!([{"start": 4.0, "end": 2.0, "text": "reversed"}])),
        );

        let (analysis, warnings) = build_unified_analysis(metadata(10.0), results);
        let entry = &analysis.timeline.entries()[0];
        assert_eq!(entry.start.seconds(), 2.0);
        assert_eq!(entry.end.unwrap().seconds(), 4.0);
        assert!(warnings.clamped >= 1);
    }

    #[test]
    fn test_failed_adapter_counts_input_shape() {
        let mut results = BTreeMap::new();
        results.insert(
            ocr::MODEL_NAME.to_string(),
            MLAnalysisResult::failed(ocr::MODEL_NAME, "unrecognized"),
        );

        let (analysis, warnings) = build_unified_analysis(metadata(10.0), results);
        assert!(analysis.timeline.is_empty());
        assert_eq!(warnings.input_shape, 1);
        assert_eq!(warnings.missing_modality, 4);
    }

    #[test]
    fn test_cross_modality_order_at_equal_start() {
        let mut results = BTreeMap::new();
        results.insert(
            scene::MODEL_NAME.to_string(),
            crate::adapters::adapt_scene_detection(&json!({
                "shots": [{"start_time": 2.0, "end_time": 4.0}]
            })),
        );
        results.insert(
            speech::MODEL_NAME.to_string(),
            speech_result(json!([{"start": 2.0, "end": 3.0, "text": "same second"}])),
        );
        results.insert(
            ocr::MODEL_NAME.to_string(),
            crate::adapters::adapt_ocr(&json!({
                "frames": [{"timestamp": 2.0, "text_elements": [{"text": "overlay"}]}]
            })),
        );

        let (analysis, _) = build_unified_analysis(metadata(10.0), results);
        let modalities: Vec<Modality> =
            analysis.timeline.entries().iter().map(|e| e.modality).collect();
        assert_eq!(
            modalities,
            vec![Modality::SceneChange, Modality::TextOverlay, Modality::Speech]
        );
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let make = || {
            let mut results = BTreeMap::new();
            results.insert(
                speech::MODEL_NAME.to_string(),
                speech_result(json!([
                    {"start": 1.0, "end": 2.0, "text": "a"},
                    {"start": 1.0, "end": 2.0, "text": "b"}
                ])),
            );
            build_unified_analysis(metadata(10.0), results).0
        };
        let a = serde_json::to_string(&make().timeline).unwrap();
        let b = serde_json::to_string(&make().timeline).unwrap();
        assert_eq!(a, b);
    }
}
