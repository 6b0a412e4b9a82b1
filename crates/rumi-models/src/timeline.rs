//! Unified timeline: time-ordered, modality-typed events.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::timestamp::Timestamp;

/// The analyzer modality an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    SceneChange,
    Object,
    Pose,
    Expression,
    Gesture,
    TextOverlay,
    Sticker,
    Speech,
    Action,
    Background,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::SceneChange => "scene_change",
            Modality::Object => "object",
            Modality::Pose => "pose",
            Modality::Expression => "expression",
            Modality::Gesture => "gesture",
            Modality::TextOverlay => "text_overlay",
            Modality::Sticker => "sticker",
            Modality::Speech => "speech",
            Modality::Action => "action",
            Modality::Background => "background",
        }
    }

    /// Fixed cross-modality insertion order used by the timeline builder.
    pub const BUILD_ORDER: [Modality; 8] = [
        Modality::SceneChange,
        Modality::Object,
        Modality::Pose,
        Modality::Expression,
        Modality::Gesture,
        Modality::TextOverlay,
        Modality::Sticker,
        Modality::Speech,
    ];
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BBox {
    pub fn area(&self) -> f64 {
        (self.width * self.height).max(0.0)
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }
}

/// Relative text size, classified from bbox area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum TextSizeClass {
    S,
    M,
    L,
    #[serde(rename = "XL")]
    Xl,
}

impl TextSizeClass {
    /// Rank used when scoring text moments (larger reads first).
    pub fn rank(&self) -> u8 {
        match self {
            TextSizeClass::Xl => 3,
            TextSizeClass::L => 2,
            TextSizeClass::M => 1,
            TextSizeClass::S => 0,
        }
    }
}

/// Vertical placement of on-screen text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VerticalPosition {
    Top,
    Middle,
    Bottom,
}

/// Horizontal placement of on-screen text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalPosition {
    Left,
    Center,
    Right,
}

/// Grid position of a text overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TextPosition {
    pub vertical: VerticalPosition,
    pub horizontal: HorizontalPosition,
}

impl Default for TextPosition {
    fn default() -> Self {
        Self { vertical: VerticalPosition::Middle, horizontal: HorizontalPosition::Center }
    }
}

/// Semantic category of a text overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TextCategory {
    Headline,
    Subtitle,
    Cta,
    Caption,
    Number,
    Hashtag,
    Other,
}

/// Transition kind reported by the scene detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SceneChangeKind {
    Cut,
    Dissolve,
    Fade,
}

/// One word with its own timing, from word-level transcription.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SpeechWord {
    pub word: String,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub confidence: f64,
}

/// Modality-typed event payload.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Object {
        class: String,
        confidence: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        bbox: Option<BBox>,
        #[serde(skip_serializing_if = "Option::is_none")]
        track_id: Option<i64>,
    },
    Speech {
        text: String,
        #[serde(default)]
        language: String,
        confidence: f64,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        words: Vec<SpeechWord>,
    },
    Expression {
        emotion: String,
        /// Signed pleasantness in [-1, 1]
        valence: f64,
        /// Strength in [0, 1]
        intensity: f64,
    },
    Gesture {
        label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        confidence: f64,
    },
    TextOverlay {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        bbox: Option<BBox>,
        size_class: TextSizeClass,
        #[serde(default)]
        position: TextPosition,
        category: TextCategory,
        #[serde(default)]
        confidence: f64,
    },
    Sticker {
        sticker: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        bbox: Option<BBox>,
    },
    SceneChange {
        change: SceneChangeKind,
        shot_id: u32,
    },
    Pose {
        #[serde(skip_serializing_if = "Option::is_none")]
        bbox: Option<BBox>,
        confidence: f64,
        /// True when the frame contains a detected face
        #[serde(default)]
        face_visible: bool,
        /// Gaze direction variance proxy, when the analyzer reports it
        #[serde(skip_serializing_if = "Option::is_none")]
        gaze_variance: Option<f64>,
    },
}

impl Payload {
    /// The modality this payload belongs to.
    pub fn modality(&self) -> Modality {
        match self {
            Payload::Object { .. } => Modality::Object,
            Payload::Speech { .. } => Modality::Speech,
            Payload::Expression { .. } => Modality::Expression,
            Payload::Gesture { .. } => Modality::Gesture,
            Payload::TextOverlay { .. } => Modality::TextOverlay,
            Payload::Sticker { .. } => Modality::Sticker,
            Payload::SceneChange { .. } => Modality::SceneChange,
            Payload::Pose { .. } => Modality::Pose,
        }
    }
}

/// One event on the unified timeline.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TimelineEntry {
    pub start: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<Timestamp>,
    pub modality: Modality,
    pub payload: Payload,
}

impl TimelineEntry {
    pub fn new(start: Timestamp, end: Option<Timestamp>, payload: Payload) -> Self {
        let modality = payload.modality();
        Self { start, end, modality, payload }
    }

    /// Duration of the entry, 0.0 for instantaneous events.
    pub fn duration(&self) -> f64 {
        self.end.map(|e| (e.seconds() - self.start.seconds()).max(0.0)).unwrap_or(0.0)
    }
}

/// Time-ordered event sequence across all modalities.
///
/// Entries are kept in non-decreasing `start` order; entries with equal
/// starts retain their insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert keeping order, stable for equal starts.
    pub fn insert(&mut self, entry: TimelineEntry) {
        // Partition point: first index whose start exceeds the new entry's,
        // so equal starts land after existing ones.
        let idx = self.entries.partition_point(|e| e.start <= entry.start);
        self.entries.insert(idx, entry);
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose start falls in `[start, end)`.
    pub fn in_range(&self, start: f64, end: f64) -> impl Iterator<Item = &TimelineEntry> {
        self.entries
            .iter()
            .filter(move |e| e.start.seconds() >= start && e.start.seconds() < end)
    }

    /// Entries of one modality, in timeline order.
    pub fn by_modality(&self, modality: Modality) -> impl Iterator<Item = &TimelineEntry> {
        self.entries.iter().filter(move |e| e.modality == modality)
    }

    /// Count of entries starting within second `i`.
    pub fn count_in_second(&self, second: usize) -> usize {
        self.in_range(second as f64, second as f64 + 1.0).count()
    }

    /// Last event time, 0.0 for an empty timeline.
    pub fn span(&self) -> f64 {
        self.entries
            .iter()
            .map(|e| e.end.unwrap_or(e.start).seconds())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object_entry(start: f64, class: &str) -> TimelineEntry {
        TimelineEntry::new(
            Timestamp::new(start).unwrap(),
            None,
            Payload::Object { class: class.to_string(), confidence: 0.9, bbox: None, track_id: None },
        )
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut timeline = Timeline::new();
        timeline.insert(object_entry(3.0, "a"));
        timeline.insert(object_entry(1.0, "b"));
        timeline.insert(object_entry(2.0, "c"));

        let starts: Vec<f64> = timeline.entries().iter().map(|e| e.start.seconds()).collect();
        assert_eq!(starts, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_equal_starts_are_stable() {
        let mut timeline = Timeline::new();
        timeline.insert(object_entry(1.0, "first"));
        timeline.insert(object_entry(1.0, "second"));
        timeline.insert(object_entry(1.0, "third"));

        let classes: Vec<&str> = timeline
            .entries()
            .iter()
            .map(|e| match &e.payload {
                Payload::Object { class, .. } => class.as_str(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(classes, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_range_and_modality_queries() {
        let mut timeline = Timeline::new();
        timeline.insert(object_entry(0.5, "a"));
        timeline.insert(object_entry(1.5, "b"));
        timeline.insert(TimelineEntry::new(
            Timestamp::new(1.2).unwrap(),
            None,
            Payload::Gesture { label: "pointing".into(), target: None, confidence: 0.8 },
        ));

        assert_eq!(timeline.in_range(1.0, 2.0).count(), 2);
        assert_eq!(timeline.by_modality(Modality::Object).count(), 2);
        assert_eq!(timeline.count_in_second(0), 1);
        assert_eq!(timeline.count_in_second(1), 2);
    }

    #[test]
    fn test_size_class_rank() {
        assert!(TextSizeClass::Xl.rank() > TextSizeClass::L.rank());
        assert!(TextSizeClass::L.rank() > TextSizeClass::M.rank());
        assert!(TextSizeClass::M.rank() > TextSizeClass::S.rank());
    }
}
