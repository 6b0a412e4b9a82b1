//! Shared data models for the RumiAI analysis core.
//!
//! This crate provides Serde-serializable types for:
//! - Timestamps, frame conversion, and the per-video FPS registry
//! - Video metadata and engagement stats
//! - The unified timeline and its modality-typed payloads
//! - Analyzer results and the fused per-video record
//! - Temporal markers with their size bounds
//! - Standard vocabularies and phrase lexicons

pub mod analysis;
pub mod fps;
pub mod lexicon;
pub mod markers;
pub mod timeline;
pub mod timestamp;
pub mod video;
pub mod vocab;
pub mod warnings;

// Re-export common types
pub use analysis::{AnalysisType, MLAnalysisResult, UnifiedAnalysis, EXPECTED_ANALYZERS};
pub use markers::{
    cta_window_bounds, CtaAppearance, CtaWindow, FirstFiveSeconds, GestureMoment, MarkerMetadata,
    ObjectAppearance, ObjectFocus, TemporalMarkers, TextMoment,
};
pub use timeline::{
    BBox, HorizontalPosition, Modality, Payload, SceneChangeKind, SpeechWord, TextCategory,
    TextPosition, TextSizeClass, Timeline, TimelineEntry, VerticalPosition,
};
pub use timestamp::{frame_to_seconds, seconds_to_frame, Timestamp};
pub use video::{VideoId, VideoMetadata, VideoStats};
pub use warnings::WarningCounters;
