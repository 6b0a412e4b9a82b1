//! Multi-modal fusion for the RumiAI analysis core.
//!
//! This crate provides:
//! - Adapters normalizing each analyzer's raw output
//! - The unified-timeline assembler with its clamp/drop policy
//! - Temporal marker extraction with size control
//! - The seven-analysis feature precompute engine

pub mod adapters;
pub mod error;
pub mod markers;
pub mod precompute;
pub mod timeline;

pub use error::{FusionError, FusionResult};
pub use markers::extract_markers;
pub use precompute::{compute_all, compute_all_parallel, FeatureBundle, PrecomputeConfig};
pub use timeline::{build_unified_analysis, TimelineBuilder};
