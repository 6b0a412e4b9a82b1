//! RumiAI pipeline runner.
//!
//! This crate provides:
//! - Environment-driven settings
//! - Analyzer-output loading and the video source adapter
//! - Pipeline wiring from metadata to the final report
//! - Progress reporting and exit-code mapping

pub mod config;
pub mod error;
pub mod ml_outputs;
pub mod pipeline;
pub mod progress;
pub mod source;

pub use config::{OutputFormatVersion, Settings};
pub use error::{RunnerError, RunnerResult};
pub use pipeline::{Pipeline, PipelineReport};
pub use source::{ApifyClient, VideoSource};
