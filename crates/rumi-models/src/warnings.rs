//! Recovered-condition counters.
//!
//! Every recoverable condition in the pipeline increments exactly one
//! counter here, and the counters appear in the final summary. Nothing is
//! recovered silently.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Counts of recovered conditions, grouped by error kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WarningCounters {
    /// Unparseable timestamps (entry dropped)
    pub timestamp_parse: u32,
    /// Out-of-range timestamps clamped into `[0, duration]`
    pub clamped: u32,
    /// Malformed analyzer output structures
    pub input_shape: u32,
    /// Entire analyzers absent from the input set
    pub missing_modality: u32,
    /// Feature extractors that fell back to minimal counts
    pub precompute_fallback: u32,
    /// LLM calls that failed or timed out
    pub llm_failure: u32,
    /// LLM responses with missing blocks or malformed JSON
    pub schema_violation: u32,
    /// Contexts or markers that needed size reduction
    pub size_overflow: u32,
}

impl WarningCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all counters.
    pub fn total(&self) -> u32 {
        self.timestamp_parse
            + self.clamped
            + self.input_shape
            + self.missing_modality
            + self.precompute_fallback
            + self.llm_failure
            + self.schema_violation
            + self.size_overflow
    }

    /// Merge another set of counters into this one.
    pub fn merge(&mut self, other: &WarningCounters) {
        self.timestamp_parse += other.timestamp_parse;
        self.clamped += other.clamped;
        self.input_shape += other.input_shape;
        self.missing_modality += other.missing_modality;
        self.precompute_fallback += other.precompute_fallback;
        self.llm_failure += other.llm_failure;
        self.schema_violation += other.schema_violation;
        self.size_overflow += other.size_overflow;
    }
}
