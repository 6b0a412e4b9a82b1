//! Structured LLM analysis for the RumiAI core.
//!
//! This crate provides:
//! - Per-analysis prompt context assembly with size budgeting
//! - The LLM capability trait with a Claude-backed client and a test stub
//! - The sequential seven-analysis orchestrator
//! - Six-block response validation

pub mod client;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod prompts;
pub mod validator;

pub use client::{CallContext, ClaudeClient, LlmClient, LlmResponse, StubLlmClient, TokenUsage};
pub use context::{build_context, CompressionLevel, PromptContext, CONTEXT_SIZE_LIMIT};
pub use error::{InsightError, InsightResult};
pub use orchestrator::{
    AnalysisOutcome, CancelToken, Orchestrator, OrchestratorConfig, RolloutDecision,
};
pub use prompts::CANONICAL_BLOCKS;
pub use validator::{validate_response, ValidatedResponse};
