//! Insight error types.

use thiserror::Error;

pub type InsightResult<T> = Result<T, InsightError>;

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("LLM transport failed: {0}")]
    Transport(String),

    #[error("LLM call timed out after {0}s")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rumi_storage::StorageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl InsightError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
