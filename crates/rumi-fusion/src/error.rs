//! Fusion error types.

use thiserror::Error;

pub type FusionResult<T> = Result<T, FusionError>;

#[derive(Debug, Error)]
pub enum FusionError {
    #[error("Malformed analyzer output: {0}")]
    InputShape(String),

    #[error("Timeline assembly failed: {0}")]
    Assembly(String),

    #[error("Invalid video metadata: {0}")]
    InvalidMetadata(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FusionError {
    pub fn input_shape(msg: impl Into<String>) -> Self {
        Self::InputShape(msg.into())
    }

    pub fn assembly(msg: impl Into<String>) -> Self {
        Self::Assembly(msg.into())
    }
}
