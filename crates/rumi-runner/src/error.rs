//! Runner error types and exit-code mapping.

use thiserror::Error;

pub type RunnerResult<T> = Result<T, RunnerError>;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("External API failed: {0}")]
    ExternalApi(String),

    #[error("ML pipeline failed: {0}")]
    MlPipeline(String),

    #[error("Video rejected: {0}")]
    Video(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rumi_storage::StorageError),

    #[error("Insight error: {0}")]
    Insight(#[from] rumi_insight::InsightError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RunnerError {
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    pub fn external_api(msg: impl Into<String>) -> Self {
        Self::ExternalApi(msg.into())
    }

    pub fn ml_pipeline(msg: impl Into<String>) -> Self {
        Self::MlPipeline(msg.into())
    }

    /// Process exit code for this error.
    ///
    /// 0 success, 1 generic, 2 invalid arguments, 3 external API failure,
    /// 4 ML pipeline failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunnerError::InvalidArguments(_) => 2,
            RunnerError::ExternalApi(_) | RunnerError::Insight(_) => 3,
            RunnerError::MlPipeline(_) => 4,
            _ => 1,
        }
    }
}
