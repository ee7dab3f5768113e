//! Pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported video: {0}")]
    Unsupported(String),

    #[error("AI analysis failed: {0}")]
    AiFailed(String),

    #[error("Fallback download failed: {0}")]
    FallbackFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Media error: {0}")]
    Media(#[from] aclip_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn ai_failed(msg: impl Into<String>) -> Self {
        Self::AiFailed(msg.into())
    }

    pub fn fallback_failed(msg: impl Into<String>) -> Self {
        Self::FallbackFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check whether the run was aborted by the operator rather than failed.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Media(aclip_media::MediaError::Cancelled))
    }
}
