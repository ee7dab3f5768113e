//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during retrieval and media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("yt-dlp not found in PATH")]
    YtDlpNotFound,

    /// The platform refused this client identity (login wall, bot check,
    /// rate limit). The cascade moves on to the next strategy.
    #[error("authentication required (strategy {strategy})")]
    AuthRequired { strategy: String },

    #[error("download failed: {message}")]
    DownloadFailed { message: String },

    #[error("output file missing after download: {0}")]
    OutputMissing(PathBuf),

    #[error("all {attempts} retrieval strategies exhausted during {operation}: {last}")]
    StrategiesExhausted {
        operation: String,
        attempts: usize,
        last: String,
    },

    #[error("{tool} failed: {message}")]
    ToolFailed {
        tool: &'static str,
        message: String,
        exit_code: Option<i32>,
    },

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("operation cancelled")]
    Cancelled,

    #[error("attempt timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("invalid video file: {0}")]
    InvalidVideo(String),
}

impl MediaError {
    /// Create an auth-wall error for a strategy.
    pub fn auth_required(strategy: impl Into<String>) -> Self {
        Self::AuthRequired {
            strategy: strategy.into(),
        }
    }

    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    /// Create a tool failure error.
    pub fn tool_failed(
        tool: &'static str,
        message: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::ToolFailed {
            tool,
            message: message.into(),
            exit_code,
        }
    }

    /// Whether the retrieval cascade may continue with the next strategy.
    ///
    /// Soft failures are per-attempt conditions: auth walls, plain download
    /// errors, missing output, and attempt deadlines. Everything else aborts
    /// the cascade.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            MediaError::AuthRequired { .. }
                | MediaError::DownloadFailed { .. }
                | MediaError::OutputMissing(_)
                | MediaError::Timeout(_)
        )
    }
}
