//! Error types shared across FrameBatch crates.

/// Top-level error type for FrameBatch operations.
#[derive(Debug, thiserror::Error)]
pub enum FrameBatchError {
    #[error("Invalid frame range: {start}..={end}")]
    InvalidRange { start: i64, end: i64 },

    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    #[error("Batch error: {message}")]
    Batch { message: String },

    #[error("Auto batch is already running")]
    AlreadyRunning,

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using FrameBatchError.
pub type FrameBatchResult<T> = Result<T, FrameBatchError>;

impl FrameBatchError {
    pub fn invalid_range(start: i64, end: i64) -> Self {
        Self::InvalidRange { start, end }
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: msg.into(),
        }
    }

    pub fn batch(msg: impl Into<String>) -> Self {
        Self::Batch {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
