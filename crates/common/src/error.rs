//! Error types shared across Handwave crates.

use std::path::PathBuf;

/// Top-level error type for Handwave operations.
///
/// The per-frame pipeline never produces these; they surface only at the
/// fallible edges (configuration, mapping documents, frame logs, CLI).
#[derive(Debug, thiserror::Error)]
pub enum HandwaveError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Mapping error: {message}")]
    Mapping { message: String },

    #[error("Frame log error at line {line}: {message}")]
    FrameLog { line: usize, message: String },

    #[error("Desktop host error: {message}")]
    Host { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using HandwaveError.
pub type HandwaveResult<T> = Result<T, HandwaveError>;

impl HandwaveError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::Mapping {
            message: msg.into(),
        }
    }

    pub fn frame_log(line: usize, msg: impl Into<String>) -> Self {
        Self::FrameLog {
            line,
            message: msg.into(),
        }
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_log_error_mentions_line() {
        let err = HandwaveError::frame_log(7, "expected value");
        assert_eq!(
            err.to_string(),
            "Frame log error at line 7: expected value"
        );
    }

    #[test]
    fn test_io_error_converts() {
        fn open() -> HandwaveResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?
        }
        assert!(matches!(open(), Err(HandwaveError::Io(_))));
    }
}
