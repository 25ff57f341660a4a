use std::path::PathBuf;
use thiserror::Error;

/// screentrack error types
#[derive(Error, Debug)]
pub enum ScreentrackError {
    /// Failed to parse a value (date, JSON fragment)
    #[error("parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Store write or lock failed
    #[error("store error: {0}")]
    Store(String),

    /// Store exists but its content is not a valid usage document.
    /// Recoverable: the caller decides whether to start empty or abort.
    #[error("corrupt store {}: {reason}", path.display())]
    CorruptStore { path: PathBuf, reason: String },

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Foreground window lookup failed
    #[error("platform error: {0}")]
    Platform(String),
}

/// Result type alias for screentrack
pub type Result<T> = std::result::Result<T, ScreentrackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScreentrackError::Parse("invalid date".into());
        assert_eq!(err.to_string(), "parse error: invalid date");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ScreentrackError = io_err.into();
        assert!(err.to_string().contains("io error"));
    }

    #[test]
    fn test_corrupt_store_display_includes_path() {
        let err = ScreentrackError::CorruptStore {
            path: PathBuf::from("/tmp/usage.json"),
            reason: "expected value at line 1".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/usage.json"));
        assert!(msg.contains("expected value"));
    }
}
