//! Error types for yt-grab

use thiserror::Error;

/// Stable error codes, one per failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Caller errors
    InvalidArgument,
    Busy,

    // Tool errors
    EmptyResult,
    ParseError,
    ToolError,
    Cancelled,

    // System errors
    MissingDependency,
    IoError,
    SpawnError,
    NetworkError,
}

/// Main error type for yt-grab
#[derive(Error, Debug)]
pub enum GrabError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Another operation is already running: {0}")]
    Busy(String),

    #[error("yt-dlp returned no output")]
    EmptyResult,

    /// The raw text is kept so it can be shown for diagnostics.
    #[error("Failed to parse yt-dlp output: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
        raw: String,
    },

    #[error("yt-dlp exited with code {code}. STDERR: {stderr}")]
    Tool { code: i32, stderr: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Missing dependency: {0}. Please install it.")]
    MissingDependency(String),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to spawn process: {0}")]
    Spawn(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GrabError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Busy(_) => ErrorCode::Busy,
            Self::EmptyResult => ErrorCode::EmptyResult,
            Self::Parse { .. } => ErrorCode::ParseError,
            Self::Tool { .. } => ErrorCode::ToolError,
            Self::Cancelled => ErrorCode::Cancelled,
            Self::MissingDependency(_) => ErrorCode::MissingDependency,
            Self::Io(_) => ErrorCode::IoError,
            Self::Spawn(_) => ErrorCode::SpawnError,
            Self::Network(_) => ErrorCode::NetworkError,
            Self::Json(_) => ErrorCode::ParseError,
        }
    }

    /// True when the operation was aborted on request (cleanup already done)
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, GrabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_message_carries_code_and_stderr() {
        let err = GrabError::Tool {
            code: 2,
            stderr: "ERROR: Unsupported URL".into(),
        };
        assert_eq!(err.code(), ErrorCode::ToolError);
        let msg = err.to_string();
        assert!(msg.contains("code 2"));
        assert!(msg.contains("Unsupported URL"));
    }

    #[test]
    fn test_parse_error_keeps_raw_text() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = GrabError::Parse {
            source,
            raw: "{oops".into(),
        };
        assert_eq!(err.code(), ErrorCode::ParseError);
        assert!(std::error::Error::source(&err).is_some());
        match err {
            GrabError::Parse { raw, .. } => assert_eq!(raw, "{oops"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_cancelled_is_distinct() {
        assert!(GrabError::Cancelled.is_cancelled());
        assert!(!GrabError::EmptyResult.is_cancelled());
    }
}
