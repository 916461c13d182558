//! Error types for sidenote processing

use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, SidenoteError>;

/// Sidenote error type
///
/// None of these reach the host render pipeline: the session boundary turns
/// them into diagnostics and degrades to "glyphs without panels".
#[derive(Error, Debug)]
pub enum SidenoteError {
    #[error("Positioning frame not found for region: {0}")]
    FrameNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTML rewrite failed: {0}")]
    Rewrite(String),

    #[error("Invalid marker pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SidenoteError::FrameNotFound("note.md".to_string());
        assert_eq!(err.to_string(), "Positioning frame not found for region: note.md");

        let err = SidenoteError::InvalidConfig("lead must be finite".to_string());
        assert!(err.to_string().contains("lead must be finite"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: SidenoteError = parse.unwrap_err().into();
        assert!(matches!(err, SidenoteError::Json(_)));
    }
}
