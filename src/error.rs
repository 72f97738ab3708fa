use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerseError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to fetch '{table}': {message}")]
    Transport { table: String, message: String },

    #[error("Invalid data in '{table}': {message}")]
    DataValidation { table: String, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown data type: \"{0}\"")]
    UnknownDataset(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("An unexpected error occurred: {0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl VerseError {
    /// Errors caused by caller input rather than by the service itself.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            VerseError::InvalidRequest(_) | VerseError::UnknownDataset(_) | VerseError::NotFound(_)
        )
    }

    pub(crate) fn transport(table: &str, message: impl Into<String>) -> Self {
        VerseError::Transport {
            table: table.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn validation(table: &str, message: impl Into<String>) -> Self {
        VerseError::DataValidation {
            table: table.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VerseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_are_classified() {
        assert!(VerseError::InvalidRequest("short".into()).is_user_error());
        assert!(VerseError::UnknownDataset("nope".into()).is_user_error());
        assert!(!VerseError::transport("ws-quran", "timeout").is_user_error());
        assert!(!VerseError::validation("ws-quran", "missing key").is_user_error());
    }

    #[test]
    fn test_error_messages() {
        let err = VerseError::validation("ws-quran", "Property \"verse_index\" is missing");
        assert_eq!(
            err.to_string(),
            "Invalid data in 'ws-quran': Property \"verse_index\" is missing"
        );
        let err = VerseError::UnknownDataset("bible".into());
        assert_eq!(err.to_string(), "Unknown data type: \"bible\"");
    }
}
