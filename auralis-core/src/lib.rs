//! Auralis Core - Listening-test survey backend
//!
//! This crate provides the building blocks of the survey server: the audio
//! asset library, byte-range streaming of clips, survey record storage,
//! evaluation export, and configuration management.

pub mod config;
pub mod export;
pub mod storage;
pub mod streaming;
pub mod survey;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::AuralisConfig;
pub use export::{CsvExporter, EvaluationExporter, ExportError, ExportRow, NoopExporter};
pub use storage::{Asset, AssetId, AssetLibrary, AssetResolver};
pub use streaming::{AudioStreamService, StreamError};
pub use survey::{SurveyError, SurveyStore};

/// Core errors that can bubble up from any Auralis subsystem.
#[derive(Debug, thiserror::Error)]
pub enum AuralisError {
    #[error("Streaming error: {0}")]
    Streaming(#[from] StreamError),

    #[error("Survey error: {0}")]
    Survey(#[from] SurveyError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuralisError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            AuralisError::Streaming(e) => match e {
                StreamError::AssetNotFound { asset_id } => format!("Audio {asset_id} not found"),
                StreamError::RangeNotSatisfiable { .. } => {
                    "Requested range is outside the audio file".to_string()
                }
                StreamError::StorageUnavailable { .. } => "Audio file is unavailable".to_string(),
            },
            AuralisError::Survey(e) if e.is_user_error() => e.to_string(),
            AuralisError::Survey(_) => "Questionnaire could not be loaded".to_string(),
            AuralisError::Export(_) => "Export error occurred".to_string(),
            AuralisError::Configuration { reason } => format!("Configuration error: {reason}"),
            AuralisError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        match self {
            AuralisError::Survey(e) => e.is_user_error(),
            AuralisError::Configuration { .. } => true,
            AuralisError::Streaming(StreamError::AssetNotFound { .. })
            | AuralisError::Streaming(StreamError::RangeNotSatisfiable { .. }) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuralisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_are_classified() {
        let err: AuralisError = SurveyError::DuplicateUserId {
            user_id: "P001".to_string(),
        }
        .into();
        assert!(err.is_user_error());
        assert_eq!(
            err.user_message(),
            "User with user_id 'P001' already exists"
        );

        let err: AuralisError = std::io::Error::other("disk gone").into();
        assert!(!err.is_user_error());
        assert_eq!(err.user_message(), "File system error occurred");
    }

    #[test]
    fn test_stream_errors_have_friendly_messages() {
        let err: AuralisError = StreamError::AssetNotFound {
            asset_id: AssetId::new(12),
        }
        .into();
        assert_eq!(err.user_message(), "Audio 12 not found");
        assert!(err.is_user_error());
    }
}
