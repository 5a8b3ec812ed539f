//! Listening-test survey data.
//!
//! Participant registration, the noise-sensitivity questionnaire and per-clip
//! evaluations. Records live in an in-memory [`SurveyStore`]; submitted
//! evaluations can be flattened into an [`ExportRow`](crate::export::ExportRow)
//! for spreadsheet export.

pub mod models;
pub mod store;

use std::path::{Path, PathBuf};

pub use models::{
    AudioEvaluation, EvaluationRatings, Gender, NewAudioEvaluation, NewNoiseResponse,
    NewUserProfile, NoiseQuestion, NoiseResponse, QuestionSpec, RecordId, UserProfile,
};
pub use store::SurveyStore;

use crate::storage::AssetId;

/// Errors raised by survey operations.
#[derive(Debug, thiserror::Error)]
pub enum SurveyError {
    /// No participant with this primary key
    #[error("User {id} does not exist")]
    UnknownUser {
        /// Primary key that was looked up
        id: RecordId,
    },

    /// No questionnaire item with this primary key
    #[error("Question {id} does not exist")]
    UnknownQuestion {
        /// Primary key that was looked up
        id: RecordId,
    },

    /// No audio asset with this identifier
    #[error("Audio {id} does not exist")]
    UnknownAudio {
        /// Identifier that was looked up
        id: AssetId,
    },

    /// A participant code is already registered
    #[error("User with user_id '{user_id}' already exists")]
    DuplicateUserId {
        /// The conflicting participant code
        user_id: String,
    },

    /// A field value is out of range or malformed
    #[error("Invalid {field}: {reason}")]
    Validation {
        /// Name of the offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// The questionnaire file could not be read
    #[error("Cannot read questions file {}: {source}", path.display())]
    QuestionsUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The questionnaire file is not valid JSON of the expected shape
    #[error("Invalid questions file {}: {source}", path.display())]
    QuestionsInvalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SurveyError {
    /// Whether the error was caused by the submitted data rather than the server.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            SurveyError::QuestionsUnreadable { .. } | SurveyError::QuestionsInvalid { .. }
        )
    }
}

/// Result type for survey operations
pub type SurveyResult<T> = Result<T, SurveyError>;

/// Load questionnaire items from a JSON array of
/// `{"number", "text", "reverse_scale"?}` objects.
///
/// # Errors
/// - `SurveyError::QuestionsUnreadable` - File cannot be read
/// - `SurveyError::QuestionsInvalid` - File is not a JSON array of questions
/// - `SurveyError::Validation` - Two items share a number or an item has empty text
pub async fn load_questions(path: &Path) -> SurveyResult<Vec<QuestionSpec>> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|source| SurveyError::QuestionsUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

    let specs: Vec<QuestionSpec> =
        serde_json::from_slice(&raw).map_err(|source| SurveyError::QuestionsInvalid {
            path: path.to_path_buf(),
            source,
        })?;

    let mut numbers: Vec<i32> = specs.iter().map(|q| q.number).collect();
    numbers.sort_unstable();
    if let Some(pair) = numbers.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(SurveyError::Validation {
            field: "number",
            reason: format!("question number {} appears more than once", pair[0]),
        });
    }

    if let Some(blank) = specs.iter().find(|q| q.text.trim().is_empty()) {
        return Err(SurveyError::Validation {
            field: "text",
            reason: format!("question {} has no text", blank.number),
        });
    }

    Ok(specs)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_load_questions_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("questions.json");
        tokio::fs::write(
            &path,
            r#"[
                {"number": 1, "text": "I am easily awakened by noise."},
                {"number": 2, "text": "I get used to most noises without much difficulty.", "reverse_scale": true}
            ]"#,
        )
        .await
        .unwrap();

        let questions = load_questions(&path).await.unwrap();
        assert_eq!(questions.len(), 2);
        assert!(!questions[0].reverse_scale);
        assert!(questions[1].reverse_scale);
    }

    #[tokio::test]
    async fn test_load_questions_rejects_duplicate_numbers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("questions.json");
        tokio::fs::write(
            &path,
            r#"[{"number": 4, "text": "a"}, {"number": 4, "text": "b"}]"#,
        )
        .await
        .unwrap();

        let err = load_questions(&path).await.unwrap_err();
        assert!(matches!(err, SurveyError::Validation { field: "number", .. }));
    }

    #[tokio::test]
    async fn test_load_questions_reports_bad_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("questions.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let err = load_questions(&path).await.unwrap_err();
        assert!(matches!(err, SurveyError::QuestionsInvalid { .. }));
        assert!(!err.is_user_error());
    }
}
