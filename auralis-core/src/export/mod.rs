//! Spreadsheet export of submitted evaluations.
//!
//! Every stored evaluation is flattened into an [`ExportRow`] and handed to an
//! [`EvaluationExporter`]. Export runs off the request path; failures are
//! logged and never reach the participant.

pub mod csv;

use async_trait::async_trait;

pub use csv::CsvExporter;

/// Column identifying the participant.
pub const USER_ID_COLUMN: &str = "UserID";
/// Column identifying the clip.
pub const AUDIO_TITLE_COLUMN: &str = "AudioTitle";

/// Ordered column/value pairs describing one participant and one clip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportRow {
    fields: Vec<(String, String)>,
}

impl ExportRow {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, replacing the value if the column already exists.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column, value)),
        }
    }

    /// Value of a column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    /// Column names in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }
}

/// Errors raised while exporting.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Reading or writing the export target failed
    #[error("Export I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The existing export file could not be understood
    #[error("Malformed export file: {reason}")]
    Malformed {
        /// What could not be parsed
        reason: String,
    },
}

/// Destination for flattened evaluation rows.
#[async_trait]
pub trait EvaluationExporter: Send + Sync {
    /// Insert `row`, replacing any earlier row for the same participant and clip.
    ///
    /// # Errors
    ///
    /// - `ExportError::Io` - The export target could not be read or written
    /// - `ExportError::Malformed` - Existing export data could not be parsed
    async fn export(&self, row: &ExportRow) -> Result<(), ExportError>;
}

/// Exporter used when export is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExporter;

#[async_trait]
impl EvaluationExporter for NoopExporter {
    async fn export(&self, _row: &ExportRow) -> Result<(), ExportError> {
        Ok(())
    }
}
