//! CSV file exporter.
//!
//! Keeps one row per participant and clip. Re-submitting an evaluation
//! replaces the earlier row; columns first seen in a new row are appended to
//! the header and left blank for older rows.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{AUDIO_TITLE_COLUMN, EvaluationExporter, ExportError, ExportRow, USER_ID_COLUMN};

/// Upserts evaluation rows into a CSV file on disk.
pub struct CsvExporter {
    path: PathBuf,
    // Serialises read-modify-write cycles on the file.
    write_lock: Mutex<()>,
}

impl CsvExporter {
    /// Create an exporter writing to `path`; parent directories are created on
    /// first export.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Target file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl EvaluationExporter for CsvExporter {
    async fn export(&self, row: &ExportRow) -> Result<(), ExportError> {
        let _guard = self.write_lock.lock().await;

        let mut table = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => CsvTable::parse(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CsvTable::default(),
            Err(e) => return Err(e.into()),
        };
        table.upsert(row);

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let staging = self.staging_path();
        tokio::fs::write(&staging, table.render()).await?;
        tokio::fs::rename(&staging, &self.path).await?;

        debug!(
            "Exported row for {:?}/{:?} to {} ({} rows)",
            row.get(USER_ID_COLUMN),
            row.get(AUDIO_TITLE_COLUMN),
            self.path.display(),
            table.rows.len()
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct CsvTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    fn parse(text: &str) -> Result<Self, ExportError> {
        let mut records = parse_records(text)?.into_iter();
        let Some(header) = records.next() else {
            return Ok(Self::default());
        };

        let mut rows = Vec::new();
        for (line, mut record) in records.enumerate() {
            if record.len() > header.len() {
                return Err(ExportError::Malformed {
                    reason: format!(
                        "row {} has {} fields but the header has {}",
                        line + 1,
                        record.len(),
                        header.len()
                    ),
                });
            }
            record.resize(header.len(), String::new());
            rows.push(record);
        }

        Ok(Self { header, rows })
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|c| c == name)
    }

    fn upsert(&mut self, row: &ExportRow) {
        if let (Some(user_col), Some(audio_col)) =
            (self.column(USER_ID_COLUMN), self.column(AUDIO_TITLE_COLUMN))
        {
            let user = row.get(USER_ID_COLUMN).unwrap_or_default();
            let audio = row.get(AUDIO_TITLE_COLUMN).unwrap_or_default();
            self.rows
                .retain(|r| !(r[user_col] == user && r[audio_col] == audio));
        }

        for column in row.columns() {
            if self.column(column).is_none() {
                self.header.push(column.to_string());
            }
        }
        let width = self.header.len();
        for existing in &mut self.rows {
            existing.resize(width, String::new());
        }

        let record = self
            .header
            .iter()
            .map(|column| row.get(column).unwrap_or_default().to_string())
            .collect();
        self.rows.push(record);
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for record in std::iter::once(&self.header).chain(&self.rows) {
            let line: Vec<Cow<'_, str>> = record.iter().map(|f| escape_field(f)).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
        out
    }
}

/// Quote a field when it contains a delimiter, quote or line break.
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Split CSV text into records, honouring quoted fields.
fn parse_records(text: &str) -> Result<Vec<Vec<String>>, ExportError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                other => field.push(other),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(std::mem::take(&mut field));
                let finished = std::mem::take(&mut record);
                if !(finished.len() == 1 && finished[0].is_empty()) {
                    records.push(finished);
                }
            }
            other => field.push(other),
        }
    }

    if in_quotes {
        return Err(ExportError::Malformed {
            reason: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn row(user: &str, audio: &str, calm: &str) -> ExportRow {
        let mut row = ExportRow::new();
        row.push("UserID", user);
        row.push("AudioTitle", audio);
        row.push("Calm", calm);
        row
    }

    #[tokio::test]
    async fn test_export_creates_file_and_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("csv").join("user_survey_analysis.csv");
        let exporter = CsvExporter::new(&path);

        exporter.export(&row("P001", "Park", "40")).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "UserID,AudioTitle,Calm\nP001,Park,40\n");
        assert!(!exporter.staging_path().exists());
    }

    #[tokio::test]
    async fn test_export_replaces_row_for_same_user_and_clip() {
        let dir = TempDir::new().unwrap();
        let exporter = CsvExporter::new(dir.path().join("out.csv"));

        exporter.export(&row("P001", "Park", "40")).await.unwrap();
        exporter.export(&row("P001", "Street", "10")).await.unwrap();
        exporter.export(&row("P002", "Park", "55")).await.unwrap();
        exporter.export(&row("P001", "Park", "90")).await.unwrap();

        let text = std::fs::read_to_string(exporter.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "UserID,AudioTitle,Calm",
                "P001,Street,10",
                "P002,Park,55",
                "P001,Park,90",
            ]
        );
    }

    #[tokio::test]
    async fn test_export_extends_header_with_new_columns() {
        let dir = TempDir::new().unwrap();
        let exporter = CsvExporter::new(dir.path().join("out.csv"));

        exporter.export(&row("P001", "Park", "40")).await.unwrap();
        let mut wider = row("P002", "Park", "20");
        wider.push("Q1", "5");
        exporter.export(&wider).await.unwrap();

        let text = std::fs::read_to_string(exporter.path()).unwrap();
        assert_eq!(
            text,
            "UserID,AudioTitle,Calm,Q1\nP001,Park,40,\nP002,Park,20,5\n"
        );
    }

    #[tokio::test]
    async fn test_export_quotes_and_reparses_special_characters() {
        let dir = TempDir::new().unwrap();
        let exporter = CsvExporter::new(dir.path().join("out.csv"));

        exporter
            .export(&row("P001", "Rain, \"heavy\"\nnight", "1"))
            .await
            .unwrap();
        exporter.export(&row("P002", "Park", "2")).await.unwrap();
        exporter
            .export(&row("P001", "Rain, \"heavy\"\nnight", "3"))
            .await
            .unwrap();

        let text = std::fs::read_to_string(exporter.path()).unwrap();
        let table = CsvTable::parse(&text).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][1], "Rain, \"heavy\"\nnight");
        assert_eq!(table.rows[1][2], "3");
    }

    #[tokio::test]
    async fn test_export_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "UserID,AudioTitle\n\"unterminated").unwrap();
        let exporter = CsvExporter::new(&path);

        let err = exporter.export(&row("P001", "Park", "1")).await.unwrap_err();
        assert!(matches!(err, ExportError::Malformed { .. }));
    }

    #[test]
    fn test_parse_records_handles_crlf_and_blank_lines() {
        let records = parse_records("a,b\r\n1,2\r\n\r\n3,\n").unwrap();
        assert_eq!(
            records,
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["1".to_string(), "2".to_string()],
                vec!["3".to_string(), String::new()],
            ]
        );
    }
}
