//! Local JSONL log of evaluation records.
//!
//! One file per app version: `.ragchat/evaluations/<app_version>.jsonl`.

use crate::evaluation::EvaluationRecord;
use ragchat_core::{AppError, AppResult};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Append-only record store for one app version.
pub struct EvaluationLog {
    workspace: PathBuf,
    app_version: String,
}

impl EvaluationLog {
    pub fn new(workspace: &Path, app_version: &str) -> AppResult<Self> {
        let valid = !app_version.is_empty()
            && app_version
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !app_version.starts_with('.');
        if !valid {
            return Err(AppError::InvalidInput(format!(
                "Invalid app version for evaluation log: {:?}",
                app_version
            )));
        }

        Ok(Self {
            workspace: workspace.to_path_buf(),
            app_version: app_version.to_string(),
        })
    }

    /// Path of the JSONL file.
    pub fn path(&self) -> PathBuf {
        self.workspace
            .join(".ragchat")
            .join("evaluations")
            .join(format!("{}.jsonl", self.app_version))
    }

    /// Append records, one JSON object per line.
    pub fn append(&self, records: &[EvaluationRecord]) -> AppResult<()> {
        let path = self.path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        for record in records {
            let line = serde_json::to_string(record)?;
            writeln!(file, "{}", line)?;
        }
        file.sync_all()?;

        tracing::debug!("Appended {} evaluation records to {:?}", records.len(), path);
        Ok(())
    }

    /// Read every record, in the order written.
    pub fn read_all(&self) -> AppResult<Vec<EvaluationRecord>> {
        let path = self.path();

        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let record: EvaluationRecord = serde_json::from_str(&line).map_err(|e| {
                AppError::Serialization(format!(
                    "Failed to parse line {} of {:?}: {}",
                    line_num + 1,
                    path,
                    e
                ))
            })?;
            records.push(record);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{DEFAULT_APP_NAME, DEFAULT_APP_VERSION};
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn record(question: &str) -> EvaluationRecord {
        EvaluationRecord {
            record_id: Uuid::new_v4(),
            app_name: DEFAULT_APP_NAME.to_string(),
            app_version: DEFAULT_APP_VERSION.to_string(),
            question: question.to_string(),
            answer: Some("answer".to_string()),
            citations: vec!["ch04-01.md".to_string()],
            groundedness: Some(1.0),
            context_relevance: Some(0.5),
            answer_relevance: Some(1.0),
            latency_ms: 42,
            error: None,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_path_layout() {
        let temp = TempDir::new().unwrap();
        let log = EvaluationLog::new(temp.path(), "simple").unwrap();
        assert_eq!(
            log.path(),
            temp.path().join(".ragchat/evaluations/simple.jsonl")
        );
    }

    #[test]
    fn test_append_then_read_preserves_order() {
        let temp = TempDir::new().unwrap();
        let log = EvaluationLog::new(temp.path(), "simple").unwrap();

        log.append(&[record("first")]).unwrap();
        log.append(&[record("second"), record("third")]).unwrap();

        let records = log.read_all().unwrap();
        let questions: Vec<_> = records.iter().map(|r| r.question.as_str()).collect();
        assert_eq!(questions, vec!["first", "second", "third"]);
        assert_eq!(records[0].citations, vec!["ch04-01.md"]);
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let log = EvaluationLog::new(temp.path(), "simple").unwrap();
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_path_like_versions() {
        let temp = TempDir::new().unwrap();
        assert!(EvaluationLog::new(temp.path(), "../escape").is_err());
        assert!(EvaluationLog::new(temp.path(), "").is_err());
        assert!(EvaluationLog::new(temp.path(), "v1.2-rerank").is_ok());
    }
}
