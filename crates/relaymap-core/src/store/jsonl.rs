//! Append-only JSON-lines execution log

use super::log::{stamp, ExecutionLogger, LogFilter};
use crate::types::{ExecutionRecord, NewExecutionRecord};
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// Writes one JSON object per line; the file is only ever appended to
#[derive(Debug)]
pub struct JsonlExecutionLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlExecutionLog {
    /// Open (lazily) a log at `path`; parent directories are created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<ExecutionRecord>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ExecutionRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = index + 1,
                    error = %e,
                    "Skipping unreadable execution log line"
                ),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl ExecutionLogger for JsonlExecutionLog {
    async fn record(&self, entry: NewExecutionRecord) -> Result<ExecutionRecord> {
        let record = stamp(entry);
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::Io {
                message: format!("Failed to open execution log {}: {}", self.path.display(), e),
                source: e,
            })?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(record)
    }

    async fn list(&self, filter: &LogFilter) -> Result<Vec<ExecutionRecord>> {
        Ok(filter.apply(self.read_all().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExecutionStatus;
    use serde_json::json;
    use tempfile::TempDir;

    fn entry(status: ExecutionStatus) -> NewExecutionRecord {
        NewExecutionRecord {
            status,
            template_id: Some("t1".to_string()),
            template_name: Some("ERP to CRM".to_string()),
            version_id: Some("v1".to_string()),
            version_number: Some(1),
            input_data: Some(json!({"id": 7})),
            output_data: Some(json!({"code": 7})),
            error_message: None,
            is_test: true,
        }
    }

    #[tokio::test]
    async fn test_appends_one_line_per_record() {
        let dir = TempDir::new().unwrap();
        let log = JsonlExecutionLog::new(dir.path().join("logs").join("executions.jsonl"));

        log.record(entry(ExecutionStatus::Success)).await.unwrap();
        log.record(entry(ExecutionStatus::Error)).await.unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.lines().all(|l| serde_json::from_str::<serde_json::Value>(l).is_ok()));
    }

    #[tokio::test]
    async fn test_list_reads_back_newest_first() {
        let dir = TempDir::new().unwrap();
        let log = JsonlExecutionLog::new(dir.path().join("executions.jsonl"));

        let first = log.record(entry(ExecutionStatus::Success)).await.unwrap();
        let second = log.record(entry(ExecutionStatus::Error)).await.unwrap();

        let records = log.list(&LogFilter::default()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, second.id);
        assert_eq!(records[1], first);
    }

    #[tokio::test]
    async fn test_missing_file_lists_empty_and_bad_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("executions.jsonl");
        let log = JsonlExecutionLog::new(&path);
        assert!(log.list(&LogFilter::default()).await.unwrap().is_empty());

        log.record(entry(ExecutionStatus::Success)).await.unwrap();
        let mut contents = std::fs::read_to_string(&path).unwrap();
        contents.push_str("not json\n");
        std::fs::write(&path, contents).unwrap();

        assert_eq!(log.list(&LogFilter::default()).await.unwrap().len(), 1);
    }
}
