//! Execution log: one immutable record per execution attempt

use crate::types::{ExecutionRecord, ExecutionStatus, NewExecutionRecord};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

/// Query over stored records; results are newest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub status: Option<ExecutionStatus>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl LogFilter {
    pub fn matches(&self, record: &ExecutionRecord) -> bool {
        let template_ok = self
            .template_id
            .as_deref()
            .map_or(true, |id| record.template_id.as_deref() == Some(id));
        let status_ok = self.status.map_or(true, |status| record.status == status);
        template_ok && status_ok
    }

    /// Filter, order newest first and truncate
    pub fn apply<I>(&self, records: I) -> Vec<ExecutionRecord>
    where
        I: IntoIterator<Item = ExecutionRecord>,
    {
        let mut selected: Vec<ExecutionRecord> =
            records.into_iter().filter(|record| self.matches(record)).collect();
        // Stable sort keeps later appends first among equal timestamps
        selected.reverse();
        selected.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

/// Append-only sink for execution records
#[async_trait]
pub trait ExecutionLogger: Send + Sync {
    /// Stamp and persist `entry`
    async fn record(&self, entry: NewExecutionRecord) -> Result<ExecutionRecord>;

    async fn list(&self, filter: &LogFilter) -> Result<Vec<ExecutionRecord>>;
}

/// Give an entry its id and timestamp
pub fn stamp(entry: NewExecutionRecord) -> ExecutionRecord {
    entry.into_record(Uuid::new_v4().to_string(), Utc::now())
}

/// Process-local execution log
#[derive(Debug, Default)]
pub struct MemoryExecutionLog {
    records: Mutex<Vec<ExecutionRecord>>,
}

impl MemoryExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record, in append order
    pub fn all(&self) -> Result<Vec<ExecutionRecord>> {
        self.records
            .lock()
            .map(|records| records.clone())
            .map_err(|_| Error::store("Failed to acquire execution log lock"))
    }
}

#[async_trait]
impl ExecutionLogger for MemoryExecutionLog {
    async fn record(&self, entry: NewExecutionRecord) -> Result<ExecutionRecord> {
        let record = stamp(entry);
        self.records
            .lock()
            .map_err(|_| Error::store("Failed to acquire execution log lock"))?
            .push(record.clone());
        Ok(record)
    }

    async fn list(&self, filter: &LogFilter) -> Result<Vec<ExecutionRecord>> {
        Ok(filter.apply(self.all()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(template_id: &str, status: ExecutionStatus) -> NewExecutionRecord {
        NewExecutionRecord {
            status,
            template_id: Some(template_id.to_string()),
            template_name: None,
            version_id: None,
            version_number: None,
            input_data: Some(json!({"a": 1})),
            output_data: None,
            error_message: None,
            is_test: false,
        }
    }

    #[tokio::test]
    async fn test_record_stamps_id_and_time() {
        let log = MemoryExecutionLog::new();
        let first = log.record(entry("t1", ExecutionStatus::Success)).await.unwrap();
        let second = log.record(entry("t1", ExecutionStatus::Success)).await.unwrap();
        assert_ne!(first.id, second.id);
        assert!(second.timestamp >= first.timestamp);
        assert_eq!(log.all().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let log = MemoryExecutionLog::new();
        log.record(entry("t1", ExecutionStatus::Success)).await.unwrap();
        log.record(entry("t2", ExecutionStatus::Error)).await.unwrap();
        let last = log.record(entry("t1", ExecutionStatus::Error)).await.unwrap();

        let all = log.list(&LogFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, last.id);

        let t1 = log
            .list(&LogFilter {
                template_id: Some("t1".to_string()),
                ..LogFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(t1.len(), 2);

        let errors = log
            .list(&LogFilter {
                status: Some(ExecutionStatus::Error),
                limit: Some(1),
                ..LogFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].id, last.id);
    }
}
