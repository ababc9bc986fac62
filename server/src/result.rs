//! Result envelope: the outcome of executing a [`crate::task::Task`] (spec
//! data model §3, wire shape §6).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Success,
    Failed,
}

/// The outcome of executing a task: either `SUCCESS` with `data`, or
/// `FAILED` with `error`/`error_details`. Never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

impl TaskResult {
    pub fn success(task_id: impl Into<String>, data: Value, started_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Success,
            data: Some(data),
            error: None,
            error_details: None,
            started_at: Some(started_at),
            completed_at: chrono::Utc::now(),
        }
    }

    pub fn failed(
        task_id: impl Into<String>,
        error: impl Into<String>,
        error_details: Value,
        started_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Failed,
            data: None,
            error: Some(error.into()),
            error_details: Some(error_details),
            started_at,
            completed_at: chrono::Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }
}
