//! Execution context: constructed just before the executor is invoked,
//! lives only for the duration of execution (spec data model §3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub task_id: String,
    /// Stable worker identity, e.g. `"cpu-0"` or `"io-3"`.
    pub worker_id: String,
}

impl ExecutionContext {
    pub fn new(task_id: impl Into<String>, worker_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            worker_id: worker_id.into(),
        }
    }
}
