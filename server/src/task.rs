//! Task envelope: a request to execute a named script with supplied
//! parameters (spec data model §3, wire shape §6).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which worker group a task is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskClass {
    CpuBound,
    IoBound,
}

impl TaskClass {
    pub const fn as_wire_str(self) -> &'static str {
        match self {
            TaskClass::CpuBound => "cpu_bound",
            TaskClass::IoBound => "io_bound",
        }
    }
}

/// A request to execute `script_path` with `params`, routed to the worker
/// group matching `class`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub script_path: String,
    pub params: Value,
    #[serde(rename = "task_type")]
    pub class: TaskClass,
    pub max_retries: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Task {
    /// Construct a new task with a fresh globally-unique id.
    pub fn new(script_path: impl Into<String>, params: Value, class: TaskClass) -> Self {
        Self::with_retries(script_path, params, class, 0)
    }

    pub fn with_retries(
        script_path: impl Into<String>,
        params: Value,
        class: TaskClass,
        max_retries: u32,
    ) -> Self {
        Self {
            task_id: uuid::Uuid::new_v4().to_string(),
            script_path: script_path.into(),
            params,
            class,
            max_retries,
            created_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any batch of freshly-constructed tasks gets pairwise-distinct
        /// ids, regardless of how many or what params they carry.
        #[test]
        fn fresh_task_ids_are_pairwise_distinct(count in 1usize..500) {
            let ids: std::collections::HashSet<String> = (0..count)
                .map(|_| Task::new("x.so", Value::Null, TaskClass::CpuBound).task_id)
                .collect();
            prop_assert_eq!(ids.len(), count);
        }
    }
}
