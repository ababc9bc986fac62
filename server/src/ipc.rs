//! The wire format spoken over a worker process's stdin/stdout pipes
//! (spec §6, SPEC_FULL.md AMBIENT.6): newline-delimited JSON, one envelope
//! per line, demultiplexed by a `"kind"` tag so a `STATUS` poll's reply
//! never queues up behind in-flight `EXECUTE` result traffic.

use crate::result::TaskResult;
use crate::task::Task;
use serde::{Deserialize, Serialize};

/// Parent-to-child command frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerCommand {
    Execute { task: Task },
    Status,
    Stop,
}

/// Child-to-parent frame. `StatusReply` answers a `Status` command;
/// `TaskResult` frames arrive asynchronously whenever a task completes and
/// are not correlated to any particular command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerMessage {
    StatusReply {
        active_threads: usize,
        thread_limit: usize,
    },
    TaskResult {
        result: TaskResult,
    },
}
