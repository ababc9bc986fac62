//! Engine-wide error taxonomy (spec §7). Failures that pertain to a single
//! task are reified into a [`crate::result::TaskResult`] and never reach
//! here; `EngineError` is for operations on the engine itself.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("the input queue is full and the retry budget was exhausted")]
    QueueFull,
    #[error("the engine is not running")]
    NotRunning,
    #[error("the engine is already running")]
    AlreadyRunning,
    #[error("worker {worker_id} is unreachable")]
    WorkerUnreachable { worker_id: String },
    #[error("failed to (de)serialize a task/result envelope: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be >= {min}, got {got}")]
    OutOfRange {
        field: &'static str,
        min: u64,
        got: u64,
    },
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}
