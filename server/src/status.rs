//! The status/health surface exposed by `Engine::get_status` /
//! `get_component_status` / `get_health` (spec §6, §AMBIENT.5).

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub len: usize,
    pub capacity: usize,
    pub total_enqueued: u64,
    pub total_dequeued: u64,
    pub total_dropped: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub worker_id: String,
    pub active_threads: usize,
    pub thread_limit: usize,
    pub reachable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentStatus {
    pub name: String,
    pub detail: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub running: bool,
    pub pending_count: usize,
    pub cached_result_count: usize,
    pub input_queue: QueueStatus,
    pub output_queue: QueueStatus,
    pub cpu_workers: Vec<WorkerStatus>,
    pub io_workers: Vec<WorkerStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    pub running: bool,
    pub healthy: bool,
    pub unreachable_workers: Vec<String>,
}
