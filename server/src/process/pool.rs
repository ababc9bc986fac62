//! Routes tasks to the least-loaded worker process within one task class
//! (spec §4.3): queries every worker's live load over IPC and picks the
//! minimum, breaking ties by lowest worker index for determinism.

use crate::process::worker::WorkerProcess;
use crate::task::Task;
use std::time::Duration;

/// A fixed set of same-class worker processes (all CPU-bound, or all
/// I/O-bound).
pub struct ProcessPool {
    workers: Vec<WorkerProcess>,
    status_timeout: Duration,
}

impl ProcessPool {
    pub fn new(workers: Vec<WorkerProcess>, status_timeout: Duration) -> Self {
        Self {
            workers,
            status_timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn workers(&self) -> &[WorkerProcess] {
        &self.workers
    }

    /// Submit `task` to whichever worker reports the fewest active threads
    /// right now. A worker that times out on its load query is treated as
    /// having load 0 (spec's pessimistic-fallback rule), which makes a dead
    /// worker indistinguishable from an idle one by load alone — so a dead
    /// worker can still be picked first. To honor §8 scenario 4's "keep
    /// servicing remaining workers" requirement, a `submit` failure (the
    /// crashed worker's stdin pipe is gone) falls through to the next
    /// least-loaded worker instead of giving up the task.
    pub fn submit_least_loaded(&self, task: Task) -> std::io::Result<String> {
        let mut by_load: Vec<usize> = (0..self.workers.len()).collect();
        by_load.sort_by_key(|&i| self.workers[i].load(self.status_timeout).0);

        let mut last_err = None;
        for index in by_load {
            let worker = &self.workers[index];
            match worker.submit(task.clone()) {
                Ok(()) => return Ok(worker.worker_id().to_owned()),
                Err(e) => {
                    log::warn!("worker {} unreachable, trying the next one: {e}", worker.worker_id());
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| std::io::Error::other("process pool is empty")))
    }

    pub fn stop_all(&self, graceful: bool, grace_period: Duration) {
        for worker in &self.workers {
            worker.stop(graceful, grace_period);
        }
    }
}
