//! The dispatcher tier (spec §4.2): `queue_thread_count` symmetric,
//! stateless threads draining the input queue and routing each task to the
//! least-loaded process in its class's pool.

use crate::process::ProcessPool;
use crate::queue::Queue;
use crate::task::{Task, TaskClass};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A running set of dispatcher threads. Dropping/calling [`DispatcherPool::stop`]
/// signals every thread to finish its current iteration and exit.
pub struct DispatcherPool {
    shutdown: Arc<AtomicBool>,
    handles: Vec<std::thread::JoinHandle<()>>,
}

impl DispatcherPool {
    /// Spawn `thread_count` dispatcher threads, each looping:
    /// pop a task (with a short timeout so the shutdown flag is rechecked
    /// promptly), then route it to the matching class's `ProcessPool`.
    pub fn start(
        thread_count: usize,
        poll_timeout: Duration,
        input_queue: Arc<Queue<Task>>,
        cpu_pool: Arc<ProcessPool>,
        io_pool: Arc<ProcessPool>,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let handles = (0..thread_count.max(1))
            .map(|idx| {
                let shutdown = shutdown.clone();
                let input_queue = input_queue.clone();
                let cpu_pool = cpu_pool.clone();
                let io_pool = io_pool.clone();
                std::thread::Builder::new()
                    .name(format!("taskd-dispatch-{idx}"))
                    .spawn(move || {
                        run(shutdown, input_queue, cpu_pool, io_pool, poll_timeout);
                    })
                    .expect("failed to spawn dispatcher thread")
            })
            .collect();
        Self { shutdown, handles }
    }

    pub fn stop(self) {
        self.shutdown.store(true, Ordering::Release);
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

fn run(
    shutdown: Arc<AtomicBool>,
    input_queue: Arc<Queue<Task>>,
    cpu_pool: Arc<ProcessPool>,
    io_pool: Arc<ProcessPool>,
    poll_timeout: Duration,
) {
    while !shutdown.load(Ordering::Acquire) {
        let Some(task) = input_queue.pop_timeout(poll_timeout) else {
            continue;
        };
        let pool = match task.class {
            TaskClass::CpuBound => &cpu_pool,
            TaskClass::IoBound => &io_pool,
        };
        if let Err(e) = pool.submit_least_loaded(task) {
            log::error!("failed to route task to a worker process: {e}");
        }
    }
}
