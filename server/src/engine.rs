//! The public façade tying every component together (spec §4.1): admission,
//! dispatch, the two worker-process pools, the result cache, and the
//! status/health surface.

use crate::cache::ShardedResultCache;
use crate::config::EngineConfig;
use crate::dispatcher::DispatcherPool;
use crate::error::EngineError;
use crate::pending::PendingTaskSet;
use crate::process::{ProcessPool, WorkerProcess};
use crate::queue::Queue;
use crate::registry;
use crate::result::TaskResult;
use crate::status::{ComponentStatus, QueueStatus, SystemHealth, SystemStatus, WorkerStatus};
use crate::task::Task;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Everything needed to run the engine once [`Engine::start`] has spun up
/// its threads and child processes. Built by [`Engine::start`], torn down by
/// [`Engine::shutdown`].
pub struct Engine {
    config: EngineConfig,
    input_queue: Arc<Queue<Task>>,
    output_queue: Arc<Queue<TaskResult>>,
    pending: Arc<PendingTaskSet>,
    cache: Arc<ShardedResultCache>,
    cpu_pool: Arc<ProcessPool>,
    io_pool: Arc<ProcessPool>,
    dispatcher: Option<DispatcherPool>,
    collector_shutdown: Arc<AtomicBool>,
    collector_handle: Option<std::thread::JoinHandle<()>>,
}

impl Engine {
    /// Start the engine: spawn worker processes, the dispatcher tier, and
    /// the result collector. Fails if `config` doesn't validate or a worker
    /// process can't be spawned.
    pub fn start(config: EngineConfig) -> Result<Self, EngineError> {
        if registry::is_running() {
            return Err(EngineError::AlreadyRunning);
        }
        config.validate()?;

        let worker_bin = worker_binary_path()?;
        let input_queue = Arc::new(Queue::new(config.input_queue_size));
        let output_queue = Arc::new(Queue::new(config.output_queue_size));
        let pending = Arc::new(PendingTaskSet::new());
        let cache = Arc::new(ShardedResultCache::new(config.shard_count, config.max_per_shard));
        let status_timeout = Duration::from_millis(config.worker_status_timeout_ms);

        let cpu_workers = spawn_workers(
            "cpu",
            &worker_bin,
            crate::task::TaskClass::CpuBound,
            config.cpu_bound_count,
            config.cpu_bound_task_limit,
            output_queue.clone(),
        )?;
        let io_workers = spawn_workers(
            "io",
            &worker_bin,
            crate::task::TaskClass::IoBound,
            config.io_bound_count(),
            config.io_bound_task_limit,
            output_queue.clone(),
        )?;
        let cpu_pool = Arc::new(ProcessPool::new(cpu_workers, status_timeout));
        let io_pool = Arc::new(ProcessPool::new(io_workers, status_timeout));

        let poll_timeout = Duration::from_millis(config.queue_poll_timeout_ms);
        let dispatcher = DispatcherPool::start(
            config.queue_thread_count,
            poll_timeout,
            input_queue.clone(),
            cpu_pool.clone(),
            io_pool.clone(),
        );

        let collector_shutdown = Arc::new(AtomicBool::new(false));
        let collector_handle = {
            let shutdown = collector_shutdown.clone();
            let output_queue = output_queue.clone();
            let cache = cache.clone();
            std::thread::Builder::new()
                .name("taskd-collector".into())
                .spawn(move || collect_results(shutdown, output_queue, cache, poll_timeout))
                .map_err(EngineError::Io)?
        };

        registry::set_running(true);
        registry::unpoison();
        log::info!(
            "engine started: {} cpu worker(s), {} io worker(s)",
            config.cpu_bound_count,
            config.io_bound_count()
        );

        Ok(Self {
            config,
            input_queue,
            output_queue,
            pending,
            cache,
            cpu_pool,
            io_pool,
            dispatcher: Some(dispatcher),
            collector_shutdown,
            collector_handle: Some(collector_handle),
        })
    }

    /// Admit a task. Retries up to `max_queue_full_retries` times against a
    /// brief backpressure window before giving up with `QueueFull`.
    pub fn submit_task(&self, task: Task) -> Result<String, EngineError> {
        if !registry::is_running() {
            return Err(EngineError::NotRunning);
        }
        let task_id = task.task_id.clone();
        self.pending.insert(task.clone());
        let mut attempt = 0;
        let mut pending_task = Some(task);
        loop {
            let task = pending_task.take().expect("loop invariant");
            match self.input_queue.try_push(task) {
                Ok(()) => return Ok(task_id),
                Err(task) => {
                    attempt += 1;
                    if attempt > self.config.max_queue_full_retries {
                        self.pending.remove(&task_id);
                        return Err(EngineError::QueueFull);
                    }
                    pending_task = Some(task);
                    std::thread::sleep(Duration::from_millis(10));
                }
            }
        }
    }

    /// Block up to `timeout` waiting for `task_id`'s result to land in the
    /// cache. Returns `None` on timeout; the caller may retry. A task stops
    /// counting as pending exactly here, when its result is actually handed
    /// to a caller — not when it merely arrives from the worker — per spec
    /// §3's `pending_tasks.contains(T) ⇔ ... not yet delivered to a caller`.
    pub fn get_result(&self, task_id: &str, timeout: Duration) -> Option<TaskResult> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if let Some(result) = self.cache.get(task_id) {
                self.pending.remove(task_id);
                return Some(result);
            }
            if std::time::Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    pub fn get_status(&self) -> SystemStatus {
        SystemStatus {
            running: registry::is_running(),
            pending_count: self.pending.len(),
            cached_result_count: self.cache.size(),
            input_queue: queue_status(&self.input_queue),
            output_queue: queue_status(&self.output_queue),
            cpu_workers: worker_statuses(&self.cpu_pool),
            io_workers: worker_statuses(&self.io_pool),
        }
    }

    pub fn get_component_status(&self, name: &str) -> Option<ComponentStatus> {
        let detail = match name {
            "input_queue" => serde_json::to_value(queue_status(&self.input_queue)).ok()?,
            "output_queue" => serde_json::to_value(queue_status(&self.output_queue)).ok()?,
            "cpu_pool" => serde_json::to_value(worker_statuses(&self.cpu_pool)).ok()?,
            "io_pool" => serde_json::to_value(worker_statuses(&self.io_pool)).ok()?,
            "cache" => serde_json::json!({"size": self.cache.size()}),
            _ => return None,
        };
        Some(ComponentStatus {
            name: name.to_owned(),
            detail,
        })
    }

    pub fn get_health(&self) -> SystemHealth {
        let status_timeout = Duration::from_millis(self.config.worker_status_timeout_ms);
        let unreachable_workers = self
            .cpu_pool
            .workers()
            .iter()
            .chain(self.io_pool.workers().iter())
            .filter(|w| w.load(status_timeout) == (0, 0))
            .map(|w| w.worker_id().to_owned())
            .collect();
        SystemHealth {
            running: registry::is_running(),
            healthy: registry::is_healthy(),
            unreachable_workers,
        }
    }

    /// Tear the engine down. If `graceful`, worker processes are given up to
    /// `shutdown_timeout_ms` to finish in-flight tasks before being killed.
    pub fn shutdown(mut self, graceful: bool) {
        registry::set_running(false);
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.stop();
        }
        let grace_period = Duration::from_millis(self.config.shutdown_timeout_ms);
        self.cpu_pool.stop_all(graceful, grace_period);
        self.io_pool.stop_all(graceful, grace_period);
        self.collector_shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.collector_handle.take() {
            if handle.join().is_err() {
                log::error!("result collector thread panicked, poisoning engine health");
                registry::poison();
            }
        }
        log::info!("engine stopped");
    }
}

fn spawn_workers(
    prefix: &str,
    worker_bin: &std::path::Path,
    class: crate::task::TaskClass,
    process_count: usize,
    thread_count: usize,
    output_queue: Arc<Queue<TaskResult>>,
) -> Result<Vec<WorkerProcess>, EngineError> {
    (0..process_count)
        .map(|i| {
            WorkerProcess::spawn(format!("{prefix}-{i}"), worker_bin, class, thread_count, output_queue.clone())
                .map_err(EngineError::Io)
        })
        .collect()
}

fn queue_status<T>(queue: &Queue<T>) -> QueueStatus {
    let (enqueued, dequeued, dropped) = queue.metrics.snapshot();
    QueueStatus {
        len: queue.len(),
        capacity: queue.capacity(),
        total_enqueued: enqueued,
        total_dequeued: dequeued,
        total_dropped: dropped,
    }
}

fn worker_statuses(pool: &ProcessPool) -> Vec<WorkerStatus> {
    pool.workers()
        .iter()
        .map(|w| {
            let (active, limit) = w.load(Duration::from_millis(100));
            WorkerStatus {
                worker_id: w.worker_id().to_owned(),
                active_threads: active,
                thread_limit: limit,
                reachable: limit > 0 || active > 0,
            }
        })
        .collect()
}

fn collect_results(
    shutdown: Arc<AtomicBool>,
    output_queue: Arc<Queue<TaskResult>>,
    cache: Arc<ShardedResultCache>,
    poll_timeout: Duration,
) {
    while !shutdown.load(Ordering::Acquire) {
        match output_queue.pop_timeout_checked(poll_timeout) {
            crate::queue::RecvOutcome::Item(result) => cache.put(result),
            crate::queue::RecvOutcome::Empty => {}
            // Every sender on the output queue is gone — this can only
            // happen if every worker process's reader thread has exited,
            // which means no result will ever arrive again. Spec §7 names
            // exactly this ("OutputQueue unreadable") as fatal; poison the
            // registry so `get_health()` reports it and stop polling.
            crate::queue::RecvOutcome::Disconnected => {
                log::error!("output queue is unreadable (all senders dropped), poisoning engine health");
                registry::poison();
                return;
            }
        }
    }
}

/// Locate the `taskd-worker` binary next to the currently running `taskd`
/// binary (both are installed together, as spec §4 implies). Test binaries
/// run out of `target/<profile>/deps/`, one level below where cargo places
/// the `taskd-worker` bin target, so a sibling miss falls back to the
/// parent directory before giving up.
fn worker_binary_path() -> Result<std::path::PathBuf, EngineError> {
    let current = std::env::current_exe()?;
    let dir = current
        .parent()
        .ok_or_else(|| EngineError::Io(std::io::Error::other("executable has no parent directory")))?;
    let name = if cfg!(windows) { "taskd-worker.exe" } else { "taskd-worker" };
    let sibling = dir.join(name);
    if sibling.exists() {
        return Ok(sibling);
    }
    if let Some(parent) = dir.parent() {
        let cousin = parent.join(name);
        if cousin.exists() {
            return Ok(cousin);
        }
    }
    Ok(sibling)
}
