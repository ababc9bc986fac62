//! A worker process's in-process thread pool (spec §4.4): a fixed number of
//! executor threads pulling [`Task`] jobs off a bounded queue and running
//! them through a shared [`Executor`]. Built on [`libpool::Workpool`];
//! `active_count()` is exactly the number the parent wants back on a
//! `STATUS` poll.

use crate::context::ExecutionContext;
use crate::executor::Executor;
use crate::result::TaskResult;
use crate::task::Task;
use crossbeam_channel::Sender;
use libpool::Workpool;
use std::sync::Arc;

/// A task plus where its result should be delivered once executed.
pub type Job = (Task, Sender<TaskResult>);

/// Fixed-size pool of executor threads for one task class inside a worker
/// process.
pub struct ThreadPool<Lv, Lp, Ex>
where
    Lv: Fn() -> Arc<Executor> + Clone + Send + Sync + 'static,
    Lp: Fn(&mut Arc<Executor>, Job) + Clone + Send + Sync + 'static,
    Ex: Fn(&mut Arc<Executor>) + Clone + Send + Sync + 'static,
{
    inner: Workpool<Arc<Executor>, Job, Lv, Lp, Ex>,
    worker_id: String,
    task_limit: usize,
}

impl<Lv, Lp, Ex> ThreadPool<Lv, Lp, Ex>
where
    Lv: Fn() -> Arc<Executor> + Clone + Send + Sync + 'static,
    Lp: Fn(&mut Arc<Executor>, Job) + Clone + Send + Sync + 'static,
    Ex: Fn(&mut Arc<Executor>) + Clone + Send + Sync + 'static,
{
    pub fn execute(&self, task: Task, result_tx: Sender<TaskResult>) {
        self.inner.execute((task, result_tx));
    }

    pub fn try_execute(&self, task: Task, result_tx: Sender<TaskResult>) -> Result<(), Job> {
        self.inner.try_execute((task, result_tx))
    }

    pub fn active_count(&self) -> usize {
        self.inner.active_count()
    }

    pub fn thread_limit(&self) -> usize {
        self.task_limit
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }
}

/// Build a pool of `thread_count` executor threads, each running tasks
/// through `executor` and tagging `ExecutionContext`s with `worker_id`.
#[allow(clippy::type_complexity)]
pub fn new_thread_pool(
    worker_id: impl Into<String>,
    executor: Arc<Executor>,
    thread_count: usize,
    queue_capacity: usize,
) -> ThreadPool<
    impl Fn() -> Arc<Executor> + Clone + Send + Sync + 'static,
    impl Fn(&mut Arc<Executor>, Job) + Clone + Send + Sync + 'static,
    impl Fn(&mut Arc<Executor>) + Clone + Send + Sync + 'static,
> {
    let worker_id = worker_id.into();
    let loop_worker_id = worker_id.clone();
    let inner = Workpool::new(
        thread_count.max(1),
        queue_capacity,
        move || executor.clone(),
        move |executor, (task, result_tx): Job| {
            let ctx = ExecutionContext::new(task.task_id.clone(), loop_worker_id.clone());
            let result = executor.execute(&task.script_path, &task.params, &ctx);
            let _ = result_tx.send(result);
        },
        |_executor| {},
    );
    ThreadPool {
        inner,
        worker_id,
        task_limit: thread_count.max(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskClass;
    use crossbeam_channel::unbounded;
    use serde_json::json;

    #[test]
    fn executes_and_reports_active_count() {
        let pool = new_thread_pool("test-0", Arc::new(Executor::new()), 2, 8);
        let (tx, rx) = unbounded();
        let task = Task::new("/no/such/script.so", json!({}), TaskClass::CpuBound);
        pool.execute(task, tx);
        let result = rx.recv_timeout(std::time::Duration::from_secs(1)).unwrap();
        assert!(!result.is_success());
        assert_eq!(pool.thread_limit(), 2);
    }
}
