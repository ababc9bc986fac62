#![deny(unused_crate_dependencies)]
#![deny(unused_imports)]

//! A generic, fixed-size worker thread pool.
//!
//! A [`Workpool`] drains a shared job channel with a fixed number of worker
//! threads and tracks how many of them are currently busy via an atomic
//! counter. This is the building block used by the task engine's in-process
//! thread pool: each worker-process hosts one `Workpool` specialized over
//! task envelopes, and `active_count()` is what gets reported back to the
//! parent on a `STATUS` poll.

use core::marker::PhantomData;
use crossbeam_channel::{bounded, Receiver as CReceiver, Sender as CSender};
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    sync::Arc,
    thread,
};

enum JobType<UIn> {
    Task(UIn),
    Nothing,
}

/// A single pool worker. Kept as `Option<JoinHandle>` so [`Drop`] can take
/// it without a placeholder value.
struct Worker {
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn new<Inp: 'static, UIn>(
        job_receiver: CReceiver<JobType<UIn>>,
        active_count: Arc<AtomicUsize>,
        init_pre_loop_var: impl Fn() -> Inp + 'static + Send,
        on_exit: impl Fn(&mut Inp) + Send + 'static,
        on_loop: impl Fn(&mut Inp, UIn) + Send + Sync + 'static,
    ) -> Self
    where
        UIn: Send + Sync + 'static,
    {
        let thread = thread::spawn(move || {
            let mut pre_loop_var = init_pre_loop_var();
            loop {
                let action = match job_receiver.recv() {
                    Ok(action) => action,
                    Err(_) => break,
                };
                match action {
                    JobType::Task(tsk) => {
                        active_count.fetch_add(1, Ordering::AcqRel);
                        on_loop(&mut pre_loop_var, tsk);
                        active_count.fetch_sub(1, Ordering::AcqRel);
                    }
                    JobType::Nothing => {
                        on_exit(&mut pre_loop_var);
                        break;
                    }
                }
            }
        });
        Self {
            thread: Some(thread),
        }
    }
}

/// # Workpool
///
/// A synchronous, fixed-size thread pool. Construct it with the number of
/// workers, a per-worker setup closure (`init_pre_loop_var`, use `|| ()` if
/// there's no per-thread state), what to do per job (`on_loop`) and what to
/// do when a worker is asked to stop (`on_exit`).
///
/// The job queue is bounded by `queue_capacity`; `execute` blocks if the
/// queue is full, which is the desired backpressure behaviour for the
/// engine's per-process task channel (§4.5 of the spec this crate backs).
pub struct Workpool<Inp, UIn, Lv, Lp, Ex> {
    workers: Vec<Worker>,
    job_distributor: CSender<JobType<UIn>>,
    active_count: Arc<AtomicUsize>,
    init_pre_loop_var: Lv,
    on_exit: Ex,
    on_loop: Lp,
    _marker: PhantomData<Inp>,
}

impl<Inp: 'static, UIn, Lv, Ex, Lp> Workpool<Inp, UIn, Lv, Lp, Ex>
where
    UIn: Send + Sync + 'static,
    Ex: Fn(&mut Inp) + Send + Sync + 'static + Clone,
    Lv: Fn() -> Inp + Send + Sync + 'static + Clone,
    Lp: Fn(&mut Inp, UIn) + Send + Sync + 'static + Clone,
    Inp: Sync,
{
    /// Create a new workpool with `count` worker threads and a job queue
    /// bounded at `queue_capacity`.
    pub fn new(
        count: usize,
        queue_capacity: usize,
        init_pre_loop_var: Lv,
        on_loop: Lp,
        on_exit: Ex,
    ) -> Self {
        if count == 0 {
            panic!("Runtime panic: Bad value `0` for thread count");
        }
        let (sender, receiver) = bounded(queue_capacity.max(1));
        let active_count = Arc::new(AtomicUsize::new(0));
        let mut workers = Vec::with_capacity(count);
        for _ in 0..count {
            workers.push(Worker::new(
                receiver.clone(),
                active_count.clone(),
                init_pre_loop_var.clone(),
                on_exit.clone(),
                on_loop.clone(),
            ));
        }
        Self {
            workers,
            job_distributor: sender,
            active_count,
            init_pre_loop_var,
            on_exit,
            on_loop,
            _marker: PhantomData,
        }
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Submit a job. Blocks if the internal queue is at capacity.
    pub fn execute(&self, inp: UIn) {
        let _ = self.job_distributor.send(JobType::Task(inp));
    }

    /// Try to submit a job without blocking. Returns the job back on the
    /// `Err` side if the queue is full.
    pub fn try_execute(&self, inp: UIn) -> Result<(), UIn> {
        match self.job_distributor.try_send(JobType::Task(inp)) {
            Ok(()) => Ok(()),
            Err(crossbeam_channel::TrySendError::Full(JobType::Task(inp))) => Err(inp),
            Err(crossbeam_channel::TrySendError::Disconnected(JobType::Task(inp))) => Err(inp),
            _ => unreachable!("job distributor only ever sends JobType::Task here"),
        }
    }

    /// A snapshot of how many workers are presently inside `on_loop`.
    pub fn active_count(&self) -> usize {
        self.active_count.load(Ordering::Acquire)
    }

    /// Convenience constructor: size the pool at `num_cpus::get()`.
    pub fn new_default_threads(
        queue_capacity: usize,
        init_pre_loop_var: Lv,
        on_loop: Lp,
        on_exit: Ex,
    ) -> Self {
        Self::new(
            num_cpus::get(),
            queue_capacity,
            init_pre_loop_var,
            on_loop,
            on_exit,
        )
    }
}

impl<Inp: 'static, UIn, Lp, Lv, Ex> Clone for Workpool<Inp, UIn, Lv, Lp, Ex>
where
    UIn: Send + Sync + 'static,
    Inp: Sync,
    Ex: Fn(&mut Inp) + Send + Sync + 'static + Clone,
    Lv: Fn() -> Inp + Send + Sync + 'static + Clone,
    Lp: Fn(&mut Inp, UIn) + Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Workpool::new(
            self.workers.len(),
            self.job_distributor.capacity().unwrap_or(1),
            self.init_pre_loop_var.clone(),
            self.on_loop.clone(),
            self.on_exit.clone(),
        )
    }
}

impl<Inp, UIn, Lv, Lp, Ex> Drop for Workpool<Inp, UIn, Lp, Lv, Ex> {
    fn drop(&mut self) {
        for _ in &self.workers {
            let _ = self.job_distributor.send(JobType::Nothing);
        }
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    log::warn!("a pool worker thread panicked while shutting down");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Workpool;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn executes_all_jobs() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let pool: Workpool<(), usize, _, _, _> =
            Workpool::new(4, 64, || (), move |_, _| { c.fetch_add(1, Ordering::AcqRel); }, |_| {});
        for i in 0..100 {
            pool.execute(i);
        }
        drop(pool);
        assert_eq!(counter.load(Ordering::Acquire), 100);
    }

    #[test]
    fn active_count_rises_and_falls() {
        let pool: Workpool<(), (), _, _, _> = Workpool::new(
            2,
            8,
            || (),
            |_, _| thread_sleep_ms(50),
            |_| {},
        );
        pool.execute(());
        pool.execute(());
        thread_sleep_ms(10);
        assert!(pool.active_count() >= 1);
        thread_sleep_ms(100);
        assert_eq!(pool.active_count(), 0);
    }

    fn thread_sleep_ms(ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}
