//! Parent-side handle to one worker process (spec §4.3/§4.4): owns the
//! child's stdio pipes, demultiplexes its output stream into `STATUS`
//! replies and asynchronous task results, and line-forwards its stderr to
//! this process's own log (prefixed `[worker:<id>]`).

use crate::ipc::{WorkerCommand, WorkerMessage};
use crate::queue::Queue;
use crate::task::{Task, TaskClass};
use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

type StatusWaiter = Arc<Mutex<Option<Sender<(usize, usize)>>>>;

/// A running `taskd-worker` child process plus the plumbing needed to talk
/// to it: submit tasks, poll its load, and stop it.
pub struct WorkerProcess {
    worker_id: String,
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    status_waiter: StatusWaiter,
    reader_handle: Mutex<Option<std::thread::JoinHandle<()>>>,
    stderr_handle: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl WorkerProcess {
    /// Spawn `worker_bin` as a child process dedicated to `class` tasks with
    /// `thread_count` executor threads, reporting status under `worker_id`.
    /// Results the child reports are pushed onto `output_queue`; `pending`
    /// is left untouched here — a result only stops being "pending" once a
    /// caller actually collects it (see `Engine::get_result`), not when it
    /// merely arrives at the parent.
    pub fn spawn(
        worker_id: impl Into<String>,
        worker_bin: &std::path::Path,
        class: TaskClass,
        thread_count: usize,
        output_queue: Arc<Queue<crate::result::TaskResult>>,
    ) -> std::io::Result<Self> {
        let worker_id = worker_id.into();
        let mut child = Command::new(worker_bin)
            .arg(class.as_wire_str())
            .arg(thread_count.to_string())
            .arg(&worker_id)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");

        let status_waiter: StatusWaiter = Arc::new(Mutex::new(None));

        let reader_handle = {
            let status_waiter = status_waiter.clone();
            let worker_id = worker_id.clone();
            std::thread::spawn(move || {
                reader_loop(stdout, status_waiter, output_queue, worker_id);
            })
        };
        let stderr_handle = {
            let worker_id = worker_id.clone();
            std::thread::spawn(move || stderr_loop(stderr, worker_id))
        };

        Ok(Self {
            worker_id,
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            status_waiter,
            reader_handle: Mutex::new(Some(reader_handle)),
            stderr_handle: Mutex::new(Some(stderr_handle)),
        })
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Send an `EXECUTE` command. Returns an error if the child's stdin is
    /// gone (the process has died).
    pub fn submit(&self, task: Task) -> std::io::Result<()> {
        send(&self.stdin, &WorkerCommand::Execute { task })
    }

    /// Synchronous STATUS round-trip. Blocks up to `timeout`; returns
    /// `(active_threads, thread_limit)` of `(0, 0)` on timeout or any
    /// transport failure, per spec §4.4's pessimistic-fallback rule.
    pub fn load(&self, timeout: Duration) -> (usize, usize) {
        let (tx, rx) = bounded(1);
        *self.status_waiter.lock() = Some(tx);
        if send(&self.stdin, &WorkerCommand::Status).is_err() {
            *self.status_waiter.lock() = None;
            return (0, 0);
        }
        match rx.recv_timeout(timeout) {
            Ok(load) => load,
            Err(_) => {
                *self.status_waiter.lock() = None;
                (0, 0)
            }
        }
    }

    /// Stop the child. If `graceful`, send `STOP` and wait up to
    /// `grace_period`; otherwise (or on timeout) kill it outright.
    pub fn stop(&self, graceful: bool, grace_period: Duration) {
        if graceful && send(&self.stdin, &WorkerCommand::Stop).is_ok() {
            let deadline = std::time::Instant::now() + grace_period;
            loop {
                if let Ok(Some(_)) = self.child.lock().try_wait() {
                    break;
                }
                if std::time::Instant::now() >= deadline {
                    log::warn!("worker {} did not exit within the grace period, killing", self.worker_id);
                    let _ = self.child.lock().kill();
                    break;
                }
                std::thread::sleep(Duration::from_millis(10));
            }
        } else {
            let _ = self.child.lock().kill();
        }
        let _ = self.child.lock().wait();
        if let Some(h) = self.reader_handle.lock().take() {
            let _ = h.join();
        }
        if let Some(h) = self.stderr_handle.lock().take() {
            let _ = h.join();
        }
    }
}

fn send(stdin: &Mutex<ChildStdin>, command: &WorkerCommand) -> std::io::Result<()> {
    let mut line = serde_json::to_string(command)?;
    line.push('\n');
    let mut stdin = stdin.lock();
    stdin.write_all(line.as_bytes())?;
    stdin.flush()
}

fn reader_loop(
    stdout: std::process::ChildStdout,
    status_waiter: StatusWaiter,
    output_queue: Arc<Queue<crate::result::TaskResult>>,
    worker_id: String,
) {
    let reader = BufReader::new(stdout);
    for line in reader.lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        let message: WorkerMessage = match serde_json::from_str(&line) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("worker {worker_id} sent an unparsable frame: {e}");
                continue;
            }
        };
        match message {
            WorkerMessage::StatusReply {
                active_threads,
                thread_limit,
            } => {
                if let Some(waiter) = status_waiter.lock().take() {
                    let _ = waiter.send((active_threads, thread_limit));
                }
            }
            WorkerMessage::TaskResult { result } => {
                if output_queue.try_push(result).is_err() {
                    log::error!("output queue full, dropped a result from worker {worker_id}");
                }
            }
        }
    }
}

fn stderr_loop(stderr: std::process::ChildStderr, worker_id: String) {
    let reader = BufReader::new(stderr);
    for line in reader.lines().map_while(Result::ok) {
        log::info!("[worker:{worker_id}] {line}");
    }
}
