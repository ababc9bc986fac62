//! `taskd-worker`: the child process spawned once per worker slot. Reads
//! newline-delimited JSON commands from stdin, runs tasks through an
//! in-process thread pool, and writes status replies plus asynchronous task
//! results back to stdout, each tagged by `"kind"` so the parent can
//! demultiplex them (spec §4.4, §6).

use crossbeam_channel::unbounded;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use taskd::executor::Executor;
use taskd::ipc::{WorkerCommand, WorkerMessage};
use taskd::pool::new_thread_pool;
use taskd::task::TaskClass;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("TASKD_LOG", "info"))
        .init();

    let mut args = std::env::args().skip(1);
    let class = match args.next().as_deref() {
        Some("io_bound") => TaskClass::IoBound,
        _ => TaskClass::CpuBound,
    };
    let thread_count: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(1);
    let worker_id = args.next().unwrap_or_else(|| std::process::id().to_string());
    log::info!("worker {worker_id} starting: class={class:?}, threads={thread_count}");

    let executor = Arc::new(Executor::new());
    let queue_capacity = (thread_count * 4).max(8);
    let pool = new_thread_pool(worker_id.clone(), executor, thread_count, queue_capacity);

    let (result_tx, result_rx) = unbounded();
    let writer_handle = std::thread::spawn(move || {
        for result in result_rx {
            write_frame(&WorkerMessage::TaskResult { result });
        }
    });

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        let command: WorkerCommand = match serde_json::from_str(&line) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("worker {worker_id} received an unparsable command: {e}");
                continue;
            }
        };
        match command {
            WorkerCommand::Execute { task } => pool.execute(task, result_tx.clone()),
            WorkerCommand::Status => write_frame(&WorkerMessage::StatusReply {
                active_threads: pool.active_count(),
                thread_limit: pool.thread_limit(),
            }),
            WorkerCommand::Stop => break,
        }
    }

    log::info!("worker {worker_id} draining in-flight tasks before exit");
    drop(pool);
    drop(result_tx);
    let _ = writer_handle.join();
}

fn write_frame(message: &WorkerMessage) {
    let Ok(mut line) = serde_json::to_string(message) else {
        return;
    };
    line.push('\n');
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    let _ = lock.write_all(line.as_bytes());
    let _ = lock.flush();
}
