//! Spec §8 scenario 4: worker crash isolation. A task whose script calls
//! `std::process::exit` takes its whole worker process down with it; the
//! engine must still produce a result (or at least not hang the caller
//! forever) and keep servicing later submissions on the worker(s) that
//! remain.

mod support;

use serde_json::json;
use std::time::Duration;
use taskd::{Engine, Task, TaskClass};

#[test]
fn crashed_worker_does_not_take_down_remaining_submissions() {
    let mut config = support::test_config();
    config.cpu_bound_count = 2;
    config.cpu_bound_task_limit = 1;
    let engine = Engine::start(config).expect("engine starts");

    let crashing = Task::new(support::echo_script_path(), json!({"exit": true}), TaskClass::CpuBound);
    let crashing_id = engine.submit_task(crashing).expect("task is admitted");

    // The crashing task's own result may never arrive (its process died
    // mid-execution, per the spec's open question on this legacy gap), but
    // the engine itself, and its other worker, must keep functioning.
    let _ = engine.get_result(&crashing_id, Duration::from_secs(2));

    let followups: Vec<String> = (0..10)
        .map(|i| {
            let task = Task::new(support::echo_script_path(), json!({"v": i as f64}), TaskClass::CpuBound);
            engine.submit_task(task).expect("task is admitted despite a sibling crash")
        })
        .collect();

    for (i, task_id) in followups.iter().enumerate() {
        let result = engine
            .get_result(task_id, Duration::from_secs(5))
            .unwrap_or_else(|| panic!("follow-up task {i} never completed"));
        assert!(result.is_success());
        assert_eq!(result.data.unwrap()["result"], (i as f64) * 2.0);
    }

    engine.shutdown(true);
}
