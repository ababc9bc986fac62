//! Spec §8 scenario 1: single task round-trip.

mod support;

use serde_json::json;
use std::time::Duration;
use taskd::{Engine, Task, TaskClass};

#[test]
fn doubles_v_and_returns_within_five_seconds() {
    let engine = Engine::start(support::test_config()).expect("engine starts");

    let task = Task::new(support::echo_script_path(), json!({"v": 42.0}), TaskClass::CpuBound);
    let task_id = engine.submit_task(task).expect("task is admitted");

    let result = engine
        .get_result(&task_id, Duration::from_secs(5))
        .expect("result arrives within the deadline");

    assert!(result.is_success());
    assert_eq!(result.task_id, task_id);
    assert_eq!(result.data.unwrap()["result"], 84.0);

    engine.shutdown(true);
}
