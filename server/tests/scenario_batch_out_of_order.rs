//! Spec §8 scenario 2: batch out-of-order delivery. 100 tasks with a random
//! per-task delay of 10ms or 500ms must all eventually be retrievable, even
//! though their completion order differs from submission order.

mod support;

use rand::Rng;
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use taskd::{Engine, Task, TaskClass};

#[test]
fn all_hundred_results_are_eventually_retrievable() {
    let mut config = support::test_config();
    config.io_bound_count = Some(2);
    config.io_bound_task_limit = 8;
    let engine = Engine::start(config).expect("engine starts");

    let mut rng = rand::thread_rng();
    let mut submitted = HashSet::new();
    for _ in 0..100 {
        let delay_ms = if rng.gen_bool(0.5) { 10 } else { 500 };
        let task = Task::new(
            support::echo_script_path(),
            json!({"sleep_ms": delay_ms}),
            TaskClass::IoBound,
        );
        let task_id = engine.submit_task(task).expect("task is admitted");
        submitted.insert(task_id);
    }

    let mut retrieved = HashSet::new();
    for task_id in &submitted {
        let result = engine
            .get_result(task_id, Duration::from_secs(10))
            .unwrap_or_else(|| panic!("no result for {task_id}"));
        assert!(result.is_success());
        assert_eq!(&result.task_id, task_id);
        retrieved.insert(result.task_id);
    }

    assert_eq!(submitted, retrieved);
    engine.shutdown(true);
}
