//! The set of submitted tasks awaiting delivery to their caller (spec data
//! model §3: `pending_tasks.contains(T)` iff `T` has been submitted and its
//! result has not yet been delivered).

use crate::task::Task;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Guarded by a single dedicated mutex, per spec §5's lock-ordering rule
/// (pending-tasks mutex is acquired before any cache-shard mutex, and never
/// while holding one).
#[derive(Default)]
pub struct PendingTaskSet {
    inner: Mutex<HashMap<String, Task>>,
}

impl PendingTaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, task: Task) {
        self.inner.lock().insert(task.task_id.clone(), task);
    }

    pub fn remove(&self, task_id: &str) -> Option<Task> {
        self.inner.lock().remove(task_id)
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.inner.lock().contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskClass;
    use serde_json::json;

    #[test]
    fn insert_contains_remove() {
        let set = PendingTaskSet::new();
        let task = Task::new("x.so", json!({}), TaskClass::CpuBound);
        let id = task.task_id.clone();
        set.insert(task);
        assert!(set.contains(&id));
        assert_eq!(set.len(), 1);
        let removed = set.remove(&id).unwrap();
        assert_eq!(removed.task_id, id);
        assert!(!set.contains(&id));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Submit,
            Collect(usize),
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                Just(Op::Submit),
                (0usize..20).prop_map(Op::Collect),
            ]
        }

        proptest! {
            /// `len()` always equals the number of submitted tasks not yet
            /// collected, for any interleaving of submit/collect operations —
            /// the set never double-removes or loses track of an entry.
            #[test]
            fn len_matches_submitted_minus_collected(ops in proptest::collection::vec(op_strategy(), 0..200)) {
                let set = PendingTaskSet::new();
                let mut submitted_ids: Vec<String> = Vec::new();
                let mut still_pending = std::collections::HashSet::new();

                for op in ops {
                    match op {
                        Op::Submit => {
                            let task = Task::new("x.so", serde_json::json!({}), TaskClass::CpuBound);
                            let id = task.task_id.clone();
                            set.insert(task);
                            submitted_ids.push(id.clone());
                            still_pending.insert(id);
                        }
                        Op::Collect(pick) => {
                            if submitted_ids.is_empty() {
                                continue;
                            }
                            let id = submitted_ids[pick % submitted_ids.len()].clone();
                            let was_pending = still_pending.remove(&id);
                            let removed = set.remove(&id);
                            prop_assert_eq!(removed.is_some(), was_pending);
                        }
                    }
                    prop_assert_eq!(set.len(), still_pending.len());
                }
            }
        }
    }
}
