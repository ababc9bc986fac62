//! System-wide registry: a small set of global atomics tracking engine
//! health, generalized from the teacher's single `state_okay` flag into a
//! running/not-running flag plus a poisoned-on-fatal-error flag.

use std::sync::atomic::{AtomicBool, Ordering};

const ORD_ACQ: Ordering = Ordering::Acquire;
const ORD_REL: Ordering = Ordering::Release;

static RUNNING: AtomicBool = AtomicBool::new(false);
static HEALTHY: AtomicBool = AtomicBool::new(true);

pub fn set_running(running: bool) {
    RUNNING.store(running, ORD_REL);
}

pub fn is_running() -> bool {
    RUNNING.load(ORD_ACQ)
}

/// Mark the engine unhealthy. Used when a failure compromises an engine
/// invariant (e.g. the output queue becomes unreadable) rather than a
/// single task.
pub fn poison() {
    HEALTHY.store(false, ORD_REL);
}

pub fn unpoison() {
    HEALTHY.store(true, ORD_REL);
}

pub fn is_healthy() -> bool {
    HEALTHY.load(ORD_ACQ)
}
