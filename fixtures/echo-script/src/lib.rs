//! A compiled task script used only by the engine's integration tests.
//!
//! Recognized `params` fields:
//! - `"v"` (number): returns `{"result": v * 2}`.
//! - `"sleep_ms"` (number): sleeps that many milliseconds before returning `{"ok": true}`.
//! - `"fail"` (bool): returns an explicit script-level failure.
//! - `"panic"` (bool): panics inside the script (exercises the executor's panic guard).
//! - `"exit"` (bool): calls `std::process::exit`, simulating a crashed worker.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::os::raw::c_char;

taskd_abi::export_free_symbol!();

#[derive(Deserialize)]
struct Params {
    v: Option<f64>,
    sleep_ms: Option<u64>,
    fail: Option<bool>,
    panic: Option<bool>,
    exit: Option<bool>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Outcome {
    Ok(Value),
    Err { error: String },
}

fn run_uncaught(params: Params) -> Outcome {
    if params.exit.unwrap_or(false) {
        std::process::exit(1);
    }
    if params.panic.unwrap_or(false) {
        panic!("simulated panic inside task script");
    }
    if params.fail.unwrap_or(false) {
        return Outcome::Err {
            error: "simulated script failure".to_owned(),
        };
    }
    if let Some(ms) = params.sleep_ms {
        std::thread::sleep(std::time::Duration::from_millis(ms));
    }
    if let Some(v) = params.v {
        return Outcome::Ok(serde_json::json!({ "result": v * 2.0 }));
    }
    Outcome::Ok(serde_json::json!({ "ok": true }))
}

/// A panic that unwinds out of a dynamically-loaded library is not
/// reliably catchable by the host process (the loaded copy of `std` has no
/// shared identity with the host's), so a well-behaved script must guard
/// its own execution and translate a panic into an explicit error response
/// itself, rather than rely on the host to catch it.
fn run_inner(params: Params) -> Outcome {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || run_uncaught(params))) {
        Ok(outcome) => outcome,
        Err(payload) => Outcome::Err {
            error: panic_message(&*payload),
        },
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task script panicked".to_owned()
    }
}

/// `main(params, context)` entry point shape. `C-unwind` is only a safety
/// margin at the call boundary itself; `run_inner` has already caught any
/// panic before it gets here.
///
/// # Safety
///
/// All three pointers must be valid, NUL-terminated C strings for the
/// duration of the call, per the `taskd-abi` contract.
#[no_mangle]
pub unsafe extern "C-unwind" fn taskd_run(
    params_json: *const c_char,
    _worker_id: *const c_char,
    _task_id: *const c_char,
) -> *mut c_char {
    let params: Params = match taskd_abi::decode(params_json) {
        Ok(p) => p,
        Err(e) => return taskd_abi::encode(&Outcome::Err { error: e }),
    };
    taskd_abi::encode(&run_inner(params))
}

/// `module().run(params)` entry point shape (no execution context).
///
/// # Safety
///
/// `params_json` must be a valid, NUL-terminated C string for the duration
/// of the call, per the `taskd-abi` contract.
#[no_mangle]
pub unsafe extern "C-unwind" fn taskd_module_run(params_json: *const c_char) -> *mut c_char {
    let params: Params = match taskd_abi::decode(params_json) {
        Ok(p) => p,
        Err(e) => return taskd_abi::encode(&Outcome::Err { error: e }),
    };
    taskd_abi::encode(&run_inner(params))
}
