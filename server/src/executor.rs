//! The script executor (spec §4.8 and its concrete realization in
//! SPEC_FULL.md §4.8-ext): loads a compiled task script (a `cdylib`) with
//! `libloading`, caches it keyed by path, and invalidates the cache entry
//! when the file's modification time advances.

use crate::context::ExecutionContext;
use crate::result::TaskResult;
use libloading::{Library, Symbol};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::{c_char, CStr, CString};
use std::fs;
use std::sync::Arc;
use std::time::SystemTime;

type MainEntry = unsafe extern "C-unwind" fn(*const c_char, *const c_char, *const c_char) -> *mut c_char;
type ModuleEntry = unsafe extern "C-unwind" fn(*const c_char) -> *mut c_char;
type FreeEntry = unsafe extern "C" fn(*mut c_char);

#[derive(Clone, Copy)]
enum Entry {
    Main(MainEntry),
    Module(ModuleEntry),
}

struct LoadedScript {
    // Kept alive for as long as `entry`/`free` point into it. Held behind
    // an `Arc` (see `Executor::cache`) so an in-flight call can keep it
    // mapped even if a concurrent reload replaces the cache entry.
    _library: Library,
    entry: Entry,
    free: FreeEntry,
    mtime: SystemTime,
}

/// Loads and caches compiled task scripts, invalidating an entry when the
/// backing file's mtime has advanced since it was loaded (spec §8 scenario
/// 6). One `Executor` is shared by every thread of a single worker
/// process's [`crate::pool::ThreadPool`]; the cache mutex only ever guards
/// the lookup/insert itself; running a script holds an `Arc` clone of its
/// `LoadedScript`, not the mutex, so threads run scripts concurrently
/// instead of serializing on this structure.
#[derive(Default)]
pub struct Executor {
    cache: Mutex<HashMap<String, Arc<LoadedScript>>>,
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `script_path` with `params`, returning a [`TaskResult`]. Every
    /// failure mode that can be represented without crashing the process
    /// (missing file, bad symbol, explicit script error) becomes a `FAILED`
    /// result. `catch_unwind` here is a last-resort safety margin, not the
    /// primary guard: a panic that unwinds out of a dynamically-loaded
    /// library has no shared identity with this process's own panic
    /// runtime and is not reliably catchable, so a well-behaved script
    /// must catch its own panics and report them as an explicit failure
    /// (see the `echo-script` fixture). A script that lets a panic escape
    /// anyway will abort its own worker process, which the process tier
    /// (not this executor) treats as a worker crash.
    pub fn execute(
        &self,
        script_path: &str,
        params: &serde_json::Value,
        ctx: &ExecutionContext,
    ) -> TaskResult {
        let started_at = chrono::Utc::now();
        if let Err(e) = self.load_or_refresh(script_path) {
            return TaskResult::failed(
                &ctx.task_id,
                format!("failed to load script: {e}"),
                serde_json::json!({"kind": "load_error"}),
                Some(started_at),
            );
        }
        let script = {
            let cache = self.cache.lock();
            cache.get(script_path).expect("just loaded above").clone()
        };
        let params_c = match CString::new(params.to_string()) {
            Ok(c) => c,
            Err(e) => {
                return TaskResult::failed(
                    &ctx.task_id,
                    format!("failed to encode params: {e}"),
                    serde_json::json!({"kind": "serialization_failed"}),
                    Some(started_at),
                )
            }
        };
        let task_id_c = CString::new(ctx.task_id.as_str()).unwrap();
        let worker_id_c = CString::new(ctx.worker_id.as_str()).unwrap();

        let call = std::panic::AssertUnwindSafe(|| unsafe {
            match script.entry {
                Entry::Main(f) => f(params_c.as_ptr(), worker_id_c.as_ptr(), task_id_c.as_ptr()),
                Entry::Module(f) => f(params_c.as_ptr()),
            }
        });
        let free = script.free;
        match std::panic::catch_unwind(call) {
            Ok(raw) => {
                let response = unsafe { read_and_free(raw, free) };
                drop(script);
                Self::interpret_response(&ctx.task_id, response, started_at)
            }
            Err(panic) => {
                drop(script);
                let message = panic_message(&*panic);
                TaskResult::failed(
                    &ctx.task_id,
                    "task script panicked",
                    serde_json::json!({"kind": "panic", "message": message}),
                    Some(started_at),
                )
            }
        }
    }

    fn interpret_response(
        task_id: &str,
        response: Option<String>,
        started_at: chrono::DateTime<chrono::Utc>,
    ) -> TaskResult {
        let Some(response) = response else {
            return TaskResult::failed(
                task_id,
                "script returned a null response",
                serde_json::json!({"kind": "serialization_failed"}),
                Some(started_at),
            );
        };
        let value: serde_json::Value = match serde_json::from_str(&response) {
            Ok(v) => v,
            Err(e) => {
                return TaskResult::failed(
                    task_id,
                    format!("script returned invalid json: {e}"),
                    serde_json::json!({"kind": "serialization_failed"}),
                    Some(started_at),
                )
            }
        };
        if let Some(err) = value.get("error").and_then(|v| v.as_str()) {
            return TaskResult::failed(
                task_id,
                err,
                serde_json::json!({"kind": "script_error"}),
                Some(started_at),
            );
        }
        TaskResult::success(task_id, value, started_at)
    }

    /// Load `script_path` into the cache if absent, or reload it if the
    /// file's mtime has advanced past what's cached.
    fn load_or_refresh(&self, script_path: &str) -> Result<(), String> {
        let mtime = fs::metadata(script_path)
            .and_then(|m| m.modified())
            .map_err(|e| format!("stat failed for {script_path}: {e}"))?;

        let mut cache = self.cache.lock();
        if let Some(existing) = cache.get(script_path) {
            if existing.mtime == mtime {
                return Ok(());
            }
            log::info!("script {script_path} changed on disk, reloading");
            // Drop (dlclose) the stale mapping before reopening the same
            // path: the dynamic linker refcounts loaded objects by resolved
            // path, so dlopen-ing over a still-mapped library would hand
            // back the old in-memory copy instead of rereading the file.
            cache.remove(script_path);
        }

        let library = unsafe {
            Library::new(script_path).map_err(|e| format!("dlopen failed for {script_path}: {e}"))?
        };
        let entry = unsafe { resolve_entry(&library)? };
        let free: Symbol<FreeEntry> = unsafe {
            library
                .get(b"taskd_free\0")
                .map_err(|e| format!("missing taskd_free symbol: {e}"))?
        };
        let free = *free;

        cache.insert(
            script_path.to_owned(),
            Arc::new(LoadedScript {
                _library: library,
                entry,
                free,
                mtime,
            }),
        );
        Ok(())
    }
}

unsafe fn resolve_entry(library: &Library) -> Result<Entry, String> {
    if let Ok(sym) = library.get::<MainEntry>(b"taskd_run\0") {
        return Ok(Entry::Main(*sym));
    }
    let sym: Symbol<ModuleEntry> = library
        .get(b"taskd_module_run\0")
        .map_err(|e| format!("script exposes neither taskd_run nor taskd_module_run: {e}"))?;
    Ok(Entry::Module(*sym))
}

unsafe fn read_and_free(raw: *mut c_char, free: FreeEntry) -> Option<String> {
    if raw.is_null() {
        return None;
    }
    let s = CStr::from_ptr(raw).to_str().ok().map(|s| s.to_owned());
    free(raw);
    s
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Locate the `echo-script` cdylib built as a dev-dependency of this
    /// crate. Cargo builds every dev-dependency into the workspace's shared
    /// `target/<profile>/` directory before running tests, so it's found by
    /// naming convention rather than an artifact-dependency env var.
    fn fixture_path() -> String {
        let profile = if cfg!(debug_assertions) { "debug" } else { "release" };
        let manifest_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
        let target_dir = manifest_dir
            .parent()
            .expect("server crate has a workspace-root parent")
            .join("target")
            .join(profile);
        let file_name = if cfg!(target_os = "macos") {
            "libecho_script.dylib"
        } else if cfg!(target_os = "windows") {
            "echo_script.dll"
        } else {
            "libecho_script.so"
        };
        target_dir.join(file_name).to_string_lossy().into_owned()
    }

    #[test]
    fn doubles_v() {
        let executor = Executor::new();
        let ctx = ExecutionContext::new("t1", "cpu-0");
        let result = executor.execute(&fixture_path(), &serde_json::json!({"v": 21.0}), &ctx);
        assert!(result.is_success());
        assert_eq!(result.data.unwrap()["result"], 42.0);
    }

    #[test]
    fn explicit_failure_becomes_failed_result() {
        let executor = Executor::new();
        let ctx = ExecutionContext::new("t2", "cpu-0");
        let result = executor.execute(&fixture_path(), &serde_json::json!({"fail": true}), &ctx);
        assert!(!result.is_success());
        assert!(result.error.unwrap().contains("simulated"));
    }

    #[test]
    fn panic_is_caught_and_reified() {
        let executor = Executor::new();
        let ctx = ExecutionContext::new("t3", "cpu-0");
        let result = executor.execute(&fixture_path(), &serde_json::json!({"panic": true}), &ctx);
        assert!(!result.is_success());
        assert!(result.error.unwrap().contains("simulated panic"));
    }

    #[test]
    fn missing_script_becomes_failed_result() {
        let executor = Executor::new();
        let ctx = ExecutionContext::new("t4", "cpu-0");
        let result = executor.execute("/no/such/script.so", &serde_json::json!({}), &ctx);
        assert!(!result.is_success());
    }
}
