//! Shared plumbing for the scenario tests in this directory: locating the
//! `echo-script` fixture and building a small, fast-polling [`EngineConfig`]
//! so scenarios don't spend their wall-clock budget on default poll
//! intervals sized for production.

use taskd::EngineConfig;

/// Absolute path to the compiled `echo-script` fixture, built as this
/// crate's dev-dependency before the test binary runs.
#[allow(dead_code)]
pub fn echo_script_path() -> String {
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

/// A config tuned for fast, deterministic tests: short poll/status timeouts
/// so scenarios don't wait out production-sized intervals, one worker of
/// each class unless the scenario overrides it.
#[allow(dead_code)]
pub fn test_config() -> EngineConfig {
    EngineConfig {
        input_queue_size: 100,
        output_queue_size: 1000,
        cpu_bound_count: 1,
        io_bound_count: Some(1),
        cpu_bound_task_limit: 4,
        io_bound_task_limit: 4,
        queue_thread_count: 2,
        queue_poll_timeout_ms: 50,
        max_queue_full_retries: 3,
        log_level: "warn".to_owned(),
        shard_count: 4,
        max_per_shard: 1000,
        shutdown_timeout_ms: 2_000,
        worker_status_timeout_ms: 100,
    }
}
