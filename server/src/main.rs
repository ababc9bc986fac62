//! `taskd`: the engine daemon. Loads configuration, starts the [`Engine`],
//! and blocks until `SIGINT`/`SIGTERM` requests a graceful shutdown.

use libsky::util::ExitError;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskd::{Engine, EngineConfig};

fn main() {
    let config_path = std::env::var("TASKD_CONFIG").ok().map(std::path::PathBuf::from);
    let config = EngineConfig::load(config_path.as_deref()).exit_error("failed to load configuration");

    let log_level = std::env::var("TASKD_LOG").unwrap_or_else(|_| config.log_level.clone());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    log::info!("{}", libsky::VERSION);
    let engine = Engine::start(config).exit_error("failed to start the engine");

    let shutdown_requested = Arc::new(AtomicBool::new(false));
    for sig in [SIGINT, SIGTERM] {
        flag::register(sig, shutdown_requested.clone())
            .exit_error("failed to register a shutdown signal handler");
    }

    while !shutdown_requested.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(200));
    }

    log::info!("shutdown signal received, draining in-flight work");
    engine.shutdown(true);
}
