//! Engine configuration (spec §6's configuration table).
//!
//! Mirrors the teacher's `ConfigurationSet` in spirit: a plain struct with
//! documented defaults, `serde::Deserialize` so it can be loaded from a YAML
//! file, and a `validate()` step run once at [`crate::engine::Engine::start`].

use crate::error::ConfigError;
use serde::Deserialize;
use std::{fs, path::Path};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub input_queue_size: usize,
    pub output_queue_size: usize,
    pub cpu_bound_count: usize,
    pub io_bound_count: Option<usize>,
    pub cpu_bound_task_limit: usize,
    pub io_bound_task_limit: usize,
    pub queue_thread_count: usize,
    pub queue_poll_timeout_ms: u64,
    pub max_queue_full_retries: u32,
    pub log_level: String,
    pub shard_count: usize,
    pub max_per_shard: usize,
    pub shutdown_timeout_ms: u64,
    pub worker_status_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            input_queue_size: 1000,
            output_queue_size: 10_000,
            cpu_bound_count: 1,
            io_bound_count: None,
            cpu_bound_task_limit: 1,
            io_bound_task_limit: 20,
            queue_thread_count: 4,
            queue_poll_timeout_ms: 1_000,
            max_queue_full_retries: 3,
            log_level: "INFO".to_owned(),
            shard_count: 16,
            max_per_shard: 100,
            shutdown_timeout_ms: 5_000,
            worker_status_timeout_ms: 100,
        }
    }
}

impl EngineConfig {
    /// The I/O-bound worker process count, resolving the `None` default to
    /// `max(1, CPU_CORES - 1)` as spec'd.
    pub fn io_bound_count(&self) -> usize {
        self.io_bound_count
            .unwrap_or_else(|| (num_cpus::get().saturating_sub(1)).max(1))
    }

    /// Load from a YAML file if `path` is `Some` and exists, falling back to
    /// defaults (with a warning) otherwise. This is the single file-or-default
    /// path the engine library itself needs; richer CLI/env precedence layers
    /// belong to the (out-of-scope) command-line front-end.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            log::warn!("no configuration file supplied, using default settings");
            return Ok(Self::default());
        };
        if !path.exists() {
            log::warn!(
                "configuration file {} does not exist, using default settings",
                path.display()
            );
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let cfg: Self = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_thread_count < 1 {
            return Err(ConfigError::OutOfRange {
                field: "queue_thread_count",
                min: 1,
                got: self.queue_thread_count as u64,
            });
        }
        if self.cpu_bound_count < 1 {
            return Err(ConfigError::OutOfRange {
                field: "cpu_bound_count",
                min: 1,
                got: self.cpu_bound_count as u64,
            });
        }
        if self.io_bound_count() < 1 {
            return Err(ConfigError::OutOfRange {
                field: "io_bound_count",
                min: 1,
                got: self.io_bound_count() as u64,
            });
        }
        if self.shard_count < 1 {
            return Err(ConfigError::OutOfRange {
                field: "shard_count",
                min: 1,
                got: self.shard_count as u64,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.input_queue_size, 1000);
        assert_eq!(cfg.output_queue_size, 10_000);
        assert_eq!(cfg.cpu_bound_task_limit, 1);
        assert_eq!(cfg.io_bound_task_limit, 20);
        assert_eq!(cfg.queue_thread_count, 4);
        assert_eq!(cfg.max_queue_full_retries, 3);
        assert_eq!(cfg.shard_count, 16);
        assert_eq!(cfg.max_per_shard, 100);
    }

    #[test]
    fn rejects_zero_queue_threads() {
        let cfg = EngineConfig {
            queue_thread_count: 0,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = EngineConfig::load(Some(Path::new("/no/such/path.yaml"))).unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }
}
