// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::sched::SchedulerOptions;
use crate::types::ExecutionAffinity;

/// Top-level configuration as read from a TOML file.
///
/// This is a direct mapping of the on-disk format:
///
/// ```toml
/// [runtime]
/// multithreading = true
/// num_threads = 4
/// max_exec_time = "100ms"
///
/// [module.camera]
/// affinity = "main_thread_only"
/// max_exec_time = "50ms"
/// writes = [{ channel = "image", priority = 1 }]
/// reads  = [{ channel = "trigger" }]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global execution config from `[runtime]`.
    #[serde(default)]
    pub runtime: RuntimeSection,

    /// All modules from `[module.<name>]`.
    ///
    /// Keys are the *module names* (e.g. `"camera"`, `"lane_detect"`).
    #[serde(default)]
    pub module: BTreeMap<String, ModuleSection>,
}

/// `[runtime]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeSection {
    /// Run cycles on a worker pool instead of the calling thread.
    #[serde(default)]
    pub multithreading: bool,

    /// Pool size; must be >= 1 when `multithreading` is on.
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,

    /// Default watchdog limit for modules without their own
    /// `max_exec_time`, e.g. `"100ms"`.
    #[serde(default)]
    pub max_exec_time: Option<String>,
}

fn default_num_threads() -> usize {
    1
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            multithreading: false,
            num_threads: default_num_threads(),
            max_exec_time: None,
        }
    }
}

/// `[module.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ModuleSection {
    /// `"main_thread_only"` or `"worker_thread_only"` (default).
    #[serde(default)]
    pub affinity: ExecutionAffinity,

    /// Per-module watchdog limit; overrides `[runtime].max_exec_time`.
    #[serde(default)]
    pub max_exec_time: Option<String>,

    /// Channels this module reads.
    #[serde(default)]
    pub reads: Vec<AccessDecl>,

    /// Channels this module writes.
    #[serde(default)]
    pub writes: Vec<AccessDecl>,
}

/// One channel access, e.g. `{ channel = "image", priority = 1 }`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessDecl {
    pub channel: String,

    /// Higher priority runs earlier. Defaults to 0.
    #[serde(default)]
    pub priority: i32,
}

impl ModuleSection {
    /// Per-module watchdog limit, parsed. The string was checked during
    /// validation, so an unparseable value only occurs on an unvalidated
    /// config and reads as "no limit".
    pub fn effective_max_exec_time(&self) -> Option<Duration> {
        self.max_exec_time
            .as_deref()
            .and_then(|s| parse_duration(s).ok())
    }
}

/// Validated configuration.
///
/// Construct via `ConfigFile::try_from(raw)` or
/// [`loader::load_and_validate`](crate::config::loader::load_and_validate).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub runtime: RuntimeSection,
    pub module: BTreeMap<String, ModuleSection>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        runtime: RuntimeSection,
        module: BTreeMap<String, ModuleSection>,
    ) -> Self {
        Self { runtime, module }
    }

    /// Scheduler options resolved from `[runtime]`.
    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            multithreading: self.runtime.multithreading,
            num_threads: self.runtime.num_threads,
            default_max_exec_time: self
                .runtime
                .max_exec_time
                .as_deref()
                .and_then(|s| parse_duration(s).ok()),
        }
    }
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
