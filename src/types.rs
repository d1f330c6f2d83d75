// src/types.rs

//! Shared type aliases and small enums.

use std::str::FromStr;

use serde::Deserialize;

/// Name of a registered module. Unique within one scheduler.
pub type ModuleName = String;

/// Name of a data channel modules read from or write to.
pub type ChannelName = String;

/// Thread placement constraint for a module's cycle function.
///
/// - `WorkerThreadOnly`: the module may run on any pool worker (default
///   behaviour).
/// - `MainThreadOnly`: the module must run on the thread that called
///   `Scheduler::cycle`, e.g. because it touches thread-bound resources
///   such as a UI or GL context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionAffinity {
    MainThreadOnly,
    WorkerThreadOnly,
}

impl Default for ExecutionAffinity {
    fn default() -> Self {
        ExecutionAffinity::WorkerThreadOnly
    }
}

impl FromStr for ExecutionAffinity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "main_thread_only" => Ok(ExecutionAffinity::MainThreadOnly),
            "worker_thread_only" => Ok(ExecutionAffinity::WorkerThreadOnly),
            other => Err(format!(
                "invalid affinity: {other} (expected \"main_thread_only\" or \"worker_thread_only\")"
            )),
        }
    }
}

/// How a module accesses a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// The module only observes the channel's content.
    Read,
    /// The module mutates the channel's content.
    Write,
}
