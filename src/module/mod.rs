// src/module/mod.rs

//! The module abstraction: user code driven by the scheduler.
//!
//! A module implements [`Module`] and is registered with the scheduler under
//! a unique name. The scheduler calls `init` once when the module is
//! enabled, `cycle` once per engine cycle in dependency order, and
//! `shutdown` when the module is disabled.
//!
//! Module code is a fault boundary: an `Err` return or a panic from any
//! lifecycle method is logged and contained, never propagated into the
//! engine.

pub mod registry;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::error;

use crate::messaging::MessageBus;

pub use registry::{ModuleId, ModuleRegistry, ModuleSlot};

/// Everything a module may touch during one cycle.
pub struct CycleContext {
    /// Broadcast mailbox shared by all modules.
    pub bus: Arc<MessageBus>,
    /// Number of the current cycle, starting at 1.
    pub cycle: u64,
}

/// A schedulable unit of user code.
///
/// Implementations must be `Send` so worker threads can run them; the
/// scheduler guarantees that at most one thread calls into a given module
/// at a time.
pub trait Module: Send {
    /// Called once when the module is enabled.
    fn init(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once per cycle, after every module this one depends on has
    /// finished its own `cycle`.
    fn cycle(&mut self, ctx: &CycleContext) -> anyhow::Result<()>;

    /// Called when the module is disabled.
    fn shutdown(&mut self) {}
}

/// Run a module lifecycle method with fault containment.
///
/// Returns `true` if the call completed without fault. `Err` returns and
/// panics are logged with the module name and phase and swallowed.
pub(crate) fn run_contained<F>(module: &str, phase: &str, f: F) -> bool
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!(module, phase, error = %e, "module fault contained");
            false
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(module, phase, panic = %message, "module panic contained");
            false
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
