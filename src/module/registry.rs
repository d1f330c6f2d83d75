// src/module/registry.rs

//! Storage for registered modules.
//!
//! Modules live in an arena of slots and are addressed everywhere else by
//! [`ModuleId`], a plain index. Graphs, execution lists and worker queues
//! only ever carry ids; the slot owns the boxed instance behind a mutex so
//! a worker thread can run it without any registry-wide locking.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::module::{CycleContext, Module, run_contained};
use crate::types::{ExecutionAffinity, ModuleName};

/// Stable handle for a registered module.
///
/// Ids are assigned in registration order and never reused within one
/// scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(usize);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One registered module: identity, scheduling attributes and the instance.
pub struct ModuleSlot {
    name: ModuleName,
    affinity: ExecutionAffinity,
    max_exec_time: Option<Duration>,
    instance: Mutex<Box<dyn Module>>,
}

impl ModuleSlot {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn affinity(&self) -> ExecutionAffinity {
        self.affinity
    }

    /// Per-module watchdog limit, if configured.
    pub fn max_exec_time(&self) -> Option<Duration> {
        self.max_exec_time
    }

    /// Run `init` with fault containment. Returns `true` on success.
    pub fn run_init(&self) -> bool {
        let mut instance = self.lock_instance();
        run_contained(&self.name, "init", || instance.init())
    }

    /// Run `cycle` with fault containment. Returns `true` on success.
    pub fn run_cycle(&self, ctx: &CycleContext) -> bool {
        let mut instance = self.lock_instance();
        run_contained(&self.name, "cycle", || instance.cycle(ctx))
    }

    /// Run `shutdown` with fault containment.
    pub fn run_shutdown(&self) {
        let mut instance = self.lock_instance();
        run_contained(&self.name, "shutdown", || {
            instance.shutdown();
            Ok(())
        });
    }

    // The engine keeps running after a contained fault; a poisoned lock is
    // recovered, not propagated.
    fn lock_instance(&self) -> std::sync::MutexGuard<'_, Box<dyn Module>> {
        self.instance
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Arena of module slots, addressed by [`ModuleId`].
#[derive(Default)]
pub struct ModuleRegistry {
    slots: Vec<Arc<ModuleSlot>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        name: &str,
        affinity: ExecutionAffinity,
        max_exec_time: Option<Duration>,
        instance: Box<dyn Module>,
    ) -> ModuleId {
        let id = ModuleId(self.slots.len());
        self.slots.push(Arc::new(ModuleSlot {
            name: name.to_string(),
            affinity,
            max_exec_time,
            instance: Mutex::new(instance),
        }));
        id
    }

    pub fn get(&self, id: ModuleId) -> Option<&Arc<ModuleSlot>> {
        self.slots.get(id.0)
    }

    pub fn id_of(&self, name: &str) -> Option<ModuleId> {
        self.slots
            .iter()
            .position(|slot| slot.name() == name)
            .map(ModuleId)
    }

    pub fn name_of(&self, id: ModuleId) -> Option<&str> {
        self.get(id).map(|slot| slot.name())
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.id_of(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &Arc<ModuleSlot>)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (ModuleId(i), slot))
    }
}
