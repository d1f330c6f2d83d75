// src/sched/scheduler.rs

//! The scheduler: owns the modules, their channel declarations and the
//! derived execution order, and drives cycles.
//!
//! The scheduler is either VALID or INVALID. Registering declarations or
//! changing the enabled set invalidates it; the next `cycle()` call (or
//! order query) revalidates by recompiling the channel declarations into a
//! dependency graph and topologically sorting it. A declaration set that
//! cannot be fully ordered is logged as a configuration cycle and execution
//! continues with the orderable prefix.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::errors::{ModflowError, Result};
use crate::graph::{ChannelAccessGraph, DirectedGraph, GraphExport};
use crate::messaging::MessageBus;
use crate::module::{Module, ModuleId, ModuleRegistry};
use crate::profiling::Profiler;
use crate::sched::Watchdog;
use crate::sched::pool::{WorkerEnv, WorkerPool, execute_module};
use crate::types::{ExecutionAffinity, ModuleName};

/// Execution options, usually fed from the `[runtime]` config section.
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub multithreading: bool,
    /// Pool size when multithreading is on.
    pub num_threads: usize,
    /// Watchdog limit for modules without their own `max_exec_time`.
    pub default_max_exec_time: Option<Duration>,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            multithreading: false,
            num_threads: 1,
            default_max_exec_time: None,
        }
    }
}

pub struct Scheduler {
    registry: ModuleRegistry,
    access_graph: ChannelAccessGraph<ModuleId>,
    /// Enabled modules in enable order. Disabled in reverse on shutdown.
    enabled: Vec<ModuleId>,
    valid: bool,
    /// Canonical dependency graph over the enabled set.
    cycle_list: DirectedGraph<ModuleId>,
    /// Topological order of `cycle_list`; on a configuration cycle this is
    /// the orderable prefix.
    sorted_cycle_list: Vec<ModuleId>,
    cycle_counter: u64,
    options: SchedulerOptions,
    // Pool before env: workers must join before the shared services drop.
    pool: Option<WorkerPool>,
    env: Arc<WorkerEnv>,
}

impl Scheduler {
    pub fn new(options: SchedulerOptions) -> Self {
        let env = Arc::new(WorkerEnv {
            bus: Arc::new(MessageBus::new()),
            profiler: Arc::new(Profiler::new()),
            watchdog: Arc::new(Watchdog::spawn()),
            default_max_exec_time: options.default_max_exec_time,
        });

        Self {
            registry: ModuleRegistry::new(),
            access_graph: ChannelAccessGraph::new(),
            enabled: Vec::new(),
            valid: false,
            cycle_list: DirectedGraph::new(),
            sorted_cycle_list: Vec::new(),
            cycle_counter: 0,
            options,
            pool: None,
            env,
        }
    }

    /// Add a module to the registry. The module starts disabled; call
    /// [`enable_module`](Self::enable_module) to initialise it.
    pub fn register_module(
        &mut self,
        name: &str,
        affinity: ExecutionAffinity,
        max_exec_time: Option<Duration>,
        instance: Box<dyn Module>,
    ) -> Result<ModuleId> {
        if self.registry.contains_name(name) {
            return Err(ModflowError::DuplicateModule(name.to_string()));
        }
        let id = self
            .registry
            .insert(name, affinity, max_exec_time, instance);
        debug!(module = name, "module registered");
        Ok(id)
    }

    /// Look up a registered module by name.
    pub fn module_id(&self, name: &str) -> Option<ModuleId> {
        self.registry.id_of(name)
    }

    /// Run the module's `init` and add it to the enabled set.
    ///
    /// An init fault (error or panic) is contained and leaves the module
    /// disabled.
    pub fn enable_module(&mut self, id: ModuleId) -> Result<()> {
        let slot = self
            .registry
            .get(id)
            .ok_or_else(|| ModflowError::UnknownModule(format!("id {}", id.index())))?
            .clone();

        if self.enabled.contains(&id) {
            return Ok(());
        }

        if !slot.run_init() {
            return Err(ModflowError::ModuleInit {
                module: slot.name().to_string(),
                message: "init raised a fault; module stays disabled".to_string(),
            });
        }

        info!(module = slot.name(), "module enabled");
        self.enabled.push(id);
        self.invalidate();
        Ok(())
    }

    /// Run the module's `shutdown`, drop its channel declarations and
    /// remove it from the enabled set.
    pub fn disable_module(&mut self, id: ModuleId) -> Result<()> {
        let slot = self
            .registry
            .get(id)
            .ok_or_else(|| ModflowError::UnknownModule(format!("id {}", id.index())))?
            .clone();

        let Some(pos) = self.enabled.iter().position(|&e| e == id) else {
            return Ok(());
        };

        slot.run_shutdown();
        self.enabled.remove(pos);
        self.access_graph.remove_module(id);
        self.invalidate();
        info!(module = slot.name(), "module disabled");
        Ok(())
    }

    /// Disable every enabled module, in reverse enable order.
    pub fn disable_all(&mut self) {
        let enabled: Vec<ModuleId> = self.enabled.iter().rev().copied().collect();
        for id in enabled {
            // Ids in the enabled set always resolve.
            let _ = self.disable_module(id);
        }
    }

    /// Declare that `id` reads `channel` with the given priority.
    pub fn declare_read(&mut self, id: ModuleId, channel: &str, priority: i32) -> Result<()> {
        self.check_known(id)?;
        self.access_graph.read_channel(channel, id, priority);
        self.invalidate();
        Ok(())
    }

    /// Declare that `id` writes `channel` with the given priority.
    pub fn declare_write(&mut self, id: ModuleId, channel: &str, priority: i32) -> Result<()> {
        self.check_known(id)?;
        self.access_graph.write_channel(channel, id, priority);
        self.invalidate();
        Ok(())
    }

    fn check_known(&self, id: ModuleId) -> Result<()> {
        if self.registry.get(id).is_none() {
            return Err(ModflowError::UnknownModule(format!("id {}", id.index())));
        }
        Ok(())
    }

    /// Mark the execution order stale. The next cycle recomputes it.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Run one cycle: swap the message queues, revalidate if needed, then
    /// execute every enabled module in dependency order.
    pub fn cycle(&mut self) {
        self.env.bus.swap_queues();
        self.cycle_counter += 1;
        self.ensure_valid();

        if self.options.multithreading && self.options.num_threads >= 1 {
            self.cycle_multi_threaded();
        } else {
            self.cycle_single_threaded();
        }
    }

    /// Number of completed `cycle()` calls.
    pub fn cycle_counter(&self) -> u64 {
        self.cycle_counter
    }

    /// Module names in the order they would execute, revalidating first.
    pub fn execution_order(&mut self) -> Vec<ModuleName> {
        self.ensure_valid();
        self.sorted_cycle_list
            .iter()
            .filter_map(|&id| self.registry.name_of(id))
            .map(str::to_string)
            .collect()
    }

    /// Snapshot of the canonical dependency graph with display names.
    pub fn export_graph(&mut self, remove_transitive: bool) -> GraphExport {
        self.ensure_valid();
        let registry = &self.registry;
        GraphExport::from_graph(
            &self.cycle_list,
            |id| registry.name_of(id).unwrap_or("?").to_string(),
            remove_transitive,
        )
    }

    pub fn message_bus(&self) -> Arc<MessageBus> {
        self.env.bus.clone()
    }

    pub fn profiler(&self) -> &Profiler {
        self.env.profiler.as_ref()
    }

    pub fn watchdog(&self) -> &Watchdog {
        self.env.watchdog.as_ref()
    }

    /// Recompile declarations into the canonical graph and sort it.
    fn ensure_valid(&mut self) {
        if self.valid {
            return;
        }

        let mut graph = self.access_graph.generate_dag();

        // Restrict to the enabled set; declarations of disabled or not yet
        // enabled modules must not order anyone.
        let enabled: BTreeSet<ModuleId> = self.enabled.iter().copied().collect();
        let nodes: Vec<ModuleId> = graph.nodes().collect();
        for node in nodes {
            if !enabled.contains(&node) {
                graph.remove_node(node);
                graph.remove_edges_from(node);
            }
        }
        for &id in &self.enabled {
            graph.node(id);
        }

        let mut sorted = Vec::new();
        if !graph.topo_sort(&mut sorted) {
            error!(
                ordered = sorted.len(),
                enabled = self.enabled.len(),
                "configuration cycle in channel declarations; continuing with partial execution order"
            );
        }

        self.cycle_list = graph;
        self.sorted_cycle_list = sorted;
        self.valid = true;
        debug!(
            modules = self.sorted_cycle_list.len(),
            "execution order rebuilt"
        );
    }

    fn cycle_single_threaded(&self) {
        for &id in &self.sorted_cycle_list {
            if let Some(slot) = self.registry.get(id) {
                execute_module(&self.env, slot, self.cycle_counter);
            }
        }
    }

    fn cycle_multi_threaded(&mut self) {
        // The working graph covers only the orderable prefix, so it is
        // acyclic and the cycle always terminates.
        let in_order: BTreeSet<ModuleId> = self.sorted_cycle_list.iter().copied().collect();

        let mut working = DirectedGraph::new();
        for &id in &self.sorted_cycle_list {
            working.node(id);
        }
        for (to, incoming) in self.cycle_list.iter() {
            if !in_order.contains(&to) {
                continue;
            }
            for &from in incoming {
                if in_order.contains(&from) {
                    working.edge(from, to);
                }
            }
        }

        let mut modules = BTreeMap::new();
        for &id in &self.sorted_cycle_list {
            if let Some(slot) = self.registry.get(id) {
                modules.insert(id, slot.clone());
            }
        }

        let cycle = self.cycle_counter;
        let env = self.env.clone();
        let pool = self
            .pool
            .get_or_insert_with(|| WorkerPool::spawn(self.options.num_threads, env.clone()));
        pool.run_cycle(&env, working, modules, cycle);
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.disable_all();
        self.env.profiler.flush();
    }
}
