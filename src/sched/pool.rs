// src/sched/pool.rs

//! Worker pool for multithreaded cycles.
//!
//! One mutex and one condvar guard the working graph, the slot map and the
//! remaining counter. Pool workers block until a free node they may take
//! appears; the thread driving the cycle joins in as worker 0 and returns
//! once the counter hits zero. Module bodies always run with the lock
//! released.
//!
//! Affinity split: worker 0 takes only `MainThreadOnly` modules, pool
//! workers only `WorkerThreadOnly` ones.

use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::graph::DirectedGraph;
use crate::messaging::MessageBus;
use crate::module::{CycleContext, ModuleId, ModuleSlot};
use crate::profiling::Profiler;
use crate::sched::Watchdog;
use crate::types::ExecutionAffinity;

/// Shared services a worker needs to execute one module.
pub(crate) struct WorkerEnv {
    pub bus: Arc<MessageBus>,
    pub profiler: Arc<Profiler>,
    pub watchdog: Arc<Watchdog>,
    pub default_max_exec_time: Option<Duration>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerRole {
    /// The thread that called `cycle`.
    Main,
    /// A background pool thread.
    Pool,
}

fn role_accepts(role: WorkerRole, affinity: ExecutionAffinity) -> bool {
    match role {
        WorkerRole::Main => affinity == ExecutionAffinity::MainThreadOnly,
        WorkerRole::Pool => affinity == ExecutionAffinity::WorkerThreadOnly,
    }
}

pub(crate) struct PoolState {
    /// Dependency graph consumed during the current cycle.
    working: DirectedGraph<ModuleId>,
    /// Slots for every node of the working graph.
    modules: BTreeMap<ModuleId, Arc<ModuleSlot>>,
    /// Nodes not yet finished this cycle.
    remaining: usize,
    running: bool,
    cycle: u64,
}

pub(crate) struct PoolShared {
    state: Mutex<PoolState>,
    cv: Condvar,
}

impl PoolShared {
    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) struct WorkerPool {
    shared: Arc<PoolShared>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `num_threads` background workers.
    pub fn spawn(num_threads: usize, env: Arc<WorkerEnv>) -> Self {
        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                working: DirectedGraph::new(),
                modules: BTreeMap::new(),
                remaining: 0,
                running: true,
                cycle: 0,
            }),
            cv: Condvar::new(),
        });

        let handles = (0..num_threads)
            .map(|_| {
                let shared = shared.clone();
                let env = env.clone();
                thread::spawn(move || worker_loop(&shared, &env, WorkerRole::Pool))
            })
            .collect();

        Self { shared, handles }
    }

    /// Run one cycle over `working`, blocking until every node finished.
    ///
    /// The calling thread participates as worker 0 and is the only one that
    /// executes `MainThreadOnly` modules.
    pub fn run_cycle(
        &self,
        env: &WorkerEnv,
        working: DirectedGraph<ModuleId>,
        modules: BTreeMap<ModuleId, Arc<ModuleSlot>>,
        cycle: u64,
    ) {
        {
            let mut state = self.shared.lock_state();
            state.remaining = working.node_count();
            state.working = working;
            state.modules = modules;
            state.cycle = cycle;
        }
        self.shared.cv.notify_all();

        worker_loop(&self.shared, env, WorkerRole::Main);
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        {
            let mut state = self.shared.lock_state();
            state.running = false;
        }
        self.shared.cv.notify_all();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(shared: &PoolShared, env: &WorkerEnv, role: WorkerRole) {
    let mut state = shared.lock_state();

    loop {
        if !state.running {
            return;
        }
        if role == WorkerRole::Main && state.remaining == 0 {
            return;
        }

        let free = {
            let PoolState {
                working, modules, ..
            } = &mut *state;
            working.get_free_matching(|id| {
                modules
                    .get(&id)
                    .is_some_and(|slot| role_accepts(role, slot.affinity()))
            })
        };

        match free {
            Some(id) => {
                state.working.remove_node(id);
                let slot = state.modules.get(&id).cloned();
                let cycle = state.cycle;
                drop(state);

                if let Some(slot) = slot {
                    execute_module(env, &slot, cycle);
                }

                state = shared.lock_state();
                state.working.remove_edges_from(id);
                state.remaining -= 1;
                shared.cv.notify_all();
            }
            None => {
                state = shared
                    .cv
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
    }
}

/// Execute one module cycle with watchdog and profiler bracketing.
///
/// Faults are contained inside `ModuleSlot::run_cycle`; this never fails.
pub(crate) fn execute_module(env: &WorkerEnv, slot: &ModuleSlot, cycle: u64) {
    let limit = slot.max_exec_time().or(env.default_max_exec_time);
    if let Some(limit) = limit {
        env.watchdog.begin_module(slot.name(), limit);
    }
    env.profiler.mark_begin(slot.name());

    debug!(module = slot.name(), cycle, "running module");
    let ctx = CycleContext {
        bus: env.bus.clone(),
        cycle,
    };
    slot.run_cycle(&ctx);

    env.profiler.mark_end(slot.name());
    env.watchdog.end_module();
}
