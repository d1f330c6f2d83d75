// src/sched/watchdog.rs

//! Execution time watchdog.
//!
//! A maintenance thread samples the modules currently executing and logs an
//! error when one has exceeded its time limit. The watchdog is purely
//! observational: it never kills, cancels or preempts anything, and it
//! warns at most once per module execution.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use tracing::error;

const SAMPLE_INTERVAL: Duration = Duration::from_millis(20);

struct WatchEntry {
    module: String,
    begin: Instant,
    limit: Duration,
    barked: bool,
}

struct Shared {
    /// One entry per thread currently executing a module under a limit.
    entries: Mutex<HashMap<ThreadId, WatchEntry>>,
    running: AtomicBool,
    barks: AtomicU64,
}

pub struct Watchdog {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Start the sampling thread.
    pub fn spawn() -> Self {
        let shared = Arc::new(Shared {
            entries: Mutex::new(HashMap::new()),
            running: AtomicBool::new(true),
            barks: AtomicU64::new(0),
        });

        let sampler = shared.clone();
        let handle = thread::spawn(move || sample_loop(&sampler));

        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// Mark the calling thread as executing `module` with the given limit.
    pub fn begin_module(&self, module: &str, limit: Duration) {
        let mut entries = self
            .shared
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            thread::current().id(),
            WatchEntry {
                module: module.to_string(),
                begin: Instant::now(),
                limit,
                barked: false,
            },
        );
    }

    /// Clear the calling thread's entry. No-op if none was set.
    pub fn end_module(&self) {
        let mut entries = self
            .shared
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        entries.remove(&thread::current().id());
    }

    /// Number of limit violations reported so far.
    pub fn bark_count(&self) -> u64 {
        self.shared.barks.load(Ordering::Relaxed)
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn sample_loop(shared: &Shared) {
    while shared.running.load(Ordering::Acquire) {
        thread::sleep(SAMPLE_INTERVAL);

        let mut entries = shared
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for entry in entries.values_mut() {
            let elapsed = entry.begin.elapsed();
            if !entry.barked && elapsed > entry.limit {
                entry.barked = true;
                shared.barks.fetch_add(1, Ordering::Relaxed);
                error!(
                    module = %entry.module,
                    elapsed_ms = elapsed.as_millis() as u64,
                    limit_ms = entry.limit.as_millis() as u64,
                    "module exceeded its execution time limit"
                );
            }
        }
    }
}
