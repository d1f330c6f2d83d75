// src/profiling.rs

//! Execution time profiling.
//!
//! The profiler collects timestamped begin/end marks per label (module
//! name). It is an explicit object handed to whoever needs it; nothing here
//! is global. `flush` logs a per-label summary and clears the collected
//! marks.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkKind {
    Begin,
    End,
}

#[derive(Debug, Clone)]
pub struct Mark {
    pub label: String,
    pub kind: MarkKind,
    pub at: Instant,
}

#[derive(Debug, Default)]
pub struct Profiler {
    marks: Mutex<Vec<Mark>>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_begin(&self, label: &str) {
        self.push(label, MarkKind::Begin);
    }

    pub fn mark_end(&self, label: &str) {
        self.push(label, MarkKind::End);
    }

    fn push(&self, label: &str, kind: MarkKind) {
        let mut marks = self.marks.lock().unwrap_or_else(PoisonError::into_inner);
        marks.push(Mark {
            label: label.to_string(),
            kind,
            at: Instant::now(),
        });
    }

    /// Snapshot of all marks collected so far, in recording order.
    pub fn records(&self) -> Vec<Mark> {
        self.marks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Log a per-label summary (runs, total and mean duration) and clear
    /// the collected marks. Called at scheduler shutdown.
    pub fn flush(&self) {
        let marks = std::mem::take(
            &mut *self.marks.lock().unwrap_or_else(PoisonError::into_inner),
        );
        if marks.is_empty() {
            return;
        }

        struct Summary {
            open: Option<Instant>,
            runs: u64,
            total: Duration,
        }

        let mut by_label: BTreeMap<String, Summary> = BTreeMap::new();
        for mark in marks {
            let entry = by_label.entry(mark.label).or_insert(Summary {
                open: None,
                runs: 0,
                total: Duration::ZERO,
            });
            match mark.kind {
                MarkKind::Begin => entry.open = Some(mark.at),
                MarkKind::End => {
                    if let Some(begin) = entry.open.take() {
                        entry.runs += 1;
                        entry.total += mark.at.duration_since(begin);
                    }
                }
            }
        }

        for (label, summary) in by_label {
            if summary.runs == 0 {
                continue;
            }
            let mean = summary.total / summary.runs as u32;
            info!(
                label,
                runs = summary.runs,
                total_us = summary.total.as_micros() as u64,
                mean_us = mean.as_micros() as u64,
                "profile summary"
            );
        }
    }
}
