#![allow(dead_code)]

//! Scripted modules for exercising the scheduler in tests.

use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

use modflow::module::{CycleContext, Module};

/// One recorded `cycle` execution.
#[derive(Debug, Clone)]
pub struct ExecutionSpan {
    pub module: String,
    pub begin: Instant,
    pub end: Instant,
    pub cycle: u64,
    pub thread: ThreadId,
}

/// Shared recording sink for [`RecordingModule`]s.
pub type SpanLog = Arc<Mutex<Vec<ExecutionSpan>>>;

pub fn span_log() -> SpanLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Records every cycle execution; optionally sleeps to stretch the span.
pub struct RecordingModule {
    name: String,
    log: SpanLog,
    sleep: Option<Duration>,
}

impl RecordingModule {
    pub fn new(name: &str, log: &SpanLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            sleep: None,
        }
    }

    pub fn with_sleep(mut self, sleep: Duration) -> Self {
        self.sleep = Some(sleep);
        self
    }
}

impl Module for RecordingModule {
    fn cycle(&mut self, ctx: &CycleContext) -> anyhow::Result<()> {
        let begin = Instant::now();
        if let Some(sleep) = self.sleep {
            std::thread::sleep(sleep);
        }
        let end = Instant::now();

        self.log
            .lock()
            .expect("span log poisoned")
            .push(ExecutionSpan {
                module: self.name.clone(),
                begin,
                end,
                cycle: ctx.cycle,
                thread: std::thread::current().id(),
            });
        Ok(())
    }
}

/// Fails with `Err` in the selected phases.
#[derive(Default)]
pub struct FaultingModule {
    pub fail_init: bool,
    pub fail_cycle: bool,
}

impl Module for FaultingModule {
    fn init(&mut self) -> anyhow::Result<()> {
        if self.fail_init {
            anyhow::bail!("scripted init failure");
        }
        Ok(())
    }

    fn cycle(&mut self, _ctx: &CycleContext) -> anyhow::Result<()> {
        if self.fail_cycle {
            anyhow::bail!("scripted cycle failure");
        }
        Ok(())
    }
}

/// Panics in `cycle`.
pub struct PanickingModule;

impl Module for PanickingModule {
    fn cycle(&mut self, _ctx: &CycleContext) -> anyhow::Result<()> {
        panic!("scripted panic");
    }
}

/// Sleeps through every cycle; used to trip the watchdog.
pub struct SleepingModule {
    pub sleep: Duration,
}

impl Module for SleepingModule {
    fn cycle(&mut self, _ctx: &CycleContext) -> anyhow::Result<()> {
        std::thread::sleep(self.sleep);
        Ok(())
    }
}

/// Records `init:<name>` and `shutdown:<name>` events in order.
pub struct LifecycleModule {
    name: String,
    events: Arc<Mutex<Vec<String>>>,
}

impl LifecycleModule {
    pub fn new(name: &str, events: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            events: events.clone(),
        }
    }
}

impl Module for LifecycleModule {
    fn init(&mut self) -> anyhow::Result<()> {
        self.events
            .lock()
            .expect("event log poisoned")
            .push(format!("init:{}", self.name));
        Ok(())
    }

    fn cycle(&mut self, _ctx: &CycleContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn shutdown(&mut self) {
        self.events
            .lock()
            .expect("event log poisoned")
            .push(format!("shutdown:{}", self.name));
    }
}

/// Sends one payload on a topic every cycle.
pub struct SendingModule {
    pub topic: String,
    pub payload: String,
}

impl Module for SendingModule {
    fn cycle(&mut self, ctx: &CycleContext) -> anyhow::Result<()> {
        ctx.bus.send(&self.topic, &self.payload);
        Ok(())
    }
}

/// Records what it receives on a topic each cycle.
pub struct ReceivingModule {
    pub topic: String,
    pub received: Arc<Mutex<Vec<(u64, Vec<String>)>>>,
}

impl ReceivingModule {
    pub fn new(topic: &str) -> (Self, Arc<Mutex<Vec<(u64, Vec<String>)>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                topic: topic.to_string(),
                received: received.clone(),
            },
            received,
        )
    }
}

impl Module for ReceivingModule {
    fn cycle(&mut self, ctx: &CycleContext) -> anyhow::Result<()> {
        let messages = ctx.bus.receive(&self.topic);
        self.received
            .lock()
            .expect("receive log poisoned")
            .push((ctx.cycle, messages));
        Ok(())
    }
}
