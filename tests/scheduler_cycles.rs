// tests/scheduler_cycles.rs

mod common;

use std::sync::{Arc, Mutex};

use modflow::errors::ModflowError;
use modflow::module::ModuleId;
use modflow::sched::{Scheduler, SchedulerOptions};
use modflow::types::ExecutionAffinity;
use modflow_test_utils::modules::{
    FaultingModule, LifecycleModule, PanickingModule, ReceivingModule, RecordingModule,
    SendingModule, span_log,
};

fn single_threaded() -> Scheduler {
    Scheduler::new(SchedulerOptions::default())
}

fn register(
    sched: &mut Scheduler,
    name: &str,
    instance: Box<dyn modflow::module::Module>,
) -> ModuleId {
    let id = sched
        .register_module(name, ExecutionAffinity::WorkerThreadOnly, None, instance)
        .expect("registration failed");
    sched.enable_module(id).expect("enable failed");
    id
}

#[test]
fn modules_run_in_declaration_derived_order() {
    common::init_tracing();

    let log = span_log();
    let mut sched = single_threaded();

    // Register out of order; the channel declarations decide.
    let c = register(&mut sched, "c", Box::new(RecordingModule::new("c", &log)));
    let a = register(&mut sched, "a", Box::new(RecordingModule::new("a", &log)));
    let b = register(&mut sched, "b", Box::new(RecordingModule::new("b", &log)));

    sched.declare_write(a, "raw", 0).unwrap();
    sched.declare_read(b, "raw", 0).unwrap();
    sched.declare_write(b, "refined", 0).unwrap();
    sched.declare_read(c, "refined", 0).unwrap();

    sched.cycle();

    let names: Vec<String> = log
        .lock()
        .unwrap()
        .iter()
        .map(|span| span.module.clone())
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(sched.execution_order(), vec!["a", "b", "c"]);
}

#[test]
fn duplicate_names_are_rejected() {
    let mut sched = single_threaded();
    sched
        .register_module(
            "camera",
            ExecutionAffinity::WorkerThreadOnly,
            None,
            Box::new(FaultingModule::default()),
        )
        .unwrap();

    let err = sched
        .register_module(
            "camera",
            ExecutionAffinity::WorkerThreadOnly,
            None,
            Box::new(FaultingModule::default()),
        )
        .unwrap_err();
    assert!(matches!(err, ModflowError::DuplicateModule(name) if name == "camera"));
}

#[test]
fn cycle_faults_are_contained() {
    let log = span_log();
    let mut sched = single_threaded();

    register(
        &mut sched,
        "erroring",
        Box::new(FaultingModule {
            fail_cycle: true,
            ..Default::default()
        }),
    );
    register(&mut sched, "panicking", Box::new(PanickingModule));
    register(
        &mut sched,
        "steady",
        Box::new(RecordingModule::new("steady", &log)),
    );

    sched.cycle();
    sched.cycle();

    // The faulting modules never stop the steady one.
    let names: Vec<String> = log
        .lock()
        .unwrap()
        .iter()
        .map(|span| span.module.clone())
        .collect();
    assert_eq!(names, vec!["steady", "steady"]);
}

#[test]
fn cycle_counter_is_visible_to_modules() {
    let log = span_log();
    let mut sched = single_threaded();
    register(&mut sched, "m", Box::new(RecordingModule::new("m", &log)));

    assert_eq!(sched.cycle_counter(), 0);
    sched.cycle();
    sched.cycle();
    sched.cycle();
    assert_eq!(sched.cycle_counter(), 3);

    let cycles: Vec<u64> = log.lock().unwrap().iter().map(|span| span.cycle).collect();
    assert_eq!(cycles, vec![1, 2, 3]);
}

#[test]
fn disabling_a_module_rebuilds_the_order() {
    let log = span_log();
    let mut sched = single_threaded();

    let a = register(&mut sched, "a", Box::new(RecordingModule::new("a", &log)));
    let b = register(&mut sched, "b", Box::new(RecordingModule::new("b", &log)));
    sched.declare_write(a, "data", 0).unwrap();
    sched.declare_read(b, "data", 0).unwrap();

    sched.cycle();
    sched.disable_module(a).unwrap();
    sched.cycle();

    let names: Vec<String> = log
        .lock()
        .unwrap()
        .iter()
        .map(|span| span.module.clone())
        .collect();
    assert_eq!(names, vec!["a", "b", "b"]);
    assert_eq!(sched.execution_order(), vec!["b"]);
}

#[test]
fn failing_init_leaves_the_module_disabled() {
    let log = span_log();
    let mut sched = single_threaded();

    let bad = sched
        .register_module(
            "bad",
            ExecutionAffinity::WorkerThreadOnly,
            None,
            Box::new(FaultingModule {
                fail_init: true,
                ..Default::default()
            }),
        )
        .unwrap();
    register(&mut sched, "good", Box::new(RecordingModule::new("good", &log)));

    let err = sched.enable_module(bad).unwrap_err();
    assert!(matches!(err, ModflowError::ModuleInit { module, .. } if module == "bad"));

    sched.cycle();
    assert_eq!(sched.execution_order(), vec!["good"]);
}

#[test]
fn declaration_cycle_still_runs_the_orderable_prefix() {
    let log = span_log();
    let mut sched = single_threaded();

    let m1 = register(&mut sched, "m1", Box::new(RecordingModule::new("m1", &log)));
    let m2 = register(&mut sched, "m2", Box::new(RecordingModule::new("m2", &log)));
    register(
        &mut sched,
        "independent",
        Box::new(RecordingModule::new("independent", &log)),
    );

    // m1 and m2 each write what the other reads, with priorities that
    // force both edges.
    sched.declare_write(m1, "x", 0).unwrap();
    sched.declare_read(m2, "x", 0).unwrap();
    sched.declare_write(m2, "y", 0).unwrap();
    sched.declare_read(m1, "y", 0).unwrap();

    sched.cycle();

    let names: Vec<String> = log
        .lock()
        .unwrap()
        .iter()
        .map(|span| span.module.clone())
        .collect();
    assert_eq!(names, vec!["independent"]);
}

#[test]
fn messages_arrive_one_cycle_later() {
    let mut sched = single_threaded();

    let (receiver, received) = ReceivingModule::new("telemetry");
    let r = register(&mut sched, "receiver", Box::new(receiver));
    let s = register(
        &mut sched,
        "sender",
        Box::new(SendingModule {
            topic: "telemetry".to_string(),
            payload: "ping".to_string(),
        }),
    );
    sched.declare_write(s, "telemetry", 0).unwrap();
    sched.declare_read(r, "telemetry", 0).unwrap();

    sched.cycle();
    sched.cycle();
    sched.cycle();

    let received = received.lock().unwrap().clone();
    assert_eq!(
        received,
        vec![
            (1, vec![]),
            (2, vec!["ping".to_string()]),
            (3, vec!["ping".to_string()]),
        ]
    );
}

#[test]
fn shutdown_runs_in_reverse_enable_order() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let mut sched = single_threaded();

    register(&mut sched, "a", Box::new(LifecycleModule::new("a", &events)));
    register(&mut sched, "b", Box::new(LifecycleModule::new("b", &events)));

    sched.disable_all();

    let events = events.lock().unwrap().clone();
    assert_eq!(events, vec!["init:a", "init:b", "shutdown:b", "shutdown:a"]);
}

#[test]
fn dropping_the_scheduler_shuts_modules_down() {
    let events = Arc::new(Mutex::new(Vec::new()));
    {
        let mut sched = single_threaded();
        register(&mut sched, "m", Box::new(LifecycleModule::new("m", &events)));
    }

    let events = events.lock().unwrap().clone();
    assert_eq!(events, vec!["init:m", "shutdown:m"]);
}

#[test]
fn exported_graph_reflects_declarations() {
    let log = span_log();
    let mut sched = single_threaded();

    let a = register(&mut sched, "a", Box::new(RecordingModule::new("a", &log)));
    let b = register(&mut sched, "b", Box::new(RecordingModule::new("b", &log)));
    sched.declare_write(a, "data", 0).unwrap();
    sched.declare_read(b, "data", 0).unwrap();

    let export = sched.export_graph(false);
    assert_eq!(export.nodes, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(export.edges, vec![("a".to_string(), "b".to_string())]);
}
