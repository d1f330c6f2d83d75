// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod messaging;
pub mod module;
pub mod profiling;
pub mod sched;
pub mod types;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;

use crate::cli::{CliArgs, Command};
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::config::validate::channel_graph;
use crate::graph::{DirectedGraph, GraphExport, write_dot};

/// High-level entry point used by `main.rs`.
///
/// The binary only inspects configurations: it compiles the channel
/// declarations into a dependency graph and prints it. Module code is
/// never instantiated here.
pub fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    match args.command {
        Command::Plan => print_plan(&cfg),
        Command::Dot { keep_transitive } => {
            let dag = declaration_dag(&cfg);
            let export = GraphExport::from_graph(&dag, |n| n.to_string(), !keep_transitive);
            let stdout = std::io::stdout();
            write_dot(&export, &mut stdout.lock())?;
        }
    }

    Ok(())
}

/// Dependency graph over module names, straight from the declarations.
fn declaration_dag(cfg: &ConfigFile) -> DirectedGraph<&str> {
    let mut dag = channel_graph(&cfg.module).generate_dag();
    for name in cfg.module.keys() {
        dag.node(name.as_str());
    }
    dag
}

/// Plan output: module details, then the resolved execution order.
fn print_plan(cfg: &ConfigFile) {
    let dag = declaration_dag(cfg);

    let mut order = Vec::new();
    let complete = dag.topo_sort(&mut order);

    // after-map: module -> modules that must finish before it.
    let mut after: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (to, incoming) in dag.iter() {
        after.insert(to, incoming.iter().copied().collect());
    }

    println!("modflow plan");
    println!("  runtime.multithreading = {}", cfg.runtime.multithreading);
    println!("  runtime.num_threads = {}", cfg.runtime.num_threads);
    if let Some(ref t) = cfg.runtime.max_exec_time {
        println!("  runtime.max_exec_time = {t}");
    }
    println!();

    println!("modules ({}):", cfg.module.len());
    for (name, module) in cfg.module.iter() {
        println!("  - {name}");
        println!("      affinity: {:?}", module.affinity);
        if let Some(ref t) = module.max_exec_time {
            println!("      max_exec_time: {t}");
        }
        if !module.reads.is_empty() {
            let reads: Vec<String> = module
                .reads
                .iter()
                .map(|d| format!("{} (prio {})", d.channel, d.priority))
                .collect();
            println!("      reads: {:?}", reads);
        }
        if !module.writes.is_empty() {
            let writes: Vec<String> = module
                .writes
                .iter()
                .map(|d| format!("{} (prio {})", d.channel, d.priority))
                .collect();
            println!("      writes: {:?}", writes);
        }
    }
    println!();

    println!("execution order ({} of {} modules):", order.len(), cfg.module.len());
    for name in &order {
        let deps = after.get(name).map(Vec::as_slice).unwrap_or(&[]);
        if deps.is_empty() {
            println!("  - {name}");
        } else {
            println!("  - {name} (after: {})", deps.join(", "));
        }
    }
    if !complete {
        println!(
            "  ({} modules not orderable due to a declaration cycle)",
            cfg.module.len() - order.len()
        );
    }

    debug!("plan complete (no execution)");
}
