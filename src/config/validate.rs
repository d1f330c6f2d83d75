// src/config/validate.rs

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::warn;

use crate::config::model::{ConfigFile, ModuleSection, RawConfigFile, parse_duration};
use crate::errors::{ModflowError, Result};
use crate::graph::ChannelAccessGraph;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::ModflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        warn_on_declaration_cycle(&raw.module);
        Ok(ConfigFile::new_unchecked(raw.runtime, raw.module))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_modules(cfg)?;
    validate_runtime(cfg)?;
    validate_module_sections(cfg)?;
    Ok(())
}

fn ensure_has_modules(cfg: &RawConfigFile) -> Result<()> {
    if cfg.module.is_empty() {
        return Err(ModflowError::ConfigError(
            "config must contain at least one [module.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_runtime(cfg: &RawConfigFile) -> Result<()> {
    if cfg.runtime.multithreading && cfg.runtime.num_threads == 0 {
        return Err(ModflowError::ConfigError(
            "[runtime].num_threads must be >= 1 when multithreading is on (got 0)".to_string(),
        ));
    }

    if let Some(ref s) = cfg.runtime.max_exec_time {
        parse_duration(s).map_err(|e| {
            ModflowError::ConfigError(format!("[runtime].max_exec_time: {e}"))
        })?;
    }

    Ok(())
}

fn validate_module_sections(cfg: &RawConfigFile) -> Result<()> {
    for (name, module) in cfg.module.iter() {
        if let Some(ref s) = module.max_exec_time {
            parse_duration(s).map_err(|e| {
                ModflowError::ConfigError(format!("module '{name}' max_exec_time: {e}"))
            })?;
        }

        for decl in module.reads.iter().chain(module.writes.iter()) {
            if decl.channel.trim().is_empty() {
                return Err(ModflowError::ConfigError(format!(
                    "module '{name}' declares an access with an empty channel name"
                )));
            }
        }
    }
    Ok(())
}

/// Build the channel access graph for a set of module sections.
///
/// Shared between load-time cycle diagnostics here and the inspection
/// commands in the CLI.
pub fn channel_graph(modules: &BTreeMap<String, ModuleSection>) -> ChannelAccessGraph<&str> {
    let mut graph = ChannelAccessGraph::new();
    for (name, module) in modules {
        for decl in &module.writes {
            graph.write_channel(&decl.channel, name.as_str(), decl.priority);
        }
        for decl in &module.reads {
            graph.read_channel(&decl.channel, name.as_str(), decl.priority);
        }
    }
    graph
}

/// Report an unorderable declaration set at load time.
///
/// Deliberately a warning, not an error: the scheduler runs the orderable
/// prefix and keeps going, so a cyclic configuration must not abort
/// startup.
fn warn_on_declaration_cycle(modules: &BTreeMap<String, ModuleSection>) {
    let dag = channel_graph(modules).generate_dag();

    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in modules.keys() {
        graph.add_node(name.as_str());
    }
    for (to, incoming) in dag.iter() {
        for &from in incoming {
            graph.add_edge(from, to, ());
        }
    }

    if let Err(cycle) = toposort(&graph, None) {
        warn!(
            module = cycle.node_id(),
            "channel declarations cannot be fully ordered; execution will continue with a partial order"
        );
    }
}
