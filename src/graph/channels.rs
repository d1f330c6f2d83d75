// src/graph/channels.rs

//! Channel access declarations and their compilation into a dependency graph.
//!
//! Modules do not declare dependencies on each other directly. They declare
//! read or write access to named channels, each with a priority, and the
//! ordering between modules is derived pairwise per channel:
//!
//! - different priorities: the higher-priority accessor runs first
//! - equal priorities, writer and reader: the writer runs first
//! - equal priorities, equal permission: no edge (the relative order of two
//!   equal-priority writers, or two readers, is unspecified)

use std::collections::BTreeMap;

use crate::graph::DirectedGraph;
use crate::types::{ChannelName, Permission};

/// One module's declared access to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access<M> {
    pub module: M,
    pub permission: Permission,
    pub priority: i32,
}

/// Records which module accesses which channel, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ChannelAccessGraph<M: Ord + Copy> {
    /// channel -> accessors in declaration order.
    data: BTreeMap<ChannelName, Vec<Access<M>>>,
}

impl<M: Ord + Copy> ChannelAccessGraph<M> {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
        }
    }

    /// Declare read access. A repeated declaration for the same module and
    /// channel is ignored, whichever permission it carries.
    pub fn read_channel(&mut self, channel: &str, module: M, priority: i32) {
        if !self.is_reader_or_writer(channel, module) {
            self.data.entry(channel.to_string()).or_default().push(Access {
                module,
                permission: Permission::Read,
                priority,
            });
        }
    }

    /// Declare write access. A repeated declaration for the same module and
    /// channel is ignored, whichever permission it carries.
    pub fn write_channel(&mut self, channel: &str, module: M, priority: i32) {
        if !self.is_reader_or_writer(channel, module) {
            self.data.entry(channel.to_string()).or_default().push(Access {
                module,
                permission: Permission::Write,
                priority,
            });
        }
    }

    /// Whether the module already declared any access to the channel.
    pub fn is_reader_or_writer(&self, channel: &str, module: M) -> bool {
        self.data
            .get(channel)
            .is_some_and(|accessors| accessors.iter().any(|a| a.module == module))
    }

    /// Accessors of a channel in declaration order. Empty if unknown.
    pub fn channel_accessors(&self, channel: &str) -> &[Access<M>] {
        self.data.get(channel).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_readers(&self, channel: &str) -> bool {
        self.data.get(channel).is_some_and(|accessors| {
            accessors.iter().any(|a| a.permission == Permission::Read)
        })
    }

    /// Drop every declaration made by `module`. Channels left without
    /// accessors are removed.
    pub fn remove_module(&mut self, module: M) {
        for accessors in self.data.values_mut() {
            accessors.retain(|a| a.module != module);
        }
        self.data.retain(|_, accessors| !accessors.is_empty());
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Compile the declarations into a dependency graph.
    ///
    /// Edges are derived pairwise per channel; see the module docs for the
    /// rules. The result is not guaranteed to be acyclic: conflicting
    /// priorities across channels can produce cycles, which the caller
    /// detects via `topo_sort`.
    pub fn generate_dag(&self) -> DirectedGraph<M> {
        let mut dag = DirectedGraph::new();

        for accessors in self.data.values() {
            for (i, a1) in accessors.iter().enumerate() {
                for a2 in &accessors[i + 1..] {
                    if a2.priority > a1.priority {
                        dag.edge(a2.module, a1.module);
                    } else if a1.priority > a2.priority {
                        dag.edge(a1.module, a2.module);
                    } else {
                        let w1 = a1.permission == Permission::Write;
                        let w2 = a2.permission == Permission::Write;

                        if w1 && !w2 {
                            dag.edge(a1.module, a2.module);
                        } else if !w1 && w2 {
                            dag.edge(a2.module, a1.module);
                        }
                        // Same priority and same permission: leave unordered.
                    }
                }
            }
        }

        dag
    }

    /// Read-only view of (channel, accessors) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Access<M>])> {
        self.data
            .iter()
            .map(|(channel, accessors)| (channel.as_str(), accessors.as_slice()))
    }
}
