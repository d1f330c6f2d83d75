// src/graph/export.rs

//! Read-only graph snapshots for inspection commands.

use std::io;

use crate::graph::DirectedGraph;
use crate::types::ModuleName;

/// A named snapshot of a dependency graph.
///
/// Edges are listed as `(from, to)`: `to` must not start before `from` has
/// finished.
#[derive(Debug, Clone)]
pub struct GraphExport {
    pub nodes: Vec<ModuleName>,
    pub edges: Vec<(ModuleName, ModuleName)>,
}

impl GraphExport {
    /// Snapshot a graph, mapping nodes to display names.
    ///
    /// With `remove_transitive` set, edges implied by longer paths are
    /// dropped first, which gives a much cleaner picture for dot rendering.
    pub fn from_graph<N, F>(
        graph: &DirectedGraph<N>,
        name_of: F,
        remove_transitive: bool,
    ) -> Self
    where
        N: Ord + Copy,
        F: Fn(N) -> ModuleName,
    {
        let mut graph = graph.clone();
        if remove_transitive {
            graph.remove_transitive_edges();
        }

        let nodes = graph.nodes().map(&name_of).collect();
        let mut edges = Vec::new();
        for (to, incoming) in graph.iter() {
            for &from in incoming {
                edges.push((name_of(from), name_of(to)));
            }
        }

        Self { nodes, edges }
    }
}

/// Write the snapshot in Graphviz dot format.
pub fn write_dot<W: io::Write>(export: &GraphExport, out: &mut W) -> io::Result<()> {
    writeln!(out, "digraph modflow {{")?;
    for node in &export.nodes {
        writeln!(out, "    \"{node}\";")?;
    }
    for (from, to) in &export.edges {
        writeln!(out, "    \"{from}\" -> \"{to}\";")?;
    }
    writeln!(out, "}}")
}
