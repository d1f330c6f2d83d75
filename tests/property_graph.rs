// tests/property_graph.rs

use std::collections::BTreeMap;

use proptest::prelude::*;

use modflow::graph::{ChannelAccessGraph, DirectedGraph};

/// Arbitrary edge list over a small node space. May contain cycles.
fn edges() -> impl Strategy<Value = Vec<(u8, u8)>> {
    proptest::collection::vec((0u8..12, 0u8..12), 0..40)
}

fn graph_from(edges: &[(u8, u8)]) -> DirectedGraph<u8> {
    let mut graph = DirectedGraph::new();
    for &(from, to) in edges {
        graph.edge(from, to);
    }
    graph
}

proptest! {
    /// Layered declarations (module `i` writes its own channel, readers only
    /// read channels of lower-numbered modules) can always be fully ordered,
    /// and the order respects every derived edge.
    #[test]
    fn layered_declarations_always_order(
        n in 2usize..8,
        seeds in proptest::collection::vec(any::<usize>(), 0..24),
    ) {
        let mut access = ChannelAccessGraph::new();
        for i in 0..n {
            access.write_channel(&format!("ch_{i}"), i, 0);
        }
        for seed in seeds {
            let reader = 1 + seed % (n - 1);
            let source = (seed / 7) % reader;
            access.read_channel(&format!("ch_{source}"), reader, 0);
        }

        let dag = access.generate_dag();
        prop_assert!(!dag.has_cycle());

        let mut order = Vec::new();
        prop_assert!(dag.topo_sort(&mut order));

        let position: BTreeMap<usize, usize> = order
            .iter()
            .enumerate()
            .map(|(pos, &module)| (module, pos))
            .collect();
        for (to, incoming) in dag.iter() {
            for &from in incoming {
                prop_assert!(position[&from] < position[&to]);
            }
        }
    }

    /// `topo_sort` succeeds exactly when the graph is acyclic, and a
    /// successful sort covers every node and respects every edge.
    #[test]
    fn topo_sort_agrees_with_cycle_detection(edges in edges()) {
        let graph = graph_from(&edges);

        let mut order = Vec::new();
        let sorted = graph.topo_sort(&mut order);
        prop_assert_eq!(sorted, !graph.has_cycle());

        if sorted {
            prop_assert_eq!(order.len(), graph.node_count());
            let position: BTreeMap<u8, usize> = order
                .iter()
                .enumerate()
                .map(|(pos, &node)| (node, pos))
                .collect();
            for (to, incoming) in graph.iter() {
                for &from in incoming {
                    prop_assert!(position[&from] < position[&to]);
                }
            }
        }
    }

    /// Removing transitive edges never changes reachability.
    #[test]
    fn transitive_reduction_preserves_reachability(edges in edges()) {
        // Keep only forward edges so the graph is acyclic.
        let forward: Vec<(u8, u8)> = edges
            .into_iter()
            .filter(|&(from, to)| from < to)
            .collect();
        let original = graph_from(&forward);

        let mut reduced = original.clone();
        reduced.remove_transitive_edges();

        let nodes: Vec<u8> = original.nodes().collect();
        for &from in &nodes {
            for &to in &nodes {
                prop_assert_eq!(
                    original.has_path(from, to),
                    reduced.has_path(from, to),
                    "reachability {} -> {} changed", from, to
                );
            }
        }
    }
}
