// tests/channel_access.rs

mod common;

use modflow::graph::ChannelAccessGraph;
use modflow::types::Permission;

#[test]
fn declarations_are_recorded_in_order() {
    common::init_tracing();

    let mut access = ChannelAccessGraph::new();
    access.write_channel("data", 1, 0);
    access.read_channel("data", 2, 0);

    let accessors = access.channel_accessors("data");
    assert_eq!(accessors.len(), 2);
    assert_eq!(accessors[0].module, 1);
    assert_eq!(accessors[0].permission, Permission::Write);
    assert_eq!(accessors[1].module, 2);
    assert_eq!(accessors[1].permission, Permission::Read);
}

#[test]
fn repeated_declarations_are_absorbed() {
    let mut access = ChannelAccessGraph::new();
    access.write_channel("data", 1, 0);
    access.write_channel("data", 1, 5);
    access.read_channel("data", 1, 2);

    let accessors = access.channel_accessors("data");
    assert_eq!(accessors.len(), 1);
    assert_eq!(accessors[0].permission, Permission::Write);
    assert_eq!(accessors[0].priority, 0);
}

#[test]
fn has_readers_ignores_writers() {
    let mut access = ChannelAccessGraph::new();
    access.write_channel("data", 1, 0);
    assert!(!access.has_readers("data"));
    assert!(!access.has_readers("unknown"));

    access.read_channel("data", 2, 0);
    assert!(access.has_readers("data"));
}

#[test]
fn pipeline_produces_writer_before_reader_order() {
    // 1 writes a, {2, 3} read a and write b, 4 reads b.
    let mut access = ChannelAccessGraph::new();
    access.write_channel("a", 1, 0);
    access.read_channel("a", 2, 0);
    access.read_channel("a", 3, 0);
    access.write_channel("b", 2, 0);
    access.write_channel("b", 3, 0);
    access.read_channel("b", 4, 0);

    let dag = access.generate_dag();
    let mut order = Vec::new();
    assert!(dag.topo_sort(&mut order));
    assert!(order == vec![1, 2, 3, 4] || order == vec![1, 3, 2, 4]);
}

#[test]
fn write_priorities_override_declaration_order() {
    let mut access = ChannelAccessGraph::new();
    access.write_channel("a", 1, 1);
    access.write_channel("a", 2, 2);
    access.read_channel("a", 3, 0);
    access.read_channel("a", 4, -1);

    let dag = access.generate_dag();
    let mut order = Vec::new();
    assert!(dag.topo_sort(&mut order));
    assert_eq!(order, vec![2, 1, 3, 4]);
}

#[test]
fn read_priorities_can_precede_writers() {
    let mut access = ChannelAccessGraph::new();
    access.write_channel("a", 1, 0);
    access.read_channel("a", 2, 2);
    access.read_channel("a", 3, 1);
    access.read_channel("a", 4, -1);

    let dag = access.generate_dag();
    let mut order = Vec::new();
    assert!(dag.topo_sort(&mut order));
    assert_eq!(order, vec![2, 3, 1, 4]);
}

#[test]
fn disjoint_channels_leave_modules_unordered() {
    let mut access = ChannelAccessGraph::new();
    access.write_channel("a", 1, 0);
    access.read_channel("a", 2, 0);
    access.write_channel("b", 3, 0);
    access.read_channel("b", 4, 0);

    let dag = access.generate_dag();
    assert!(dag.has_edge(1, 2));
    assert!(dag.has_edge(3, 4));
    assert!(!dag.has_edge(1, 3));
    assert!(!dag.has_edge(1, 4));
    assert!(!dag.has_edge(2, 3));
    assert!(!dag.has_edge(2, 4));
}

#[test]
fn higher_priority_writer_runs_first_regardless_of_declaration_order() {
    let mut access = ChannelAccessGraph::new();
    access.write_channel("a", 1, 1);
    access.write_channel("a", 2, 5);

    let dag = access.generate_dag();
    assert!(dag.has_edge(2, 1));
    assert!(!dag.has_edge(1, 2));

    let mut swapped = ChannelAccessGraph::new();
    swapped.write_channel("a", 1, 5);
    swapped.write_channel("a", 2, 1);

    let dag = swapped.generate_dag();
    assert!(dag.has_edge(1, 2));
    assert!(!dag.has_edge(2, 1));
}

#[test]
fn equal_priority_writers_stay_unordered() {
    let mut access = ChannelAccessGraph::new();
    access.write_channel("a", 1, 0);
    access.write_channel("a", 2, 0);

    let dag = access.generate_dag();
    assert!(!dag.has_edge(1, 2));
    assert!(!dag.has_edge(2, 1));

    let mut order = Vec::new();
    assert!(dag.topo_sort(&mut order));
    assert_eq!(order.len(), 2);
}

#[test]
fn remove_module_drops_its_declarations() {
    let mut access = ChannelAccessGraph::new();
    access.write_channel("a", 1, 0);
    access.read_channel("a", 2, 0);
    access.read_channel("b", 1, 0);

    access.remove_module(1);

    assert!(!access.is_reader_or_writer("a", 1));
    assert!(access.is_reader_or_writer("a", 2));
    assert!(access.channel_accessors("b").is_empty());

    let dag = access.generate_dag();
    assert!(!dag.contains_node(1));
}
