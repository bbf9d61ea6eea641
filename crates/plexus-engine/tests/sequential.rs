//! Integration test: sequential links and group bookkeeping.
//!
//! Sequential links read the producer's live value, refuse cycles, and
//! keep every container's (master, depth) pair consistent through any
//! sequence of connects, disconnects and container drops.

use plexus_core::{Discipline, LinkError, LinkId, PropertyDef, Status, Value};
use plexus_engine::{Container, Runtime};
use plexus_test_utils::{assert_group_invariants, chain, consumer, producer};
use proptest::prelude::*;

#[test]
fn reads_live_value_without_publishing() {
    let rt = Runtime::default();
    let a = producer(&rt, "A", 0);
    let b = consumer(&rt, "B", 0);
    rt.connect(&a, "out", &b, "in", Discipline::Sequential)
        .unwrap();
    assert!(b.is_sequential("in"));

    a.set("out", 5).unwrap();
    let report = b.read_inputs();
    assert_eq!(report.transferred, 1);
    assert_eq!(b.get("in").unwrap(), Value::Int(5));
}

#[test]
fn chain_depths_follow_link_order() {
    let rt = Runtime::default();
    let nodes = chain(&rt, 4, Discipline::Sequential);
    let ids: Vec<_> = nodes.iter().map(Container::id).collect();
    for (depth, node) in nodes.iter().enumerate() {
        assert_eq!(node.master(), Some(ids[0]));
        assert_eq!(node.depth(), Some(depth));
    }
    assert!(nodes[0].is_group_master());
    assert_eq!(
        nodes[2].group_members_by_depth(),
        ids.iter().map(|id| vec![*id]).collect::<Vec<_>>()
    );
    assert!(rt.are_synchronized(&ids));
    assert_group_invariants(&rt);
}

#[test]
fn cycle_is_rejected_without_side_effects() {
    let rt = Runtime::default();
    let nodes = chain(&rt, 3, Discipline::Sequential);
    nodes[0]
        .add_property(PropertyDef::input("back", 0))
        .unwrap();
    let links_before = rt.links();
    let groups_before = nodes[0].group_members_by_depth();

    let err = rt
        .connect(&nodes[2], "out", &nodes[0], "back", Discipline::Sequential)
        .unwrap_err();
    assert_eq!(
        err,
        LinkError::SequentialCycle {
            source: nodes[2].id(),
            destination: nodes[0].id(),
        }
    );
    assert_eq!(Status::from(&err), Status::SequentialCycle);
    assert_eq!(nodes[2].last_error(), Some(err.to_string()));
    assert_eq!(rt.links(), links_before);
    assert_eq!(nodes[0].group_members_by_depth(), groups_before);

    // The same edge is fine when it does not take part in the ordering.
    rt.connect(&nodes[2], "out", &nodes[0], "back", Discipline::Asynchronous)
        .unwrap();
    assert_group_invariants(&rt);
}

#[test]
fn dropping_middle_of_chain_splits_group() {
    let rt = Runtime::default();
    let mut nodes = chain(&rt, 4, Discipline::Sequential);
    let ids: Vec<_> = nodes.iter().map(Container::id).collect();
    drop(nodes.remove(1));

    assert_eq!(rt.master_of(ids[0]), Some(ids[0]));
    assert_eq!(rt.master_of(ids[2]), Some(ids[2]));
    assert_eq!(rt.master_of(ids[3]), Some(ids[2]));
    assert_eq!(rt.depth_of(ids[3]), Some(1));
    assert_eq!(rt.master_of(ids[1]), None);
    assert_group_invariants(&rt);
}

#[test]
fn merge_keeps_smaller_master() {
    let rt = Runtime::default();
    let first = chain(&rt, 2, Discipline::Sequential);
    let second = chain(&rt, 2, Discipline::Sequential);
    let sink = consumer(&rt, "sink", 0);
    sink.add_property(PropertyDef::input("in2", 0)).unwrap();

    rt.connect(&second[1], "out", &sink, "in", Discipline::Sequential)
        .unwrap();
    rt.connect(&first[1], "out", &sink, "in2", Discipline::Sequential)
        .unwrap();
    for node in first.iter().chain(second.iter()).chain([&sink]) {
        assert_eq!(node.master(), Some(first[0].id()));
    }
    assert_eq!(sink.depth(), Some(2));
    assert_group_invariants(&rt);
}

#[test]
fn unrelated_producer_stays_alone() {
    let rt = Runtime::default();
    let a = producer(&rt, "A", 0);
    assert!(a.is_group_master());
    assert_eq!(a.depth(), Some(0));
    assert_eq!(a.group_members_by_depth(), vec![vec![a.id()]]);
}

// ── Random wiring ───────────────────────────────────────────────────

const NODES: usize = 6;
const INPUTS: [&str; 2] = ["in0", "in1"];

#[derive(Clone, Debug)]
enum Op {
    Connect {
        source: usize,
        destination: usize,
        input: usize,
        discipline: Discipline,
    },
    Disconnect(usize),
}

fn discipline() -> impl Strategy<Value = Discipline> {
    prop_oneof![
        Just(Discipline::Asynchronous),
        Just(Discipline::Synchronous),
        Just(Discipline::Sequential),
        Just(Discipline::Sequential),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..NODES, 0..NODES, 0..INPUTS.len(), discipline()).prop_map(
            |(source, destination, input, discipline)| Op::Connect {
                source,
                destination,
                input,
                discipline,
            }
        ),
        1 => any::<usize>().prop_map(Op::Disconnect),
    ]
}

fn node(rt: &Runtime, i: usize) -> Container {
    let c = rt.create_container(format!("n{i}"));
    c.add_property(PropertyDef::output("out", 0)).unwrap();
    for input in INPUTS {
        c.add_property(PropertyDef::input(input, 0)).unwrap();
    }
    c
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn wiring_preserves_group_and_link_invariants(ops in prop::collection::vec(op(), 1..48)) {
        let rt = Runtime::default();
        let nodes: Vec<Container> = (0..NODES).map(|i| node(&rt, i)).collect();
        let mut live: Vec<LinkId> = Vec::new();

        for op in ops {
            match op {
                Op::Connect { source, destination, input, discipline } => {
                    let before = rt.links();
                    match rt.connect(&nodes[source], "out", &nodes[destination], INPUTS[input], discipline) {
                        Ok(id) => live.push(id),
                        Err(_) => {
                            prop_assert_eq!(rt.links(), before);
                        }
                    }
                }
                Op::Disconnect(k) => {
                    if !live.is_empty() {
                        let id = live.remove(k % live.len());
                        prop_assert!(rt.disconnect(id));
                    }
                }
            }

            if let Err(violation) = rt.check_group_invariants() {
                prop_assert!(false, "{}", violation);
            }
            let links = rt.links();
            prop_assert_eq!(links.len(), live.len());
            for (i, a) in links.iter().enumerate() {
                prop_assert!(a.source != a.destination);
                for b in &links[i + 1..] {
                    prop_assert!(
                        (a.destination, &a.destination_property)
                            != (b.destination, &b.destination_property),
                        "input fed twice: {} and {}", a, b
                    );
                }
            }
        }
    }
}
