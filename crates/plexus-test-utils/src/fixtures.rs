//! Reusable container fixtures.
//!
//! - [`producer`]: one output `out`.
//! - [`consumer`]: one input `in`.
//! - [`relay`]: input `in` and output `out`, for chains.
//! - [`spawn_reader`]: runs `read_inputs` cycles on a worker thread.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use plexus_core::{Discipline, PropertyDef, Value};
use plexus_engine::{Container, ExchangeReport, Runtime};

/// Container with a single output property `out`.
pub fn producer(runtime: &Runtime, name: &str, initial: impl Into<Value>) -> Container {
    let c = runtime.create_container(name);
    c.add_property(PropertyDef::output("out", initial))
        .expect("fresh container accepts out");
    c
}

/// Container with a single input property `in`.
pub fn consumer(runtime: &Runtime, name: &str, initial: impl Into<Value>) -> Container {
    let c = runtime.create_container(name);
    c.add_property(PropertyDef::input("in", initial))
        .expect("fresh container accepts in");
    c
}

/// Container with input `in` and output `out`.
pub fn relay(runtime: &Runtime, name: &str, initial: impl Into<Value> + Clone) -> Container {
    let c = runtime.create_container(name);
    c.add_property(PropertyDef::input("in", initial.clone()))
        .expect("fresh container accepts in");
    c.add_property(PropertyDef::output("out", initial))
        .expect("fresh container accepts out");
    c
}

/// `n` relays named `r0..r{n-1}`, each `out` linked to the next `in`.
pub fn chain(runtime: &Runtime, n: usize, discipline: Discipline) -> Vec<Container> {
    let nodes: Vec<Container> = (0..n).map(|i| relay(runtime, &format!("r{i}"), 0)).collect();
    for pair in nodes.windows(2) {
        runtime
            .connect(&pair[0], "out", &pair[1], "in", discipline)
            .expect("chain link");
    }
    nodes
}

/// One completed `read_inputs` cycle observed by a worker thread.
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub report: ExchangeReport,
    pub value: Value,
}

/// Move `container` to a worker thread that runs `cycles` calls of
/// `read_inputs` and sends the report plus the value of `property` after
/// each. The join handle returns the container.
pub fn spawn_reader(
    container: Container,
    property: &str,
    cycles: usize,
) -> (JoinHandle<Container>, Receiver<Reading>) {
    let (tx, rx): (Sender<Reading>, Receiver<Reading>) = crossbeam_channel::unbounded();
    let property = property.to_owned();
    let handle = thread::spawn(move || {
        for _ in 0..cycles {
            let report = container.read_inputs();
            let value = container.get(&property).expect("reader property exists");
            if tx.send(Reading { report, value }).is_err() {
                break;
            }
        }
        container
    });
    (handle, rx)
}
