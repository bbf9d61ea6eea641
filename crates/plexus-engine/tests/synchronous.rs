//! Integration test: synchronous links enforce strict alternation.
//!
//! A producer publishing over a synchronous link cannot publish again
//! until the consumer has taken the previous value, and the consumer
//! cannot read until something new was published. Values therefore
//! arrive exactly once and in order.

use std::thread;

use plexus_core::{Discipline, Value};
use plexus_engine::{ExchangeReport, Runtime};
use plexus_test_utils::{consumer, producer, spawn_reader, BLOCKED, WAIT};

#[test]
fn producer_values_arrive_once_in_order() {
    let rt = Runtime::default();
    let a = producer(&rt, "A", 0);
    let b = consumer(&rt, "B", 0);
    rt.connect(&a, "out", &b, "in", Discipline::Synchronous)
        .unwrap();
    rt.start();

    let (reader, readings) = spawn_reader(b, "in", 3);
    for v in 1..=3 {
        a.set("out", v).unwrap();
        let report = a.write_outputs();
        assert_eq!(
            report,
            ExchangeReport {
                transferred: 1,
                links_gone: 0
            }
        );
    }

    let seen: Vec<Value> = (0..3)
        .map(|_| readings.recv_timeout(WAIT).unwrap().value)
        .collect();
    assert_eq!(seen, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    let b = reader.join().unwrap();
    assert_eq!(b.get("in").unwrap(), Value::Int(3));
}

#[test]
fn reader_waits_for_first_write() {
    let rt = Runtime::default();
    let a = producer(&rt, "A", 0);
    let b = consumer(&rt, "B", 0);
    rt.connect(&a, "out", &b, "in", Discipline::Synchronous)
        .unwrap();

    let (reader, readings) = spawn_reader(b, "in", 1);
    assert!(readings.recv_timeout(BLOCKED).is_err());

    a.set("out", 42).unwrap();
    a.write_outputs();
    let reading = readings.recv_timeout(WAIT).unwrap();
    assert_eq!(reading.value, Value::Int(42));
    assert!(reading.report.is_clean());
    reader.join().unwrap();
}

#[test]
fn second_read_blocks_until_next_write() {
    let rt = Runtime::default();
    let a = producer(&rt, "A", 0);
    let b = consumer(&rt, "B", 0);
    rt.connect(&a, "out", &b, "in", Discipline::Synchronous)
        .unwrap();

    a.set("out", 1).unwrap();
    a.write_outputs();
    b.read_inputs();
    assert_eq!(b.get("in").unwrap(), Value::Int(1));

    let (reader, readings) = spawn_reader(b, "in", 1);
    assert!(
        readings.recv_timeout(BLOCKED).is_err(),
        "second read must wait for the next write"
    );

    a.set("out", 2).unwrap();
    assert!(a.write_outputs().is_clean());
    let reading = readings.recv_timeout(WAIT).unwrap();
    assert_eq!(reading.value, Value::Int(2));
    assert_eq!(reading.report.transferred, 1);
    reader.join().unwrap();
}

#[test]
fn write_before_read_blocks_until_read() {
    let rt = Runtime::default();
    let a = producer(&rt, "A", 0);
    let b = consumer(&rt, "B", 0);
    rt.connect(&a, "out", &b, "in", Discipline::Synchronous)
        .unwrap();

    for v in 1..=2 {
        a.set("out", v).unwrap();
        a.write_outputs();
        b.read_inputs();
        assert_eq!(b.get("in").unwrap(), Value::Int(v));
    }
    a.set("out", 3).unwrap();
    a.write_outputs();

    let (tx, rx) = crossbeam_channel::bounded(1);
    let writer = thread::spawn(move || {
        a.set("out", 4).unwrap();
        tx.send(a.write_outputs()).unwrap();
        a
    });
    assert!(
        rx.recv_timeout(BLOCKED).is_err(),
        "fourth write must wait for the third read"
    );

    b.read_inputs();
    assert_eq!(b.get("in").unwrap(), Value::Int(3));
    let report = rx.recv_timeout(WAIT).unwrap();
    assert!(report.is_clean());

    b.read_inputs();
    assert_eq!(b.get("in").unwrap(), Value::Int(4));
    writer.join().unwrap();
}

#[test]
fn producer_waits_for_every_synchronous_consumer() {
    let rt = Runtime::default();
    let a = producer(&rt, "A", 0);
    let b = consumer(&rt, "B", 0);
    let c = consumer(&rt, "C", 0);
    rt.connect(&a, "out", &b, "in", Discipline::Synchronous)
        .unwrap();
    rt.connect(&a, "out", &c, "in", Discipline::Synchronous)
        .unwrap();
    assert_eq!(a.destinations_of("out"), vec![b.id(), c.id()]);

    a.set("out", 1).unwrap();
    assert_eq!(a.write_outputs().transferred, 2);
    b.read_inputs();

    let (tx, rx) = crossbeam_channel::bounded(1);
    let writer = thread::spawn(move || {
        a.set("out", 2).unwrap();
        tx.send(a.write_outputs()).unwrap();
        a
    });
    assert!(rx.recv_timeout(BLOCKED).is_err(), "C has not read yet");

    c.read_inputs();
    rx.recv_timeout(WAIT).unwrap();
    assert_eq!(c.get("in").unwrap(), Value::Int(1));
    writer.join().unwrap();
}

#[test]
fn synchronous_links_report_their_discipline() {
    let rt = Runtime::default();
    let a = producer(&rt, "A", 0);
    let b = consumer(&rt, "B", 0);
    rt.connect(&a, "out", &b, "in", Discipline::Synchronous)
        .unwrap();
    assert!(b.is_synchronous("in"));
    assert!(!b.is_sequential("in"));
    assert!(rt.are_synchronized(&[a.id(), b.id()]));
}
