//! The boundary calls: [`Container::read_inputs`] and [`Container::write_outputs`].
//!
//! A container's thread calls `read_inputs` at the start of each cycle
//! and `write_outputs` at the end. What happens per link depends on its
//! discipline:
//!
//! | discipline | `read_inputs` | `write_outputs` |
//! |---|---|---|
//! | asynchronous | copy the published value | publish |
//! | synchronous | wait for a fresh value, copy, hand the turn back | wait for the last value to be taken, publish, signal |
//! | sequential | copy the producer's live value | publish |
//!
//! Both calls snapshot the link table and release it before waiting on
//! any gate, and never hold their own store lock together with a peer's.

use std::sync::Arc;

use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::trace;

use plexus_core::{ChangeKind, Discipline, LinkId, Value};

use crate::container::Container;
use crate::link::Link;

/// Outcome of one boundary call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExchangeReport {
    /// Links over which a value moved.
    pub transferred: usize,
    /// Links found torn down, before or while waiting on them.
    pub links_gone: usize,
}

impl ExchangeReport {
    /// Whether no link disappeared during the call.
    pub fn is_clean(&self) -> bool {
        self.links_gone == 0
    }
}

impl Container {
    /// Pull fresh values into every linked input.
    ///
    /// Blocks on each synchronous link until its producer has written
    /// since the last read. A link torn down while waiting is skipped and
    /// counted in [`ExchangeReport::links_gone`].
    pub fn read_inputs(&self) -> ExchangeReport {
        let inbound = self.cell.links.lock().inbound_snapshot();
        let mut report = ExchangeReport::default();
        let mut gone: SmallVec<[LinkId; 2]> = SmallVec::new();
        let mut stale: SmallVec<[LinkId; 2]> = SmallVec::new();
        let mut fresh: Vec<(&str, Value)> = Vec::with_capacity(inbound.len());

        for link in &inbound {
            match fetch(link) {
                Some(value) => fresh.push((link.destination_property(), value)),
                None if link.is_marked() => gone.push(link.id()),
                None => stale.push(link.id()),
            }
        }

        if !fresh.is_empty() {
            let mut store = self.cell.store.lock();
            for (property, value) in fresh {
                if store.assign_from_link(property, value).is_ok() {
                    report.transferred += 1;
                }
            }
        }
        report.links_gone = gone.len() + stale.len();
        self.forget(&gone);
        // Unmarked but unreadable: tear it down through the runtime.
        for id in stale {
            self.runtime.disconnect(id);
        }

        trace!(
            container = %self.id(),
            transferred = report.transferred,
            links_gone = report.links_gone,
            "inputs read"
        );
        if report.transferred > 0 {
            self.cell.emit(ChangeKind::InputsRead);
        }
        report
    }

    /// Publish every linked output.
    ///
    /// Blocks on each synchronous link until its consumer has taken the
    /// previous value, then publishes all linked outputs under one write
    /// lock so asynchronous readers never see a partial update.
    pub fn write_outputs(&self) -> ExchangeReport {
        let outbound = self.cell.links.lock().outbound_snapshot();

        let mut held: SmallVec<[&Arc<Link>; 4]> = SmallVec::new();
        for link in &outbound {
            if link.discipline() == Discipline::Synchronous && !link.is_marked() {
                link.in_gate.acquire();
                held.push(link);
            }
        }

        let properties: IndexSet<&str> = outbound
            .iter()
            .filter(|l| !l.is_marked())
            .map(|l| l.source_property())
            .collect();
        let values: Vec<(String, Value)> = {
            let store = self.cell.store.lock();
            let values = properties
                .iter()
                .filter_map(|p| store.get(p).ok().map(|v| ((*p).to_owned(), v.clone())))
                .collect();
            values
        };
        {
            let mut published = self.cell.published.write();
            for (property, value) in values {
                published.insert(property, value);
            }
        }

        for link in held {
            if !link.is_marked() {
                link.out_gate.release();
            }
        }

        let gone: SmallVec<[LinkId; 2]> = outbound
            .iter()
            .filter(|l| l.is_marked())
            .map(|l| l.id())
            .collect();
        let report = ExchangeReport {
            transferred: outbound.len() - gone.len(),
            links_gone: gone.len(),
        };
        self.forget(&gone);

        trace!(
            container = %self.id(),
            transferred = report.transferred,
            links_gone = report.links_gone,
            "outputs written"
        );
        report
    }

    /// Drop torn-down links still listed in the local table. Only marked
    /// links are removed; the runtime owns every other removal.
    fn forget(&self, gone: &[LinkId]) {
        if gone.is_empty() {
            return;
        }
        let mut table = self.cell.links.lock();
        for id in gone {
            table.remove_marked(*id);
        }
    }
}

/// Fetch the value a link currently carries, or `None` if it is gone.
fn fetch(link: &Link) -> Option<Value> {
    if link.is_marked() {
        return None;
    }
    match link.discipline() {
        Discipline::Asynchronous => published_value(link),
        Discipline::Synchronous => {
            link.out_gate.acquire();
            if link.is_marked() {
                return None;
            }
            let value = published_value(link);
            link.in_gate.release();
            value
        }
        Discipline::Sequential => {
            let source = link.source()?;
            let value = source.store.lock().get(link.source_property()).ok().cloned();
            value
        }
    }
}

fn published_value(link: &Link) -> Option<Value> {
    let source = link.source()?;
    let value = source.published.read().get(link.source_property()).cloned();
    value
}
