//! Per-container link tables.
//!
//! Each container keeps the links it takes part in, keyed by local
//! property name: at most one inbound link per input, any number of
//! outbound links per output. Tables are only touched under the owning
//! container's `links` mutex and are never held across a gate wait.

use std::sync::Arc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use plexus_core::LinkId;

use crate::link::Link;

/// Outbound fan-out of one output. Two inline slots cover the common case.
type Fanout = SmallVec<[Arc<Link>; 2]>;

/// Inbound and outbound links of one container.
#[derive(Default)]
pub(crate) struct LinkTable {
    inbound: IndexMap<String, Arc<Link>>,
    outbound: IndexMap<String, Fanout>,
}

impl LinkTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The live link feeding `property`, if any.
    pub(crate) fn inbound(&self, property: &str) -> Option<&Arc<Link>> {
        self.inbound.get(property).filter(|l| !l.is_marked())
    }

    /// Live links reading `property`.
    pub(crate) fn outbound(&self, property: &str) -> impl Iterator<Item = &Arc<Link>> {
        self.outbound
            .get(property)
            .into_iter()
            .flatten()
            .filter(|l| !l.is_marked())
    }

    pub(crate) fn insert_inbound(&mut self, property: &str, link: Arc<Link>) {
        self.inbound.insert(property.to_owned(), link);
    }

    pub(crate) fn insert_outbound(&mut self, property: &str, link: Arc<Link>) {
        self.outbound
            .entry(property.to_owned())
            .or_default()
            .push(link);
    }

    /// Drop every reference to `id`. Returns `true` if anything was removed.
    pub(crate) fn remove(&mut self, id: LinkId) -> bool {
        let before = self.len();
        self.inbound.retain(|_, l| l.id() != id);
        self.outbound.retain(|_, fanout| {
            fanout.retain(|l| l.id() != id);
            !fanout.is_empty()
        });
        self.len() != before
    }

    /// Like [`remove`](Self::remove), but only if the link is marked.
    pub(crate) fn remove_marked(&mut self, id: LinkId) -> bool {
        let marked = self.all().iter().any(|l| l.id() == id && l.is_marked());
        marked && self.remove(id)
    }

    /// Inbound links, cloned so the caller can release the table lock.
    pub(crate) fn inbound_snapshot(&self) -> Vec<Arc<Link>> {
        self.inbound.values().cloned().collect()
    }

    /// Outbound links in property order, cloned.
    pub(crate) fn outbound_snapshot(&self) -> Vec<Arc<Link>> {
        self.outbound.values().flatten().cloned().collect()
    }

    /// Every link touching the container, inbound first.
    pub(crate) fn all(&self) -> Vec<Arc<Link>> {
        let mut links = self.inbound_snapshot();
        links.extend(self.outbound_snapshot());
        links
    }

    /// Links attached to one property, in either direction.
    pub(crate) fn attached_to(&self, property: &str) -> Vec<Arc<Link>> {
        let mut links: Vec<Arc<Link>> = self.inbound.get(property).cloned().into_iter().collect();
        links.extend(self.outbound.get(property).into_iter().flatten().cloned());
        links
    }

    pub(crate) fn len(&self) -> usize {
        self.inbound.len() + self.outbound.values().map(SmallVec::len).sum::<usize>()
    }
}
