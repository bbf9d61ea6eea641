//! Link objects shared between the two endpoint containers.
//!
//! A [`Link`] is reference-counted. Both endpoint tables and the runtime's
//! link index hold an `Arc`; boundary calls clone it before blocking on a
//! gate. Tearing a link down marks it and releases both gates; the memory
//! is reclaimed once the last in-flight holder lets go.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use plexus_core::{ContainerId, Discipline, LinkId, LinkInfo};

use crate::container::ContainerCell;
use crate::gate::Gate;

/// A directed, typed connection from an output property to an input property.
pub(crate) struct Link {
    info: LinkInfo,
    source: Weak<ContainerCell>,
    destination: Weak<ContainerCell>,
    /// Producer side: one permit means the consumer has taken the last value.
    pub(crate) in_gate: Gate,
    /// Consumer side: one permit means a fresh value is published.
    pub(crate) out_gate: Gate,
    marked: AtomicBool,
}

const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Link>();
};

impl Link {
    pub(crate) fn new(
        info: LinkInfo,
        source: &Arc<ContainerCell>,
        destination: &Arc<ContainerCell>,
    ) -> Self {
        Self {
            info,
            source: Arc::downgrade(source),
            destination: Arc::downgrade(destination),
            in_gate: Gate::new(1),
            out_gate: Gate::new(0),
            marked: AtomicBool::new(false),
        }
    }

    pub(crate) fn info(&self) -> &LinkInfo {
        &self.info
    }

    pub(crate) fn id(&self) -> LinkId {
        self.info.id
    }

    pub(crate) fn discipline(&self) -> Discipline {
        self.info.discipline
    }

    pub(crate) fn source_id(&self) -> ContainerId {
        self.info.source
    }

    pub(crate) fn destination_id(&self) -> ContainerId {
        self.info.destination
    }

    pub(crate) fn source_property(&self) -> &str {
        &self.info.source_property
    }

    pub(crate) fn destination_property(&self) -> &str {
        &self.info.destination_property
    }

    pub(crate) fn source(&self) -> Option<Arc<ContainerCell>> {
        self.source.upgrade()
    }

    pub(crate) fn destination(&self) -> Option<Arc<ContainerCell>> {
        self.destination.upgrade()
    }

    /// Whether the link has been torn down.
    pub(crate) fn is_marked(&self) -> bool {
        self.marked.load(Ordering::Acquire)
    }

    /// Mark the link for deletion. Returns `false` if it already was.
    pub(crate) fn mark(&self) -> bool {
        self.marked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Wake whichever side is blocked. Called after [`mark`](Self::mark)
    /// so the woken thread sees the link as gone.
    pub(crate) fn release_gates(&self) {
        self.in_gate.release();
        self.out_gate.release();
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("info", &self.info)
            .field("marked", &self.is_marked())
            .finish()
    }
}
