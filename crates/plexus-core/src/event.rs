//! Change notifications published by containers.
//!
//! Presentation layers (GUIs, loggers, tracers) subscribe to a
//! container and receive [`ChangeEvent`]s describing what changed. Events
//! are pushed after the change has been committed and outside of any
//! store lock; a slow subscriber loses events rather than stalling the
//! container.

use crate::id::{ContainerId, LinkId};
use crate::value::Value;

/// The synchronization contract of a link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Discipline {
    /// Latest coherent value, no blocking, no cycle relationship.
    Asynchronous,
    /// Strict producer/consumer alternation through two gates.
    Synchronous,
    /// Same-thread, depth-ordered execution; no gates and no double buffer.
    Sequential,
}

impl std::fmt::Display for Discipline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asynchronous => write!(f, "asynchronous"),
            Self::Synchronous => write!(f, "synchronous"),
            Self::Sequential => write!(f, "sequential"),
        }
    }
}

/// Description of a link's endpoints, cached at creation.
///
/// Remains meaningful after either endpoint has been destroyed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkInfo {
    /// Link id.
    pub id: LinkId,
    /// Source container id.
    pub source: ContainerId,
    /// Source container name at link time.
    pub source_name: String,
    /// Source property.
    pub source_property: String,
    /// Destination container id.
    pub destination: ContainerId,
    /// Destination container name at link time.
    pub destination_name: String,
    /// Destination property.
    pub destination_property: String,
    /// Synchronization contract.
    pub discipline: Discipline,
}

impl std::fmt::Display for LinkInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}[{}]:{} -> {}[{}]:{} ({})",
            self.source_name,
            self.source,
            self.source_property,
            self.destination_name,
            self.destination,
            self.destination_property,
            self.discipline
        )
    }
}

/// What changed in a container.
#[derive(Clone, Debug, PartialEq)]
pub enum ChangeKind {
    /// The display name changed.
    Renamed {
        /// The new name.
        name: String,
    },
    /// The container was destroyed.
    Destroyed,
    /// A property was declared.
    PropertyAdded {
        /// Property name.
        property: String,
    },
    /// A property was removed.
    PropertyRemoved {
        /// Property name.
        property: String,
    },
    /// A property was assigned through `set`.
    PropertyValue {
        /// Property name.
        property: String,
        /// The new value.
        value: Value,
    },
    /// `read_inputs` delivered fresh values to linked inputs.
    InputsRead,
    /// A link touching this container was created.
    LinkAdded(LinkInfo),
    /// A link touching this container was removed.
    LinkRemoved(LinkInfo),
}

/// A change notification.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeEvent {
    /// The container that changed.
    pub container: ContainerId,
    /// Its name when the event was emitted.
    pub container_name: String,
    /// What changed.
    pub kind: ChangeKind,
}
