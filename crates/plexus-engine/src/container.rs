//! Containers: named property stores that exchange values over links.
//!
//! A [`Container`] is an owning handle. Creating one registers it with
//! its [`Runtime`]; dropping it disconnects every link it takes part in,
//! waking any peer blocked on one of them, and then deregisters it.
//!
//! Each container keeps two views of its outputs: the live values in its
//! [`PropertyStore`], which only its own thread mutates, and the
//! published buffer that [`write_outputs`](Container::write_outputs)
//! refreshes under a write lock and that peers read under a read lock.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use indexmap::{IndexMap, IndexSet};
use parking_lot::{Mutex, RwLock};

use plexus_core::{
    ChangeEvent, ChangeKind, ContainerId, Discipline, LinkInfo, PropertyDef, PropertyError,
    PropertyFlags, PropertyStore, Range, Value, ValueType,
};

use crate::registry::LinkTable;
use crate::runtime::Runtime;

// ── ContainerCell ──────────────────────────────────────────────────

/// Shared state of a container. Links hold `Weak` references to it.
///
/// Lock discipline: no two of these locks are ever held at once by a
/// boundary call or a store operation. Wiring operations take the
/// runtime directory lock first and then these one at a time.
pub(crate) struct ContainerCell {
    pub(crate) id: ContainerId,
    name: RwLock<String>,
    /// Live values, mutated by the owning thread.
    pub(crate) store: Mutex<PropertyStore>,
    /// Output values as of the last `write_outputs`.
    pub(crate) published: RwLock<IndexMap<String, Value>>,
    pub(crate) links: Mutex<LinkTable>,
    last_error: Mutex<Option<String>>,
    subscribers: Mutex<Vec<Sender<ChangeEvent>>>,
}

impl ContainerCell {
    pub(crate) fn new(id: ContainerId, name: String) -> Self {
        Self {
            id,
            name: RwLock::new(name),
            store: Mutex::new(PropertyStore::new()),
            published: RwLock::new(IndexMap::new()),
            links: Mutex::new(LinkTable::new()),
            last_error: Mutex::new(None),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn name(&self) -> String {
        self.name.read().clone()
    }

    pub(crate) fn record_error(&self, message: String) {
        *self.last_error.lock() = Some(message);
    }

    /// Push an event to every subscriber without blocking. Full channels
    /// lose the event; disconnected subscribers are dropped.
    pub(crate) fn emit(&self, kind: ChangeKind) {
        let mut subscribers = self.subscribers.lock();
        if subscribers.is_empty() {
            return;
        }
        let event = ChangeEvent {
            container: self.id,
            container_name: self.name(),
            kind,
        };
        subscribers.retain(|tx| {
            !matches!(
                tx.try_send(event.clone()),
                Err(TrySendError::Disconnected(_))
            )
        });
    }
}

// ── Container ──────────────────────────────────────────────────────

/// A named, typed property store wired to other containers by links.
pub struct Container {
    pub(crate) cell: Arc<ContainerCell>,
    pub(crate) runtime: Runtime,
}

// Compile-time assertion: containers are handed to worker threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Container>();
};

impl Container {
    /// Create a container and register it with `runtime`.
    pub fn new(runtime: &Runtime, name: impl Into<String>) -> Self {
        runtime.create_container(name)
    }

    /// Container id, unique within its runtime.
    pub fn id(&self) -> ContainerId {
        self.cell.id
    }

    /// Current display name.
    pub fn name(&self) -> String {
        self.cell.name()
    }

    /// Change the display name. Links keep the name cached at link time.
    pub fn rename(&self, name: impl Into<String>) {
        let name = name.into();
        *self.cell.name.write() = name.clone();
        self.cell.emit(ChangeKind::Renamed { name });
    }

    /// The runtime this container is registered with.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Message of the most recent rejected operation on this container.
    pub fn last_error(&self) -> Option<String> {
        self.cell.last_error.lock().clone()
    }

    /// Forget the last error.
    pub fn clear_last_error(&self) {
        *self.cell.last_error.lock() = None;
    }

    /// Subscribe to change events. The channel is bounded by the
    /// runtime's `event_capacity`; dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<ChangeEvent> {
        let (tx, rx) = crossbeam_channel::bounded(self.runtime.config().event_capacity);
        self.cell.subscribers.lock().push(tx);
        rx
    }

    // ── Properties ─────────────────────────────────────────────────

    /// Declare a property.
    pub fn add_property(&self, def: PropertyDef) -> Result<(), PropertyError> {
        let name = def.name.clone();
        let added = self.cell.store.lock().add(def);
        match added {
            Ok(()) => {
                self.cell.emit(ChangeKind::PropertyAdded { property: name });
                Ok(())
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Remove a property, disconnecting every link attached to it first.
    pub fn remove_property(&self, name: &str) -> Result<(), PropertyError> {
        if let Err(e) = self.runtime.remove_property(&self.cell, name) {
            return Err(self.reject(e));
        }
        self.cell.emit(ChangeKind::PropertyRemoved {
            property: name.to_owned(),
        });
        Ok(())
    }

    /// Current live value of a property.
    pub fn get(&self, name: &str) -> Result<Value, PropertyError> {
        let value = self.cell.store.lock().get(name).cloned();
        value.map_err(|e| self.reject(e))
    }

    /// Assign a property from outside the link machinery.
    ///
    /// Rejected, with the store unchanged, for an unknown name, a
    /// different type tag, an out-of-range number, or an input fed by a
    /// live link.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), PropertyError> {
        let value = value.into();
        let assigned = self.cell.store.lock().set(name, value.clone());
        match assigned {
            Ok(()) => {
                self.cell.emit(ChangeKind::PropertyValue {
                    property: name.to_owned(),
                    value,
                });
                Ok(())
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Whether a property exists.
    pub fn contains_property(&self, name: &str) -> bool {
        self.cell.store.lock().contains(name)
    }

    /// Property names in creation order.
    pub fn list_properties(&self) -> Vec<String> {
        self.cell.store.lock().names()
    }

    /// Names of properties carrying `value_type`, in creation order.
    pub fn properties_of_type(&self, value_type: ValueType) -> Vec<String> {
        self.cell.store.lock().names_of_type(value_type)
    }

    /// Flags of a property.
    pub fn property_flags(&self, name: &str) -> Result<PropertyFlags, PropertyError> {
        self.cell.store.lock().flags(name)
    }

    /// Declared range of a property.
    pub fn property_range(&self, name: &str) -> Result<Option<Range>, PropertyError> {
        self.cell.store.lock().range(name)
    }

    /// Documentation of a property.
    pub fn property_doc(&self, name: &str) -> Result<String, PropertyError> {
        self.cell.store.lock().doc(name).map(str::to_owned)
    }

    /// Type tag of a property.
    pub fn property_type(&self, name: &str) -> Result<ValueType, PropertyError> {
        self.cell.store.lock().value_type(name)
    }

    /// Help text for the visible inputs, headed by the container name.
    pub fn describe_inputs(&self) -> String {
        let name = self.name();
        self.cell.store.lock().describe_inputs(&name)
    }

    // ── Introspection ──────────────────────────────────────────────

    /// Source container and property feeding input `property`.
    pub fn source_of(&self, property: &str) -> Option<(ContainerId, String)> {
        let table = self.cell.links.lock();
        table
            .inbound(property)
            .map(|l| (l.source_id(), l.source_property().to_owned()))
    }

    /// Description of the live link feeding input `property`.
    pub fn inbound_link(&self, property: &str) -> Option<LinkInfo> {
        let table = self.cell.links.lock();
        table.inbound(property).map(|l| l.info().clone())
    }

    /// Containers reading output `property`, each listed once.
    pub fn destinations_of(&self, property: &str) -> Vec<ContainerId> {
        let table = self.cell.links.lock();
        let ids: IndexSet<ContainerId> = table.outbound(property).map(|l| l.destination_id()).collect();
        ids.into_iter().collect()
    }

    /// Whether input `property` is fed by a synchronous link.
    pub fn is_synchronous(&self, property: &str) -> bool {
        self.inbound_discipline(property) == Some(Discipline::Synchronous)
    }

    /// Whether input `property` is fed by a sequential link.
    pub fn is_sequential(&self, property: &str) -> bool {
        self.inbound_discipline(property) == Some(Discipline::Sequential)
    }

    /// Every live link touching this container, inbound first.
    pub fn links(&self) -> Vec<LinkInfo> {
        let table = self.cell.links.lock();
        table
            .all()
            .iter()
            .filter(|l| !l.is_marked())
            .map(|l| l.info().clone())
            .collect()
    }

    /// Whether this container is the master of its sequential group.
    pub fn is_group_master(&self) -> bool {
        self.runtime.is_group_master(self.id())
    }

    /// Master of this container's sequential group.
    pub fn master(&self) -> Option<ContainerId> {
        self.runtime.master_of(self.id())
    }

    /// Depth of this container within its sequential group.
    pub fn depth(&self) -> Option<usize> {
        self.runtime.depth_of(self.id())
    }

    /// Members of this container's sequential group, grouped by depth.
    pub fn group_members_by_depth(&self) -> Vec<Vec<ContainerId>> {
        self.runtime.group_members_by_depth(self.id())
    }

    fn inbound_discipline(&self, property: &str) -> Option<Discipline> {
        self.cell.links.lock().inbound(property).map(|l| l.discipline())
    }

    fn reject(&self, error: PropertyError) -> PropertyError {
        self.runtime.note_rejection(&self.cell, &error);
        error
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        self.runtime.destroy(&self.cell);
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}
