//! The runtime: container directory, wiring operations and lifecycle.
//!
//! A [`Runtime`] is a cheap, cloneable handle to one directory of
//! containers, links and sequential groups. Every container is created
//! against a runtime and every wiring operation goes through it.
//!
//! # Lifecycle
//!
//! ```text
//!   wiring ──start()──► running ──stop()──► wiring
//!      │                   │
//!      └────shutdown()─────┴──► every link gone, every container deregistered
//! ```
//!
//! Links can only be created while the runtime is not running.
//! Disconnecting is allowed at any time, and always wakes a peer blocked
//! on the removed link.
//!
//! # Locking
//!
//! Wiring operations hold the directory lock for their whole duration and
//! take per-container locks one at a time beneath it. Boundary calls and
//! store operations never take the directory lock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use petgraph::unionfind::UnionFind;
use tracing::{debug, warn};

use plexus_core::{
    ChangeKind, ContainerId, Direction, Discipline, LinkError, LinkId, LinkInfo, PropertyError,
    ValueType,
};

use crate::config::{ConfigError, RuntimeConfig};
use crate::container::{Container, ContainerCell};
use crate::link::Link;
use crate::sequential::SequentialGroups;

// ── Directory ──────────────────────────────────────────────────────

#[derive(Default)]
struct Directory {
    containers: IndexMap<ContainerId, Weak<ContainerCell>>,
    links: IndexMap<LinkId, Arc<Link>>,
    groups: SequentialGroups,
}

impl Directory {
    fn is_registered(&self, cell: &Arc<ContainerCell>) -> bool {
        self.containers
            .get(&cell.id)
            .is_some_and(|w| std::ptr::eq(w.as_ptr(), Arc::as_ptr(cell)))
    }
}

struct Shared {
    config: RuntimeConfig,
    next_container: AtomicU64,
    next_link: AtomicU64,
    running: AtomicBool,
    directory: Mutex<Directory>,
}

/// What [`Runtime::shutdown`] tore down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Containers deregistered.
    pub containers: usize,
    /// Links disconnected.
    pub links: usize,
}

// ── Runtime ────────────────────────────────────────────────────────

/// Directory of containers and links.
#[derive(Clone)]
pub struct Runtime {
    shared: Arc<Shared>,
}

const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Runtime>();
};

impl Runtime {
    /// Create a runtime after validating `config`.
    pub fn new(config: RuntimeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: RuntimeConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                next_container: AtomicU64::new(1),
                next_link: AtomicU64::new(1),
                running: AtomicBool::new(false),
                directory: Mutex::new(Directory::default()),
            }),
        }
    }

    /// The configuration this runtime was created with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.shared.config
    }

    /// Create and register a container.
    pub fn create_container(&self, name: impl Into<String>) -> Container {
        let id = ContainerId(self.shared.next_container.fetch_add(1, Ordering::Relaxed));
        let cell = Arc::new(ContainerCell::new(id, name.into()));
        {
            let mut dir = self.shared.directory.lock();
            dir.containers.insert(id, Arc::downgrade(&cell));
            dir.groups.register(id);
        }
        debug!(runtime = %self.shared.config.name, container = %id, "container registered");
        Container {
            cell,
            runtime: self.clone(),
        }
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Freeze the wiring. Subsequent `connect` calls fail with
    /// [`LinkError::LinkingAfterStart`].
    pub fn start(&self) {
        self.shared.running.store(true, Ordering::Release);
        debug!(runtime = %self.shared.config.name, "runtime started");
    }

    /// Unfreeze the wiring.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
        debug!(runtime = %self.shared.config.name, "runtime stopped");
    }

    /// Whether the runtime is running.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Stop, disconnect every link and deregister every container.
    ///
    /// Container handles stay usable as plain property stores but can no
    /// longer be wired.
    pub fn shutdown(&self) -> ShutdownReport {
        self.shared.running.store(false, Ordering::Release);
        let mut dir = self.shared.directory.lock();
        let links: Vec<Arc<Link>> = dir.links.values().cloned().collect();
        let mut report = ShutdownReport::default();
        for link in &links {
            if self.detach(&mut dir, link) {
                report.links += 1;
            }
        }
        let ids: Vec<ContainerId> = dir.containers.keys().copied().collect();
        for id in &ids {
            dir.groups.deregister(*id);
        }
        dir.containers.clear();
        report.containers = ids.len();
        drop(dir);
        debug!(
            runtime = %self.shared.config.name,
            containers = report.containers,
            links = report.links,
            "runtime shut down"
        );
        report
    }

    // ── Wiring ─────────────────────────────────────────────────────

    /// Link output `source_property` of `source` to input
    /// `destination_property` of `destination`.
    ///
    /// On failure the message is recorded as the last error of the
    /// container at fault and nothing changes.
    pub fn connect(
        &self,
        source: &Container,
        source_property: &str,
        destination: &Container,
        destination_property: &str,
        discipline: Discipline,
    ) -> Result<LinkId, LinkError> {
        let (src, dst) = (&source.cell, &destination.cell);
        let mut dir = self.shared.directory.lock();

        let checked = self.check_link(
            &dir,
            src,
            source_property,
            dst,
            destination_property,
            discipline,
        );
        if let Err(e) = checked {
            drop(dir);
            let blamed = if e.blames_destination(dst.id) { dst } else { src };
            self.note_rejection(blamed, &e);
            return Err(e);
        }

        let id = LinkId(self.shared.next_link.fetch_add(1, Ordering::Relaxed));
        let info = LinkInfo {
            id,
            source: src.id,
            source_name: src.name(),
            source_property: source_property.to_owned(),
            destination: dst.id,
            destination_name: dst.name(),
            destination_property: destination_property.to_owned(),
            discipline,
        };
        let link = Arc::new(Link::new(info.clone(), src, dst));

        let initial = {
            let mut store = src.store.lock();
            store.add_linked_output(source_property);
            let value = store.get(source_property).ok().cloned();
            value
        };
        dst.store.lock().set_linked_input(destination_property, true);
        if let Some(value) = initial {
            src.published.write().insert(source_property.to_owned(), value);
        }
        src.links.lock().insert_outbound(source_property, Arc::clone(&link));
        dst.links.lock().insert_inbound(destination_property, Arc::clone(&link));
        dir.links.insert(id, link);

        if discipline == Discipline::Sequential && dir.groups.link(src.id, dst.id) {
            debug!(
                runtime = %self.shared.config.name,
                master = ?dir.groups.master(dst.id),
                depth = ?dir.groups.depth(dst.id),
                "sequential groups merged"
            );
        }
        drop(dir);

        debug!(runtime = %self.shared.config.name, link = %info, "link created");
        src.emit(ChangeKind::LinkAdded(info.clone()));
        dst.emit(ChangeKind::LinkAdded(info));
        Ok(id)
    }

    /// Link every same-named, same-typed output of `source` to the
    /// matching input of `destination`, skipping internal properties and
    /// pairs that fail validation. Returns the links made.
    pub fn connect_matching(
        &self,
        source: &Container,
        destination: &Container,
        discipline: Discipline,
    ) -> Vec<LinkId> {
        let outputs: Vec<(String, ValueType)> = {
            let store = source.cell.store.lock();
            store
                .iter()
                .filter(|(_, p)| p.flags().is_output() && !p.flags().is_internal())
                .map(|(n, p)| (n.to_owned(), p.value_type()))
                .collect()
        };
        let pairs: Vec<String> = {
            let store = destination.cell.store.lock();
            outputs
                .into_iter()
                .filter(|(name, value_type)| {
                    store.entry(name).is_ok_and(|p| {
                        p.flags().is_input()
                            && !p.flags().is_internal()
                            && p.value_type() == *value_type
                    })
                })
                .map(|(name, _)| name)
                .collect()
        };
        pairs
            .iter()
            .filter_map(|name| {
                self.connect(source, name, destination, name, discipline)
                    .ok()
            })
            .collect()
    }

    /// Disconnect a link. Idempotent: `false` if it was already gone.
    pub fn disconnect(&self, link: LinkId) -> bool {
        let mut dir = self.shared.directory.lock();
        let Some(link) = dir.links.get(&link).cloned() else {
            return false;
        };
        self.detach(&mut dir, &link)
    }

    /// Disconnect the live link from `source_property` of `source` to
    /// `destination_property` of `destination`. `false` if none matches.
    pub fn disconnect_property(
        &self,
        source: &Container,
        source_property: &str,
        destination: &Container,
        destination_property: &str,
    ) -> bool {
        let mut dir = self.shared.directory.lock();
        let link = destination
            .cell
            .links
            .lock()
            .inbound(destination_property)
            .filter(|l| l.source_id() == source.id() && l.source_property() == source_property)
            .cloned();
        match link {
            Some(link) => self.detach(&mut dir, &link),
            None => false,
        }
    }

    /// Disconnect every link touching `container`. Returns how many went.
    pub fn disconnect_all(&self, container: &Container) -> usize {
        let mut dir = self.shared.directory.lock();
        let links = container.cell.links.lock().all();
        links
            .iter()
            .filter(|link| self.detach(&mut dir, link))
            .count()
    }

    /// Whether `containers` form one connected set under synchronous and
    /// sequential links. An empty list is not synchronized.
    pub fn are_synchronized(&self, containers: &[ContainerId]) -> bool {
        let slot = |id: ContainerId| containers.iter().position(|c| *c == id);
        let mut sets = UnionFind::<usize>::new(containers.len());
        let mut components = containers.len();
        for (i, id) in containers.iter().enumerate() {
            if slot(*id).is_some_and(|first| sets.union(first, i)) {
                components -= 1;
            }
        }
        let dir = self.shared.directory.lock();
        for link in dir.links.values() {
            if link.discipline() == Discipline::Asynchronous || link.is_marked() {
                continue;
            }
            if let (Some(i), Some(j)) = (slot(link.source_id()), slot(link.destination_id())) {
                if sets.union(i, j) {
                    components -= 1;
                }
            }
        }
        components == 1
    }

    // ── Introspection ──────────────────────────────────────────────

    /// Ids of every registered container, in creation order.
    pub fn container_ids(&self) -> Vec<ContainerId> {
        self.shared.directory.lock().containers.keys().copied().collect()
    }

    /// Number of registered containers.
    pub fn container_count(&self) -> usize {
        self.shared.directory.lock().containers.len()
    }

    /// Every live link, in creation order.
    pub fn links(&self) -> Vec<LinkInfo> {
        let dir = self.shared.directory.lock();
        dir.links.values().map(|l| l.info().clone()).collect()
    }

    /// Number of live links.
    pub fn link_count(&self) -> usize {
        self.shared.directory.lock().links.len()
    }

    /// Description of a live link.
    pub fn link_info(&self, link: LinkId) -> Option<LinkInfo> {
        let dir = self.shared.directory.lock();
        dir.links.get(&link).map(|l| l.info().clone())
    }

    /// Live links touching `container`.
    pub fn links_of(&self, container: ContainerId) -> Vec<LinkInfo> {
        let dir = self.shared.directory.lock();
        dir.links
            .values()
            .filter(|l| l.source_id() == container || l.destination_id() == container)
            .map(|l| l.info().clone())
            .collect()
    }

    /// Master of the sequential group containing `container`.
    pub fn master_of(&self, container: ContainerId) -> Option<ContainerId> {
        self.shared.directory.lock().groups.master(container)
    }

    /// Depth of `container` within its sequential group.
    pub fn depth_of(&self, container: ContainerId) -> Option<usize> {
        self.shared.directory.lock().groups.depth(container)
    }

    /// Whether `container` is the master of its sequential group.
    pub fn is_group_master(&self, container: ContainerId) -> bool {
        self.shared.directory.lock().groups.is_master(container)
    }

    /// Members of the sequential group containing `container`, by depth.
    pub fn group_members_by_depth(&self, container: ContainerId) -> Vec<Vec<ContainerId>> {
        self.shared.directory.lock().groups.members_by_depth(container)
    }

    /// Verify the sequential group invariants.
    pub fn check_group_invariants(&self) -> Result<(), String> {
        self.shared.directory.lock().groups.check_invariants()
    }

    // ── Internals ──────────────────────────────────────────────────

    fn check_link(
        &self,
        dir: &Directory,
        src: &Arc<ContainerCell>,
        source_property: &str,
        dst: &Arc<ContainerCell>,
        destination_property: &str,
        discipline: Discipline,
    ) -> Result<(), LinkError> {
        if self.is_running() {
            return Err(LinkError::LinkingAfterStart);
        }
        for cell in [src, dst] {
            if !dir.is_registered(cell) {
                return Err(LinkError::UnknownContainer { container: cell.id });
            }
        }
        if src.id == dst.id {
            return Err(LinkError::SelfLink { container: src.id });
        }

        let (source_type, source_flags) = {
            let store = src.store.lock();
            let p = store.entry(source_property).map_err(|_| LinkError::UnknownProperty {
                container: src.id,
                property: source_property.to_owned(),
            })?;
            (p.value_type(), p.flags())
        };
        let (destination_type, destination_flags) = {
            let store = dst.store.lock();
            let p = store
                .entry(destination_property)
                .map_err(|_| LinkError::UnknownProperty {
                    container: dst.id,
                    property: destination_property.to_owned(),
                })?;
            (p.value_type(), p.flags())
        };

        if source_type != destination_type {
            return Err(LinkError::TypeMismatch {
                source_property: source_property.to_owned(),
                source_type,
                destination_property: destination_property.to_owned(),
                destination_type,
            });
        }
        if !source_flags.is_output() {
            return Err(LinkError::WrongDirection {
                container: src.id,
                property: source_property.to_owned(),
                required: Direction::Output,
            });
        }
        if !destination_flags.is_input() {
            return Err(LinkError::WrongDirection {
                container: dst.id,
                property: destination_property.to_owned(),
                required: Direction::Input,
            });
        }
        if let Some(existing) = dst.links.lock().inbound(destination_property) {
            return Err(LinkError::DestinationAlreadyLinked {
                container: dst.id,
                property: destination_property.to_owned(),
                existing: existing.id(),
            });
        }
        if discipline == Discipline::Sequential && dir.groups.would_cycle(src.id, dst.id) {
            return Err(LinkError::SequentialCycle {
                source: src.id,
                destination: dst.id,
            });
        }
        Ok(())
    }

    /// Tear a link down: mark it, wake both sides, drop it from every
    /// table and update the grouping. Returns `false` if it was already
    /// marked.
    fn detach(&self, dir: &mut Directory, link: &Arc<Link>) -> bool {
        if !link.mark() {
            return false;
        }
        link.release_gates();
        dir.links.shift_remove(&link.id());

        let src = link.source();
        let dst = link.destination();
        if let Some(src) = &src {
            src.links.lock().remove(link.id());
            src.store.lock().remove_linked_output(link.source_property());
        }
        if let Some(dst) = &dst {
            dst.links.lock().remove(link.id());
            dst.store
                .lock()
                .set_linked_input(link.destination_property(), false);
        }
        if link.discipline() == Discipline::Sequential
            && dir.groups.unlink(link.source_id(), link.destination_id())
        {
            debug!(
                runtime = %self.shared.config.name,
                source_master = ?dir.groups.master(link.source_id()),
                destination_master = ?dir.groups.master(link.destination_id()),
                "sequential edge removed"
            );
        }

        debug!(runtime = %self.shared.config.name, link = %link.info(), "link removed");
        for cell in src.iter().chain(dst.iter()) {
            cell.emit(ChangeKind::LinkRemoved(link.info().clone()));
        }
        true
    }

    /// Disconnect every link attached to one property of `cell`, then
    /// drop the property. The directory lock is held throughout so no
    /// `connect` can wire the property while it goes away.
    pub(crate) fn remove_property(
        &self,
        cell: &Arc<ContainerCell>,
        property: &str,
    ) -> Result<(), PropertyError> {
        let mut dir = self.shared.directory.lock();
        cell.store.lock().entry(property).map(|_| ())?;
        let links = cell.links.lock().attached_to(property);
        for link in &links {
            self.detach(&mut dir, link);
        }
        cell.store.lock().remove(property)?;
        cell.published.write().shift_remove(property);
        Ok(())
    }

    /// Disconnect everything and deregister. Called when a container
    /// handle is dropped.
    pub(crate) fn destroy(&self, cell: &Arc<ContainerCell>) {
        let mut dir = self.shared.directory.lock();
        let links = cell.links.lock().all();
        for link in &links {
            self.detach(&mut dir, link);
        }
        if dir.is_registered(cell) {
            dir.containers.shift_remove(&cell.id);
            dir.groups.deregister(cell.id);
        }
        drop(dir);
        debug!(runtime = %self.shared.config.name, container = %cell.id, "container destroyed");
        cell.emit(ChangeKind::Destroyed);
    }

    /// Record a rejected operation against the container at fault.
    pub(crate) fn note_rejection(&self, cell: &ContainerCell, error: &dyn std::error::Error) {
        cell.record_error(error.to_string());
        if self.shared.config.warn_on_config_error {
            warn!(
                runtime = %self.shared.config.name,
                container = %cell.id,
                error = %error,
                "operation rejected"
            );
        } else {
            debug!(
                runtime = %self.shared.config.name,
                container = %cell.id,
                error = %error,
                "operation rejected"
            );
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::with_config(RuntimeConfig::default())
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("name", &self.shared.config.name)
            .field("running", &self.is_running())
            .finish()
    }
}
