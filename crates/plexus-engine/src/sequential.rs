//! Sequential group bookkeeping.
//!
//! Containers joined by sequential links run on one thread in depth
//! order. [`SequentialGroups`] tracks, for every registered container,
//! its group master and its depth (one more than the deepest sequential
//! predecessor, zero for roots), and keeps the master's per-depth member
//! lists current as links are added and removed.
//!
//! Group membership is the weakly connected component of the sequential
//! link graph. The graph is kept acyclic: [`SequentialGroups::link`]
//! refuses an edge that would close a cycle.
//!
//! Master election is deterministic. When two groups merge, the master
//! with the smaller id wins. A master is always a root of its group, so
//! if the new edge gave the winner a predecessor the group's smallest-id
//! root takes over instead. When a group splits, the part that lost its
//! master promotes its smallest-id root.

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use plexus_core::ContainerId;

type Level = SmallVec<[ContainerId; 4]>;

#[derive(Clone, Debug)]
struct Node {
    master: ContainerId,
    depth: usize,
    /// Members indexed by depth. Only populated on masters.
    levels: Vec<Level>,
    /// Sequential predecessors with link multiplicity.
    preds: IndexMap<ContainerId, usize>,
    /// Sequential successors with link multiplicity.
    succs: IndexMap<ContainerId, usize>,
}

impl Node {
    fn standalone(id: ContainerId) -> Self {
        let mut first = Level::new();
        first.push(id);
        Self {
            master: id,
            depth: 0,
            levels: vec![first],
            preds: IndexMap::new(),
            succs: IndexMap::new(),
        }
    }
}

/// Masters, depths and per-depth member lists of every sequential group.
#[derive(Clone, Debug, Default)]
pub struct SequentialGroups {
    nodes: IndexMap<ContainerId, Node>,
}

impl SequentialGroups {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` as the master of its own single-member group.
    /// Returns `false` if it was already registered.
    pub fn register(&mut self, id: ContainerId) -> bool {
        if self.nodes.contains_key(&id) {
            return false;
        }
        self.nodes.insert(id, Node::standalone(id));
        true
    }

    /// Remove `id`, first unlinking every sequential edge touching it.
    /// Returns `false` if it was not registered.
    pub fn deregister(&mut self, id: ContainerId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        let preds: Vec<(ContainerId, usize)> = node.preds.iter().map(|(k, v)| (*k, *v)).collect();
        let succs: Vec<(ContainerId, usize)> = node.succs.iter().map(|(k, v)| (*k, *v)).collect();
        for (p, count) in preds {
            for _ in 0..count {
                self.unlink(p, id);
            }
        }
        for (s, count) in succs {
            for _ in 0..count {
                self.unlink(id, s);
            }
        }
        self.nodes.shift_remove(&id);
        true
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: ContainerId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of registered containers.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no container is registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[cfg(test)]
    fn group_count(&self) -> usize {
        self.nodes.iter().filter(|(id, n)| n.master == **id).count()
    }

    /// Master of the group containing `id`.
    pub fn master(&self, id: ContainerId) -> Option<ContainerId> {
        self.nodes.get(&id).map(|n| n.master)
    }

    /// Depth of `id` within its group.
    pub fn depth(&self, id: ContainerId) -> Option<usize> {
        self.nodes.get(&id).map(|n| n.depth)
    }

    /// Whether `id` is the master of its group.
    pub fn is_master(&self, id: ContainerId) -> bool {
        self.master(id) == Some(id)
    }

    /// Members of the group containing `id`, grouped by depth, each
    /// level sorted by id. Empty if `id` is unknown.
    pub fn members_by_depth(&self, id: ContainerId) -> Vec<Vec<ContainerId>> {
        let Some(master) = self.master(id).and_then(|m| self.nodes.get(&m)) else {
            return Vec::new();
        };
        let mut levels: Vec<Vec<ContainerId>> = master
            .levels
            .iter()
            .map(|level| {
                let mut ids = level.to_vec();
                ids.sort_unstable();
                ids
            })
            .collect();
        while levels.last().is_some_and(Vec::is_empty) {
            levels.pop();
        }
        levels
    }

    /// Whether `ancestor` reaches `id` through sequential links.
    pub fn has_ancestor(&self, id: ContainerId, ancestor: ContainerId) -> bool {
        let mut seen = IndexSet::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let Some(node) = self.nodes.get(&cur) else {
                continue;
            };
            for &p in node.preds.keys() {
                if p == ancestor {
                    return true;
                }
                if seen.insert(p) {
                    stack.push(p);
                }
            }
        }
        false
    }

    /// Whether adding a sequential edge `source -> destination` would
    /// close a cycle.
    pub fn would_cycle(&self, source: ContainerId, destination: ContainerId) -> bool {
        source == destination || self.has_ancestor(source, destination)
    }

    /// Record a sequential edge, merging groups and raising depths.
    ///
    /// Returns `false` (table unchanged) if either end is unknown or the
    /// edge would close a cycle. Parallel edges between the same pair are
    /// counted; only the first one changes the grouping.
    pub fn link(&mut self, source: ContainerId, destination: ContainerId) -> bool {
        if !self.contains(source)
            || !self.contains(destination)
            || self.would_cycle(source, destination)
        {
            return false;
        }
        let fresh = self.bump(source, destination);
        if !fresh {
            return true;
        }

        let (ms, md) = (self.nodes[&source].master, self.nodes[&destination].master);
        let winner = ms.min(md);
        if ms != md {
            self.absorb(ms.max(md), winner);
        }

        let depth = self.nodes[&source].depth + 1;
        self.raise_depth(destination, depth);
        self.reelect(winner);
        true
    }

    /// Remove one sequential edge `source -> destination`.
    ///
    /// When the last parallel edge goes, depths are recomputed and, if
    /// the group fell apart, the part without the old master gets its own.
    /// Returns `false` if no such edge existed.
    pub fn unlink(&mut self, source: ContainerId, destination: ContainerId) -> bool {
        let Some(remaining) = self.drop_edge(source, destination) else {
            return false;
        };
        if remaining > 0 {
            return true;
        }

        let master = self.nodes[&source].master;
        let src_side = self.component(source);
        if src_side.contains(&destination) {
            self.rebuild(&src_side, master);
            return true;
        }
        let dst_side = self.component(destination);
        for side in [src_side, dst_side] {
            let new_master = if side.contains(&master) {
                master
            } else {
                self.smallest_root(&side)
            };
            self.rebuild(&side, new_master);
        }
        true
    }

    /// Verify every structural invariant. Intended for tests and debug
    /// assertions; returns a description of the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (&id, node) in &self.nodes {
            let master = self
                .nodes
                .get(&node.master)
                .ok_or_else(|| format!("{id}: master {} not registered", node.master))?;
            if master.master != node.master {
                return Err(format!("{id}: master {} is not its own master", node.master));
            }
            if node.master != id && !node.levels.iter().all(|l| l.is_empty()) {
                return Err(format!("{id}: non-master holds member levels"));
            }
            let mut expected = 0;
            for (&p, &count) in &node.preds {
                let pred = self
                    .nodes
                    .get(&p)
                    .ok_or_else(|| format!("{id}: predecessor {p} not registered"))?;
                if pred.master != node.master {
                    return Err(format!("{id}: predecessor {p} in another group"));
                }
                if pred.succs.get(&id) != Some(&count) {
                    return Err(format!("{id}: edge {p} -> {id} not mirrored"));
                }
                expected = expected.max(pred.depth + 1);
            }
            if node.depth != expected {
                return Err(format!(
                    "{id}: depth {} but predecessors imply {expected}",
                    node.depth
                ));
            }
            if node.master == id && node.depth != 0 {
                return Err(format!("{id}: master at depth {}", node.depth));
            }
            let listed = master
                .levels
                .get(node.depth)
                .map_or(0, |l| l.iter().filter(|&&m| m == id).count());
            if listed != 1 {
                return Err(format!(
                    "{id}: listed {listed} times at depth {} of master {}",
                    node.depth, node.master
                ));
            }
        }
        for (&id, node) in &self.nodes {
            if node.master != id {
                continue;
            }
            let listed: usize = node.levels.iter().map(SmallVec::len).sum();
            let component = self.component(id);
            if listed != component.len() {
                return Err(format!(
                    "{id}: lists {listed} members but its component has {}",
                    component.len()
                ));
            }
        }
        Ok(())
    }

    // ── Internals ──────────────────────────────────────────────────

    /// Increment the edge count in both directions. Returns `true` for
    /// the first edge between the pair.
    fn bump(&mut self, source: ContainerId, destination: ContainerId) -> bool {
        let mut fresh = false;
        if let Some(node) = self.nodes.get_mut(&source) {
            let count = node.succs.entry(destination).or_insert(0);
            *count += 1;
            fresh = *count == 1;
        }
        if let Some(node) = self.nodes.get_mut(&destination) {
            *node.preds.entry(source).or_insert(0) += 1;
        }
        fresh
    }

    /// Decrement the edge count in both directions, returning what is
    /// left, or `None` if there was no such edge.
    fn drop_edge(&mut self, source: ContainerId, destination: ContainerId) -> Option<usize> {
        let node = self.nodes.get_mut(&source)?;
        let count = node.succs.get_mut(&destination)?;
        *count -= 1;
        let remaining = *count;
        if remaining == 0 {
            node.succs.shift_remove(&destination);
        }
        if let Some(node) = self.nodes.get_mut(&destination) {
            if let Some(count) = node.preds.get_mut(&source) {
                *count -= 1;
                if *count == 0 {
                    node.preds.shift_remove(&source);
                }
            }
        }
        Some(remaining)
    }

    /// Move every member of `loser`'s group under `winner`.
    fn absorb(&mut self, loser: ContainerId, winner: ContainerId) {
        let levels = match self.nodes.get_mut(&loser) {
            Some(node) => std::mem::take(&mut node.levels),
            None => return,
        };
        for (depth, level) in levels.into_iter().enumerate() {
            for id in level {
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.master = winner;
                }
                self.push_level(winner, depth, id);
            }
        }
    }

    /// Raise `id` to at least `depth`, pushing increases downstream.
    fn raise_depth(&mut self, id: ContainerId, depth: usize) {
        let mut work = vec![(id, depth)];
        while let Some((cur, depth)) = work.pop() {
            let Some(node) = self.nodes.get_mut(&cur) else {
                continue;
            };
            if depth <= node.depth {
                continue;
            }
            let (old, master) = (node.depth, node.master);
            node.depth = depth;
            work.extend(node.succs.keys().map(|&s| (s, depth + 1)));
            if let Some(m) = self.nodes.get_mut(&master) {
                if let Some(level) = m.levels.get_mut(old) {
                    level.retain(|x| *x != cur);
                }
            }
            self.push_level(master, depth, cur);
        }
    }

    /// Hand the group over to its smallest-id root if `master` gained a
    /// predecessor.
    fn reelect(&mut self, master: ContainerId) {
        let Some(node) = self.nodes.get(&master) else {
            return;
        };
        if node.preds.is_empty() {
            return;
        }
        let members: Vec<ContainerId> = node.levels.iter().flatten().copied().collect();
        let new_master = self.smallest_root(&members);
        self.absorb(master, new_master);
    }

    fn push_level(&mut self, master: ContainerId, depth: usize, id: ContainerId) {
        if let Some(m) = self.nodes.get_mut(&master) {
            if m.levels.len() <= depth {
                m.levels.resize_with(depth + 1, Level::new);
            }
            m.levels[depth].push(id);
        }
    }

    /// Weakly connected component containing `start`.
    fn component(&self, start: ContainerId) -> Vec<ContainerId> {
        let mut seen = IndexSet::new();
        let mut queue = VecDeque::new();
        seen.insert(start);
        queue.push_back(start);
        while let Some(cur) = queue.pop_front() {
            let Some(node) = self.nodes.get(&cur) else {
                continue;
            };
            for &next in node.preds.keys().chain(node.succs.keys()) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen.into_iter().collect()
    }

    fn smallest_root(&self, members: &[ContainerId]) -> ContainerId {
        members
            .iter()
            .copied()
            .filter(|id| self.nodes.get(id).is_some_and(|n| n.preds.is_empty()))
            .min()
            .or_else(|| members.iter().copied().min())
            .unwrap_or(ContainerId(0))
    }

    /// Recompute master, depths and levels of `members` from scratch.
    /// `members` must be a whole component.
    fn rebuild(&mut self, members: &[ContainerId], master: ContainerId) {
        let mut pending: IndexMap<ContainerId, usize> = IndexMap::new();
        for id in members {
            if let Some(node) = self.nodes.get_mut(id) {
                node.levels.clear();
                node.depth = 0;
                node.master = master;
                pending.insert(*id, node.preds.len());
            }
        }
        let mut ready: VecDeque<ContainerId> = pending
            .iter()
            .filter(|(_, n)| **n == 0)
            .map(|(id, _)| *id)
            .collect();
        while let Some(cur) = ready.pop_front() {
            let (depth, succs) = match self.nodes.get(&cur) {
                Some(node) => (node.depth, node.succs.keys().copied().collect::<Vec<_>>()),
                None => continue,
            };
            self.push_level(master, depth, cur);
            for s in succs {
                if let Some(node) = self.nodes.get_mut(&s) {
                    node.depth = node.depth.max(depth + 1);
                }
                if let Some(n) = pending.get_mut(&s) {
                    *n -= 1;
                    if *n == 0 {
                        ready.push_back(s);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(raw: &[u64]) -> Vec<ContainerId> {
        raw.iter().copied().map(ContainerId).collect()
    }

    fn table(n: u64) -> SequentialGroups {
        let mut groups = SequentialGroups::new();
        for i in 1..=n {
            groups.register(ContainerId(i));
        }
        groups
    }

    #[test]
    fn fresh_container_is_its_own_master() {
        let groups = table(1);
        assert!(groups.is_master(ContainerId(1)));
        assert_eq!(groups.depth(ContainerId(1)), Some(0));
        assert_eq!(groups.members_by_depth(ContainerId(1)), vec![ids(&[1])]);
    }

    #[test]
    fn chain_gets_increasing_depths() {
        let mut groups = table(3);
        assert!(groups.link(ContainerId(1), ContainerId(2)));
        assert!(groups.link(ContainerId(2), ContainerId(3)));
        for (id, depth) in [(1, 0), (2, 1), (3, 2)] {
            assert_eq!(groups.master(ContainerId(id)), Some(ContainerId(1)));
            assert_eq!(groups.depth(ContainerId(id)), Some(depth));
        }
        assert_eq!(
            groups.members_by_depth(ContainerId(3)),
            vec![ids(&[1]), ids(&[2]), ids(&[3])]
        );
        groups.check_invariants().unwrap();
    }

    #[test]
    fn cycle_is_refused() {
        let mut groups = table(3);
        groups.link(ContainerId(1), ContainerId(2));
        groups.link(ContainerId(2), ContainerId(3));
        let before = groups.members_by_depth(ContainerId(1));
        assert!(groups.would_cycle(ContainerId(3), ContainerId(1)));
        assert!(!groups.link(ContainerId(3), ContainerId(1)));
        assert!(!groups.link(ContainerId(2), ContainerId(2)));
        assert_eq!(groups.members_by_depth(ContainerId(1)), before);
        groups.check_invariants().unwrap();
    }

    #[test]
    fn smaller_master_wins_merge() {
        let mut groups = table(4);
        groups.link(ContainerId(3), ContainerId(4));
        groups.link(ContainerId(1), ContainerId(2));
        groups.link(ContainerId(2), ContainerId(4));
        assert_eq!(groups.master(ContainerId(3)), Some(ContainerId(1)));
        assert_eq!(groups.depth(ContainerId(4)), Some(2));
        assert_eq!(groups.group_count(), 1);
        groups.check_invariants().unwrap();
    }

    #[test]
    fn master_with_new_predecessor_hands_over() {
        let mut groups = table(2);
        groups.link(ContainerId(2), ContainerId(1));
        assert_eq!(groups.master(ContainerId(1)), Some(ContainerId(2)));
        assert_eq!(groups.depth(ContainerId(1)), Some(1));
        groups.check_invariants().unwrap();
    }

    #[test]
    fn split_promotes_new_master() {
        let mut groups = table(4);
        groups.link(ContainerId(1), ContainerId(2));
        groups.link(ContainerId(2), ContainerId(3));
        groups.link(ContainerId(3), ContainerId(4));
        assert!(groups.unlink(ContainerId(2), ContainerId(3)));
        assert_eq!(groups.master(ContainerId(2)), Some(ContainerId(1)));
        assert_eq!(groups.master(ContainerId(4)), Some(ContainerId(3)));
        assert_eq!(groups.depth(ContainerId(3)), Some(0));
        assert_eq!(groups.depth(ContainerId(4)), Some(1));
        assert_eq!(groups.group_count(), 2);
        groups.check_invariants().unwrap();
    }

    #[test]
    fn parallel_edges_are_counted() {
        let mut groups = table(2);
        groups.link(ContainerId(1), ContainerId(2));
        groups.link(ContainerId(1), ContainerId(2));
        groups.unlink(ContainerId(1), ContainerId(2));
        assert_eq!(groups.master(ContainerId(2)), Some(ContainerId(1)));
        groups.unlink(ContainerId(1), ContainerId(2));
        assert!(groups.is_master(ContainerId(2)));
        assert!(!groups.unlink(ContainerId(1), ContainerId(2)));
        groups.check_invariants().unwrap();
    }

    #[test]
    fn deregister_unlinks_edges() {
        let mut groups = table(3);
        groups.link(ContainerId(1), ContainerId(2));
        groups.link(ContainerId(2), ContainerId(3));
        assert!(groups.deregister(ContainerId(2)));
        assert!(!groups.contains(ContainerId(2)));
        assert!(groups.is_master(ContainerId(3)));
        assert_eq!(groups.group_count(), 2);
        groups.check_invariants().unwrap();
    }

    #[test]
    fn diamond_takes_longest_path() {
        let mut groups = table(4);
        groups.link(ContainerId(1), ContainerId(2));
        groups.link(ContainerId(2), ContainerId(3));
        groups.link(ContainerId(1), ContainerId(4));
        groups.link(ContainerId(3), ContainerId(4));
        assert_eq!(groups.depth(ContainerId(4)), Some(3));
        groups.unlink(ContainerId(3), ContainerId(4));
        assert_eq!(groups.depth(ContainerId(4)), Some(1));
        assert_eq!(groups.master(ContainerId(4)), Some(ContainerId(1)));
        groups.check_invariants().unwrap();
    }

    #[derive(Clone, Debug)]
    enum Op {
        Link(u64, u64),
        Unlink(u64, u64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u64..=8, 1u64..=8).prop_map(|(a, b)| Op::Link(a, b)),
            (1u64..=8, 1u64..=8).prop_map(|(a, b)| Op::Unlink(a, b)),
        ]
    }

    proptest! {
        #[test]
        fn invariants_hold_after_every_mutation(ops in prop::collection::vec(op(), 1..60)) {
            let mut groups = table(8);
            for op in ops {
                match op {
                    Op::Link(a, b) => {
                        let cyclic = groups.would_cycle(ContainerId(a), ContainerId(b));
                        prop_assert_eq!(groups.link(ContainerId(a), ContainerId(b)), !cyclic);
                    }
                    Op::Unlink(a, b) => {
                        groups.unlink(ContainerId(a), ContainerId(b));
                    }
                }
                if let Err(e) = groups.check_invariants() {
                    prop_assert!(false, "{}", e);
                }
            }
        }
    }
}
