//! Strongly-typed identifiers for containers and links.

use std::fmt;

/// Identifies a container within a runtime.
///
/// Allocated from a monotonic per-runtime counter, starting at 1. Ids are
/// never reused, so a smaller id always means an older container. The
/// sequential group merge uses this ordering as its tie-break.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(pub u64);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ContainerId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies a link within a runtime.
///
/// Like [`ContainerId`], link ids are allocated monotonically and never
/// reused. Disconnecting an id that is no longer live is a no-op, which
/// makes the id safe to hold after either endpoint has gone away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for LinkId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
