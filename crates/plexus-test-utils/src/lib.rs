//! Test fixtures and invariant checkers for Plexus development.
//!
//! Provides ready-made producer, consumer and relay containers, chain
//! builders, a helper that runs a container's boundary calls on its own
//! thread, and [`assert_group_invariants`] for checking the sequential
//! grouping after every wiring mutation.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::time::Duration;

use plexus_engine::Runtime;

pub use fixtures::{chain, consumer, producer, relay, spawn_reader, Reading};

/// Upper bound for waits that are expected to complete.
pub const WAIT: Duration = Duration::from_secs(5);

/// How long a call must stay pending to count as blocked.
pub const BLOCKED: Duration = Duration::from_millis(100);

/// Panic with the first violated sequential group invariant.
pub fn assert_group_invariants(runtime: &Runtime) {
    if let Err(violation) = runtime.check_group_invariants() {
        panic!("sequential group invariant violated: {violation}");
    }
}
