//! Link registry, synchronization protocol and sequential grouping.
//!
//! Provides the [`Runtime`] directory that owns the wiring between
//! [`Container`]s, and the boundary calls ([`Container::read_inputs`],
//! [`Container::write_outputs`]) through which container threads
//! exchange values. Links come in three disciplines: asynchronous
//! (latest coherent value), synchronous (strict producer/consumer
//! alternation) and sequential (same-thread, depth-ordered).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod container;
pub mod exchange;
pub(crate) mod gate;
pub(crate) mod link;
pub(crate) mod registry;
pub mod runtime;
pub mod sequential;

pub use config::{ConfigError, RuntimeConfig};
pub use container::Container;
pub use exchange::ExchangeReport;
pub use runtime::{Runtime, ShutdownReport};
pub use sequential::SequentialGroups;
