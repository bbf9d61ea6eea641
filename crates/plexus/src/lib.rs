//! Plexus: typed property containers wired together by links.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Plexus sub-crates. For most users, adding `plexus` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use plexus::prelude::*;
//!
//! let runtime = Runtime::default();
//!
//! let camera = Container::new(&runtime, "camera");
//! camera.add_property(PropertyDef::output("frame", 0)).unwrap();
//!
//! let filter = Container::new(&runtime, "filter");
//! filter
//!     .add_property(PropertyDef::input("frame", 0).with_doc("Incoming frame number"))
//!     .unwrap();
//!
//! runtime
//!     .connect(&camera, "frame", &filter, "frame", Discipline::Synchronous)
//!     .unwrap();
//! runtime.start();
//!
//! camera.set("frame", 1).unwrap();
//! camera.write_outputs();
//! let report = filter.read_inputs();
//!
//! assert_eq!(report.transferred, 1);
//! assert_eq!(filter.get("frame").unwrap(), Value::Int(1));
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `plexus-core` | Ids, values, flags, property store, events, errors, status codes |
//! | [`engine`] | `plexus-engine` | Runtime, containers, links, boundary calls, sequential groups |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types (`plexus-core`).
///
/// Contains [`types::Value`], [`types::PropertyStore`], the error enums
/// and [`types::Status`] codes.
pub use plexus_core as types;

/// Runtime and link machinery (`plexus-engine`).
///
/// [`engine::Runtime`] owns the wiring; [`engine::Container`] is the
/// per-thread handle with the boundary calls.
pub use plexus_engine as engine;

/// Common imports for typical Plexus usage.
///
/// ```rust
/// use plexus::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use plexus_core::{
        ContainerId, Discipline, LinkId, LinkInfo, PropertyDef, PropertyFlags, Range, Value,
        ValueType,
    };

    // Events
    pub use plexus_core::{ChangeEvent, ChangeKind};

    // Errors
    pub use plexus_core::{LinkError, PropertyError, Status};

    // Engine
    pub use plexus_engine::{
        ConfigError, Container, ExchangeReport, Runtime, RuntimeConfig, ShutdownReport,
    };
}
