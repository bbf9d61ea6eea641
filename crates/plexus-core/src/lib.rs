//! Core types for the Plexus property exchange engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the data every other crate shares: container and link ids, the
//! dynamically-typed [`Value`], property flags and ranges, the
//! per-container [`PropertyStore`], change events, error types and
//! status codes.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod event;
pub mod flags;
pub mod id;
pub mod status;
pub mod store;
pub mod value;

pub use error::{Direction, LinkError, PropertyError};
pub use event::{ChangeEvent, ChangeKind, Discipline, LinkInfo};
pub use flags::{PropertyFlags, Range};
pub use id::{ContainerId, LinkId};
pub use status::Status;
pub use store::{Property, PropertyDef, PropertyStore, NO_DOC};
pub use value::{Opaque, OpaqueType, Value, ValueType};
