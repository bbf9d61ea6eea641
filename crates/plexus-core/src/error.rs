//! Error types for the Plexus property exchange engine.
//!
//! Organized by subsystem: [`PropertyError`] for the per-container
//! property store, [`LinkError`] for wiring. Both are configuration
//! errors in the sense that they are reported synchronously, never
//! abort, and leave the target unchanged.

use std::error::Error;
use std::fmt;

use crate::flags::Range;
use crate::id::{ContainerId, LinkId};
use crate::value::ValueType;

/// Errors from property store operations.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyError {
    /// A property with this name already exists.
    DuplicateProperty {
        /// The contested name.
        property: String,
    },
    /// No property with this name exists.
    UnknownProperty {
        /// The missing name.
        property: String,
    },
    /// The value falls outside the property's declared range.
    OutOfRange {
        /// The property being assigned.
        property: String,
        /// Numeric view of the rejected value.
        value: f64,
        /// The declared range.
        range: Range,
    },
    /// The value's type tag differs from the property's.
    TypeMismatch {
        /// The property being assigned.
        property: String,
        /// The property's type tag.
        expected: ValueType,
        /// The rejected value's type tag.
        found: ValueType,
    },
    /// The property may not be written from outside (it is an input fed
    /// by a live link).
    NotWritable {
        /// The protected property.
        property: String,
    },
    /// A range was declared on a property whose value is not numeric.
    NotNumeric {
        /// The property.
        property: String,
        /// Its type tag.
        found: ValueType,
    },
    /// The declared range has non-finite bounds or `min > max`.
    InvalidRange {
        /// The property.
        property: String,
        /// The rejected range.
        range: Range,
    },
}

impl PropertyError {
    /// Name of the property the error refers to.
    pub fn property(&self) -> &str {
        match self {
            Self::DuplicateProperty { property }
            | Self::UnknownProperty { property }
            | Self::OutOfRange { property, .. }
            | Self::TypeMismatch { property, .. }
            | Self::NotWritable { property }
            | Self::NotNumeric { property, .. }
            | Self::InvalidRange { property, .. } => property,
        }
    }
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateProperty { property } => {
                write!(f, "property '{property}' already exists")
            }
            Self::UnknownProperty { property } => {
                write!(f, "property '{property}' does not exist")
            }
            Self::OutOfRange {
                property,
                value,
                range,
            } => write!(
                f,
                "value {value} for property '{property}' is not valid for the range {range}"
            ),
            Self::TypeMismatch {
                property,
                expected,
                found,
            } => write!(
                f,
                "property '{property}' holds {expected} values, got {found}"
            ),
            Self::NotWritable { property } => {
                write!(f, "property '{property}' is fed by a link and cannot be written")
            }
            Self::NotNumeric { property, found } => {
                write!(f, "property '{property}' of type {found} cannot carry a range")
            }
            Self::InvalidRange { property, range } => {
                write!(f, "range {range} for property '{property}' is invalid")
            }
        }
    }
}

impl Error for PropertyError {}

/// Which end of a link a property was expected to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Source side: needs the output flag.
    Output,
    /// Destination side: needs the input flag.
    Input,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Output => write!(f, "output"),
            Self::Input => write!(f, "input"),
        }
    }
}

/// Errors from link creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkError {
    /// The runtime has started; the wiring is frozen.
    LinkingAfterStart,
    /// Source and destination are the same container.
    SelfLink {
        /// The container.
        container: ContainerId,
    },
    /// The container is not registered with this runtime (destroyed, or
    /// created against another runtime).
    UnknownContainer {
        /// The missing container.
        container: ContainerId,
    },
    /// A named endpoint property does not exist.
    UnknownProperty {
        /// The container searched.
        container: ContainerId,
        /// The missing property.
        property: String,
    },
    /// Source and destination properties carry different type tags.
    TypeMismatch {
        /// Source property name.
        source_property: String,
        /// Source type tag.
        source_type: ValueType,
        /// Destination property name.
        destination_property: String,
        /// Destination type tag.
        destination_type: ValueType,
    },
    /// An endpoint property lacks the flag its side of the link needs.
    WrongDirection {
        /// The container owning the property.
        container: ContainerId,
        /// The property.
        property: String,
        /// The flag that was required.
        required: Direction,
    },
    /// The destination input is already fed by a live link.
    DestinationAlreadyLinked {
        /// Destination container.
        container: ContainerId,
        /// Destination property.
        property: String,
        /// The link currently feeding it.
        existing: LinkId,
    },
    /// The sequential link would close a cycle of sequential links.
    SequentialCycle {
        /// Would-be source.
        source: ContainerId,
        /// Would-be destination.
        destination: ContainerId,
    },
}

impl LinkError {
    /// Whether the fault lies with the destination side. Used to decide
    /// which container records the error message.
    pub fn blames_destination(&self, destination: ContainerId) -> bool {
        match self {
            Self::UnknownProperty { container, .. }
            | Self::WrongDirection { container, .. }
            | Self::UnknownContainer { container } => *container == destination,
            Self::DestinationAlreadyLinked { .. } => true,
            _ => false,
        }
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkingAfterStart => {
                write!(f, "cannot link properties after the runtime has started")
            }
            Self::SelfLink { container } => {
                write!(f, "container {container} cannot be linked with itself")
            }
            Self::UnknownContainer { container } => {
                write!(f, "container {container} is not registered")
            }
            Self::UnknownProperty {
                container,
                property,
            } => write!(
                f,
                "property '{property}' does not exist in container {container}"
            ),
            Self::TypeMismatch {
                source_property,
                source_type,
                destination_property,
                destination_type,
            } => write!(
                f,
                "properties '{source_property}' ({source_type}) and \
                 '{destination_property}' ({destination_type}) are not of the same type"
            ),
            Self::WrongDirection {
                container,
                property,
                required,
            } => write!(
                f,
                "property '{property}' of container {container} is not of {required} type"
            ),
            Self::DestinationAlreadyLinked {
                container,
                property,
                existing,
            } => write!(
                f,
                "input '{property}' of container {container} is already fed by link {existing}"
            ),
            Self::SequentialCycle {
                source,
                destination,
            } => write!(
                f,
                "sequential link {source} -> {destination} would create a cycle"
            ),
        }
    }
}

impl Error for LinkError {}
