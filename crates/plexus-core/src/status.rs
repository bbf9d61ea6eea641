//! Stable status codes for every error condition.
//!
//! [`Status`] gives tools and bindings a numeric code to report next to
//! the human-readable message. `Ok` = 0, all errors are negative, and
//! values never change once assigned.

use crate::error::{LinkError, PropertyError};

/// Numeric status code.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// Success.
    Ok = 0,
    /// Property name already used in the container.
    DuplicateProperty = -1,
    /// Property name not found.
    UnknownProperty = -2,
    /// Property type tags differ.
    TypeMismatch = -3,
    /// Endpoint lacks the input/output flag for its side.
    WrongDirection = -4,
    /// Source and destination are the same container.
    SelfLink = -5,
    /// Destination input already has a live link.
    DestinationAlreadyLinked = -6,
    /// Sequential link would close a cycle.
    SequentialCycle = -7,
    /// Wiring attempted after the runtime started.
    LinkingAfterStart = -8,
    /// Value outside the declared range.
    OutOfRange = -9,
    /// Property cannot be written externally.
    NotWritable = -10,
    /// Container not registered.
    UnknownContainer = -11,
    /// Range declared on a non-numeric property, or malformed bounds.
    InvalidRange = -12,
    /// Runtime configuration rejected.
    InvalidConfig = -13,
}

impl Status {
    /// The raw code.
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<&PropertyError> for Status {
    fn from(e: &PropertyError) -> Self {
        match e {
            PropertyError::DuplicateProperty { .. } => Status::DuplicateProperty,
            PropertyError::UnknownProperty { .. } => Status::UnknownProperty,
            PropertyError::OutOfRange { .. } => Status::OutOfRange,
            PropertyError::TypeMismatch { .. } => Status::TypeMismatch,
            PropertyError::NotWritable { .. } => Status::NotWritable,
            PropertyError::NotNumeric { .. } | PropertyError::InvalidRange { .. } => {
                Status::InvalidRange
            }
        }
    }
}

impl From<&LinkError> for Status {
    fn from(e: &LinkError) -> Self {
        match e {
            LinkError::LinkingAfterStart => Status::LinkingAfterStart,
            LinkError::SelfLink { .. } => Status::SelfLink,
            LinkError::UnknownContainer { .. } => Status::UnknownContainer,
            LinkError::UnknownProperty { .. } => Status::UnknownProperty,
            LinkError::TypeMismatch { .. } => Status::TypeMismatch,
            LinkError::WrongDirection { .. } => Status::WrongDirection,
            LinkError::DestinationAlreadyLinked { .. } => Status::DestinationAlreadyLinked,
            LinkError::SequentialCycle { .. } => Status::SequentialCycle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ContainerId;

    #[test]
    fn codes_are_negative_for_errors() {
        assert_eq!(Status::Ok.code(), 0);
        let s = Status::from(&LinkError::SelfLink {
            container: ContainerId(1),
        });
        assert_eq!(s, Status::SelfLink);
        assert!(s.code() < 0);
    }

    #[test]
    fn property_errors_map() {
        let e = PropertyError::NotNumeric {
            property: "p".into(),
            found: crate::ValueType::Text,
        };
        assert_eq!(Status::from(&e), Status::InvalidRange);
    }
}
