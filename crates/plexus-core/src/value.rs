//! Dynamically-typed property values and their type tags.
//!
//! A [`Value`] is the payload a property carries. The engine never
//! interprets it beyond two things: its [`ValueType`] tag, compared for
//! identity when properties are linked or assigned, and a numeric view
//! used for range checks. Everything else (images, matrices, solver
//! state) travels as an [`Opaque`] payload.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Type tag of an opaque payload.
///
/// Two tags are equal iff they were produced from the same Rust type.
#[derive(Clone, Copy, Debug, Eq)]
pub struct OpaqueType {
    id: TypeId,
    name: &'static str,
}

impl OpaqueType {
    /// The tag for values of type `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The Rust type name, for diagnostics only.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for OpaqueType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl std::hash::Hash for OpaqueType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A shared, immutable payload of arbitrary type.
///
/// Cloning is a reference-count bump, so publishing a large opaque value
/// to several consumers never copies the payload itself.
#[derive(Clone)]
pub struct Opaque {
    tag: OpaqueType,
    data: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    /// Wrap a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            tag: OpaqueType::of::<T>(),
            data: Arc::new(value),
        }
    }

    /// The payload's type tag.
    pub fn tag(&self) -> OpaqueType {
        self.tag
    }

    /// Borrow the payload as `T`, or `None` if it holds another type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    /// Whether two handles share the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque<{}>", self.tag.name)
    }
}

/// Type tag of a [`Value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Boolean.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Float,
    /// UTF-8 string.
    Text,
    /// Vector of 64-bit floats.
    Floats,
    /// Arbitrary shared payload.
    Opaque(OpaqueType),
}

impl ValueType {
    /// Whether values of this type have a numeric view (and so may carry a range).
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Text => write!(f, "text"),
            Self::Floats => write!(f, "floats"),
            Self::Opaque(tag) => write!(f, "{}", tag.name()),
        }
    }
}

/// A dynamically-typed property value.
#[derive(Clone, Debug)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Float vector value.
    Floats(Vec<f64>),
    /// Opaque payload.
    Opaque(Opaque),
}

impl Value {
    /// Wrap an arbitrary payload.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Self::Opaque(Opaque::new(value))
    }

    /// The type tag of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Text(_) => ValueType::Text,
            Self::Floats(_) => ValueType::Floats,
            Self::Opaque(o) => ValueType::Opaque(o.tag()),
        }
    }

    /// Numeric view used for range checks. `None` for non-numeric values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// The boolean, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The integer, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The float, if this is a `Float`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// The string, if this is a `Text`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// The float slice, if this is a `Floats`.
    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            Self::Floats(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow an opaque payload as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Opaque(o) => o.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Whether this value has a short human-readable rendering
    /// (used by help output; vectors and opaque payloads do not).
    pub fn is_printable(&self) -> bool {
        matches!(
            self,
            Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Text(_)
        )
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Floats(a), Self::Floats(b)) => a == b,
            (Self::Opaque(a), Self::Opaque(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "'{v}'"),
            Self::Floats(v) => write!(f, "[{} floats]", v.len()),
            Self::Opaque(o) => write!(f, "<{}>", o.tag().name()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Self::Floats(v)
    }
}
