//! Property flags and numeric ranges.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bitset describing how a property may be used.
///
/// Flags combine with `|`:
///
/// ```
/// use plexus_core::PropertyFlags;
/// let flags = PropertyFlags::INPUT | PropertyFlags::HIDDEN;
/// assert!(flags.is_input());
/// assert!(!flags.is_output());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct PropertyFlags(u8);

impl PropertyFlags {
    /// No flags set.
    pub const NONE: Self = Self(0x0);
    /// May be the destination of a link.
    pub const INPUT: Self = Self(0x1);
    /// May be the source of links.
    pub const OUTPUT: Self = Self(0x2);
    /// Not shown by presentation layers (GUIs, help output).
    pub const HIDDEN: Self = Self(0x4);
    /// Internal bookkeeping; never auto-linked by name.
    pub const INTERNAL: Self = Self(0x8);

    /// Raw bits.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Whether every flag in `other` is set in `self`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Carries [`INPUT`](Self::INPUT).
    pub fn is_input(self) -> bool {
        self.contains(Self::INPUT)
    }

    /// Carries [`OUTPUT`](Self::OUTPUT).
    pub fn is_output(self) -> bool {
        self.contains(Self::OUTPUT)
    }

    /// Carries [`HIDDEN`](Self::HIDDEN).
    pub fn is_hidden(self) -> bool {
        self.contains(Self::HIDDEN)
    }

    /// Carries [`INTERNAL`](Self::INTERNAL).
    pub fn is_internal(self) -> bool {
        self.contains(Self::INTERNAL)
    }
}

impl BitOr for PropertyFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PropertyFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for PropertyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::INPUT, "input"),
            (Self::OUTPUT, "output"),
            (Self::HIDDEN, "hidden"),
            (Self::INTERNAL, "internal"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", set.join("|"))
        }
    }
}

/// Inclusive numeric range `[min, max]` attached to a property.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Range {
    /// Lower bound (inclusive).
    pub min: f64,
    /// Upper bound (inclusive).
    pub max: f64,
}

impl Range {
    /// Create a range. Bounds are not reordered.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether `value` lies within the bounds. NaN never does.
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    /// Structural validity: finite bounds with `min <= max`.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}...{}]", self.min, self.max)
    }
}
