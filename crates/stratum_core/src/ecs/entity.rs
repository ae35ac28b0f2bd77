//! # Entity Handles
//!
//! Entities are plain unsigned integers. An entity has no state of its own;
//! it is alive only while some archetype storage resolves it to a dense slot.

use std::fmt;

/// Opaque identifier for one logical record.
///
/// The value doubles as an index into index maps, so it is kept as a 32-bit
/// integer. [`Entity::NULL`] is reserved and never issued by the allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Entity(u32);

impl Entity {
    /// Null/invalid entity.
    pub const NULL: Self = Self(u32::MAX);

    /// Wraps a raw identifier.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[inline]
    #[must_use]
    pub const fn to_raw(self) -> u32 {
        self.0
    }

    /// Returns the identifier as an index into index maps.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Checks if this entity is the null entity.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u32::MAX
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("null")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}
