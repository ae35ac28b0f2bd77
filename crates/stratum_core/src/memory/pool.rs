//! # Entity Allocator
//!
//! Issues entity identifiers and recycles released ones.
//!
//! Recycled identifiers are kept in two LIFO tiers:
//! - a fixed tier, pre-allocated once and sized to stay cache resident
//! - an overflow tier that grows geometrically once the fixed tier is full
//!
//! `generate` always drains the fixed tier first.

use crate::ecs::Entity;
use crate::error::{EngineError, EngineResult};

/// Byte budget of the fixed recycling tier.
pub const FIXED_TIER_BYTES: usize = 16384;

const _: () = assert!(FIXED_TIER_BYTES.is_power_of_two());

/// An identifier allocator with LIFO reuse.
///
/// # Thread Safety
///
/// This allocator is NOT thread-safe.
///
/// # Example
///
/// ```rust
/// use stratum_core::EntityAllocator;
///
/// let mut allocator = EntityAllocator::new();
/// let e = allocator.generate()?;
/// allocator.release(e)?;
///
/// // The most recently released identifier comes back first.
/// assert_eq!(allocator.generate()?, e);
/// # Ok::<(), stratum_core::EngineError>(())
/// ```
pub struct EntityAllocator {
    /// Next never-issued identifier.
    current: u32,
    /// Fixed tier storage (pre-allocated).
    fixed: Box<[Entity]>,
    /// Number of reusable identifiers held in the fixed tier.
    fixed_len: usize,
    /// Overflow tier.
    overflow: Vec<Entity>,
    /// Logical capacity of the overflow tier.
    overflow_capacity: usize,
}

impl EntityAllocator {
    /// Capacity of the fixed tier, in identifiers.
    pub const FIXED_CAPACITY: usize = FIXED_TIER_BYTES / std::mem::size_of::<Entity>();

    /// Smallest capacity the overflow tier is ever shrunk to.
    pub const MIN_OVERFLOW_CAPACITY: usize = Self::FIXED_CAPACITY * 2;

    /// Creates an allocator with both tiers pre-allocated.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: 0,
            fixed: vec![Entity::NULL; Self::FIXED_CAPACITY].into_boxed_slice(),
            fixed_len: 0,
            overflow: Vec::with_capacity(Self::MIN_OVERFLOW_CAPACITY),
            overflow_capacity: Self::MIN_OVERFLOW_CAPACITY,
        }
    }

    /// Returns an identifier that is not currently live.
    ///
    /// Recycled identifiers are preferred over fresh ones.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Exhausted`] once every non-null identifier has
    /// been issued and none are waiting for reuse.
    #[inline]
    pub fn generate(&mut self) -> EngineResult<Entity> {
        if self.fixed_len > 0 {
            self.fixed_len -= 1;
            return Ok(self.fixed[self.fixed_len]);
        }
        if let Some(entity) = self.overflow.pop() {
            return Ok(entity);
        }
        if self.current == Entity::NULL.to_raw() {
            return Err(EngineError::Exhausted);
        }
        let entity = Entity::from_raw(self.current);
        self.current += 1;
        Ok(entity)
    }

    /// Makes `entity` available for reuse.
    ///
    /// The caller guarantees that `entity` is currently live.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OutOfMemory`] if the overflow tier cannot grow.
    #[inline]
    pub fn release(&mut self, entity: Entity) -> EngineResult<()> {
        debug_assert!(!entity.is_null(), "released the null entity");

        if self.fixed_len < Self::FIXED_CAPACITY {
            self.fixed[self.fixed_len] = entity;
            self.fixed_len += 1;
            return Ok(());
        }

        if self.overflow.len() == self.overflow_capacity {
            self.grow_overflow()?;
        }
        self.overflow.push(entity);
        Ok(())
    }

    #[cold]
    fn grow_overflow(&mut self) -> EngineResult<()> {
        let new_capacity = self.overflow_capacity * 5 / 3;
        self.overflow
            .try_reserve_exact(new_capacity - self.overflow.len())
            .map_err(|_| EngineError::OutOfMemory {
                what: "entity recycling pool",
            })?;
        self.overflow_capacity = new_capacity;
        Ok(())
    }

    /// Forgets every issued identifier and resets the counter to zero.
    ///
    /// O(1). Capacity of both tiers is retained.
    pub fn release_all(&mut self) {
        self.fixed_len = 0;
        self.overflow.clear();
        self.current = 0;
    }

    /// Moves as many overflow identifiers as fit into the fixed tier.
    ///
    /// Identifiers are taken from the top of the overflow tier.
    pub fn swap(&mut self) {
        let space = Self::FIXED_CAPACITY - self.fixed_len;
        let amount = self.overflow.len().min(space);
        if amount == 0 {
            return;
        }

        let start = self.overflow.len() - amount;
        self.fixed[self.fixed_len..self.fixed_len + amount].copy_from_slice(&self.overflow[start..]);
        self.overflow.truncate(start);
        self.fixed_len += amount;
    }

    /// Shrinks the overflow tier to its length.
    ///
    /// The overflow tier never drops below [`Self::MIN_OVERFLOW_CAPACITY`].
    pub fn shrink_to_fit(&mut self) {
        let target = self.overflow.len().max(Self::MIN_OVERFLOW_CAPACITY);
        if self.overflow_capacity > target {
            self.overflow.shrink_to(target);
            self.overflow_capacity = target;
        }
    }

    /// Returns the next fresh identifier.
    ///
    /// This is not a reservation: a recycled identifier may be issued first.
    #[inline]
    #[must_use]
    pub const fn peek(&self) -> Entity {
        Entity::from_raw(self.current)
    }

    /// Number of reusable identifiers in the fixed tier.
    #[inline]
    #[must_use]
    pub const fn fixed_reusable(&self) -> usize {
        self.fixed_len
    }

    /// Number of reusable identifiers in the overflow tier.
    #[inline]
    #[must_use]
    pub fn overflow_reusable(&self) -> usize {
        self.overflow.len()
    }

    /// Total number of reusable identifiers.
    #[inline]
    #[must_use]
    pub fn reusable(&self) -> usize {
        self.fixed_len + self.overflow.len()
    }

    /// Current logical capacity of the overflow tier.
    #[inline]
    #[must_use]
    pub const fn overflow_capacity(&self) -> usize {
        self.overflow_capacity
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}
