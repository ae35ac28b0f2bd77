//! # Index Map Arena
//!
//! Index maps translate an entity value into a dense position. They are
//! owned by an [`IndexMapArena`] and referenced by archetype storages through
//! an [`IndexMapId`], so several storages can share one growable array.
//!
//! A shared map holds positions written by different storages. Storages
//! therefore never trust an entry on its own and re-check it against their
//! own dense array.

use std::ops::{Index, IndexMut};

use crate::ecs::Entity;
use crate::error::{EngineError, EngineResult};

/// Marker for an unset index map entry.
pub const INVALID_POSITION: u32 = u32::MAX;

/// Number of entries added past the requested entity on a large jump.
pub const PAGE_ENTRIES: usize = 1024 / std::mem::size_of::<u32>();

/// A growable entity-to-position array.
#[derive(Debug, Default)]
pub struct IndexMap {
    /// Position per entity value.
    positions: Vec<u32>,
    /// Number of storages using this map.
    ref_count: usize,
}

impl IndexMap {
    /// Creates an empty map with no users.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            positions: Vec::new(),
            ref_count: 0,
        }
    }

    /// Makes `entity` addressable.
    ///
    /// Capacity doubles, unless `entity` lies beyond twice the current
    /// capacity, in which case the map jumps straight past it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OutOfMemory`] if the map cannot grow.
    #[inline]
    pub fn assure(&mut self, entity: Entity) -> EngineResult<()> {
        let index = entity.index();
        let capacity = self.positions.len();
        if index < capacity {
            return Ok(());
        }

        let new_capacity = if index >= capacity * 2 {
            index + PAGE_ENTRIES
        } else {
            capacity * 2
        };
        self.positions
            .try_reserve_exact(new_capacity - capacity)
            .map_err(|_| EngineError::OutOfMemory { what: "index map" })?;
        self.positions.resize(new_capacity, INVALID_POSITION);
        Ok(())
    }

    /// Returns the recorded position of `entity`, if any.
    ///
    /// The position may belong to another storage sharing this map.
    #[inline]
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<u32> {
        match self.positions.get(entity.index()) {
            Some(&position) if position != INVALID_POSITION => Some(position),
            _ => None,
        }
    }

    /// Records the position of `entity`.
    ///
    /// The caller must have called [`IndexMap::assure`] for `entity`.
    #[inline]
    pub fn set(&mut self, entity: Entity, position: u32) {
        self.positions[entity.index()] = position;
    }

    /// Number of addressable entities.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.positions.len()
    }

    /// Number of storages using this map.
    #[inline]
    #[must_use]
    pub const fn ref_count(&self) -> usize {
        self.ref_count
    }
}

/// Handle to a map inside an [`IndexMapArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndexMapId(usize);

impl IndexMapId {
    /// Wraps an arena slot.
    #[inline]
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Slot of the map inside its arena.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Owner of every index map in an engine.
///
/// Maps are reference counted by the storages attached to them and their
/// memory is released when the last storage detaches.
#[derive(Debug, Default)]
pub struct IndexMapArena {
    /// Map slots. `None` marks a freed slot.
    maps: Vec<Option<IndexMap>>,
    /// Freed slots available for reuse.
    free_slots: Vec<usize>,
}

impl IndexMapArena {
    /// Creates an empty arena.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            maps: Vec::new(),
            free_slots: Vec::new(),
        }
    }

    /// Creates a new map with no users.
    pub fn create(&mut self) -> IndexMapId {
        if let Some(slot) = self.free_slots.pop() {
            self.maps[slot] = Some(IndexMap::new());
            return IndexMapId(slot);
        }
        self.maps.push(Some(IndexMap::new()));
        IndexMapId(self.maps.len() - 1)
    }

    /// Registers one more user of `id`.
    ///
    /// Returns `false` if the map does not exist.
    pub fn attach(&mut self, id: IndexMapId) -> bool {
        match self.get_mut(id) {
            Some(map) => {
                map.ref_count += 1;
                true
            }
            None => false,
        }
    }

    /// Removes one user of `id`, freeing the map when none remain.
    ///
    /// Returns `true` if the map was freed.
    pub fn detach(&mut self, id: IndexMapId) -> bool {
        let Some(map) = self.get_mut(id) else {
            return false;
        };
        map.ref_count = map.ref_count.saturating_sub(1);
        if map.ref_count > 0 {
            return false;
        }
        self.maps[id.0] = None;
        self.free_slots.push(id.0);
        true
    }

    /// Returns the map behind `id`.
    #[inline]
    #[must_use]
    pub fn get(&self, id: IndexMapId) -> Option<&IndexMap> {
        self.maps.get(id.0)?.as_ref()
    }

    /// Returns the map behind `id` mutably.
    #[inline]
    pub fn get_mut(&mut self, id: IndexMapId) -> Option<&mut IndexMap> {
        self.maps.get_mut(id.0)?.as_mut()
    }

    /// Number of maps currently alive.
    #[must_use]
    pub fn live(&self) -> usize {
        self.maps.len() - self.free_slots.len()
    }

    /// Releases unused bookkeeping at the tail of the arena.
    pub fn shrink_to_fit(&mut self) {
        while matches!(self.maps.last(), Some(None)) {
            self.maps.pop();
        }
        let len = self.maps.len();
        self.free_slots.retain(|&slot| slot < len);
        self.maps.shrink_to_fit();
        self.free_slots.shrink_to_fit();
    }
}

impl Index<IndexMapId> for IndexMapArena {
    type Output = IndexMap;

    /// # Panics
    ///
    /// Panics if the map has been freed.
    #[inline]
    fn index(&self, id: IndexMapId) -> &IndexMap {
        match self.get(id) {
            Some(map) => map,
            None => panic!("index map {} has been freed", id.0),
        }
    }
}

impl IndexMut<IndexMapId> for IndexMapArena {
    #[inline]
    fn index_mut(&mut self, id: IndexMapId) -> &mut IndexMap {
        match self.get_mut(id) {
            Some(map) => map,
            None => panic!("index map {} has been freed", id.0),
        }
    }
}
