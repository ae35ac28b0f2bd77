//! # Archetype Storage
//!
//! Entities sharing the same component set are stored together, one dense
//! array per component plus one dense array of entity ids:
//!
//! ```text
//! index map:  e7 -> 0, e2 -> 1, e9 -> 2
//! dense:      [e7, e2, e9]
//! Position[]: [P7, P2, P9]
//! Velocity[]: [V7, V2, V9]
//! ```
//!
//! Every array is kept in lock-step: the entity at position `p` and every
//! column value at position `p` describe the same record. Erasure is a
//! swap-and-pop, so iteration is always a linear scan over `[0, len)`.
//!
//! The index map is not owned by the storage. Several storages may share
//! one map, so every lookup is re-checked against the dense array.

use std::fmt;

use super::bundle::{Bundle, ComponentSet};
use super::component::{Component, ComponentId, ComponentInfo};
use super::entity::Entity;
use super::query::{Query, QueryIter};
use super::storage::{Column, ErasedColumn};
use crate::error::{EngineError, EngineResult};
use crate::memory::{IndexMap, IndexMapId, INVALID_POSITION};

// ============================================================================
// IDENTITY AND SIGNATURES
// ============================================================================

/// Index of an archetype inside its catalog and engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchetypeId(usize);

impl ArchetypeId {
    /// Wraps a registration index.
    #[inline]
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Registration index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Canonical form of a component set: sorted and deduplicated.
///
/// Two signatures are equal iff they name the same set of components,
/// regardless of declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Signature {
    components: Vec<ComponentId>,
}

impl Signature {
    /// Creates a signature from components in any order.
    #[must_use]
    pub fn new(mut components: Vec<ComponentId>) -> Self {
        components.sort_unstable();
        components.dedup();
        Self { components }
    }

    /// Signature of a component set.
    #[must_use]
    pub fn of<S: ComponentSet>() -> Self {
        Self::new(S::components().iter().map(ComponentInfo::id).collect())
    }

    /// Checks if the signature contains `id`.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ComponentId) -> bool {
        self.position(id).is_some()
    }

    /// Column index of `id`.
    #[inline]
    #[must_use]
    pub fn position(&self, id: ComponentId) -> Option<usize> {
        self.components.binary_search(&id).ok()
    }

    /// Checks if every component of `other` is also in `self`.
    #[must_use]
    pub fn is_superset_of(&self, other: &Self) -> bool {
        let mut mine = self.components.iter();
        other
            .components
            .iter()
            .all(|wanted| mine.any(|have| have == wanted))
    }

    /// Number of components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Checks if the signature names no components.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Components in canonical order.
    #[inline]
    #[must_use]
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, id) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(id.name())?;
        }
        f.write_str("}")
    }
}

// ============================================================================
// ROW WRITER
// ============================================================================

/// Writes the values of one bundle into the columns of a new row.
///
/// Handed to [`Bundle::write`] during [`ArchetypeStorage::insert`].
pub struct ColumnWriter<'a> {
    archetype: ArchetypeId,
    signature: &'a Signature,
    columns: &'a mut [Box<dyn ErasedColumn>],
    position: usize,
    error: Option<EngineError>,
}

impl ColumnWriter<'_> {
    /// Pushes `value` into the column of `T`.
    ///
    /// The first failure is recorded and later pushes are ignored.
    pub fn push<T: Component>(&mut self, value: T) {
        if self.error.is_some() {
            return;
        }

        let id = ComponentId::of::<T>();
        let column = match self.signature.position(id) {
            Some(index) => self.columns[index].as_any_mut().downcast_mut::<Column<T>>(),
            None => None,
        };

        match column {
            Some(column) if column.len() == self.position => column.push(value),
            Some(_) => self.error = Some(EngineError::ConflictingComponents(id.name())),
            None => {
                self.error = Some(EngineError::ComponentNotInArchetype {
                    component: id.name(),
                    archetype: self.archetype.index(),
                });
            }
        }
    }
}

// ============================================================================
// ARCHETYPE STORAGE
// ============================================================================

/// Sparse-set storage for one archetype.
///
/// # Performance
///
/// - Insert: O(1) amortized
/// - Erase: O(1), swap-and-pop
/// - Lookup: O(1), one index map read plus one dense check
pub struct ArchetypeStorage {
    /// Position of this archetype in the catalog.
    id: ArchetypeId,
    /// Components stored, in column order.
    signature: Signature,
    /// Entity at each position.
    dense: Vec<Entity>,
    /// One column per component, parallel to `dense`.
    columns: Vec<Box<dyn ErasedColumn>>,
    /// Map used to locate entities.
    index_map: IndexMapId,
    /// Reserved rows in `dense` and every column.
    capacity: usize,
}

impl ArchetypeStorage {
    /// Creates an empty storage for `components`.
    ///
    /// Repeated components get a single column.
    #[must_use]
    pub fn new(id: ArchetypeId, components: &[ComponentInfo], index_map: IndexMapId) -> Self {
        let mut infos = components.to_vec();
        infos.sort_unstable_by_key(ComponentInfo::id);
        infos.dedup_by_key(|info| info.id());

        Self {
            id,
            signature: Signature::new(infos.iter().map(ComponentInfo::id).collect()),
            dense: Vec::new(),
            columns: infos.iter().map(ComponentInfo::new_column).collect(),
            index_map,
            capacity: 0,
        }
    }

    /// Archetype identifier.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ArchetypeId {
        self.id
    }

    /// Components stored by this archetype.
    #[inline]
    #[must_use]
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Index map this storage records positions in.
    #[inline]
    #[must_use]
    pub const fn index_map(&self) -> IndexMapId {
        self.index_map
    }

    /// Number of stored entities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Checks if no entity is stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Number of rows reserved.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored entities in dense order.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.dense
    }

    // ========================================================================
    // CAPACITY
    // ========================================================================

    /// Reserves room for at least `additional` more rows.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OutOfMemory`] if any array cannot grow.
    pub fn reserve(&mut self, additional: usize) -> EngineResult<()> {
        let target = self.dense.len() + additional;
        if target <= self.capacity {
            return Ok(());
        }
        self.reserve_rows(target)
    }

    fn reserve_rows(&mut self, capacity: usize) -> EngineResult<()> {
        let additional = capacity - self.dense.len();
        self.dense
            .try_reserve_exact(additional)
            .map_err(|_| EngineError::OutOfMemory { what: "entity array" })?;
        for column in &mut self.columns {
            column.reserve_exact(additional)?;
        }
        self.capacity = capacity;
        Ok(())
    }

    #[cold]
    fn grow(&mut self) -> EngineResult<()> {
        self.reserve_rows(self.capacity * 3 / 2 + 8)
    }

    #[inline]
    fn locate(&self, map: &IndexMap, entity: Entity) -> Option<u32> {
        let position = map.get(entity)?;
        (self.dense.get(position as usize) == Some(&entity)).then_some(position)
    }

    /// Checks if `entity` is stored here.
    ///
    /// A map entry alone is never trusted; the dense slot must agree.
    #[inline]
    #[must_use]
    pub fn contains(&self, map: &IndexMap, entity: Entity) -> bool {
        self.locate(map, entity).is_some()
    }

    // ========================================================================
    // SPARSE SET OPERATIONS
    // ========================================================================

    /// Appends a row for `entity`.
    ///
    /// `bundle` may cover any subset of the archetype's components; omitted
    /// columns receive their default value. `entity` must not already be
    /// stored here.
    ///
    /// Returns the row position.
    ///
    /// # Errors
    ///
    /// - [`EngineError::ComponentNotInArchetype`] if the bundle names a
    ///   component outside this archetype
    /// - [`EngineError::ConflictingComponents`] if the bundle names a
    ///   component twice
    /// - [`EngineError::OutOfMemory`] if growth fails
    ///
    /// The storage is unchanged on error.
    pub fn insert<B: Bundle>(
        &mut self,
        map: &mut IndexMap,
        entity: Entity,
        bundle: B,
    ) -> EngineResult<usize> {
        debug_assert!(
            !self.contains(map, entity),
            "entity {entity} inserted twice into archetype {}",
            self.id.index()
        );

        let position = self.dense.len();
        let raw_position = u32::try_from(position).map_err(|_| EngineError::Exhausted)?;
        map.assure(entity)?;
        if position == self.capacity {
            self.grow()?;
        }

        let mut writer = ColumnWriter {
            archetype: self.id,
            signature: &self.signature,
            columns: &mut self.columns,
            position,
            error: None,
        };
        bundle.write(&mut writer);
        if let Some(error) = writer.error {
            for column in &mut self.columns {
                column.truncate(position);
            }
            return Err(error);
        }

        for column in &mut self.columns {
            if column.len() == position {
                column.push_default();
            }
        }
        self.dense.push(entity);
        map.set(entity, raw_position);
        Ok(position)
    }

    /// Removes the row of `entity`.
    ///
    /// The last row is moved into the freed slot. Returns `false` if
    /// `entity` is not stored here.
    pub fn erase(&mut self, map: &mut IndexMap, entity: Entity) -> bool {
        let Some(raw_position) = self.locate(map, entity) else {
            return false;
        };
        let position = raw_position as usize;
        let last = self.dense.len() - 1;

        self.dense.swap_remove(position);
        for column in &mut self.columns {
            column.swap_remove(position);
        }
        if position != last {
            map.set(self.dense[position], raw_position);
        }
        map.set(entity, INVALID_POSITION);
        true
    }

    // ========================================================================
    // COLUMN ACCESS
    // ========================================================================

    /// Column of component `T`.
    #[must_use]
    pub fn column<T: Component>(&self) -> Option<&Column<T>> {
        let index = self.signature.position(ComponentId::of::<T>())?;
        self.columns[index].as_any().downcast_ref()
    }

    /// Column of component `T`, mutably.
    pub fn column_mut<T: Component>(&mut self) -> Option<&mut Column<T>> {
        let index = self.signature.position(ComponentId::of::<T>())?;
        self.columns[index].as_any_mut().downcast_mut()
    }

    /// Component `T` of `entity`.
    #[inline]
    #[must_use]
    pub fn get<T: Component>(&self, map: &IndexMap, entity: Entity) -> Option<&T> {
        let position = self.locate(map, entity)?;
        self.column::<T>()?.get(position as usize)
    }

    /// Component `T` of `entity`, mutably.
    #[inline]
    pub fn get_mut<T: Component>(&mut self, map: &IndexMap, entity: Entity) -> Option<&mut T> {
        let position = self.locate(map, entity)?;
        self.column_mut::<T>()?.get_mut(position as usize)
    }

    /// Removes every row. Memory is kept.
    ///
    /// Index map entries are left stale; [`Self::contains`] rejects them.
    pub fn clear(&mut self) {
        self.dense.clear();
        for column in &mut self.columns {
            column.truncate(0);
        }
    }

    /// Releases memory beyond the current row count.
    pub fn shrink_to_fit(&mut self) {
        self.dense.shrink_to_fit();
        for column in &mut self.columns {
            column.shrink_to_fit();
        }
        self.capacity = self.dense.len();
    }

    // ========================================================================
    // ITERATION
    // ========================================================================

    /// Iterates rows in dense order.
    #[must_use]
    pub fn rows(&self) -> Rows<'_> {
        Rows {
            storage: self,
            next: 0,
        }
    }

    /// Iterates rows projected through query `Q`.
    ///
    /// Returns `None` if the archetype lacks a component of `Q`.
    pub fn query<Q: Query>(&mut self) -> Option<QueryIter<'_, Q>> {
        let (entities, columns) = self.split_columns_mut();
        QueryIter::new(entities, columns)
    }

    /// Splits the storage into its entities and its columns.
    pub fn split_columns_mut(&mut self) -> (&[Entity], &mut [Box<dyn ErasedColumn>]) {
        (&self.dense, &mut self.columns)
    }
}

impl fmt::Debug for ArchetypeStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchetypeStorage")
            .field("id", &self.id)
            .field("signature", &self.signature)
            .field("len", &self.dense.len())
            .field("capacity", &self.capacity)
            .field("index_map", &self.index_map)
            .finish()
    }
}

// ============================================================================
// ROW ITERATION
// ============================================================================

/// Restartable iterator over the rows of an [`ArchetypeStorage`].
#[derive(Clone)]
pub struct Rows<'a> {
    storage: &'a ArchetypeStorage,
    next: usize,
}

impl<'a> Iterator for Rows<'a> {
    type Item = Row<'a>;

    #[inline]
    fn next(&mut self) -> Option<Row<'a>> {
        let entity = *self.storage.dense.get(self.next)?;
        let row = Row {
            storage: self.storage,
            position: self.next,
            entity,
        };
        self.next += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.storage.dense.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Rows<'_> {}

/// One row of an [`ArchetypeStorage`].
#[derive(Clone, Copy)]
pub struct Row<'a> {
    storage: &'a ArchetypeStorage,
    position: usize,
    entity: Entity,
}

impl<'a> Row<'a> {
    /// Entity owning this row.
    #[inline]
    #[must_use]
    pub const fn entity(&self) -> Entity {
        self.entity
    }

    /// Dense position of this row.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Component `T` of this row.
    #[inline]
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<&'a T> {
        self.storage.column::<T>()?.get(self.position)
    }
}
