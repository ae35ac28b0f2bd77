//! # Engine
//!
//! The central container: one archetype storage per catalog schema, the
//! index maps they share, and the entity allocator.
//!
//! Every operation is resolved through the catalog:
//! - creation targets the archetype whose set equals the bundle's types
//! - lookups, counts and iteration visit every archetype containing the
//!   requested types

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::archetype::{ArchetypeId, ArchetypeStorage, Signature};
use super::bundle::{Bundle, ComponentSet};
use super::catalog::SchemaCatalog;
use super::component::Component;
use super::entity::Entity;
use super::query::{query_signature, Query};
use crate::config::{EngineConfig, IndexMapPolicy};
use crate::error::{EngineError, EngineResult};
use crate::memory::{EntityAllocator, IndexMapArena};

// ============================================================================
// ENGINE
// ============================================================================

/// Storage engine over a fixed schema catalog.
///
/// # Example
///
/// ```rust
/// use stratum_core::{CatalogBuilder, Engine};
///
/// #[derive(Clone, Copy, Default)]
/// struct Position(f32);
/// #[derive(Clone, Copy, Default)]
/// struct Velocity(f32);
///
/// let catalog = CatalogBuilder::new()
///     .archetype::<(Position, Velocity)>()
///     .archetype::<(Position,)>()
///     .build()?;
/// let mut engine = Engine::new(catalog);
///
/// let moving = engine.create((Position(0.0), Velocity(2.0)))?;
/// engine.create((Position(5.0),))?;
///
/// engine.for_each::<(&mut Position, &Velocity), _>(|_, (pos, vel)| pos.0 += vel.0)?;
///
/// assert_eq!(engine.get::<Position>(moving)?.0, 2.0);
/// assert_eq!(engine.size::<(Position,)>(), 2);
/// # Ok::<(), stratum_core::EngineError>(())
/// ```
pub struct Engine {
    /// Schemas, one per storage.
    catalog: SchemaCatalog,
    /// Storages indexed by [`ArchetypeId`].
    storages: Vec<ArchetypeStorage>,
    /// Maps referenced by the storages.
    index_maps: IndexMapArena,
    /// Identifier source.
    allocator: EntityAllocator,
    /// Construction parameters.
    config: EngineConfig,
    /// Resolved creation target per bundle type.
    bundle_targets: HashMap<TypeId, ArchetypeId>,
}

impl Engine {
    /// Creates an engine with the default configuration.
    ///
    /// No memory is reserved until the first insert.
    #[must_use]
    pub fn new(catalog: SchemaCatalog) -> Self {
        Self::assemble(catalog, EngineConfig::default())
    }

    /// Creates an engine with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OutOfMemory`] if the initial reservation fails.
    pub fn with_config(catalog: SchemaCatalog, config: EngineConfig) -> EngineResult<Self> {
        let mut engine = Self::assemble(catalog, config);

        let mut initial = engine.config.initial_capacity;
        let addressable = u32::MAX as usize;
        if initial > addressable {
            tracing::warn!(
                requested = initial,
                limit = addressable,
                "initial capacity exceeds the entity range, clamping"
            );
            initial = addressable;
        }
        if initial > 0 {
            for storage in &mut engine.storages {
                storage.reserve(initial)?;
            }
        }
        Ok(engine)
    }

    fn assemble(catalog: SchemaCatalog, config: EngineConfig) -> Self {
        let mut index_maps = IndexMapArena::new();
        let shared = match config.index_maps {
            IndexMapPolicy::Shared => Some(index_maps.create()),
            IndexMapPolicy::PerArchetype => None,
        };

        let mut storages = Vec::with_capacity(catalog.len());
        for (id, entry) in catalog.iter() {
            let map = match shared {
                Some(map) => map,
                None => index_maps.create(),
            };
            index_maps.attach(map);
            storages.push(ArchetypeStorage::new(id, entry.components(), map));
        }

        tracing::debug!(
            archetypes = storages.len(),
            index_maps = index_maps.live(),
            policy = ?config.index_maps,
            "engine assembled"
        );

        Self {
            catalog,
            storages,
            index_maps,
            allocator: EntityAllocator::new(),
            config,
            bundle_targets: HashMap::new(),
        }
    }

    fn target_of<B: Bundle>(&mut self) -> EngineResult<ArchetypeId> {
        let key = TypeId::of::<B>();
        if let Some(&id) = self.bundle_targets.get(&key) {
            return Ok(id);
        }

        let signature = Signature::of::<B>();
        let id = self
            .catalog
            .exact(&signature)
            .ok_or_else(|| EngineError::UnknownArchetype {
                components: signature.to_string(),
            })?;
        self.bundle_targets.insert(key, id);
        Ok(id)
    }

    // ========================================================================
    // ENTITY LIFECYCLE
    // ========================================================================

    /// Creates an entity in the archetype whose components are exactly the
    /// bundle's.
    ///
    /// # Errors
    ///
    /// - [`EngineError::UnknownArchetype`] if no archetype has that set
    /// - [`EngineError::ConflictingComponents`] if the bundle repeats a type
    /// - [`EngineError::Exhausted`] or [`EngineError::OutOfMemory`] on
    ///   resource exhaustion
    pub fn create<B: Bundle>(&mut self, bundle: B) -> EngineResult<Entity> {
        let archetype = self.target_of::<B>()?;
        let entity = self.allocator.generate()?;

        let storage = &mut self.storages[archetype.index()];
        let map = &mut self.index_maps[storage.index_map()];
        match storage.insert(map, entity, bundle) {
            Ok(_) => Ok(entity),
            Err(error) => {
                if let Err(release) = self.allocator.release(entity) {
                    tracing::warn!(
                        %entity,
                        %release,
                        "identifier of a rejected insert could not be recycled"
                    );
                }
                Err(error)
            }
        }
    }

    /// Destroys `entity`, searching the archetypes containing `S`.
    ///
    /// Naming the entity's full component set makes this a single lookup;
    /// `()` searches every archetype.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if no searched archetype holds it.
    pub fn destroy<S: ComponentSet>(&mut self, entity: Entity) -> EngineResult<()> {
        let candidates = self.catalog.matching_set::<S>();
        for id in candidates.iter() {
            let storage = &mut self.storages[id.index()];
            let map = &mut self.index_maps[storage.index_map()];
            if storage.erase(map, entity) {
                return self.allocator.release(entity);
            }
        }
        Err(EngineError::NotFound(entity))
    }

    /// Destroys every entity and resets identifier allocation.
    ///
    /// Storage memory is kept.
    pub fn destroy_all(&mut self) {
        for storage in &mut self.storages {
            storage.clear();
        }
        self.allocator.release_all();
        tracing::debug!(archetypes = self.storages.len(), "destroyed all entities");
    }

    // ========================================================================
    // ITERATION AND LOOKUP
    // ========================================================================

    /// Iterates every row of every archetype containing `Q`'s components.
    ///
    /// Archetypes are visited in resolution order, exact match first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ConflictingComponents`] if `Q` names a
    /// component twice.
    pub fn query<'w, Q>(
        &'w mut self,
    ) -> EngineResult<impl Iterator<Item = (Entity, Q::Item<'w>)> + 'w>
    where
        Q: Query + 'w,
    {
        let signature = query_signature::<Q>()?;
        let matching = self.catalog.matching(&signature);

        // Split borrows of the resolved subset, in resolution order.
        let mut slots: Vec<Option<&'w mut ArchetypeStorage>> =
            self.storages.iter_mut().map(Some).collect();
        let selected: Vec<&'w mut ArchetypeStorage> = matching
            .iter()
            .filter_map(|id| slots[id.index()].take())
            .collect();

        Ok(selected
            .into_iter()
            .filter_map(|storage| storage.query::<Q>())
            .flatten())
    }

    /// Calls `f` with every row of every archetype containing `Q`'s
    /// components.
    ///
    /// Order is unspecified. Components requested as `&mut T` may be
    /// modified in place.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ConflictingComponents`] if `Q` names a
    /// component twice.
    pub fn for_each<'w, Q, F>(&'w mut self, mut f: F) -> EngineResult<()>
    where
        Q: Query + 'w,
        F: FnMut(Entity, Q::Item<'w>),
    {
        for (entity, item) in self.query::<Q>()? {
            f(entity, item);
        }
        Ok(())
    }

    /// Resolves the archetypes containing `S`.
    #[must_use]
    pub fn view<S: ComponentSet>(&self) -> View<'_> {
        View {
            engine: self,
            archetypes: self.catalog.matching_set::<S>(),
        }
    }

    /// Checks if `entity` is stored in an archetype containing `S`.
    #[must_use]
    pub fn has<S: ComponentSet>(&self, entity: Entity) -> bool {
        self.view::<S>().contains(entity)
    }

    /// Number of entities in archetypes containing `S`.
    #[must_use]
    pub fn size<S: ComponentSet>(&self) -> usize {
        self.view::<S>().size()
    }

    /// Checks if no archetype containing `S` holds an entity.
    #[must_use]
    pub fn is_empty<S: ComponentSet>(&self) -> bool {
        self.view::<S>().is_empty()
    }

    /// Component `T` of `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if no archetype with `T` holds it.
    pub fn get<T: Component>(&self, entity: Entity) -> EngineResult<&T> {
        self.catalog
            .matching_set::<(T,)>()
            .iter()
            .find_map(|id| {
                let storage = &self.storages[id.index()];
                storage.get::<T>(&self.index_maps[storage.index_map()], entity)
            })
            .ok_or(EngineError::NotFound(entity))
    }

    /// Component `T` of `entity`, mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if no archetype with `T` holds it.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> EngineResult<&mut T> {
        let found = self
            .view::<(T,)>()
            .locate(entity)
            .ok_or(EngineError::NotFound(entity))?;

        let storage = &mut self.storages[found.index()];
        let map = &self.index_maps[storage.index_map()];
        storage
            .get_mut::<T>(map, entity)
            .ok_or(EngineError::NotFound(entity))
    }

    // ========================================================================
    // MAINTENANCE AND INSPECTION
    // ========================================================================

    /// Releases memory held beyond current needs.
    ///
    /// Shrinks every storage, moves recycled identifiers back into the
    /// allocator's fixed tier and shrinks its overflow tier.
    pub fn optimize(&mut self) {
        for storage in &mut self.storages {
            storage.shrink_to_fit();
        }
        self.allocator.swap();
        self.allocator.shrink_to_fit();
        self.index_maps.shrink_to_fit();

        tracing::debug!(
            entities = self.storages.iter().map(ArchetypeStorage::len).sum::<usize>(),
            reusable = self.allocator.reusable(),
            "engine optimized"
        );
    }

    /// Storage of `id`.
    #[must_use]
    pub fn storage(&self, id: ArchetypeId) -> Option<&ArchetypeStorage> {
        self.storages.get(id.index())
    }

    /// All storages, indexed by [`ArchetypeId`].
    #[must_use]
    pub fn storages(&self) -> &[ArchetypeStorage] {
        &self.storages
    }

    /// The catalog this engine was built from.
    #[must_use]
    pub const fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// The entity allocator.
    #[must_use]
    pub const fn allocator(&self) -> &EntityAllocator {
        &self.allocator
    }

    /// The index maps used by the storages.
    #[must_use]
    pub const fn index_maps(&self) -> &IndexMapArena {
        &self.index_maps
    }

    /// Construction parameters.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        for storage in &self.storages {
            self.index_maps.detach(storage.index_map());
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("storages", &self.storages)
            .field("index_maps", &self.index_maps.live())
            .field("reusable", &self.allocator.reusable())
            .field("config", &self.config)
            .finish()
    }
}

// ============================================================================
// VIEW
// ============================================================================

/// The archetypes of an [`Engine`] that contain a component set.
///
/// Cheap to build and reusable while the engine is borrowed.
#[derive(Clone)]
pub struct View<'a> {
    engine: &'a Engine,
    archetypes: Rc<[ArchetypeId]>,
}

impl<'a> View<'a> {
    /// Matching archetypes; an exact match comes first.
    #[must_use]
    pub fn archetypes(&self) -> &[ArchetypeId] {
        &self.archetypes
    }

    /// Matching storages, in [`Self::archetypes`] order.
    pub fn storages(&self) -> impl Iterator<Item = &'a ArchetypeStorage> + '_ {
        let engine = self.engine;
        self.archetypes
            .iter()
            .map(move |id| &engine.storages[id.index()])
    }

    /// Archetype holding `entity`, if it matches.
    #[must_use]
    pub fn locate(&self, entity: Entity) -> Option<ArchetypeId> {
        let engine = self.engine;
        self.storages()
            .find(|storage| storage.contains(&engine.index_maps[storage.index_map()], entity))
            .map(ArchetypeStorage::id)
    }

    /// Checks if a matching archetype holds `entity`.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.locate(entity).is_some()
    }

    /// Number of entities in matching archetypes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.storages().map(ArchetypeStorage::len).sum()
    }

    /// Checks if every matching archetype is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storages().all(ArchetypeStorage::is_empty)
    }
}

impl fmt::Debug for View<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("archetypes", &self.archetypes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::CatalogBuilder;

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Position(f32, f32);

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Velocity(f32, f32);

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Tag;

    fn catalog() -> SchemaCatalog {
        CatalogBuilder::new()
            .archetype::<(Position,)>()
            .archetype::<(Position, Velocity)>()
            .archetype::<(Velocity,)>()
            .archetype::<()>()
            .build()
            .unwrap()
    }

    #[test]
    fn test_create_routes_to_exact_archetype() {
        let mut engine = Engine::new(catalog());
        let e = engine.create((Velocity(1.0, 0.0), Position(0.0, 0.0))).unwrap();

        let pv = engine.catalog().exact(&Signature::of::<(Position, Velocity)>()).unwrap();
        assert_eq!(engine.storage(pv).unwrap().len(), 1);
        assert_eq!(engine.view::<(Position, Velocity)>().locate(e), Some(pv));
    }

    #[test]
    fn test_create_unknown_archetype() {
        let mut engine = Engine::new(catalog());
        let err = engine.create((Tag,)).unwrap_err();
        assert!(matches!(err, EngineError::UnknownArchetype { .. }));
        assert_eq!(engine.allocator().peek(), Entity::from_raw(0));
    }

    #[test]
    fn test_failed_create_recycles_identifier() {
        let mut engine = Engine::new(catalog());
        let err = engine.create((Position::default(), Position::default())).unwrap_err();
        assert!(matches!(err, EngineError::ConflictingComponents(_)));
        assert_eq!(engine.allocator().reusable(), 1);
        assert!(engine.is_empty::<()>());
    }

    #[test]
    fn test_create_empty_entity() {
        let mut engine = Engine::new(catalog());
        let e = engine.create(()).unwrap();
        assert!(engine.has::<()>(e));
        assert!(!engine.has::<(Position,)>(e));
        engine.destroy::<()>(e).unwrap();
        assert!(!engine.has::<()>(e));
    }

    #[test]
    fn test_size_counts_supersets() {
        let mut engine = Engine::new(catalog());
        engine.create((Position::default(),)).unwrap();
        engine.create((Position::default(), Velocity::default())).unwrap();
        engine.create((Velocity::default(),)).unwrap();
        engine.create(()).unwrap();

        assert_eq!(engine.size::<(Position,)>(), 2);
        assert_eq!(engine.size::<(Velocity,)>(), 2);
        assert_eq!(engine.size::<(Velocity, Position)>(), 1);
        assert_eq!(engine.size::<()>(), 4);
        assert!(engine.is_empty::<(Tag,)>());
    }

    #[test]
    fn test_destroy_narrows_search() {
        let mut engine = Engine::new(catalog());
        let e = engine.create((Position(1.0, 1.0), Velocity(0.0, 0.0))).unwrap();

        assert_eq!(engine.destroy::<(Velocity,)>(e), Ok(()));
        assert!(!engine.has::<()>(e));
        assert_eq!(engine.destroy::<()>(e), Err(EngineError::NotFound(e)));
    }

    #[test]
    fn test_destroy_outside_named_set() {
        let mut engine = Engine::new(catalog());
        let e = engine.create((Position::default(),)).unwrap();

        assert_eq!(engine.destroy::<(Velocity,)>(e), Err(EngineError::NotFound(e)));
        assert!(engine.has::<(Position,)>(e));
    }

    #[test]
    fn test_destroy_recycles_identifier() {
        let mut engine = Engine::new(catalog());
        let a = engine.create((Position::default(),)).unwrap();
        let _b = engine.create((Position::default(),)).unwrap();

        engine.destroy::<(Position,)>(a).unwrap();
        let c = engine.create((Velocity::default(),)).unwrap();
        assert_eq!(c, a);
        assert!(engine.has::<(Velocity,)>(c));
        assert!(!engine.has::<(Position,)>(c));
    }

    #[test]
    fn test_get_and_get_mut() {
        let mut engine = Engine::new(catalog());
        let e = engine.create((Position(1.0, 2.0), Velocity(3.0, 4.0))).unwrap();

        assert_eq!(engine.get::<Velocity>(e), Ok(&Velocity(3.0, 4.0)));
        engine.get_mut::<Position>(e).unwrap().0 = 9.0;
        assert_eq!(engine.get::<Position>(e), Ok(&Position(9.0, 2.0)));
        assert_eq!(engine.get::<Tag>(e), Err(EngineError::NotFound(e)));
        assert_eq!(
            engine.get_mut::<Tag>(e).map(|_| ()),
            Err(EngineError::NotFound(e))
        );
    }

    #[test]
    fn test_for_each_mutates_in_place() {
        let mut engine = Engine::new(catalog());
        let moving = engine.create((Position(0.0, 0.0), Velocity(1.0, 2.0))).unwrap();
        let still = engine.create((Position(5.0, 5.0),)).unwrap();

        engine
            .for_each::<(&mut Position, &Velocity), _>(|_, (pos, vel)| {
                pos.0 += vel.0;
                pos.1 += vel.1;
            })
            .unwrap();

        assert_eq!(engine.get::<Position>(moving), Ok(&Position(1.0, 2.0)));
        assert_eq!(engine.get::<Position>(still), Ok(&Position(5.0, 5.0)));
    }

    #[test]
    fn test_for_each_visits_each_row_once() {
        let mut engine = Engine::new(catalog());
        let mut expected = Vec::new();
        for i in 0..10 {
            expected.push(engine.create((Position(i as f32, 0.0),)).unwrap());
            engine.create((Velocity::default(),)).unwrap();
        }
        expected.push(engine.create((Position::default(), Velocity::default())).unwrap());

        let mut seen = Vec::new();
        engine
            .for_each::<&Position, _>(|entity, _| seen.push(entity))
            .unwrap();
        seen.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_query_visits_exact_archetype_first() {
        let mut engine = Engine::new(catalog());
        let superset = engine.create((Position::default(), Velocity(1.0, 0.0))).unwrap();
        let exact = engine.create((Velocity(2.0, 0.0),)).unwrap();
        engine.create((Position::default(),)).unwrap();

        let order: Vec<Entity> = engine
            .query::<&Velocity>()
            .unwrap()
            .map(|(entity, _)| entity)
            .collect();
        assert_eq!(order, vec![exact, superset]);
    }

    #[test]
    fn test_for_each_rejects_aliasing() {
        let mut engine = Engine::new(catalog());
        let result = engine.for_each::<(&Position, &mut Position), _>(|_, _| {});
        assert!(matches!(result, Err(EngineError::ConflictingComponents(_))));
    }

    #[test]
    fn test_destroy_all() {
        let mut engine = Engine::new(catalog());
        for _ in 0..5 {
            engine.create((Position::default(),)).unwrap();
            engine.create((Velocity::default(),)).unwrap();
        }

        engine.destroy_all();
        assert!(engine.is_empty::<()>());
        assert_eq!(engine.allocator().peek(), Entity::from_raw(0));
        assert_eq!(engine.create((Velocity::default(),)).unwrap(), Entity::from_raw(0));
        assert_eq!(engine.size::<()>(), 1);
    }

    #[test]
    fn test_optimize_keeps_data() {
        let mut engine = Engine::new(catalog());
        let entities: Vec<Entity> = (0..100)
            .map(|i| engine.create((Position(i as f32, 0.0),)).unwrap())
            .collect();
        for &e in &entities[..90] {
            engine.destroy::<(Position,)>(e).unwrap();
        }

        engine.optimize();
        let p = engine.catalog().exact(&Signature::of::<(Position,)>()).unwrap();
        assert_eq!(engine.storage(p).unwrap().capacity(), 10);
        for (i, &e) in entities.iter().enumerate().skip(90) {
            assert_eq!(engine.get::<Position>(e), Ok(&Position(i as f32, 0.0)));
        }
    }

    #[test]
    fn test_shared_index_map_policy() {
        let engine = Engine::new(catalog());
        let maps: Vec<_> = engine.storages().iter().map(ArchetypeStorage::index_map).collect();
        assert!(maps.iter().all(|&map| map == maps[0]));
        assert_eq!(engine.index_maps().live(), 1);
        assert_eq!(engine.index_maps()[maps[0]].ref_count(), 4);
    }

    #[test]
    fn test_per_archetype_index_map_policy() {
        let config = EngineConfig {
            index_maps: IndexMapPolicy::PerArchetype,
            initial_capacity: 64,
        };
        let mut engine = Engine::with_config(catalog(), config).unwrap();
        assert_eq!(engine.index_maps().live(), 4);
        assert!(engine.storages().iter().all(|s| s.capacity() == 64));

        let a = engine.create((Position::default(),)).unwrap();
        let b = engine.create((Velocity::default(),)).unwrap();
        assert!(engine.has::<(Position,)>(a));
        assert!(engine.has::<(Velocity,)>(b));
        assert!(!engine.has::<(Velocity,)>(a));
    }

    #[test]
    fn test_view_is_reusable() {
        let mut engine = Engine::new(catalog());
        let e = engine.create((Position::default(), Velocity::default())).unwrap();

        let view = engine.view::<(Position,)>();
        assert_eq!(view.archetypes().len(), 2);
        assert!(view.contains(e));
        assert_eq!(view.size(), 1);
        assert_eq!(view.clone().size(), 1);
        assert!(!view.is_empty());
    }
}
