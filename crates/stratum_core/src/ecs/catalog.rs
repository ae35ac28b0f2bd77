//! # Schema Catalog
//!
//! The fixed set of archetypes an engine is built from. Schemas are
//! declared once, validated in [`CatalogBuilder::build`], and never change
//! afterwards, so every resolution can be memoized.
//!
//! ```rust
//! use stratum_core::{CatalogBuilder, Signature};
//!
//! #[derive(Default)]
//! struct Position(f32, f32);
//! #[derive(Default)]
//! struct Velocity(f32, f32);
//!
//! let catalog = CatalogBuilder::new()
//!     .archetype::<(Position,)>()
//!     .archetype::<(Position, Velocity)>()
//!     .build()?;
//!
//! assert!(catalog.exact(&Signature::of::<(Velocity, Position)>()).is_some());
//! assert_eq!(catalog.matching(&Signature::of::<(Position,)>()).len(), 2);
//! # Ok::<(), stratum_core::SchemaError>(())
//! ```

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::archetype::{ArchetypeId, Signature};
use super::bundle::ComponentSet;
use super::component::ComponentInfo;
use crate::error::{SchemaError, SchemaResult};

/// Collects archetype schemas before validation.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    schemas: Vec<Vec<ComponentInfo>>,
}

impl CatalogBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the archetype made of the components of `S`.
    #[must_use]
    pub fn archetype<S: ComponentSet>(mut self) -> Self {
        self.schemas.push(S::components());
        self
    }

    /// Registers an archetype from explicit component descriptions.
    #[must_use]
    pub fn archetype_with(mut self, components: Vec<ComponentInfo>) -> Self {
        self.schemas.push(components);
        self
    }

    /// Validates the schemas and freezes them into a catalog.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::Empty`] if no archetype was registered
    /// - [`SchemaError::DuplicateComponent`] if a schema repeats a component
    /// - [`SchemaError::DuplicateArchetype`] if two schemas are equal as sets
    pub fn build(self) -> SchemaResult<SchemaCatalog> {
        if self.schemas.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut entries = Vec::with_capacity(self.schemas.len());
        let mut exact = HashMap::with_capacity(self.schemas.len());

        for (index, mut components) in self.schemas.into_iter().enumerate() {
            components.sort_unstable_by_key(ComponentInfo::id);
            if let Some(pair) = components.windows(2).find(|pair| pair[0].id() == pair[1].id()) {
                return Err(SchemaError::DuplicateComponent {
                    archetype: index,
                    component: pair[0].id().name(),
                });
            }

            let signature = Signature::new(components.iter().map(ComponentInfo::id).collect());
            if let Some(first) = exact.insert(signature.clone(), ArchetypeId::new(index)) {
                return Err(SchemaError::DuplicateArchetype {
                    first: first.index(),
                    second: index,
                });
            }

            entries.push(CatalogEntry {
                signature,
                components,
            });
        }

        Ok(SchemaCatalog {
            entries,
            exact,
            by_signature: RefCell::default(),
            by_set: RefCell::default(),
        })
    }
}

/// One validated archetype schema.
#[derive(Debug)]
pub struct CatalogEntry {
    signature: Signature,
    components: Vec<ComponentInfo>,
}

impl CatalogEntry {
    /// Canonical signature.
    #[inline]
    #[must_use]
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Component descriptions in canonical order.
    #[inline]
    #[must_use]
    pub fn components(&self) -> &[ComponentInfo] {
        &self.components
    }
}

/// Validated, immutable set of archetype schemas.
///
/// Resolutions are cached on first use, so the catalog is not `Sync`.
#[derive(Debug)]
pub struct SchemaCatalog {
    /// Schemas in registration order.
    entries: Vec<CatalogEntry>,
    /// Exact-set lookup.
    exact: HashMap<Signature, ArchetypeId>,
    /// Superset matches per requested signature.
    by_signature: RefCell<HashMap<Signature, Rc<[ArchetypeId]>>>,
    /// Superset matches per component set type.
    by_set: RefCell<HashMap<TypeId, Rc<[ArchetypeId]>>>,
}

impl SchemaCatalog {
    /// Number of archetypes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if the catalog has no archetypes. Never true for a built catalog.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Schema of `id`.
    #[must_use]
    pub fn entry(&self, id: ArchetypeId) -> Option<&CatalogEntry> {
        self.entries.get(id.index())
    }

    /// Signature of `id`.
    #[must_use]
    pub fn signature(&self, id: ArchetypeId) -> Option<&Signature> {
        self.entry(id).map(CatalogEntry::signature)
    }

    /// Schemas with their identifiers, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (ArchetypeId, &CatalogEntry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (ArchetypeId::new(index), entry))
    }

    /// The archetype whose component set equals `signature`.
    #[inline]
    #[must_use]
    pub fn exact(&self, signature: &Signature) -> Option<ArchetypeId> {
        self.exact.get(signature).copied()
    }

    /// Every archetype containing all components of `signature`.
    ///
    /// Registration order, except that an exact match comes first. An empty
    /// signature matches every archetype. Results are cached.
    #[must_use]
    pub fn matching(&self, signature: &Signature) -> Rc<[ArchetypeId]> {
        if let Some(hit) = self.by_signature.borrow().get(signature) {
            return Rc::clone(hit);
        }

        let resolved = self.resolve(signature);
        self.by_signature
            .borrow_mut()
            .insert(signature.clone(), Rc::clone(&resolved));
        resolved
    }

    /// [`Self::matching`] keyed by a component set type.
    #[must_use]
    pub fn matching_set<S: ComponentSet>(&self) -> Rc<[ArchetypeId]> {
        let key = TypeId::of::<S>();
        if let Some(hit) = self.by_set.borrow().get(&key) {
            return Rc::clone(hit);
        }

        let resolved = self.matching(&Signature::of::<S>());
        self.by_set.borrow_mut().insert(key, Rc::clone(&resolved));
        resolved
    }

    fn resolve(&self, signature: &Signature) -> Rc<[ArchetypeId]> {
        let mut ids: Vec<ArchetypeId> = self
            .iter()
            .filter(|(_, entry)| entry.signature.is_superset_of(signature))
            .map(|(id, _)| id)
            .collect();

        if let Some(exact) = ids
            .iter()
            .position(|id| self.entries[id.index()].signature.len() == signature.len())
        {
            ids[..=exact].rotate_right(1);
        }

        tracing::trace!(
            request = %signature,
            matches = ids.len(),
            "resolved archetype set"
        );
        ids.into()
    }
}
