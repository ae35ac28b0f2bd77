//! # Stratum Core
//!
//! In-process archetype storage engine. Component records keyed by integer
//! entity ids are grouped by their exact component set into densely packed
//! columns, so any subset of component types can be scanned linearly.
//!
//! ## Building Blocks
//!
//! 1. **Entity allocator** - issues ids and recycles released ones (LIFO)
//! 2. **Index maps** - entity-to-position arrays, shareable between archetypes
//! 3. **Archetype storage** - sparse-set insert/erase/lookup over parallel columns
//! 4. **Schema catalog** - the validated archetype set and type-set resolution
//! 5. **Engine** - creation, destruction, lookup, counting and iteration
//!
//! ## Example
//!
//! ```rust
//! use stratum_core::{CatalogBuilder, Engine};
//!
//! #[derive(Clone, Copy, Default)]
//! struct Health(u32);
//!
//! let catalog = CatalogBuilder::new().archetype::<(Health,)>().build()?;
//! let mut engine = Engine::new(catalog);
//!
//! let e = engine.create((Health(10),))?;
//! assert!(engine.has::<(Health,)>(e));
//!
//! engine.destroy::<(Health,)>(e)?;
//! assert!(engine.is_empty::<(Health,)>());
//! # Ok::<(), stratum_core::EngineError>(())
//! ```
//!
//! The engine is single-threaded; wrap it externally if it must be shared.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;

pub use config::{EngineConfig, IndexMapPolicy};
pub use ecs::{
    ArchetypeId, ArchetypeStorage, Bundle, CatalogBuilder, Component, ComponentId,
    ComponentInfo, ComponentSet, Engine, Entity, Query, SchemaCatalog, Signature, View,
};
pub use error::{ConfigError, EngineError, EngineResult, SchemaError, SchemaResult};
pub use memory::{EntityAllocator, IndexMap, IndexMapArena, IndexMapId};
