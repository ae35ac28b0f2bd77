//! # Entity Component Storage
//!
//! Archetype-grouped, sparse-set storage with catalog-driven queries.
//!
//! ## Design Philosophy
//!
//! - Schemas are fixed and validated before the engine exists
//! - Every archetype stores its components in parallel dense columns
//! - Entity ids are plain integers; liveness is decided by storage lookups
//! - Type-set resolution is cached, never recomputed per row

pub mod archetype;
mod bundle;
mod catalog;
mod component;
mod entity;
mod query;
mod storage;
mod world;

pub use archetype::{ArchetypeId, ArchetypeStorage, ColumnWriter, Row, Rows, Signature};
pub use bundle::{Bundle, ComponentSet};
pub use catalog::{CatalogBuilder, CatalogEntry, SchemaCatalog};
pub use component::{Component, ComponentId, ComponentInfo};
pub use entity::Entity;
pub use query::{query_signature, Query, QueryIter, QueryTerm};
pub use storage::{Column, ErasedColumn};
pub use world::{Engine, View};
