//! # Error Types
//!
//! Two tiers of failure:
//! - [`SchemaError`] is raised while a catalog is being built, before any
//!   engine exists.
//! - [`EngineError`] is raised by engine operations that search across
//!   storages or allocate.
//!
//! Hot storage paths do not return errors for precondition violations.

use thiserror::Error;

use crate::ecs::Entity;

/// Errors detected while validating a schema catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A single archetype names the same component more than once.
    #[error("archetype {archetype} lists component `{component}` more than once")]
    DuplicateComponent {
        /// Registration index of the offending archetype.
        archetype: usize,
        /// Name of the repeated component type.
        component: &'static str,
    },

    /// Two archetypes describe the same set of components.
    #[error("archetype {second} has the same component set as archetype {first}")]
    DuplicateArchetype {
        /// Registration index of the first archetype.
        first: usize,
        /// Registration index of the duplicate.
        second: usize,
    },

    /// The catalog was built without any archetype.
    #[error("catalog has no archetypes")]
    Empty,
}

/// Errors raised by engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Catalog validation failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// No archetype has exactly the requested component set.
    #[error("no archetype matches component set {components}")]
    UnknownArchetype {
        /// Human readable component set.
        components: String,
    },

    /// The entity is not stored in any archetype that was searched.
    #[error("entity {0} not found")]
    NotFound(Entity),

    /// A component is not part of the target archetype.
    #[error("component `{component}` is not part of archetype {archetype}")]
    ComponentNotInArchetype {
        /// Name of the component type.
        component: &'static str,
        /// Target archetype index.
        archetype: usize,
    },

    /// The same component type was requested twice in one bundle or query.
    #[error("component `{0}` requested more than once")]
    ConflictingComponents(&'static str),

    /// The identifier space is used up.
    #[error("entity identifier space exhausted")]
    Exhausted,

    /// A backing allocation could not be satisfied.
    #[error("out of memory while growing {what}")]
    OutOfMemory {
        /// Which structure was growing.
        what: &'static str,
    },
}

/// Errors raised while reading an engine configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The document is not valid TOML or does not fit the configuration shape.
    #[error("invalid configuration: {0}")]
    Parse(String),
}

/// Result type for catalog construction.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
