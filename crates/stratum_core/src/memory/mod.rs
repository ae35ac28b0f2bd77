//! # Memory Management
//!
//! Identifier recycling and the shared entity-to-position maps used by
//! archetype storages.
//!
//! ## Design Philosophy
//!
//! Growth happens in large geometric steps and shrinking only on request:
//! - No allocation on the common insert/erase path once warmed up
//! - Explicit, caller-invoked compaction

mod arena;
mod pool;

pub use arena::{IndexMap, IndexMapArena, IndexMapId, INVALID_POSITION, PAGE_ENTRIES};
pub use pool::{EntityAllocator, FIXED_TIER_BYTES};
