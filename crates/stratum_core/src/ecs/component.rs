//! # Component System
//!
//! Components are plain data records with no behavior. Any `'static` type
//! with a default value qualifies.

use std::any::{type_name, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::storage::{Column, ErasedColumn};

/// Marker trait for component types.
///
/// Components must be:
/// - `'static`: identified by [`TypeId`]
/// - `Default`: columns are default-filled when an insert omits them
///
/// Implemented for every qualifying type.
///
/// # Example
///
/// ```rust
/// use stratum_core::Component;
///
/// #[derive(Clone, Copy, Default)]
/// struct Position {
///     x: f32,
///     y: f32,
/// }
///
/// fn assert_component<T: Component>() {}
/// assert_component::<Position>();
/// ```
pub trait Component: Default + 'static {}

impl<T: Default + 'static> Component for T {}

/// Stable identifier of a component type.
///
/// Equality, hashing and ordering only consider the [`TypeId`]; the name is
/// carried for diagnostics.
#[derive(Clone, Copy)]
pub struct ComponentId {
    type_id: TypeId,
    name: &'static str,
}

impl ComponentId {
    /// Returns the identifier of `T`.
    #[inline]
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Underlying type identifier.
    #[inline]
    #[must_use]
    pub const fn type_id(self) -> TypeId {
        self.type_id
    }

    /// Type name, for diagnostics only.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }
}

impl PartialEq for ComponentId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ComponentId {}

impl Hash for ComponentId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl PartialOrd for ComponentId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComponentId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_id.cmp(&other.type_id)
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Everything needed to build a column for a component type.
#[derive(Clone, Copy)]
pub struct ComponentInfo {
    id: ComponentId,
    new_column: fn() -> Box<dyn ErasedColumn>,
}

impl ComponentInfo {
    /// Describes `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self {
            id: ComponentId::of::<T>(),
            new_column: || Box::new(Column::<T>::new()),
        }
    }

    /// Identifier of the described component.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ComponentId {
        self.id
    }

    /// Creates an empty column for the described component.
    #[must_use]
    pub fn new_column(&self) -> Box<dyn ErasedColumn> {
        (self.new_column)()
    }
}

impl fmt::Debug for ComponentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInfo").field("id", &self.id).finish()
    }
}
