//! # Column Storage
//!
//! One dense, contiguous array per component type. Archetype storages keep
//! their columns behind the object-safe [`ErasedColumn`] trait so every
//! structural operation (grow, push, swap-remove, truncate, shrink) is
//! applied uniformly to all of them.

use std::any::Any;

use super::component::{Component, ComponentId};
use crate::error::{EngineError, EngineResult};

/// Type-erased view of a [`Column`].
pub trait ErasedColumn: Any {
    /// Upcast for downcasting to the concrete column.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete column.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Component stored in this column.
    fn component(&self) -> ComponentId;

    /// Number of stored values.
    fn len(&self) -> usize;

    /// Checks if the column is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reserves room for exactly `additional` more values.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OutOfMemory`] if the allocation fails.
    fn reserve_exact(&mut self, additional: usize) -> EngineResult<()>;

    /// Appends a default value.
    fn push_default(&mut self);

    /// Moves the last value into `position` and drops the value there.
    fn swap_remove(&mut self, position: usize);

    /// Drops every value at or past `len`.
    fn truncate(&mut self, len: usize);

    /// Releases unused capacity.
    fn shrink_to_fit(&mut self);
}

/// Dense array of one component type.
#[derive(Debug, Default)]
pub struct Column<T> {
    data: Vec<T>,
}

impl<T: Component> Column<T> {
    /// Creates an empty column.
    #[must_use]
    pub const fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Appends a value.
    #[inline]
    pub fn push(&mut self, value: T) {
        self.data.push(value);
    }

    /// Returns the value at `position`.
    #[inline]
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&T> {
        self.data.get(position)
    }

    /// Returns the value at `position` mutably.
    #[inline]
    pub fn get_mut(&mut self, position: usize) -> Option<&mut T> {
        self.data.get_mut(position)
    }

    /// All values in dense order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// All values in dense order, mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Allocated capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }
}

impl<T: Component> ErasedColumn for Column<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn component(&self) -> ComponentId {
        ComponentId::of::<T>()
    }

    #[inline]
    fn len(&self) -> usize {
        self.data.len()
    }

    fn reserve_exact(&mut self, additional: usize) -> EngineResult<()> {
        self.data
            .try_reserve_exact(additional)
            .map_err(|_| EngineError::OutOfMemory { what: "component column" })
    }

    #[inline]
    fn push_default(&mut self) {
        self.data.push(T::default());
    }

    #[inline]
    fn swap_remove(&mut self, position: usize) {
        self.data.swap_remove(position);
    }

    fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    fn shrink_to_fit(&mut self) {
        self.data.shrink_to_fit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_swap_remove() {
        let mut column = Column::<u32>::new();
        for i in 0..4 {
            column.push(i);
        }

        let erased: &mut dyn ErasedColumn = &mut column;
        erased.swap_remove(1);
        assert_eq!(erased.len(), 3);
        assert_eq!(column.as_slice(), &[0, 3, 2]);
    }

    #[test]
    fn test_column_push_default_and_truncate() {
        let mut column = Column::<String>::new();
        column.push("a".to_owned());

        let erased: &mut dyn ErasedColumn = &mut column;
        erased.push_default();
        assert_eq!(erased.len(), 2);
        erased.truncate(1);
        assert_eq!(column.as_slice(), &["a".to_owned()]);
    }

    #[test]
    fn test_column_reserve_and_shrink() {
        let mut column = Column::<u64>::new();
        column.reserve_exact(100).unwrap();
        assert!(column.capacity() >= 100);

        column.push(1);
        ErasedColumn::shrink_to_fit(&mut column);
        assert!(column.capacity() < 100);
    }

    #[test]
    fn test_column_downcast() {
        let boxed: Box<dyn ErasedColumn> = Box::new(Column::<i16>::new());
        assert!(boxed.as_any().downcast_ref::<Column<i16>>().is_some());
        assert!(boxed.as_any().downcast_ref::<Column<i32>>().is_none());
        assert_eq!(boxed.component(), ComponentId::of::<i16>());
    }
}
