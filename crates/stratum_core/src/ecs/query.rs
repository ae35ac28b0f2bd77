//! # Queries
//!
//! A query names the columns to project for each row: `&T` for shared
//! access, `&mut T` for in-place mutation, and tuples of those.
//!
//! ```rust,ignore
//! engine.for_each::<(&mut Position, &Velocity), _>(|_entity, (pos, vel)| {
//!     pos.x += vel.dx;
//! })?;
//! ```
//!
//! Each requested column is borrowed once per archetype and walked in
//! lock-step with the entity array, so projecting a row costs nothing
//! beyond advancing the column iterators.

use std::slice;

use super::archetype::Signature;
use super::component::{Component, ComponentId};
use super::entity::Entity;
use super::storage::{Column, ErasedColumn};
use crate::error::{EngineError, EngineResult};

/// A single projected column.
pub trait QueryTerm {
    /// Value yielded per row.
    type Item<'a>;
    /// Column cursor.
    type Fetch<'a>;

    /// Component read by this term.
    fn component() -> ComponentId;

    /// Starts a cursor over `column`.
    ///
    /// Returns `None` if the column stores another component.
    fn fetch_column<'a>(column: &'a mut Box<dyn ErasedColumn>) -> Option<Self::Fetch<'a>>;

    /// Advances the cursor by one row.
    fn next<'a>(fetch: &mut Self::Fetch<'a>) -> Option<Self::Item<'a>>;
}

impl<T: Component> QueryTerm for &T {
    type Item<'a> = &'a T;
    type Fetch<'a> = slice::Iter<'a, T>;

    fn component() -> ComponentId {
        ComponentId::of::<T>()
    }

    fn fetch_column<'a>(column: &'a mut Box<dyn ErasedColumn>) -> Option<Self::Fetch<'a>> {
        let column: &'a dyn ErasedColumn = &**column;
        Some(column.as_any().downcast_ref::<Column<T>>()?.as_slice().iter())
    }

    #[inline]
    fn next<'a>(fetch: &mut Self::Fetch<'a>) -> Option<Self::Item<'a>> {
        fetch.next()
    }
}

impl<T: Component> QueryTerm for &mut T {
    type Item<'a> = &'a mut T;
    type Fetch<'a> = slice::IterMut<'a, T>;

    fn component() -> ComponentId {
        ComponentId::of::<T>()
    }

    fn fetch_column<'a>(column: &'a mut Box<dyn ErasedColumn>) -> Option<Self::Fetch<'a>> {
        let column: &'a mut dyn ErasedColumn = &mut **column;
        Some(
            column
                .as_any_mut()
                .downcast_mut::<Column<T>>()?
                .as_mut_slice()
                .iter_mut(),
        )
    }

    #[inline]
    fn next<'a>(fetch: &mut Self::Fetch<'a>) -> Option<Self::Item<'a>> {
        fetch.next()
    }
}

/// A projection of rows: one term or a tuple of terms.
pub trait Query {
    /// Value yielded per row.
    type Item<'a>;
    /// Cursor over one archetype.
    type Fetch<'a>;

    /// Components read by the query, in declaration order.
    fn components() -> Vec<ComponentId>;

    /// Starts a cursor over the columns of one archetype.
    ///
    /// Returns `None` if a requested component has no column.
    fn fetch<'a>(columns: &'a mut [Box<dyn ErasedColumn>]) -> Option<Self::Fetch<'a>>;

    /// Advances the cursor by one row.
    fn next<'a>(fetch: &mut Self::Fetch<'a>) -> Option<Self::Item<'a>>;
}

macro_rules! impl_single_query {
    ($($term:ty),+) => {
        $(
            impl<T: Component> Query for $term {
                type Item<'a> = <Self as QueryTerm>::Item<'a>;
                type Fetch<'a> = <Self as QueryTerm>::Fetch<'a>;

                fn components() -> Vec<ComponentId> {
                    vec![ComponentId::of::<T>()]
                }

                fn fetch<'a>(columns: &'a mut [Box<dyn ErasedColumn>]) -> Option<Self::Fetch<'a>> {
                    let id = ComponentId::of::<T>();
                    columns
                        .iter_mut()
                        .find(|column| column.component() == id)
                        .and_then(<Self as QueryTerm>::fetch_column)
                }

                #[inline]
                fn next<'a>(fetch: &mut Self::Fetch<'a>) -> Option<Self::Item<'a>> {
                    <Self as QueryTerm>::next(fetch)
                }
            }
        )+
    };
}

impl_single_query!(&T, &mut T);

impl Query for () {
    type Item<'a> = ();
    type Fetch<'a> = ();

    fn components() -> Vec<ComponentId> {
        Vec::new()
    }

    fn fetch<'a>(_columns: &'a mut [Box<dyn ErasedColumn>]) -> Option<Self::Fetch<'a>> {
        Some(())
    }

    #[inline]
    fn next<'a>(_fetch: &mut Self::Fetch<'a>) -> Option<Self::Item<'a>> {
        Some(())
    }
}

macro_rules! impl_tuple_query {
    ($($name:ident $fetch:ident),+) => {
        impl<$($name: QueryTerm),+> Query for ($($name,)+) {
            type Item<'a> = ($(<$name as QueryTerm>::Item<'a>,)+);
            type Fetch<'a> = ($(<$name as QueryTerm>::Fetch<'a>,)+);

            fn components() -> Vec<ComponentId> {
                vec![$(<$name as QueryTerm>::component()),+]
            }

            fn fetch<'a>(columns: &'a mut [Box<dyn ErasedColumn>]) -> Option<Self::Fetch<'a>> {
                $(let mut $fetch: Option<<$name as QueryTerm>::Fetch<'a>> = None;)+

                // Each column is handed to the first unfilled term asking for it.
                for column in columns.iter_mut() {
                    let id = column.component();
                    $(
                        if $fetch.is_none() && id == <$name as QueryTerm>::component() {
                            $fetch = <$name as QueryTerm>::fetch_column(column);
                            continue;
                        }
                    )+
                }

                Some(($($fetch?,)+))
            }

            #[inline]
            fn next<'a>(fetch: &mut Self::Fetch<'a>) -> Option<Self::Item<'a>> {
                let ($($fetch,)+) = fetch;
                Some(($(<$name as QueryTerm>::next($fetch)?,)+))
            }
        }
    };
}

impl_tuple_query!(A a);
impl_tuple_query!(A a, B b);
impl_tuple_query!(A a, B b, C c);
impl_tuple_query!(A a, B b, C c, D d);
impl_tuple_query!(A a, B b, C c, D d, E e);
impl_tuple_query!(A a, B b, C c, D d, E e, F f);
impl_tuple_query!(A a, B b, C c, D d, E e, F f, G g);
impl_tuple_query!(A a, B b, C c, D d, E e, F f, G g, H h);

/// Canonical signature of `Q`.
///
/// # Errors
///
/// Returns [`EngineError::ConflictingComponents`] if `Q` names a component
/// twice, since that would alias one column.
pub fn query_signature<Q: Query>() -> EngineResult<Signature> {
    let mut requested = Q::components();
    requested.sort_unstable();
    if let Some(pair) = requested.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(EngineError::ConflictingComponents(pair[0].name()));
    }
    Ok(Signature::new(requested))
}

/// Iterator over the rows of one archetype, projected through `Q`.
pub struct QueryIter<'a, Q: Query> {
    entities: slice::Iter<'a, Entity>,
    fetch: Q::Fetch<'a>,
}

impl<'a, Q: Query> QueryIter<'a, Q> {
    /// Starts iterating `entities` alongside `columns`.
    ///
    /// Returns `None` if a requested component has no column.
    pub fn new(entities: &'a [Entity], columns: &'a mut [Box<dyn ErasedColumn>]) -> Option<Self> {
        Some(Self {
            entities: entities.iter(),
            fetch: Q::fetch(columns)?,
        })
    }
}

impl<'a, Q: Query> Iterator for QueryIter<'a, Q> {
    type Item = (Entity, Q::Item<'a>);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let entity = *self.entities.next()?;
        let item = Q::next(&mut self.fetch)?;
        Some((entity, item))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entities.size_hint()
    }
}
