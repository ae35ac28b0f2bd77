//! # Component Sets and Bundles
//!
//! A [`ComponentSet`] names a group of component types, for example the
//! schema of an archetype or the types a lookup is narrowed to. A
//! [`Bundle`] is a set of component values inserted together.
//!
//! Both are implemented for `()` and tuples of up to eight components.

use super::archetype::ColumnWriter;
use super::component::{Component, ComponentInfo};

/// A statically known group of component types.
pub trait ComponentSet: 'static {
    /// Components in declaration order. May contain repeats.
    fn components() -> Vec<ComponentInfo>;
}

/// A group of component values written into one row.
pub trait Bundle: ComponentSet {
    /// Pushes every value through `writer`.
    fn write(self, writer: &mut ColumnWriter<'_>);
}

impl ComponentSet for () {
    fn components() -> Vec<ComponentInfo> {
        Vec::new()
    }
}

impl Bundle for () {
    fn write(self, _writer: &mut ColumnWriter<'_>) {}
}

macro_rules! impl_bundle {
    ($($name:ident $value:ident),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            fn components() -> Vec<ComponentInfo> {
                vec![$(ComponentInfo::of::<$name>()),+]
            }
        }

        impl<$($name: Component),+> Bundle for ($($name,)+) {
            fn write(self, writer: &mut ColumnWriter<'_>) {
                let ($($value,)+) = self;
                $(writer.push($value);)+
            }
        }
    };
}

impl_bundle!(A a);
impl_bundle!(A a, B b);
impl_bundle!(A a, B b, C c);
impl_bundle!(A a, B b, C c, D d);
impl_bundle!(A a, B b, C c, D d, E e);
impl_bundle!(A a, B b, C c, D d, E e, F f);
impl_bundle!(A a, B b, C c, D d, E e, F f, G g);
impl_bundle!(A a, B b, C c, D d, E e, F f, G g, H h);
