use alloc::borrow::Cow;
use alloc::collections::BTreeSet;
use alloc::format;
use core::any::Any;
use core::hash::Hash;
use core::marker::PhantomData;
use std::collections::HashSet as StdHashSet;

use uuid::Uuid;
use vc_utils::hash::HashSet;

use crate::container::{ContainerAdapter, ElementInstance, ElementRef, ReservedElement};
use crate::impls::template;
use crate::reflection::{Reflect, TypeUuid, generic_uuid};
use crate::registry::{ClassElement, TypeRegistry};

// -----------------------------------------------------------------------------
// SetStorage

/// A set the [`SetAdapter`] can drive.
pub trait SetStorage: Any {
    type Item: Reflect;

    fn len(&self) -> usize;

    /// Inserts `item`. A value already present is kept as is.
    fn insert_item(&mut self, item: Self::Item);

    /// Removes the element at `index` in iteration order.
    fn remove_nth(&mut self, index: usize) -> bool {
        let before = self.len();
        let mut current = 0;
        self.retain_items(&mut |_| {
            let keep = current != index;
            current += 1;
            keep
        });
        self.len() != before
    }

    fn retain_items(&mut self, keep: &mut dyn FnMut(&Self::Item) -> bool);

    fn clear_items(&mut self);

    fn items(&self) -> impl Iterator<Item = &Self::Item>;
}

impl<T: Reflect + Ord> SetStorage for BTreeSet<T> {
    type Item = T;

    #[inline]
    fn len(&self) -> usize {
        BTreeSet::len(self)
    }

    #[inline]
    fn insert_item(&mut self, item: T) {
        self.insert(item);
    }

    fn retain_items(&mut self, keep: &mut dyn FnMut(&T) -> bool) {
        self.retain(|item| keep(item));
    }

    #[inline]
    fn clear_items(&mut self) {
        self.clear();
    }

    #[inline]
    fn items(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }
}

impl<T: Reflect + Eq + Hash> SetStorage for StdHashSet<T> {
    type Item = T;

    #[inline]
    fn len(&self) -> usize {
        StdHashSet::len(self)
    }

    #[inline]
    fn insert_item(&mut self, item: T) {
        self.insert(item);
    }

    fn retain_items(&mut self, keep: &mut dyn FnMut(&T) -> bool) {
        self.retain(|item| keep(item));
    }

    #[inline]
    fn clear_items(&mut self) {
        self.clear();
    }

    #[inline]
    fn items(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }
}

impl<T: Reflect + Eq + Hash> SetStorage for HashSet<T> {
    type Item = T;

    #[inline]
    fn len(&self) -> usize {
        HashSet::len(self)
    }

    #[inline]
    fn insert_item(&mut self, item: T) {
        self.insert(item);
    }

    fn retain_items(&mut self, keep: &mut dyn FnMut(&T) -> bool) {
        self.retain(|item| keep(item));
    }

    #[inline]
    fn clear_items(&mut self) {
        self.clear();
    }

    #[inline]
    fn items(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }
}

// -----------------------------------------------------------------------------
// SetAdapter

/// [`ContainerAdapter`] of every [`SetStorage`].
pub struct SetAdapter<C> {
    element: ClassElement,
    _marker: PhantomData<fn() -> C>,
}

impl<C: SetStorage> SetAdapter<C> {
    pub fn new() -> Self {
        Self {
            element: ClassElement::for_container::<C::Item>("element"),
            _marker: PhantomData,
        }
    }
}

impl<C: SetStorage> Default for SetAdapter<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: SetStorage> ContainerAdapter for SetAdapter<C> {
    fn element(&self, name_crc: u32) -> Option<&ClassElement> {
        (self.element.name_crc() == name_crc).then_some(&self.element)
    }

    fn enum_types(&self, f: &mut dyn FnMut(&ClassElement)) {
        f(&self.element);
    }

    fn size(&self, instance: &dyn Any) -> usize {
        instance.downcast_ref::<C>().map_or(0, C::len)
    }

    fn reserve_element(
        &self,
        instance: &mut dyn Any,
        _element: Option<&ClassElement>,
    ) -> Option<ReservedElement> {
        let set = instance.downcast_mut::<C>()?;
        Some(ReservedElement::new(set.len()))
    }

    fn store_element(
        &self,
        instance: &mut dyn Any,
        _reserved: ReservedElement,
        value: ElementInstance,
        registry: &TypeRegistry,
    ) -> Result<(), ElementInstance> {
        let Some(set) = instance.downcast_mut::<C>() else {
            return Err(value);
        };
        let value = value.into_value()?;
        let item = C::Item::from_element(value, registry).map_err(ElementInstance::Value)?;
        set.insert_item(item);
        Ok(())
    }

    fn enum_elements<'a>(
        &'a self,
        instance: &'a dyn Any,
        visit: &mut dyn FnMut(ElementRef<'a>) -> bool,
    ) {
        let Some(set) = instance.downcast_ref::<C>() else {
            return;
        };
        for item in set.items() {
            let element = ElementRef::Value {
                value: item.as_element(),
                element: &self.element,
            };
            if !visit(element) {
                break;
            }
        }
    }

    fn remove_element(
        &self,
        instance: &mut dyn Any,
        index: usize,
        _registry: Option<&TypeRegistry>,
    ) -> bool {
        instance
            .downcast_mut::<C>()
            .is_some_and(|set| set.remove_nth(index))
    }

    fn clear_elements(&self, instance: &mut dyn Any, _registry: Option<&TypeRegistry>) {
        if let Some(set) = instance.downcast_mut::<C>() {
            set.clear_items();
        }
    }
}

// -----------------------------------------------------------------------------
// Reflect

macro_rules! impl_set {
    ($template:expr, $name:literal, $ty:ty, $($bound:tt)+) => {
        impl<T: Reflect + $($bound)+> TypeUuid for $ty {
            fn type_uuid() -> Uuid {
                generic_uuid($template, &[T::type_uuid()])
            }

            fn type_name() -> Cow<'static, str> {
                Cow::Owned(format!(concat!($name, "<{}>"), T::type_name()))
            }
        }

        impl<T: Reflect + $($bound)+> Reflect for $ty {
            fn reflect(registry: &mut TypeRegistry) {
                registry.reflect_dependency::<T>();
                registry.class::<Self>().container(SetAdapter::<Self>::new());
            }
        }
    };
}

impl_set!(template::BTREE_SET, "BTreeSet", BTreeSet<T>, Ord);
impl_set!(template::HASH_SET, "HashSet", StdHashSet<T>, Eq + Hash);
impl_set!(template::FIXED_HASH_SET, "hashbrown::HashSet", HashSet<T>, Eq + Hash);

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeSet;
    use alloc::vec::Vec;

    use crate::reflection::TypeUuid;
    use crate::registry::TypeRegistry;

    #[test]
    fn remove_by_iteration_position() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<BTreeSet<i32>>();
        let class = registry.class_of::<BTreeSet<i32>>().unwrap();
        let container = class.container().unwrap();

        let mut set: BTreeSet<i32> = [30, 10, 20].into_iter().collect();
        assert!(container.remove_element(&mut set, 1, None));
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), [10, 30]);
        assert!(!container.remove_element(&mut set, 2, None));
    }

    #[test]
    fn std_and_hashbrown_sets_differ() {
        type Std = std::collections::HashSet<u8>;
        type Fixed = vc_utils::hash::HashSet<u8>;
        assert_ne!(Std::type_uuid(), Fixed::type_uuid());
    }
}
