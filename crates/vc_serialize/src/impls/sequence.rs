use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::collections::{LinkedList, VecDeque};
use alloc::format;
use alloc::vec::Vec;
use core::any::Any;
use core::marker::PhantomData;

use uuid::Uuid;
use vc_utils::vec::StackVec;

use crate::container::{ContainerAdapter, ElementInstance, ElementRef, ReservedElement};
use crate::impls::template;
use crate::reflection::{Reflect, TypeUuid, generic_uuid};
use crate::registry::{ClassElement, TypeRegistry};

// -----------------------------------------------------------------------------
// SequenceStorage

/// A growable sequence the [`SequenceAdapter`] can drive.
pub trait SequenceStorage: Any {
    type Item: Reflect;

    /// Whether element addresses survive insertions.
    const STABLE: bool = false;
    /// Whether elements can be reached by index cheaply.
    const INDEXED: bool = true;

    /// The static capacity, if any.
    fn capacity_limit() -> Option<usize> {
        None
    }

    fn len(&self) -> usize;

    fn is_full(&self) -> bool {
        Self::capacity_limit().is_some_and(|limit| self.len() >= limit)
    }

    /// Appends `item`, giving it back when the sequence is full.
    fn push_item(&mut self, item: Self::Item) -> Result<(), Self::Item>;

    fn remove_item(&mut self, index: usize) -> bool;

    fn clear_items(&mut self);

    fn items(&self) -> impl Iterator<Item = &Self::Item>;
}

impl<T: Reflect> SequenceStorage for Vec<T> {
    type Item = T;

    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn push_item(&mut self, item: T) -> Result<(), T> {
        self.push(item);
        Ok(())
    }

    fn remove_item(&mut self, index: usize) -> bool {
        if index < self.len() {
            self.remove(index);
            return true;
        }
        false
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

impl<T: Reflect> SequenceStorage for VecDeque<T> {
    type Item = T;

    #[inline]
    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    #[inline]
    fn push_item(&mut self, item: T) -> Result<(), T> {
        self.push_back(item);
        Ok(())
    }

    #[inline]
    fn remove_item(&mut self, index: usize) -> bool {
        self.remove(index).is_some()
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

impl<T: Reflect> SequenceStorage for LinkedList<T> {
    type Item = T;

    const STABLE: bool = true;
    const INDEXED: bool = false;

    #[inline]
    fn len(&self) -> usize {
        LinkedList::len(self)
    }

    #[inline]
    fn push_item(&mut self, item: T) -> Result<(), T> {
        self.push_back(item);
        Ok(())
    }

    fn remove_item(&mut self, index: usize) -> bool {
        if index >= self.len() {
            return false;
        }
        let mut tail = self.split_off(index);
        tail.pop_front();
        self.append(&mut tail);
        true
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

impl<T: Reflect, const N: usize> SequenceStorage for StackVec<T, N> {
    type Item = T;

    #[inline]
    fn capacity_limit() -> Option<usize> {
        Some(N)
    }

    #[inline]
    fn len(&self) -> usize {
        StackVec::len(self)
    }

    #[inline]
    fn is_full(&self) -> bool {
        StackVec::is_full(self)
    }

    fn push_item(&mut self, item: T) -> Result<(), T> {
        if StackVec::is_full(self) {
            return Err(item);
        }
        self.push(item);
        Ok(())
    }

    fn remove_item(&mut self, index: usize) -> bool {
        if index < StackVec::len(self) {
            self.remove(index);
            return true;
        }
        false
    }

    fn clear_items(&mut self) {
        while self.pop().is_some() {}
    }

    #[inline]
    fn items(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }
}

// -----------------------------------------------------------------------------
// SequenceAdapter

/// [`ContainerAdapter`] of every [`SequenceStorage`].
///
/// The single slot descriptor is called `element`.
pub struct SequenceAdapter<C> {
    element: ClassElement,
    _marker: PhantomData<fn() -> C>,
}

impl<C: SequenceStorage> SequenceAdapter<C> {
    pub fn new() -> Self {
        Self {
            element: ClassElement::for_container::<C::Item>("element"),
            _marker: PhantomData,
        }
    }
}

impl<C: SequenceStorage> Default for SequenceAdapter<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: SequenceStorage> ContainerAdapter for SequenceAdapter<C> {
    fn element(&self, name_crc: u32) -> Option<&ClassElement> {
        (self.element.name_crc() == name_crc).then_some(&self.element)
    }

    fn enum_types(&self, f: &mut dyn FnMut(&ClassElement)) {
        f(&self.element);
    }

    fn size(&self, instance: &dyn Any) -> usize {
        instance.downcast_ref::<C>().map_or(0, C::len)
    }

    fn capacity(&self, _instance: &dyn Any) -> usize {
        C::capacity_limit().unwrap_or(usize::MAX)
    }

    fn is_fixed_capacity(&self) -> bool {
        C::capacity_limit().is_some()
    }

    fn is_stable_elements(&self) -> bool {
        C::STABLE
    }

    fn can_access_elements_by_index(&self) -> bool {
        C::INDEXED
    }

    fn reserve_element(
        &self,
        instance: &mut dyn Any,
        _element: Option<&ClassElement>,
    ) -> Option<ReservedElement> {
        let sequence = instance.downcast_mut::<C>()?;
        (!sequence.is_full()).then(|| ReservedElement::new(sequence.len()))
    }

    fn store_element(
        &self,
        instance: &mut dyn Any,
        _reserved: ReservedElement,
        value: ElementInstance,
        registry: &TypeRegistry,
    ) -> Result<(), ElementInstance> {
        let Some(sequence) = instance.downcast_mut::<C>() else {
            return Err(value);
        };
        let value = value.into_value()?;
        let item = C::Item::from_element(value, registry).map_err(ElementInstance::Value)?;
        sequence
            .push_item(item)
            .map_err(|item| ElementInstance::Value(Box::new(item)))
    }

    fn get_element<'a>(&'a self, instance: &'a dyn Any, index: usize) -> Option<ElementRef<'a>> {
        let item = instance.downcast_ref::<C>()?.items().nth(index)?;
        Some(ElementRef::Value {
            value: item.as_element(),
            element: &self.element,
        })
    }

    fn enum_elements<'a>(
        &'a self,
        instance: &'a dyn Any,
        visit: &mut dyn FnMut(ElementRef<'a>) -> bool,
    ) {
        let Some(sequence) = instance.downcast_ref::<C>() else {
            return;
        };
        for item in sequence.items() {
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
            .is_some_and(|sequence| sequence.remove_item(index))
    }

    fn clear_elements(&self, instance: &mut dyn Any, _registry: Option<&TypeRegistry>) {
        if let Some(sequence) = instance.downcast_mut::<C>() {
            sequence.clear_items();
        }
    }
}

// -----------------------------------------------------------------------------
// Reflect

macro_rules! impl_sequence {
    ($template:expr, $name:literal, $ty:ident) => {
        impl<T: Reflect> TypeUuid for $ty<T> {
            fn type_uuid() -> Uuid {
                generic_uuid($template, &[T::type_uuid()])
            }

            fn type_name() -> Cow<'static, str> {
                Cow::Owned(format!(concat!($name, "<{}>"), T::type_name()))
            }
        }

        impl<T: Reflect> Reflect for $ty<T> {
            fn reflect(registry: &mut TypeRegistry) {
                registry.reflect_dependency::<T>();
                registry
                    .class::<Self>()
                    .container(SequenceAdapter::<Self>::new());
            }
        }
    };
}

impl_sequence!(template::VEC, "Vec", Vec);
impl_sequence!(template::VEC_DEQUE, "VecDeque", VecDeque);
impl_sequence!(template::LINKED_LIST, "LinkedList", LinkedList);

impl<T: Reflect, const N: usize> TypeUuid for StackVec<T, N> {
    fn type_uuid() -> Uuid {
        let capacity = Uuid::from_u128(N as u128);
        generic_uuid(template::STACK_VEC, &[T::type_uuid(), capacity])
    }

    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("StackVec<{}, {N}>", T::type_name()))
    }
}

impl<T: Reflect, const N: usize> Reflect for StackVec<T, N> {
    fn reflect(registry: &mut TypeRegistry) {
        registry.reflect_dependency::<T>();
        registry
            .class_with_factory::<Self>(StackVec::new)
            .container(SequenceAdapter::<Self>::new());
    }
}
