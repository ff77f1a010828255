use alloc::borrow::Cow;
use alloc::format;
use alloc::vec::Vec;
use core::any::Any;
use core::marker::PhantomData;
use std::sync::{Mutex, PoisonError};
use std::thread::{self, ThreadId};

use uuid::Uuid;

use crate::container::{ContainerAdapter, ElementInstance, ElementRef, ReservedElement};
use crate::impls::template;
use crate::reflection::{Reflect, TypeUuid, generic_uuid};
use crate::registry::{ClassElement, TypeRegistry};

// -----------------------------------------------------------------------------
// ArrayAdapter

/// [`ContainerAdapter`] of `[T; N]`.
///
/// An array never changes its length. Loading overwrites the elements in
/// order and drops everything past `N`. The next slot to write is tracked by
/// a cursor per write pass: [`on_write_begin`] pushes a fresh cursor and
/// [`on_write_end`] pops it, so nested passes on the same array type do not
/// disturb each other. Cursors are kept per thread. Outside of a pass every
/// reservation targets slot 0.
///
/// [`on_write_begin`]: ContainerAdapter::on_write_begin
/// [`on_write_end`]: ContainerAdapter::on_write_end
pub struct ArrayAdapter<T, const N: usize> {
    element: ClassElement,
    cursors: Mutex<Vec<(ThreadId, usize)>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Reflect, const N: usize> ArrayAdapter<T, N> {
    pub fn new() -> Self {
        Self {
            element: ClassElement::for_container::<T>("element"),
            cursors: Mutex::new(Vec::new()),
            _marker: PhantomData,
        }
    }

    fn cursor(&self) -> usize {
        let id = thread::current().id();
        let cursors = self.cursors.lock().unwrap_or_else(PoisonError::into_inner);
        cursors
            .iter()
            .rev()
            .find(|(owner, _)| *owner == id)
            .map_or(0, |(_, cursor)| *cursor)
    }

    fn advance(&self, next: usize) {
        let id = thread::current().id();
        let mut cursors = self.cursors.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((_, cursor)) = cursors.iter_mut().rev().find(|(owner, _)| *owner == id) {
            *cursor = next;
        }
    }
}

impl<T: Reflect, const N: usize> Default for ArrayAdapter<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Reflect, const N: usize> ContainerAdapter for ArrayAdapter<T, N> {
    fn element(&self, name_crc: u32) -> Option<&ClassElement> {
        (self.element.name_crc() == name_crc).then_some(&self.element)
    }

    fn enum_types(&self, f: &mut dyn FnMut(&ClassElement)) {
        f(&self.element);
    }

    fn size(&self, _instance: &dyn Any) -> usize {
        N
    }

    fn capacity(&self, _instance: &dyn Any) -> usize {
        N
    }

    fn is_fixed_size(&self) -> bool {
        true
    }

    fn is_fixed_capacity(&self) -> bool {
        true
    }

    fn is_stable_elements(&self) -> bool {
        true
    }

    fn can_access_elements_by_index(&self) -> bool {
        true
    }

    fn reserve_element(
        &self,
        instance: &mut dyn Any,
        _element: Option<&ClassElement>,
    ) -> Option<ReservedElement> {
        instance.downcast_mut::<[T; N]>()?;
        let cursor = self.cursor();
        (cursor < N).then(|| ReservedElement::new(cursor))
    }

    fn store_element(
        &self,
        instance: &mut dyn Any,
        reserved: ReservedElement,
        value: ElementInstance,
        registry: &TypeRegistry,
    ) -> Result<(), ElementInstance> {
        let slot = reserved.slot();
        let Some(array) = instance.downcast_mut::<[T; N]>() else {
            return Err(value);
        };
        if slot >= N {
            return Err(value);
        }
        let value = value.into_value()?;
        array[slot] = T::from_element(value, registry).map_err(ElementInstance::Value)?;
        self.advance(slot + 1);
        Ok(())
    }

    fn get_element<'a>(&'a self, instance: &'a dyn Any, index: usize) -> Option<ElementRef<'a>> {
        let item = instance.downcast_ref::<[T; N]>()?.get(index)?;
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
        let Some(array) = instance.downcast_ref::<[T; N]>() else {
            return;
        };
        for item in array {
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
        _instance: &mut dyn Any,
        _index: usize,
        _registry: Option<&TypeRegistry>,
    ) -> bool {
        false
    }

    fn clear_elements(&self, _instance: &mut dyn Any, _registry: Option<&TypeRegistry>) {}

    fn on_write_begin(&self, _instance: &mut dyn Any) {
        let id = thread::current().id();
        self.cursors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, 0));
    }

    fn on_write_end(&self, _instance: &mut dyn Any) {
        let id = thread::current().id();
        let mut cursors = self.cursors.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(index) = cursors.iter().rposition(|(owner, _)| *owner == id) {
            cursors.remove(index);
        }
    }
}

// -----------------------------------------------------------------------------
// Reflect

impl<T: Reflect, const N: usize> TypeUuid for [T; N] {
    fn type_uuid() -> Uuid {
        let length = Uuid::from_u128(N as u128);
        generic_uuid(template::ARRAY, &[T::type_uuid(), length])
    }

    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("[{}; {N}]", T::type_name()))
    }
}

/// Arrays are created from `T::default()` elements.
impl<T: Reflect + Default, const N: usize> Reflect for [T; N] {
    fn reflect(registry: &mut TypeRegistry) {
        registry.reflect_dependency::<T>();
        registry
            .class_with_factory::<Self>(|| core::array::from_fn(|_| T::default()))
            .container(ArrayAdapter::<T, N>::new());
    }
}
