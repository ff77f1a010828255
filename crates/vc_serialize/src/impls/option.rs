use alloc::borrow::Cow;
use alloc::format;
use core::any::Any;
use core::marker::PhantomData;

use uuid::Uuid;

use crate::container::{ContainerAdapter, ElementInstance, ElementRef, ReservedElement};
use crate::impls::template;
use crate::reflection::{Reflect, TypeUuid, generic_uuid};
use crate::registry::{ClassElement, TypeRegistry};

/// [`ContainerAdapter`] of `Option<T>`, a container of zero or one element.
pub struct OptionAdapter<T> {
    element: ClassElement,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Reflect> OptionAdapter<T> {
    pub fn new() -> Self {
        Self {
            element: ClassElement::for_container::<T>("element"),
            _marker: PhantomData,
        }
    }
}

impl<T: Reflect> Default for OptionAdapter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Reflect> ContainerAdapter for OptionAdapter<T> {
    fn element(&self, name_crc: u32) -> Option<&ClassElement> {
        (self.element.name_crc() == name_crc).then_some(&self.element)
    }

    fn enum_types(&self, f: &mut dyn FnMut(&ClassElement)) {
        f(&self.element);
    }

    fn size(&self, instance: &dyn Any) -> usize {
        instance
            .downcast_ref::<Option<T>>()
            .map_or(0, |option| usize::from(option.is_some()))
    }

    fn capacity(&self, _instance: &dyn Any) -> usize {
        1
    }

    fn is_fixed_capacity(&self) -> bool {
        true
    }

    fn is_stable_elements(&self) -> bool {
        true
    }

    fn reserve_element(
        &self,
        instance: &mut dyn Any,
        _element: Option<&ClassElement>,
    ) -> Option<ReservedElement> {
        let option = instance.downcast_mut::<Option<T>>()?;
        option.is_none().then(|| ReservedElement::new(0))
    }

    fn store_element(
        &self,
        instance: &mut dyn Any,
        _reserved: ReservedElement,
        value: ElementInstance,
        registry: &TypeRegistry,
    ) -> Result<(), ElementInstance> {
        let Some(option) = instance.downcast_mut::<Option<T>>() else {
            return Err(value);
        };
        let value = value.into_value()?;
        *option = Some(T::from_element(value, registry).map_err(ElementInstance::Value)?);
        Ok(())
    }

    fn enum_elements<'a>(
        &'a self,
        instance: &'a dyn Any,
        visit: &mut dyn FnMut(ElementRef<'a>) -> bool,
    ) {
        if let Some(Some(value)) = instance.downcast_ref::<Option<T>>() {
            visit(ElementRef::Value {
                value: value.as_element(),
                element: &self.element,
            });
        }
    }

    fn remove_element(
        &self,
        instance: &mut dyn Any,
        index: usize,
        _registry: Option<&TypeRegistry>,
    ) -> bool {
        index == 0
            && instance
                .downcast_mut::<Option<T>>()
                .is_some_and(|option| option.take().is_some())
    }

    fn clear_elements(&self, instance: &mut dyn Any, _registry: Option<&TypeRegistry>) {
        if let Some(option) = instance.downcast_mut::<Option<T>>() {
            *option = None;
        }
    }
}

impl<T: Reflect> TypeUuid for Option<T> {
    fn type_uuid() -> Uuid {
        generic_uuid(template::OPTION, &[T::type_uuid()])
    }

    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("Option<{}>", T::type_name()))
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn reflect(registry: &mut TypeRegistry) {
        registry.reflect_dependency::<T>();
        registry.class::<Self>().container(OptionAdapter::<T>::new());
    }
}
