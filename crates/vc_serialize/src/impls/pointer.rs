use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::format;
use core::any::Any;
use core::marker::PhantomData;

use uuid::Uuid;

use crate::container::{ContainerAdapter, ElementInstance, ElementRef, ReservedElement};
use crate::impls::template;
use crate::reflection::{Reflect, RttiBase, TypeUuid, generic_uuid};
use crate::registry::{ClassElement, TypeRegistry};

/// [`ContainerAdapter`] of `Box<B>`, a smart pointer to exactly one value.
///
/// The element is flagged as a pointer, so it is saved as the actual type of
/// the pointee. Storing replaces the pointee. A box is never empty, clearing
/// leaves it untouched.
pub struct PointerAdapter<B: ?Sized> {
    element: ClassElement,
    _marker: PhantomData<fn() -> Box<B>>,
}

impl<B: ?Sized + RttiBase> PointerAdapter<B> {
    pub fn new() -> Self {
        Self {
            element: ClassElement::for_container::<Box<B>>("element"),
            _marker: PhantomData,
        }
    }
}

impl<B: ?Sized + RttiBase> Default for PointerAdapter<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ?Sized + RttiBase> ContainerAdapter for PointerAdapter<B> {
    fn element(&self, name_crc: u32) -> Option<&ClassElement> {
        (self.element.name_crc() == name_crc).then_some(&self.element)
    }

    fn enum_types(&self, f: &mut dyn FnMut(&ClassElement)) {
        f(&self.element);
    }

    fn size(&self, instance: &dyn Any) -> usize {
        usize::from(instance.is::<Box<B>>())
    }

    fn capacity(&self, _instance: &dyn Any) -> usize {
        1
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

    fn is_smart_pointer(&self) -> bool {
        true
    }

    fn reserve_element(
        &self,
        instance: &mut dyn Any,
        _element: Option<&ClassElement>,
    ) -> Option<ReservedElement> {
        instance
            .is::<Box<B>>()
            .then(|| ReservedElement::new(0))
    }

    fn store_element(
        &self,
        instance: &mut dyn Any,
        _reserved: ReservedElement,
        value: ElementInstance,
        registry: &TypeRegistry,
    ) -> Result<(), ElementInstance> {
        let Some(pointer) = instance.downcast_mut::<Box<B>>() else {
            return Err(value);
        };
        let value = value.into_value()?;
        *pointer = B::from_any(value, registry).map_err(ElementInstance::Value)?;
        Ok(())
    }

    fn enum_elements<'a>(
        &'a self,
        instance: &'a dyn Any,
        visit: &mut dyn FnMut(ElementRef<'a>) -> bool,
    ) {
        if let Some(pointer) = instance.downcast_ref::<Box<B>>() {
            visit(ElementRef::Value {
                value: (**pointer).as_any(),
                element: &self.element,
            });
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
}

impl<B: ?Sized + RttiBase> TypeUuid for Box<B> {
    fn type_uuid() -> Uuid {
        generic_uuid(template::BOX, &[B::type_uuid()])
    }

    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("Box<{}>", B::type_name()))
    }
}

/// Boxes have no factory, the pointee's class creates the instance.
impl<B: ?Sized + RttiBase> Reflect for Box<B> {
    const IS_POINTER: bool = true;

    fn reflect(registry: &mut TypeRegistry) {
        if !registry.is_removing_reflection() {
            B::reflect_base(registry);
        }
        registry
            .class_without_factory::<Self>()
            .container(PointerAdapter::<B>::new());
    }

    #[inline]
    fn element_type_uuid() -> Uuid {
        B::type_uuid()
    }

    #[inline]
    fn as_element(&self) -> &dyn Any {
        (**self).as_any()
    }

    #[inline]
    fn from_element(element: Box<dyn Any>, registry: &TypeRegistry) -> Result<Self, Box<dyn Any>> {
        B::from_any(element, registry)
    }
}
