use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::any::Any;
use core::marker::PhantomData;

use uuid::Uuid;

use crate::container::{ContainerAdapter, ElementInstance, ElementRef, ReservedElement};
use crate::impls::template;
use crate::reflection::{Reflect, TypeUuid, generic_uuid};
use crate::registry::{ClassElement, TypeRegistry};

// -----------------------------------------------------------------------------
// TupleStorage

/// Positional access to the fields of a tuple.
pub trait TupleStorage: Any {
    /// One slot descriptor per field, named `value1`, `value2` and so on.
    fn slot_elements() -> Vec<ClassElement>;

    fn field(&self, index: usize) -> Option<&dyn Any>;

    fn set_field(
        &mut self,
        index: usize,
        value: Box<dyn Any>,
        registry: &TypeRegistry,
    ) -> Result<(), Box<dyn Any>>;
}

// -----------------------------------------------------------------------------
// TupleAdapter

/// [`ContainerAdapter`] of tuples, a fixed heterogeneous sequence.
///
/// Children are matched to fields by name, so [`reserve_element`] needs the
/// slot descriptor.
///
/// [`reserve_element`]: ContainerAdapter::reserve_element
pub struct TupleAdapter<C> {
    elements: Vec<ClassElement>,
    _marker: PhantomData<fn() -> C>,
}

impl<C: TupleStorage> TupleAdapter<C> {
    pub fn new() -> Self {
        Self {
            elements: C::slot_elements(),
            _marker: PhantomData,
        }
    }
}

impl<C: TupleStorage> Default for TupleAdapter<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: TupleStorage> ContainerAdapter for TupleAdapter<C> {
    fn element(&self, name_crc: u32) -> Option<&ClassElement> {
        self.elements.iter().find(|e| e.name_crc() == name_crc)
    }

    fn enum_types(&self, f: &mut dyn FnMut(&ClassElement)) {
        self.elements.iter().for_each(f);
    }

    fn size(&self, _instance: &dyn Any) -> usize {
        self.elements.len()
    }

    fn capacity(&self, _instance: &dyn Any) -> usize {
        self.elements.len()
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
        element: Option<&ClassElement>,
    ) -> Option<ReservedElement> {
        if !instance.is::<C>() {
            return None;
        }
        let crc = element?.name_crc();
        let slot = self.elements.iter().position(|e| e.name_crc() == crc)?;
        Some(ReservedElement::new(slot))
    }

    fn store_element(
        &self,
        instance: &mut dyn Any,
        reserved: ReservedElement,
        value: ElementInstance,
        registry: &TypeRegistry,
    ) -> Result<(), ElementInstance> {
        let Some(tuple) = instance.downcast_mut::<C>() else {
            return Err(value);
        };
        let value = value.into_value()?;
        tuple
            .set_field(reserved.slot(), value, registry)
            .map_err(ElementInstance::Value)
    }

    fn get_element<'a>(&'a self, instance: &'a dyn Any, index: usize) -> Option<ElementRef<'a>> {
        let value = instance.downcast_ref::<C>()?.field(index)?;
        Some(ElementRef::Value {
            value,
            element: self.elements.get(index)?,
        })
    }

    fn enum_elements<'a>(
        &'a self,
        instance: &'a dyn Any,
        visit: &mut dyn FnMut(ElementRef<'a>) -> bool,
    ) {
        let Some(tuple) = instance.downcast_ref::<C>() else {
            return;
        };
        for (index, element) in self.elements.iter().enumerate() {
            let Some(value) = tuple.field(index) else {
                break;
            };
            if !visit(ElementRef::Value { value, element }) {
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
}

// -----------------------------------------------------------------------------
// Reflect

macro_rules! impl_tuple {
    ($($name:ident $index:tt),+) => {
        impl<$($name: Reflect + Default),+> TupleStorage for ($($name,)+) {
            fn slot_elements() -> Vec<ClassElement> {
                vec![$(ClassElement::for_container::<$name>(format!("value{}", $index + 1))),+]
            }

            fn field(&self, index: usize) -> Option<&dyn Any> {
                match index {
                    $($index => Some(self.$index.as_element()),)+
                    _ => None,
                }
            }

            fn set_field(
                &mut self,
                index: usize,
                value: Box<dyn Any>,
                registry: &TypeRegistry,
            ) -> Result<(), Box<dyn Any>> {
                match index {
                    $($index => self.$index = $name::from_element(value, registry)?,)+
                    _ => return Err(value),
                }
                Ok(())
            }
        }

        impl<$($name: Reflect + Default),+> TypeUuid for ($($name,)+) {
            fn type_uuid() -> Uuid {
                generic_uuid(template::TUPLE, &[$($name::type_uuid()),+])
            }

            fn type_name() -> Cow<'static, str> {
                let names: Vec<String> = vec![$($name::type_name().into_owned()),+];
                Cow::Owned(format!("({})", names.join(", ")))
            }
        }

        impl<$($name: Reflect + Default),+> Reflect for ($($name,)+) {
            fn reflect(registry: &mut TypeRegistry) {
                $(registry.reflect_dependency::<$name>();)+
                registry.class::<Self>().container(TupleAdapter::<Self>::new());
            }
        }
    };
}

impl_tuple!(A 0);
impl_tuple!(A 0, B 1);
impl_tuple!(A 0, B 1, C 2);
impl_tuple!(A 0, B 1, C 2, D 3);
impl_tuple!(A 0, B 1, C 2, D 3, E 4);
impl_tuple!(A 0, B 1, C 2, D 3, E 4, F 5);

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::string::String;

    use crate::container::ElementInstance;
    use crate::reflection::{TypeUuid, name_crc};
    use crate::registry::TypeRegistry;

    type Pair = (i32, String);

    #[test]
    fn fields_are_reserved_by_name() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<Pair>();
        let container = registry.class_of::<Pair>().unwrap().container().unwrap();

        let mut pair = Pair::default();
        let second = container.element(name_crc("value2")).unwrap();
        let slot = container.reserve_element(&mut pair, Some(second)).unwrap();
        let value = ElementInstance::Value(Box::new(String::from("two")));
        container.store_element(&mut pair, slot, value, &registry).unwrap();

        assert_eq!(pair, (0, String::from("two")));
        assert!(container.reserve_element(&mut pair, None).is_none());
        assert_eq!(Pair::type_name(), "(i32, String)");
    }
}
