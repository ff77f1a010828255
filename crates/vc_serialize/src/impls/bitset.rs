use alloc::borrow::Cow;
use alloc::vec::Vec;
use core::any::Any;

use fixedbitset::FixedBitSet;
use uuid::Uuid;

use crate::container::{ContainerAdapter, ElementInstance, ElementRef, ReservedElement};
use crate::impls::template;
use crate::reflection::{Reflect, TypeUuid};
use crate::registry::{ClassElement, TypeRegistry};

static TRUE: bool = true;
static FALSE: bool = false;

/// [`ContainerAdapter`] of [`FixedBitSet`], seen as a sequence of `bool`.
pub struct BitSetAdapter {
    element: ClassElement,
}

impl BitSetAdapter {
    pub fn new() -> Self {
        Self {
            element: ClassElement::for_container::<bool>("element"),
        }
    }
}

impl Default for BitSetAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn rebuild(bits: &mut FixedBitSet, values: &[bool]) {
    *bits = FixedBitSet::with_capacity(values.len());
    for (index, value) in values.iter().enumerate() {
        bits.set(index, *value);
    }
}

impl ContainerAdapter for BitSetAdapter {
    fn element(&self, name_crc: u32) -> Option<&ClassElement> {
        (self.element.name_crc() == name_crc).then_some(&self.element)
    }

    fn enum_types(&self, f: &mut dyn FnMut(&ClassElement)) {
        f(&self.element);
    }

    fn size(&self, instance: &dyn Any) -> usize {
        instance.downcast_ref::<FixedBitSet>().map_or(0, FixedBitSet::len)
    }

    fn can_access_elements_by_index(&self) -> bool {
        true
    }

    fn reserve_element(
        &self,
        instance: &mut dyn Any,
        _element: Option<&ClassElement>,
    ) -> Option<ReservedElement> {
        let bits = instance.downcast_mut::<FixedBitSet>()?;
        Some(ReservedElement::new(bits.len()))
    }

    fn store_element(
        &self,
        instance: &mut dyn Any,
        _reserved: ReservedElement,
        value: ElementInstance,
        _registry: &TypeRegistry,
    ) -> Result<(), ElementInstance> {
        let Some(bits) = instance.downcast_mut::<FixedBitSet>() else {
            return Err(value);
        };
        let value = value.into_value()?.downcast::<bool>().map_err(ElementInstance::Value)?;
        let index = bits.len();
        bits.grow(index + 1);
        bits.set(index, *value);
        Ok(())
    }

    fn get_element<'a>(&'a self, instance: &'a dyn Any, index: usize) -> Option<ElementRef<'a>> {
        let bits = instance.downcast_ref::<FixedBitSet>()?;
        (index < bits.len()).then(|| ElementRef::Value {
            value: if bits.contains(index) { &TRUE } else { &FALSE },
            element: &self.element,
        })
    }

    fn enum_elements<'a>(
        &'a self,
        instance: &'a dyn Any,
        visit: &mut dyn FnMut(ElementRef<'a>) -> bool,
    ) {
        let Some(bits) = instance.downcast_ref::<FixedBitSet>() else {
            return;
        };
        for index in 0..bits.len() {
            let element = ElementRef::Value {
                value: if bits.contains(index) { &TRUE } else { &FALSE },
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
        let Some(bits) = instance.downcast_mut::<FixedBitSet>() else {
            return false;
        };
        if index >= bits.len() {
            return false;
        }
        let values: Vec<bool> = (0..bits.len())
            .filter(|&i| i != index)
            .map(|i| bits.contains(i))
            .collect();
        rebuild(bits, &values);
        true
    }

    fn clear_elements(&self, instance: &mut dyn Any, _registry: Option<&TypeRegistry>) {
        if let Some(bits) = instance.downcast_mut::<FixedBitSet>() {
            rebuild(bits, &[]);
        }
    }
}

impl TypeUuid for FixedBitSet {
    #[inline]
    fn type_uuid() -> Uuid {
        template::FIXED_BIT_SET
    }

    #[inline]
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("FixedBitSet")
    }
}

impl Reflect for FixedBitSet {
    fn reflect(registry: &mut TypeRegistry) {
        registry.reflect_dependency::<bool>();
        registry.class::<Self>().container(BitSetAdapter::new());
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::vec::Vec;

    use fixedbitset::FixedBitSet;

    use crate::container::{ElementInstance, ElementRef};
    use crate::registry::TypeRegistry;

    #[test]
    fn bits_push_and_remove() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<FixedBitSet>();
        let container = registry.class_of::<FixedBitSet>().unwrap().container().unwrap();

        let mut bits = FixedBitSet::new();
        for value in [true, false, true] {
            let slot = container.reserve_element(&mut bits, None).unwrap();
            let value = ElementInstance::Value(Box::new(value));
            container.store_element(&mut bits, slot, value, &registry).unwrap();
        }
        assert!(container.remove_element(&mut bits, 0, None));

        let mut seen = Vec::new();
        container.enum_elements(&bits, &mut |element| {
            if let ElementRef::Value { value, .. } = element {
                seen.push(*value.downcast_ref::<bool>().unwrap());
            }
            true
        });
        assert_eq!(seen, [false, true]);

        container.clear_elements(&mut bits, None);
        assert_eq!(container.size(&bits), 0);
    }
}
