use alloc::boxed::Box;
use alloc::string::ToString;
use alloc::vec::Vec;
use core::any::Any;

use uuid::Uuid;

use crate::container::{ContainerAdapter, ElementInstance, ElementRef};
use crate::ops::CloneError;
use crate::reflection::Reflect;
use crate::registry::{ClassData, ClassElement, TypeRegistry};
use crate::serializer::DataSerializer;
use crate::walker::{Diagnostics, ElementError, ElementPath};

/// Deep-copies a registered object.
///
/// Source and copy are walked side by side; no element tree is built. Leaf
/// values are copied through their serializer and containers are refilled
/// element by element, so polymorphic elements keep their dynamic type.
///
/// Elements that cannot be copied are reported to a throwaway
/// [`Diagnostics`] and left out, see [`clone_object_with`].
pub fn clone_object(registry: &TypeRegistry, source: &dyn Any) -> Result<Box<dyn Any>, CloneError> {
    clone_object_with(registry, source, &mut Diagnostics::new())
}

/// [`clone_object`] with the issues collected in `diagnostics`.
///
/// - An element of an unregistered or deprecated class is an error. It
///   becomes a gap in optional slots and is omitted from other containers.
/// - A pointer to a class without factory clones as empty, with a warning.
///
/// `on_object_cloned` fires once, on the root copy.
pub fn clone_object_with(
    registry: &TypeRegistry,
    source: &dyn Any,
    diagnostics: &mut Diagnostics,
) -> Result<Box<dyn Any>, CloneError> {
    let class = registry
        .find_class_data_for_instance(source)
        .ok_or(CloneError::Unregistered)?;

    let mut cloner = Cloner {
        registry,
        diagnostics,
        path: ElementPath::new(),
    };
    cloner.path.push_field(class.name());
    let mut clone = cloner.clone_instance(source, class)?;

    if let Some(handler) = class.event_handler() {
        handler.on_object_cloned(&mut *clone);
    }
    Ok(clone)
}

/// Typed [`clone_object`].
///
/// ```
/// use vc_serialize::{Reflect, TypeRegistry};
/// use vc_serialize::ops::clone_value;
///
/// #[derive(Reflect, Default, Debug, PartialEq)]
/// #[reflect(uuid = "{6B2E9D14-0C7A-4F35-8E61-D94A3B5C7F08}")]
/// struct Route {
///     stops: Vec<String>,
///     loop_back: bool,
/// }
///
/// let mut registry = TypeRegistry::new();
/// registry.reflect::<Route>();
///
/// let route = Route { stops: vec!["a".into(), "b".into()], loop_back: true };
/// assert_eq!(clone_value(&registry, &route).unwrap(), route);
/// ```
pub fn clone_value<T: Reflect>(registry: &TypeRegistry, source: &T) -> Result<T, CloneError> {
    let clone = clone_object(registry, source)?;
    clone.downcast::<T>().map(|clone| *clone).map_err(|other| CloneError::Downcast {
        expected: T::type_uuid(),
        found: registry.actual_type_id(&*other).unwrap_or(Uuid::nil()),
    })
}

struct Cloner<'r, 'd> {
    registry: &'r TypeRegistry,
    diagnostics: &'d mut Diagnostics,
    path: ElementPath,
}

impl<'r> Cloner<'r, '_> {
    fn report(&mut self, error: &ElementError) {
        self.diagnostics.report(&self.path, error);
    }

    fn clone_instance(&mut self, source: &dyn Any, class: &'r ClassData) -> Result<Box<dyn Any>, ElementError> {
        if class.is_deprecated() {
            return Err(ElementError::Discarded);
        }
        let mut copy = class.create_instance().ok_or(ElementError::MissingFactory {
            type_id: class.type_id(),
        })?;
        self.copy_into(source, &mut *copy, class)?;
        Ok(copy)
    }

    fn copy_into(
        &mut self,
        source: &dyn Any,
        target: &mut dyn Any,
        class: &'r ClassData,
    ) -> Result<(), ElementError> {
        let handler = class.event_handler();
        if let Some(handler) = handler {
            handler.on_read_begin(source);
            handler.on_write_begin(target);
        }

        let result = if let Some(serializer) = class.serializer() {
            copy_leaf(source, target, class, serializer)
        } else if let Some(container) = class.container() {
            self.copy_container(source, target, container);
            Ok(())
        } else {
            self.copy_fields(source, target, class);
            Ok(())
        };

        if let Some(handler) = handler {
            handler.on_write_end(target);
            handler.on_read_end(source);
        }
        result
    }

    fn copy_fields(&mut self, source: &dyn Any, target: &mut dyn Any, class: &'r ClassData) {
        for element in class.elements() {
            self.path.push_field(element.name());
            if let Err(err) = self.copy_field(source, target, element) {
                self.report(&err);
            }
            self.path.pop();
        }
    }

    fn copy_field(
        &mut self,
        source: &dyn Any,
        target: &mut dyn Any,
        element: &ClassElement,
    ) -> Result<(), ElementError> {
        let access = || ElementError::FieldAccess {
            field: element.name().to_string(),
        };
        let accessor = element.accessor().ok_or_else(access)?;
        let from = accessor.get(source).ok_or_else(access)?;
        let to = accessor.get_mut(target).ok_or_else(access)?;
        let class = self
            .registry
            .find_class_data(&element.type_id())
            .ok_or(ElementError::UnknownType {
                type_id: element.type_id(),
            })?;
        self.copy_into(from, to, class)
    }

    fn copy_container(&mut self, source: &dyn Any, target: &mut dyn Any, container: &'r dyn ContainerAdapter) {
        container.clear_elements(target, Some(self.registry));
        container.on_write_begin(target);

        let mut index = 0;
        container.enum_elements(source, &mut |item| {
            self.path.push_index(index);
            index += 1;
            let stored = match item {
                ElementRef::Value { value, element } => self
                    .clone_element(value, element)
                    .and_then(|value| self.store(target, container, element, ElementInstance::Value(value))),
                ElementRef::Entry { key, value, element } => self
                    .clone_entry(container, key, value)
                    .and_then(|entry| self.store(target, container, element, entry)),
            };
            if let Err(err) = &stored {
                self.report(err);
            }
            self.path.pop();
            // Full. The remaining elements are dropped silently.
            stored != Ok(false)
        });

        container.on_write_end(target);
    }

    /// Clones a container element, as its dynamic type for pointer slots.
    fn clone_element(&mut self, value: &dyn Any, element: &ClassElement) -> Result<Box<dyn Any>, ElementError> {
        let type_id = if element.is_pointer() {
            self.registry
                .actual_type_id(value)
                .ok_or(ElementError::UnregisteredInstance)?
        } else {
            element.type_id()
        };
        let class = self
            .registry
            .find_class_data(&type_id)
            .ok_or(ElementError::UnknownType { type_id })?;
        self.clone_instance(value, class)
    }

    fn clone_entry(
        &mut self,
        container: &dyn ContainerAdapter,
        key: &dyn Any,
        value: &dyn Any,
    ) -> Result<ElementInstance, ElementError> {
        let (key_element, value_element) = container
            .entry_elements()
            .ok_or(ElementError::MissingEntryPart { part: "key" })?;

        let mut parts: Vec<Box<dyn Any>> = Vec::with_capacity(2);
        for (part, part_element) in [(key, key_element), (value, value_element)] {
            self.path.push_field(part_element.name());
            let cloned = self.clone_element(part, part_element);
            self.path.pop();
            parts.push(cloned?);
        }
        match (parts.pop(), parts.pop()) {
            (Some(value), Some(key)) => Ok(ElementInstance::Entry { key, value }),
            _ => Err(ElementError::MissingEntryPart { part: "value" }),
        }
    }

    /// Returns `Ok(false)` when the container has no room left.
    fn store(
        &self,
        target: &mut dyn Any,
        container: &dyn ContainerAdapter,
        element: &ClassElement,
        instance: ElementInstance,
    ) -> Result<bool, ElementError> {
        let Some(reserved) = container.reserve_element(target, Some(element)) else {
            return Ok(false);
        };
        container
            .store_element(target, reserved, instance, self.registry)
            .map_err(|_| ElementError::StoreRejected {
                type_id: element.type_id(),
            })?;
        Ok(true)
    }
}

fn copy_leaf(
    source: &dyn Any,
    target: &mut dyn Any,
    class: &ClassData,
    serializer: &dyn DataSerializer,
) -> Result<(), ElementError> {
    let mut bytes = Vec::new();
    serializer.save(source, &mut bytes)?;
    serializer.load(target, &bytes, class.version())?;
    Ok(())
}
