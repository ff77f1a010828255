use alloc::boxed::Box;
use alloc::string::ToString;
use alloc::vec::Vec;
use core::any::Any;

use crate::container::{ContainerAdapter, ElementInstance};
use crate::convert::resolve_node;
use crate::registry::{ClassData, ClassElement, TypeRegistry};
use crate::serializer::DataSerializer;
use crate::tree::{DataElementNode, ElementData};
use crate::walker::{Diagnostics, ElementError, ElementPath, LoadFlags};

/// Materializes [`DataElementNode`] trees into live instances.
///
/// Each node is resolved first, so outdated and deprecated data goes through
/// its converter. Fields are matched by name hash and unknown names are
/// dropped silently. Failures of single elements are reported to the
/// [`Diagnostics`] and only drop that element.
///
/// # Examples
///
/// ```
/// use vc_serialize::{Reflect, TypeRegistry};
/// use vc_serialize::walker::{Diagnostics, LoadFlags, Loader, save_to_node};
///
/// #[derive(Reflect, Default, Debug, PartialEq)]
/// #[reflect(uuid = "{9D3A41C6-52B7-4E08-A1F9-3C6D2E7B8A10}")]
/// struct Inventory {
///     items: Vec<String>,
/// }
///
/// let mut registry = TypeRegistry::new();
/// registry.reflect::<Inventory>();
///
/// let mut diagnostics = Diagnostics::new();
/// let saved = Inventory { items: vec!["rope".into()] };
/// let mut node = save_to_node(&registry, &saved, "", &mut diagnostics).unwrap();
///
/// // Loading in place replaces the old items.
/// let mut target = Inventory { items: vec!["a".into(), "b".into()] };
/// Loader::new(&registry, &mut diagnostics, LoadFlags::empty())
///     .load_node_into(&mut target, &mut node)
///     .unwrap();
/// assert_eq!(target, saved);
/// ```
pub struct Loader<'r, 'd> {
    registry: &'r TypeRegistry,
    diagnostics: &'d mut Diagnostics,
    flags: LoadFlags,
    path: ElementPath,
}

impl<'r, 'd> Loader<'r, 'd> {
    pub fn new(registry: &'r TypeRegistry, diagnostics: &'d mut Diagnostics, flags: LoadFlags) -> Self {
        Self {
            registry,
            diagnostics,
            flags,
            path: ElementPath::new(),
        }
    }

    #[inline]
    pub fn flags(&self) -> LoadFlags {
        self.flags
    }

    /// Creates a new instance of the root class of `node` and loads it.
    pub fn create_root(&mut self, node: &mut DataElementNode) -> Result<Box<dyn Any>, ElementError> {
        let class = resolve_node(self.registry, node)?;
        self.path.push_field(class.name());
        let result = self.create_loaded(class, node);
        self.path.pop();
        result
    }

    /// Loads `node` into the existing `instance`.
    ///
    /// Containers are cleared first, so the result replaces the previous
    /// content. The node may also describe a base of the instance.
    pub fn load_node_into(
        &mut self,
        instance: &mut dyn Any,
        node: &mut DataElementNode,
    ) -> Result<(), ElementError> {
        let class = resolve_node(self.registry, node)?;
        let actual = self
            .registry
            .actual_type_id(instance)
            .ok_or(ElementError::UnregisteredInstance)?;

        self.path.push_field(class.name());
        let result = if actual == class.type_id() {
            self.load_into(instance, class, node)
        } else {
            match self.registry.upcast_mut(instance, &actual, &class.type_id()) {
                Some(base) => self.load_into(base, class, node),
                None => Err(ElementError::TypeMismatch {
                    expected: actual,
                    found: class.type_id(),
                }),
            }
        };
        self.path.pop();
        result
    }

    fn report(&mut self, error: &ElementError) {
        match error {
            ElementError::Discarded => {}
            ElementError::UnknownType { type_id }
                if self.flags.contains(LoadFlags::IGNORE_UNKNOWN_CLASSES) =>
            {
                log::debug!("{}: skipped unknown type {type_id}", self.path);
            }
            _ => self.diagnostics.report(&self.path, error),
        }
    }

    fn create_loaded(
        &mut self,
        class: &'r ClassData,
        node: &mut DataElementNode,
    ) -> Result<Box<dyn Any>, ElementError> {
        let mut value = class.create_instance().ok_or(ElementError::MissingFactory {
            type_id: class.type_id(),
        })?;
        self.load_into(&mut *value, class, node)?;
        Ok(value)
    }

    /// Loads an already resolved node into an instance of exactly `class`.
    fn load_into(
        &mut self,
        instance: &mut dyn Any,
        class: &'r ClassData,
        node: &mut DataElementNode,
    ) -> Result<(), ElementError> {
        if let Some(handler) = class.event_handler() {
            handler.on_write_begin(instance);
        }

        let result = if let Some(serializer) = class.serializer() {
            load_leaf(instance, class, serializer, node)
        } else if let Some(container) = class.container() {
            self.load_container(instance, container, node);
            Ok(())
        } else {
            self.load_fields(instance, class, node);
            Ok(())
        };

        if let Some(handler) = class.event_handler() {
            handler.on_write_end(instance);
        }
        result
    }

    fn load_fields(&mut self, instance: &mut dyn Any, class: &'r ClassData, node: &mut DataElementNode) {
        for child in node.children_mut() {
            // Renamed or removed fields are dropped without a trace.
            let Some(element) = class.find_element(child.name_crc()) else {
                continue;
            };
            self.path.push_field(element.name());
            if let Err(err) = self.load_field(instance, element, child) {
                self.report(&err);
            }
            self.path.pop();
        }
    }

    fn load_field(
        &mut self,
        instance: &mut dyn Any,
        element: &'r ClassElement,
        child: &mut DataElementNode,
    ) -> Result<(), ElementError> {
        let class = resolve_node(self.registry, child)?;
        let field = element
            .accessor()
            .and_then(|accessor| accessor.get_mut(instance))
            .ok_or_else(|| ElementError::FieldAccess {
                field: element.name().to_string(),
            })?;

        if class.type_id() == element.type_id() {
            return self.load_into(field, class, child);
        }
        // The data holds a base of the field type.
        if self.registry.is_derived_from(&element.type_id(), &class.type_id()) {
            let base = self
                .registry
                .upcast_mut(field, &element.type_id(), &class.type_id())
                .ok_or(ElementError::CastFailed {
                    from: element.type_id(),
                    to: class.type_id(),
                })?;
            return self.load_into(base, class, child);
        }
        Err(ElementError::TypeMismatch {
            expected: element.type_id(),
            found: class.type_id(),
        })
    }

    fn load_container(
        &mut self,
        instance: &mut dyn Any,
        container: &'r dyn ContainerAdapter,
        node: &mut DataElementNode,
    ) {
        container.clear_elements(instance, Some(self.registry));
        container.on_write_begin(instance);

        for (index, child) in node.children_mut().iter_mut().enumerate() {
            self.path.push_index(index);
            let stored = self.load_container_element(instance, container, child);
            if let Err(err) = &stored {
                self.report(err);
            }
            self.path.pop();
            // Full. Further elements are dropped silently.
            if stored == Ok(false) {
                break;
            }
        }

        container.on_write_end(instance);
    }

    /// Returns `Ok(false)` when the container has no room left.
    fn load_container_element(
        &mut self,
        instance: &mut dyn Any,
        container: &'r dyn ContainerAdapter,
        child: &mut DataElementNode,
    ) -> Result<bool, ElementError> {
        let Some(element) = container.element(child.name_crc()) else {
            return Ok(true);
        };
        let class = resolve_node(self.registry, child)?;

        if let Some((key_element, value_element)) = container.entry_elements() {
            return self.load_entry(instance, container, element, (key_element, value_element), child);
        }
        self.check_element_type(element, class)?;

        let Some(reserved) = container.reserve_element(instance, Some(element)) else {
            return Ok(false);
        };
        let value = match self.create_loaded(class, child) {
            Ok(value) => value,
            Err(err) => {
                container.free_reserved_element(instance, reserved);
                return Err(err);
            }
        };
        container
            .store_element(instance, reserved, ElementInstance::Value(value), self.registry)
            .map_err(|_| ElementError::StoreRejected {
                type_id: class.type_id(),
            })?;
        Ok(true)
    }

    fn load_entry(
        &mut self,
        instance: &mut dyn Any,
        container: &'r dyn ContainerAdapter,
        element: &'r ClassElement,
        (key_element, value_element): (&'r ClassElement, &'r ClassElement),
        node: &mut DataElementNode,
    ) -> Result<bool, ElementError> {
        let mut parts: Vec<Box<dyn Any>> = Vec::with_capacity(2);
        for (part_element, part_name) in [(key_element, "key"), (value_element, "value")] {
            let part = node
                .find_sub_element(part_element.name_crc())
                .ok_or(ElementError::MissingEntryPart { part: part_name })?;
            self.path.push_field(part_element.name());
            let loaded = resolve_node(self.registry, part).and_then(|class| {
                self.check_element_type(part_element, class)?;
                self.create_loaded(class, part)
            });
            self.path.pop();
            parts.push(loaded?);
        }

        let (Some(value), Some(key)) = (parts.pop(), parts.pop()) else {
            return Err(ElementError::MissingEntryPart { part: "key" });
        };
        let Some(reserved) = container.reserve_element(instance, Some(element)) else {
            return Ok(false);
        };
        container
            .store_element(instance, reserved, ElementInstance::Entry { key, value }, self.registry)
            .map_err(|_| ElementError::StoreRejected {
                type_id: element.type_id(),
            })?;
        Ok(true)
    }

    /// Pointer elements accept any class deriving from their pointee.
    fn check_element_type(&self, element: &ClassElement, class: &ClassData) -> Result<(), ElementError> {
        let compatible = class.type_id() == element.type_id()
            || (element.is_pointer()
                && self.registry.is_derived_from(&class.type_id(), &element.type_id()));
        if compatible {
            Ok(())
        } else {
            Err(ElementError::TypeMismatch {
                expected: element.type_id(),
                found: class.type_id(),
            })
        }
    }
}

fn load_leaf(
    instance: &mut dyn Any,
    class: &ClassData,
    serializer: &dyn DataSerializer,
    node: &DataElementNode,
) -> Result<(), ElementError> {
    match node.data() {
        ElementData::Binary(bytes) => serializer.load(instance, bytes, node.version())?,
        ElementData::Text(text) => {
            let mut bytes = Vec::new();
            serializer.text_to_data(text, &mut bytes)?;
            serializer.load(instance, &bytes, node.version())?;
        }
        ElementData::None => {
            return Err(ElementError::MissingData {
                type_id: class.type_id(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::collections::BTreeMap;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;

    use super::Loader;
    use crate::TypeUuid;
    use crate::fixtures::{
        BaseA, Circle, Foo, FooV2, MultiDerived, ShapeHolder, Square, deprecate_square,
    };
    use crate::reflection::name_crc;
    use crate::registry::TypeRegistry;
    use crate::tree::DataElementNode;
    use crate::walker::{Diagnostics, IssueKind, LoadFlags, save_to_node};

    fn save<T: core::any::Any>(registry: &TypeRegistry, value: &T) -> DataElementNode {
        save_to_node(registry, value, "", &mut Diagnostics::new()).unwrap()
    }

    #[test]
    fn creates_polymorphic_elements() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<ShapeHolder>().reflect::<Square>();
        let holder = ShapeHolder {
            shapes: vec![Box::new(Circle { radius: 2.0 }), Box::new(Square { side: 3.0 })],
        };
        let mut node = save(&registry, &holder);

        let mut diagnostics = Diagnostics::new();
        let loaded = Loader::new(&registry, &mut diagnostics, LoadFlags::empty())
            .create_root(&mut node)
            .unwrap();
        let loaded = loaded.downcast::<ShapeHolder>().unwrap();
        let areas: Vec<f32> = loaded.shapes.iter().map(|s| s.area()).collect();
        assert_eq!(areas, [12.0, 9.0]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn old_versions_load_through_the_converter() {
        let mut old = TypeRegistry::new();
        old.reflect::<Foo>();
        let mut node = save(&old, &Foo { m_data: 5 });

        let mut registry = TypeRegistry::new();
        registry.reflect::<FooV2>();
        let mut diagnostics = Diagnostics::new();
        let loaded = Loader::new(&registry, &mut diagnostics, LoadFlags::empty())
            .create_root(&mut node)
            .unwrap();
        assert_eq!(loaded.downcast::<FooV2>().unwrap().m_value, 10);
    }

    #[test]
    fn deprecated_elements_leave_no_gaps() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<ShapeHolder>().reflect::<Square>();
        let holder = ShapeHolder {
            shapes: vec![
                Box::new(Circle { radius: 1.0 }),
                Box::new(Square { side: 1.0 }),
                Box::new(Circle { radius: 2.0 }),
                Box::new(Square { side: 2.0 }),
            ],
        };
        let mut node = save(&registry, &holder);

        let mut current = TypeRegistry::new();
        current.reflect::<ShapeHolder>();
        deprecate_square(&mut current, None);
        let mut diagnostics = Diagnostics::new();
        let loaded = Loader::new(&current, &mut diagnostics, LoadFlags::empty())
            .create_root(&mut node)
            .unwrap()
            .downcast::<ShapeHolder>()
            .unwrap();
        assert_eq!(loaded.shapes.len(), 2);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn unknown_types_are_reported_and_skipped() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<ShapeHolder>().reflect::<Square>();
        let holder = ShapeHolder {
            shapes: vec![Box::new(Square { side: 1.0 }), Box::new(Circle { radius: 1.0 })],
        };
        let node = save(&registry, &holder);

        let mut current = TypeRegistry::new();
        current.reflect::<ShapeHolder>();

        let mut diagnostics = Diagnostics::new();
        let loaded = Loader::new(&current, &mut diagnostics, LoadFlags::empty())
            .create_root(&mut node.clone())
            .unwrap()
            .downcast::<ShapeHolder>()
            .unwrap();
        assert_eq!(loaded.shapes.len(), 1);
        assert_eq!(diagnostics.count(IssueKind::UnknownType), 1);
        assert_eq!(diagnostics.issues()[0].path, "ShapeHolder.shapes[0]");

        let mut quiet = Diagnostics::new();
        Loader::new(&current, &mut quiet, LoadFlags::IGNORE_UNKNOWN_CLASSES)
            .create_root(&mut node.clone())
            .unwrap();
        assert!(quiet.is_empty());
    }

    #[test]
    fn unknown_field_names_are_dropped_silently() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<Foo>();
        let mut node = save(&registry, &Foo { m_data: 3 });
        node.add_node(DataElementNode::leaf("gone", &1_i32));

        let mut diagnostics = Diagnostics::new();
        let mut target = Foo::default();
        Loader::new(&registry, &mut diagnostics, LoadFlags::empty())
            .load_node_into(&mut target, &mut node)
            .unwrap();
        assert_eq!(target.m_data, 3);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn a_base_node_loads_into_the_base_sub_object() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<MultiDerived>();
        let mut node = save(&registry, &BaseA { a: 4 });
        assert_eq!(node.type_id(), BaseA::type_uuid());

        let mut diagnostics = Diagnostics::new();
        let mut target = MultiDerived::default();
        Loader::new(&registry, &mut diagnostics, LoadFlags::empty())
            .load_node_into(&mut target, &mut node)
            .unwrap();
        assert_eq!(target.base_a.a, 4);
    }

    #[test]
    fn maps_load_key_value_pairs() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<BTreeMap<String, i32>>();
        let map = BTreeMap::from([(String::from("a"), 1), (String::from("b"), 2)]);
        let mut node = save(&registry, &map);
        assert_eq!(node.children()[0].children().len(), 2);

        let mut diagnostics = Diagnostics::new();
        let mut target = BTreeMap::from([(String::from("z"), 0)]);
        Loader::new(&registry, &mut diagnostics, LoadFlags::empty())
            .load_node_into(&mut target, &mut node)
            .unwrap();
        assert_eq!(target, map);
    }

    #[test]
    fn corrupt_leaves_are_reported() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<Foo>();
        let mut node = save(&registry, &Foo { m_data: 3 });
        node.find_sub_element(name_crc("m_data"))
            .unwrap()
            .set_raw_data(crate::tree::ElementData::Binary(vec![1]));

        let mut diagnostics = Diagnostics::new();
        let mut target = Foo { m_data: 8 };
        Loader::new(&registry, &mut diagnostics, LoadFlags::empty())
            .load_node_into(&mut target, &mut node)
            .unwrap();
        assert_eq!(target.m_data, 8);
        assert_eq!(diagnostics.count(IssueKind::LeafData), 1);
    }
}
