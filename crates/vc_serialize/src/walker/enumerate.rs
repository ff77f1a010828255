use alloc::string::ToString;
use core::any::Any;

use crate::container::{ContainerAdapter, ElementRef};
use crate::registry::{ClassData, ClassElement, TypeRegistry};
use crate::walker::{Diagnostics, ElementError, ElementPath};

/// Receives the elements of a walked instance.
///
/// Calls nest: every `begin_element` that returns `true` is matched by one
/// `end_element` after the children of the element.
pub trait InstanceVisitor {
    /// Called before the children of an element.
    ///
    /// `instance` is `None` for map entries, which have no object of their
    /// own. `element` is `None` for the root. Returning `false` skips the
    /// children and the matching `end_element`.
    fn begin_element(
        &mut self,
        instance: Option<&dyn Any>,
        class: &ClassData,
        element: Option<&ClassElement>,
    ) -> bool;

    /// Called after the children of an element. Returning `false` aborts the
    /// walk.
    fn end_element(&mut self) -> bool {
        true
    }
}

/// Walks `instance` depth first and calls `visitor` for each element.
///
/// Elements whose class cannot be resolved are reported and skipped. Returns
/// `Ok(false)` when the visitor aborted the walk, and an error when the class
/// of `instance` itself is unknown.
///
/// # Examples
///
/// ```
/// use core::any::Any;
/// use vc_serialize::{ClassData, ClassElement, TypeRegistry};
/// use vc_serialize::walker::{Diagnostics, InstanceVisitor, enumerate_instance};
///
/// struct Names(Vec<String>);
///
/// impl InstanceVisitor for Names {
///     fn begin_element(
///         &mut self,
///         _: Option<&dyn Any>,
///         class: &ClassData,
///         _: Option<&ClassElement>,
///     ) -> bool {
///         self.0.push(class.name().to_string());
///         true
///     }
/// }
///
/// let mut registry = TypeRegistry::new();
/// registry.reflect::<Vec<u8>>();
///
/// let mut names = Names(Vec::new());
/// let mut diagnostics = Diagnostics::new();
/// enumerate_instance(&registry, &vec![1_u8, 2], &mut names, &mut diagnostics).unwrap();
/// assert_eq!(names.0, ["Vec<u8>", "u8", "u8"]);
/// ```
pub fn enumerate_instance(
    registry: &TypeRegistry,
    instance: &dyn Any,
    visitor: &mut dyn InstanceVisitor,
    diagnostics: &mut Diagnostics,
) -> Result<bool, ElementError> {
    let class = registry
        .find_class_data_for_instance(instance)
        .ok_or(ElementError::UnregisteredInstance)?;

    let mut walk = Walk {
        registry,
        visitor,
        diagnostics,
        path: ElementPath::new(),
    };
    walk.path.push_field(class.name());
    Ok(walk.element(instance, class, None))
}

struct Walk<'r, 'v, 'd> {
    registry: &'r TypeRegistry,
    visitor: &'v mut dyn InstanceVisitor,
    diagnostics: &'d mut Diagnostics,
    path: ElementPath,
}

impl<'r> Walk<'r, '_, '_> {
    fn report(&mut self, error: &ElementError) {
        self.diagnostics.report(&self.path, error);
    }

    /// Returns `false` once the walk is aborted.
    fn element(
        &mut self,
        instance: &dyn Any,
        class: &'r ClassData,
        element: Option<&ClassElement>,
    ) -> bool {
        if !self.visitor.begin_element(Some(instance), class, element) {
            return true;
        }
        if let Some(handler) = class.event_handler() {
            handler.on_read_begin(instance);
        }

        let keep_going = if class.is_leaf() {
            true
        } else if let Some(container) = class.container() {
            self.container(instance, container)
        } else {
            self.fields(instance, class)
        };

        if let Some(handler) = class.event_handler() {
            handler.on_read_end(instance);
        }
        keep_going && self.visitor.end_element()
    }

    fn fields(&mut self, instance: &dyn Any, class: &'r ClassData) -> bool {
        for element in class.elements() {
            self.path.push_field(element.name());
            let keep_going = match element.accessor().and_then(|a| a.get(instance)) {
                Some(value) => self.value(value, element),
                None => {
                    self.report(&ElementError::FieldAccess {
                        field: element.name().to_string(),
                    });
                    true
                }
            };
            self.path.pop();
            if !keep_going {
                return false;
            }
        }
        true
    }

    /// Resolves the class of `value`, the dynamic one for pointer elements.
    fn value(&mut self, value: &dyn Any, element: &ClassElement) -> bool {
        let type_id = if element.is_pointer() {
            self.registry.actual_type_id(value)
        } else {
            Some(element.type_id())
        };
        match type_id.and_then(|id| self.registry.find_class_data(&id)) {
            Some(class) => self.element(value, class, Some(element)),
            None => {
                self.report(&ElementError::UnknownType {
                    type_id: type_id.unwrap_or(element.type_id()),
                });
                true
            }
        }
    }

    fn container(&mut self, instance: &dyn Any, container: &dyn ContainerAdapter) -> bool {
        let mut keep_going = true;
        let mut index = 0;
        container.enum_elements(instance, &mut |item| {
            self.path.push_index(index);
            index += 1;
            keep_going = match item {
                ElementRef::Value { value, element } => self.value(value, element),
                ElementRef::Entry {
                    key,
                    value,
                    element,
                } => self.entry(container, key, value, element),
            };
            self.path.pop();
            keep_going
        });
        keep_going
    }

    fn entry(
        &mut self,
        container: &dyn ContainerAdapter,
        key: &dyn Any,
        value: &dyn Any,
        element: &ClassElement,
    ) -> bool {
        let Some(pair) = self.registry.find_class_data(&element.type_id()) else {
            self.report(&ElementError::UnknownType {
                type_id: element.type_id(),
            });
            return true;
        };
        if !self.visitor.begin_element(None, pair, Some(element)) {
            return true;
        }
        if let Some((key_element, value_element)) = container.entry_elements() {
            for (part, part_element) in [(key, key_element), (value, value_element)] {
                self.path.push_field(part_element.name());
                let keep_going = self.value(part, part_element);
                self.path.pop();
                if !keep_going {
                    return false;
                }
            }
        }
        self.visitor.end_element()
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::any::Any;

    use super::{InstanceVisitor, enumerate_instance};
    use crate::fixtures::{Circle, Foo, ShapeHolder};
    use crate::registry::{ClassData, ClassElement, TypeRegistry};
    use crate::walker::Diagnostics;

    #[derive(Default)]
    struct Trace {
        events: Vec<String>,
        skip: Option<&'static str>,
        stop_after: Option<usize>,
    }

    impl InstanceVisitor for Trace {
        fn begin_element(
            &mut self,
            _: Option<&dyn Any>,
            class: &ClassData,
            element: Option<&ClassElement>,
        ) -> bool {
            let name = element.map_or("<root>", |e| e.name());
            self.events.push(alloc::format!("{name}:{}", class.name()));
            self.skip != Some(class.name())
        }

        fn end_element(&mut self) -> bool {
            self.events.push("end".into());
            self.stop_after.is_none_or(|n| self.events.len() < n)
        }
    }

    #[test]
    fn pointer_elements_report_their_dynamic_type() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<ShapeHolder>();
        let holder = ShapeHolder {
            shapes: vec![Box::new(Circle { radius: 1.0 })],
        };

        let mut trace = Trace::default();
        let mut diagnostics = Diagnostics::new();
        assert_eq!(
            enumerate_instance(&registry, &holder, &mut trace, &mut diagnostics),
            Ok(true)
        );
        assert_eq!(trace.events[2], "element:Circle");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn begin_element_false_skips_children() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<ShapeHolder>();
        let holder = ShapeHolder {
            shapes: vec![Box::new(Circle { radius: 1.0 })],
        };

        let mut trace = Trace {
            skip: Some("Circle"),
            ..Trace::default()
        };
        let mut diagnostics = Diagnostics::new();
        enumerate_instance(&registry, &holder, &mut trace, &mut diagnostics).unwrap();
        assert!(!trace.events.iter().any(|e| e.starts_with("radius")));
        // The skipped element gets no `end`.
        assert_eq!(trace.events.iter().filter(|e| *e == "end").count(), 2);
    }

    #[test]
    fn end_element_false_aborts() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<Foo>();

        let mut trace = Trace {
            stop_after: Some(1),
            ..Trace::default()
        };
        let mut diagnostics = Diagnostics::new();
        let walked = enumerate_instance(&registry, &Foo { m_data: 1 }, &mut trace, &mut diagnostics);
        assert_eq!(walked, Ok(false));
    }

    #[test]
    fn unregistered_root_is_an_error() {
        let registry = TypeRegistry::new();
        let mut diagnostics = Diagnostics::new();
        assert!(
            enumerate_instance(&registry, &Foo::default(), &mut Trace::default(), &mut diagnostics)
                .is_err()
        );
    }
}
