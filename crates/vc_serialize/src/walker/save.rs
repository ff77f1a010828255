use alloc::vec::Vec;
use core::any::Any;

use crate::registry::{ClassData, ClassElement, TypeRegistry};
use crate::tree::{DataElementNode, ElementData};
use crate::walker::{Diagnostics, ElementError, ElementPath, InstanceVisitor, enumerate_instance};

/// Builds a [`DataElementNode`] tree from a walked instance.
struct TreeBuilder<'n> {
    root_name: &'n str,
    stack: Vec<DataElementNode>,
    root: Option<DataElementNode>,
    failures: Vec<(ElementPath, ElementError)>,
}

impl TreeBuilder<'_> {
    fn current_path(&self, element: Option<&ClassElement>) -> ElementPath {
        let mut path = ElementPath::new();
        for node in &self.stack {
            path.push_field(node.name());
        }
        if let Some(element) = element {
            path.push_field(element.name());
        }
        path
    }
}

impl InstanceVisitor for TreeBuilder<'_> {
    fn begin_element(
        &mut self,
        instance: Option<&dyn Any>,
        class: &ClassData,
        element: Option<&ClassElement>,
    ) -> bool {
        let name = element.map_or(self.root_name, |e| e.name());
        let mut node = DataElementNode::new(name, class.type_id(), class.version());

        if let (Some(instance), Some(serializer)) = (instance, class.serializer()) {
            let mut bytes = Vec::new();
            if let Err(err) = serializer.save(instance, &mut bytes) {
                let path = self.current_path(element);
                self.failures.push((path, err.into()));
                return false;
            }
            node.set_raw_data(ElementData::Binary(bytes));
        }

        self.stack.push(node);
        true
    }

    fn end_element(&mut self) -> bool {
        let Some(node) = self.stack.pop() else {
            return false;
        };
        match self.stack.last_mut() {
            Some(parent) => {
                parent.add_node(node);
            }
            None => self.root = Some(node),
        }
        true
    }
}

/// Saves `instance` into a new tree whose root is called `name`.
///
/// Leaves hold the canonical binary payload of their serializer. Elements
/// that cannot be saved are reported and left out. Fails only when the root
/// itself cannot be saved.
pub fn save_to_node(
    registry: &TypeRegistry,
    instance: &dyn Any,
    name: &str,
    diagnostics: &mut Diagnostics,
) -> Result<DataElementNode, ElementError> {
    let mut builder = TreeBuilder {
        root_name: name,
        stack: Vec::new(),
        root: None,
        failures: Vec::new(),
    };
    enumerate_instance(registry, instance, &mut builder, diagnostics)?;

    let mut failures = builder.failures.into_iter();
    match builder.root {
        Some(root) => {
            for (path, error) in failures {
                diagnostics.report(&path, &error);
            }
            Ok(root)
        }
        // Only a failing root leaf leaves no root behind.
        None => Err(failures
            .next()
            .map_or(ElementError::UnregisteredInstance, |(_, error)| error)),
    }
}
