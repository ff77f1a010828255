//! Bringing decoded nodes up to the registered schema.
//!
//! [`resolve_node`] runs before a node is materialized. It follows
//! deprecation redirects, rejects data from the future, and hands outdated
//! nodes to the class converter. The node records its
//! [`ConversionState`] so the work happens once.
//!
//! Converters are plain functions over the node:
//!
//! ```
//! use vc_serialize::{DataElementNode, TypeRegistry};
//! use vc_serialize::reflection::name_crc;
//!
//! // Version 2 renamed `m_data` to `m_value` and doubled it.
//! fn upgrade_foo(registry: &TypeRegistry, node: &mut DataElementNode) -> bool {
//!     if node.version() < 2 {
//!         let Ok(old) = node.get_child_data::<i32>(registry, name_crc("m_data")) else {
//!             return false;
//!         };
//!         node.remove_element_by_name(name_crc("m_data"));
//!         node.add_element_with_data(registry, "m_value", &(old * 2)).is_ok()
//!     } else {
//!         true
//!     }
//! }
//! # let _ = upgrade_foo;
//! ```

use uuid::Uuid;

use crate::registry::{ClassData, TypeRegistry};
use crate::tree::{ConversionState, DataElementNode};
use crate::walker::{Diagnostics, ElementError, ElementPath};

/// Longest chain of deprecation redirects followed for one node.
pub const MAX_REDIRECTS: usize = 16;

/// Resolves the class `node` is materialized as, converting it if needed.
///
/// - A deprecated class without converter discards the node.
/// - A deprecation converter may rebind the node to another type, which is
///   then resolved again.
/// - A node newer than its class is a [`ElementError::FutureVersion`].
/// - An older node goes through the class converter, which must keep the
///   type id. Its version then becomes the class version.
///
/// Discarded nodes yield [`ElementError::Discarded`]. A node whose converter
/// is running resolves to its class without converting again.
pub fn resolve_node<'r>(
    registry: &'r TypeRegistry,
    node: &mut DataElementNode,
) -> Result<&'r ClassData, ElementError> {
    match node.state() {
        ConversionState::Discarded => return Err(ElementError::Discarded),
        ConversionState::Done | ConversionState::Converting => return find(registry, node.type_id()),
        ConversionState::NeedsConversion => {}
    }

    let result = run(registry, node);
    node.set_state(match result {
        Ok(_) => ConversionState::Done,
        Err(ElementError::Discarded) => ConversionState::Discarded,
        Err(_) => ConversionState::NeedsConversion,
    });
    result
}

fn find(registry: &TypeRegistry, type_id: Uuid) -> Result<&ClassData, ElementError> {
    registry
        .find_class_data(&type_id)
        .ok_or(ElementError::UnknownType { type_id })
}

fn run<'r>(
    registry: &'r TypeRegistry,
    node: &mut DataElementNode,
) -> Result<&'r ClassData, ElementError> {
    let mut redirects = 0;
    loop {
        let class = find(registry, node.type_id())?;

        if class.is_deprecated() {
            let Some(converter) = class.converter() else {
                log::debug!("dropping `{}` of deprecated class {}", node.name(), class.name());
                return Err(ElementError::Discarded);
            };
            redirects += 1;
            if redirects > MAX_REDIRECTS {
                return Err(ElementError::ConversionLoop {
                    type_id: class.type_id(),
                });
            }
            node.set_state(ConversionState::Converting);
            if !converter(registry, node) || node.type_id() == class.type_id() {
                return Err(ElementError::Discarded);
            }
            log::trace!("deprecated {} redirected to {}", class.name(), node.type_id());
            node.set_state(ConversionState::NeedsConversion);
            continue;
        }

        if node.version() > class.version() {
            return Err(ElementError::FutureVersion {
                type_id: class.type_id(),
                found: node.version(),
                max: class.version(),
            });
        }

        if node.version() < class.version() {
            if let Some(converter) = class.converter() {
                log::trace!(
                    "converting `{}` from version {} to {}",
                    node.name(),
                    node.version(),
                    class.version()
                );
                node.set_state(ConversionState::Converting);
                if !converter(registry, node) {
                    return Err(ElementError::Discarded);
                }
                if node.type_id() != class.type_id() {
                    return Err(ElementError::ConverterPolicyViolation {
                        from: class.type_id(),
                        to: node.type_id(),
                    });
                }
            }
            node.set_version(class.version());
        }
        return Ok(class);
    }
}

/// Converts `node` and its whole subtree eagerly.
///
/// Discarded children are removed. Children that fail are reported and
/// removed as well. Returns the root error, if any.
pub fn convert_tree(
    registry: &TypeRegistry,
    node: &mut DataElementNode,
    diagnostics: &mut Diagnostics,
) -> Result<(), ElementError> {
    let mut path = ElementPath::new();
    let class = resolve_node(registry, node)?;
    path.push_field(class.name());
    convert_children(registry, node, &mut path, diagnostics);
    Ok(())
}

fn convert_children(
    registry: &TypeRegistry,
    node: &mut DataElementNode,
    path: &mut ElementPath,
    diagnostics: &mut Diagnostics,
) {
    node.children_mut().retain_mut(|child| {
        path.push_field(child.name());
        let keep = match resolve_node(registry, child) {
            Ok(_) => {
                convert_children(registry, child, path, diagnostics);
                true
            }
            Err(ElementError::Discarded) => false,
            Err(err) => {
                diagnostics.report(path, &err);
                false
            }
        };
        path.pop();
        keep
    });
}

#[cfg(test)]
mod tests {
    use super::{convert_tree, resolve_node};
    use crate::TypeUuid;
    use crate::fixtures::{
        ALIAS_A, BadFoo, Circle, Foo, FooV2, Square, deprecate_square, redirect_square_to_circle,
        register_alias_loop,
    };
    use crate::reflection::name_crc;
    use crate::registry::TypeRegistry;
    use crate::tree::{ConversionState, DataElementNode};
    use crate::walker::{Diagnostics, ElementError, save_to_node};

    fn foo_v1_node() -> DataElementNode {
        let mut registry = TypeRegistry::new();
        registry.reflect::<Foo>();
        save_to_node(&registry, &Foo { m_data: 5 }, "", &mut Diagnostics::new()).unwrap()
    }

    #[test]
    fn outdated_nodes_are_converted_once() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<FooV2>();

        let mut node = foo_v1_node();
        let class = resolve_node(&registry, &mut node).unwrap();
        assert_eq!(class.version(), 2);
        assert_eq!(node.version(), 2);
        assert_eq!(node.state(), ConversionState::Done);
        assert_eq!(node.get_child_data::<i32>(&registry, name_crc("m_value")), Ok(10));

        // Resolving again does not rerun the converter.
        resolve_node(&registry, &mut node).unwrap();
        assert_eq!(node.get_child_data::<i32>(&registry, name_crc("m_value")), Ok(10));
    }

    #[test]
    fn conversion_is_deterministic() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<FooV2>();

        let mut first = foo_v1_node();
        let mut second = foo_v1_node();
        convert_tree(&registry, &mut first, &mut Diagnostics::new()).unwrap();
        convert_tree(&registry, &mut second, &mut Diagnostics::new()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn newer_data_is_rejected() {
        let registry = {
            let mut registry = TypeRegistry::new();
            registry.reflect::<Foo>();
            registry
        };
        let mut node = foo_v1_node();
        node.set_version(7);
        assert_eq!(
            resolve_node(&registry, &mut node).map(|_| ()),
            Err(ElementError::FutureVersion {
                type_id: Foo::type_uuid(),
                found: 7,
                max: 1,
            })
        );
    }

    #[test]
    fn converters_may_not_change_the_type() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<BadFoo>();

        let mut node = foo_v1_node();
        assert!(matches!(
            resolve_node(&registry, &mut node),
            Err(ElementError::ConverterPolicyViolation { .. })
        ));
    }

    #[test]
    fn deprecation_discards_or_redirects() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<Square>();
        let mut diagnostics = Diagnostics::new();
        let saved = save_to_node(&registry, &Square { side: 3.0 }, "", &mut diagnostics).unwrap();

        let mut dropped = TypeRegistry::new();
        deprecate_square(&mut dropped, None);
        let mut node = saved.clone();
        assert_eq!(resolve_node(&dropped, &mut node).map(|_| ()), Err(ElementError::Discarded));
        assert_eq!(node.state(), ConversionState::Discarded);

        let mut redirected = TypeRegistry::new();
        redirected.reflect::<Circle>();
        deprecate_square(&mut redirected, Some(redirect_square_to_circle));
        let mut node = saved;
        let class = resolve_node(&redirected, &mut node).unwrap();
        assert_eq!(class.type_id(), Circle::type_uuid());
        assert_eq!(node.get_data::<Circle>(&redirected).unwrap().radius, 3.0);
    }

    #[test]
    fn redirect_chains_are_bounded() {
        let mut registry = TypeRegistry::new();
        register_alias_loop(&mut registry);

        let mut node = DataElementNode::new("", ALIAS_A, 0);
        assert!(matches!(
            resolve_node(&registry, &mut node),
            Err(ElementError::ConversionLoop { .. })
        ));
    }
}
