use core::any::Any;

use crate::container::{ElementInstance, ElementRef, ReservedElement};
use crate::registry::{ClassElement, TypeRegistry};

/// Generic operations on instances of one container type.
///
/// Every method taking an instance expects the container type the adapter
/// was registered for and treats anything else as empty. Elements are
/// added in three steps: [`reserve_element`](Self::reserve_element) picks a
/// slot, the caller builds a detached element, and
/// [`store_element`](Self::store_element) moves it into the slot.
///
/// Loading into an existing instance always starts with
/// [`clear_elements`](Self::clear_elements), which makes an in-place load a
/// replacement rather than a merge.
///
/// # Examples
///
/// ```
/// use vc_serialize::container::{ElementInstance, ElementRef};
/// use vc_serialize::{TypeRegistry, TypeUuid};
///
/// let mut registry = TypeRegistry::new();
/// registry.reflect::<Vec<u32>>();
/// let class = registry.class_of::<Vec<u32>>().unwrap();
/// let container = class.container().unwrap();
///
/// let mut values = vec![1_u32, 2];
/// let slot = container.reserve_element(&mut values, None).unwrap();
/// container
///     .store_element(&mut values, slot, ElementInstance::Value(Box::new(3_u32)), &registry)
///     .unwrap();
/// assert_eq!(values, [1, 2, 3]);
///
/// let mut seen = Vec::new();
/// container.enum_elements(&values, &mut |element| {
///     if let ElementRef::Value { value, .. } = element {
///         seen.push(*value.downcast_ref::<u32>().unwrap());
///     }
///     true
/// });
/// assert_eq!(seen, [1, 2, 3]);
/// ```
pub trait ContainerAdapter: Send + Sync {
    /// The slot descriptor named `name_crc`.
    fn element(&self, name_crc: u32) -> Option<&ClassElement>;

    /// Calls `f` with every slot descriptor.
    fn enum_types(&self, f: &mut dyn FnMut(&ClassElement));

    /// Key and value descriptors, for maps only.
    fn entry_elements(&self) -> Option<(&ClassElement, &ClassElement)> {
        None
    }

    /// Number of elements in `instance`.
    fn size(&self, instance: &dyn Any) -> usize;

    /// Maximum number of elements, `usize::MAX` when unbounded.
    fn capacity(&self, instance: &dyn Any) -> usize {
        let _ = instance;
        usize::MAX
    }

    /// Whether the number of elements is part of the type.
    fn is_fixed_size(&self) -> bool {
        false
    }

    /// Whether the capacity is bounded.
    fn is_fixed_capacity(&self) -> bool {
        false
    }

    /// Whether element addresses survive further insertions.
    fn is_stable_elements(&self) -> bool {
        false
    }

    /// Whether this is a pointer holding zero or one element.
    fn is_smart_pointer(&self) -> bool {
        false
    }

    fn can_access_elements_by_index(&self) -> bool {
        false
    }

    /// Picks a slot for a new element.
    ///
    /// `None` means the container is full. Callers stop adding silently.
    fn reserve_element(
        &self,
        instance: &mut dyn Any,
        element: Option<&ClassElement>,
    ) -> Option<ReservedElement>;

    /// Moves a detached element into a reserved slot.
    ///
    /// Gives the element back when it does not fit the container.
    fn store_element(
        &self,
        instance: &mut dyn Any,
        reserved: ReservedElement,
        value: ElementInstance,
        registry: &TypeRegistry,
    ) -> Result<(), ElementInstance>;

    /// Releases a slot that will not be stored.
    fn free_reserved_element(&self, instance: &mut dyn Any, reserved: ReservedElement) {
        let _ = (instance, reserved);
    }

    /// The element at `index`, for indexable containers.
    fn get_element<'a>(&'a self, instance: &'a dyn Any, index: usize) -> Option<ElementRef<'a>> {
        let mut current = 0;
        let mut found = None;
        self.enum_elements(instance, &mut |element| {
            if current == index {
                found = Some(element);
                return false;
            }
            current += 1;
            true
        });
        found
    }

    /// Calls `visit` with each element in order until it returns `false`.
    fn enum_elements<'a>(
        &'a self,
        instance: &'a dyn Any,
        visit: &mut dyn FnMut(ElementRef<'a>) -> bool,
    );

    /// Removes the element at `index`.
    fn remove_element(
        &self,
        instance: &mut dyn Any,
        index: usize,
        registry: Option<&TypeRegistry>,
    ) -> bool;

    /// Removes every element. Fixed-size containers keep their elements.
    fn clear_elements(&self, instance: &mut dyn Any, registry: Option<&TypeRegistry>);

    /// Starts a pass of reserve and store calls.
    fn on_write_begin(&self, instance: &mut dyn Any) {
        let _ = instance;
    }

    /// Ends the pass started by [`on_write_begin`](Self::on_write_begin).
    fn on_write_end(&self, instance: &mut dyn Any) {
        let _ = instance;
    }
}
