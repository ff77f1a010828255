use alloc::boxed::Box;
use core::any::Any;

use uuid::Uuid;

use crate::reflection::TypeUuid;
use crate::registry::TypeRegistry;

// -----------------------------------------------------------------------------
// Reflect

/// A type whose shape can be registered in a [`TypeRegistry`].
///
/// `reflect` is the single registration entry point of a type. The same call
/// is used to remove the type again, see [`TypeRegistry::unreflect`].
///
/// The remaining items describe how a value behaves when it is an element of
/// a container. Only smart pointers override them: a `Box<dyn Shape>` element
/// is stored as the shape it points to, not as the box.
///
/// Most types implement this trait through `#[derive(Reflect)]`.
///
/// # Examples
///
/// ```
/// use vc_serialize::{Reflect, TypeRegistry, field};
///
/// #[derive(Default)]
/// struct Foo {
///     data: i32,
/// }
///
/// impl vc_serialize::TypeUuid for Foo {
///     fn type_uuid() -> uuid::Uuid {
///         uuid::Uuid::from_u128(0x5F8E_02B1_7A90_4F0E_8D54_A4D1_E2C8_9B31)
///     }
///     fn type_name() -> std::borrow::Cow<'static, str> {
///         "Foo".into()
///     }
/// }
///
/// impl Reflect for Foo {
///     fn reflect(registry: &mut TypeRegistry) {
///         registry
///             .class::<Foo>()
///             .version(1)
///             .field("m_data", field!(Foo, data));
///     }
/// }
///
/// let mut registry = TypeRegistry::new();
/// registry.reflect::<Foo>();
/// let class = registry.find_class_data(&<Foo as vc_serialize::TypeUuid>::type_uuid()).unwrap();
/// assert_eq!(class.elements().len(), 1);
/// ```
pub trait Reflect: TypeUuid + Sized {
    /// `true` when container elements of this type are stored as their pointee.
    const IS_POINTER: bool = false;

    /// Registers (or, in removal mode, unregisters) this type.
    fn reflect(registry: &mut TypeRegistry);

    /// The type recorded for this value when it is a container element.
    #[inline]
    fn element_type_uuid() -> Uuid {
        Self::type_uuid()
    }

    /// The instance the walker visits when this value is a container element.
    #[inline]
    fn as_element(&self) -> &dyn Any {
        self
    }

    /// Rebuilds an element from a detached instance created by a class factory.
    ///
    /// Returns the instance unchanged when it cannot become `Self`.
    #[inline]
    fn from_element(element: Box<dyn Any>, registry: &TypeRegistry) -> Result<Self, Box<dyn Any>> {
        let _ = registry;
        element.downcast::<Self>().map(|boxed| *boxed)
    }
}
