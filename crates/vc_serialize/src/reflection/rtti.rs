use alloc::boxed::Box;
use core::any::Any;

use crate::reflection::{Reflect, TypeUuid};
use crate::registry::TypeRegistry;

/// Runtime type information for a possible polymorphic base.
///
/// Every [`Reflect`] type is its own base. Trait objects become bases through
/// [`rtti_base!`](crate::rtti_base), which requires the trait to have `Any` as
/// a supertrait:
///
/// ```
/// use core::any::Any;
/// use vc_serialize::{Reflect, RttiBase, TypeRegistry, rtti_base};
///
/// pub trait Shape: Any {
///     fn area(&self) -> f32;
/// }
///
/// rtti_base!(dyn Shape, "{0E26C5B2-94C8-4C3B-A7B1-6A0F2E5C9D11}");
///
/// #[derive(Reflect, Default)]
/// #[reflect(uuid = "{B4D1B9C3-2B8F-4B61-8F5E-0D0E64A0C2F4}", polymorphic(dyn Shape))]
/// struct Circle {
///     radius: f32,
/// }
///
/// impl Shape for Circle {
///     fn area(&self) -> f32 {
///         3.0 * self.radius * self.radius
///     }
/// }
///
/// let mut registry = TypeRegistry::new();
/// registry.reflect::<Box<dyn Shape>>();
/// registry.reflect::<Circle>();
///
/// let boxed: Box<dyn Any> = Box::new(Circle { radius: 2.0 });
/// let shape = <dyn Shape as RttiBase>::from_any(boxed, &registry).ok().unwrap();
/// assert_eq!(shape.area(), 12.0);
/// ```
pub trait RttiBase: TypeUuid {
    /// The most derived instance behind `self`.
    fn as_any(&self) -> &dyn Any;

    /// The most derived instance behind `self`, mutably.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Casts a detached instance to this base using the casts in `registry`.
    fn from_any(value: Box<dyn Any>, registry: &TypeRegistry) -> Result<Box<Self>, Box<dyn Any>>;

    /// Registers this base so that element type checks can resolve it.
    fn reflect_base(registry: &mut TypeRegistry);
}

impl<T: Reflect> RttiBase for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    #[inline]
    fn from_any(value: Box<dyn Any>, _registry: &TypeRegistry) -> Result<Box<Self>, Box<dyn Any>> {
        value.downcast::<T>()
    }

    #[inline]
    fn reflect_base(registry: &mut TypeRegistry) {
        registry.reflect::<T>();
    }
}
