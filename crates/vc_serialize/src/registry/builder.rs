use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::format;
use alloc::sync::Arc;
use core::any::{Any, TypeId};
use core::marker::PhantomData;

use uuid::Uuid;

use crate::container::ContainerAdapter;
use crate::reflection::{FieldDesc, Reflect, RttiBase, name_crc};
use crate::registry::class_data::{BoxCaster, RttiCast};
use crate::registry::{
    BaseClassData, ClassData, ClassElement, ElementFlags, EventHandler, RegistrationError,
    TypeRegistry, VersionConverter,
};
use crate::serializer::DataSerializer;

// -----------------------------------------------------------------------------
// ClassBuilder

/// Fluent description of one class, committed to the registry on drop.
///
/// Created by [`TypeRegistry::class`] and its siblings. Each call adds to the
/// class being built. When the builder goes out of scope the class is
/// registered, or unregistered if the registry is in removal mode. Use
/// [`finish`](Self::finish) to observe the registration result.
///
/// Field types are reflected on the way, so registering a class also
/// registers everything it contains.
///
/// # Examples
///
/// ```
/// use vc_serialize::{Reflect, TypeRegistry, TypeUuid, field};
///
/// #[derive(Reflect, Default)]
/// #[reflect(uuid = "{4A9C8F2D-3B61-4E0A-9D7E-51B2C4E6F801}", version = 2)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// let mut registry = TypeRegistry::new();
/// registry.reflect::<Health>();
///
/// let class = registry.find_class_data(&Health::type_uuid()).unwrap();
/// assert_eq!(class.version(), 2);
/// assert_eq!(class.elements()[1].name(), "max");
/// ```
pub struct ClassBuilder<'a, T: ?Sized + 'static> {
    registry: &'a mut TypeRegistry,
    class: ClassData,
    committed: bool,
    removing: bool,
    base_count: usize,
    _marker: PhantomData<fn() -> Box<T>>,
}

impl<'a, T: ?Sized + 'static> ClassBuilder<'a, T> {
    pub(crate) fn new(registry: &'a mut TypeRegistry, class: ClassData) -> Self {
        let removing = registry.is_removing_reflection();
        if !removing {
            registry.in_progress.insert(class.type_id);
        }
        Self {
            registry,
            class,
            committed: false,
            removing,
            base_count: 0,
            _marker: PhantomData,
        }
    }

    #[inline]
    fn class_mut(&mut self) -> &mut ClassData {
        &mut self.class
    }

    /// Overrides the class name written into readable formats.
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        let class = self.class_mut();
        class.name = name.into();
        class.name_crc = name_crc(&class.name);
        self
    }

    /// Sets the current data version of the class.
    pub fn version(mut self, version: u32) -> Self {
        self.class_mut().version = version;
        self
    }

    /// Sets the converter for data older than [`version`](Self::version).
    pub fn converter(mut self, converter: VersionConverter) -> Self {
        self.class_mut().converter = Some(converter);
        self
    }

    /// Makes instances of the class leaves handled by `serializer`.
    pub fn serializer(mut self, serializer: impl DataSerializer + 'static) -> Self {
        self.class_mut().serializer = Some(Arc::new(serializer));
        self
    }

    /// Makes the class a container handled by `container`.
    pub fn container(mut self, container: impl ContainerAdapter + 'static) -> Self {
        self.class_mut().container = Some(Box::new(container));
        self
    }

    /// Attaches lifecycle hooks.
    pub fn event_handler(mut self, handler: impl EventHandler + 'static) -> Self {
        self.class_mut().event_handler = Some(Arc::new(handler));
        self
    }

    /// Adds an attribute to the last element, or to the class if no element
    /// has been added yet.
    pub fn attribute<V: Any + Send + Sync>(
        mut self,
        name: impl Into<Cow<'static, str>>,
        value: V,
    ) -> Self {
        let class = self.class_mut();
        match class.elements.last_mut() {
            Some(element) => element.attributes_mut().insert(name, value),
            None => class.attributes.insert(name, value),
        }
        self
    }

    /// Commits the class now and returns the registration result.
    pub fn finish(mut self) -> Result<(), RegistrationError> {
        self.commit()
    }

    fn commit(&mut self) -> Result<(), RegistrationError> {
        if core::mem::replace(&mut self.committed, true) {
            return Ok(());
        }
        let class = core::mem::replace(&mut self.class, ClassData::new(Uuid::nil(), ""));
        self.registry.in_progress.remove(&class.type_id);
        self.registry.register_class(class)
    }
}

impl<T: Any> ClassBuilder<'_, T> {
    /// Adds a serialized field.
    ///
    /// The field type is reflected first unless the registry is removing
    /// reflection.
    pub fn field<F: Reflect>(
        mut self,
        name: impl Into<Cow<'static, str>>,
        desc: FieldDesc<T, F>,
    ) -> Self {
        if !self.removing {
            self.registry.reflect::<F>();
        }
        let offset = desc.offset();
        let element = ClassElement::new(name, F::type_uuid(), size_of::<F>())
            .with_accessor(offset, Arc::new(desc));
        self.class_mut().elements.push(element);
        self
    }

    /// Declares an embedded base class.
    ///
    /// The base is stored as an element named `BaseClass1`, `BaseClass2` and
    /// so on, and recorded in the base table at the field's offset.
    pub fn base<B: Reflect>(mut self, desc: FieldDesc<T, B>) -> Self {
        if !self.removing {
            self.registry.reflect::<B>();
        }
        self.base_count += 1;
        let offset = desc.offset();
        let name = format!("BaseClass{}", self.base_count);
        let element = ClassElement::new(name, B::type_uuid(), size_of::<B>())
            .with_accessor(offset, Arc::new(desc))
            .with_flags(ElementFlags::BASE_CLASS);

        let class = self.class_mut();
        class.base_classes.push(BaseClassData {
            type_id: B::type_uuid(),
            offset,
            polymorphic: false,
            element: Some(class.elements.len()),
        });
        class.elements.push(element);
        self
    }

    /// Declares a trait-object base.
    ///
    /// `cast` turns a boxed instance into the base, usually by unsizing:
    /// `|value: Box<Self>| -> Box<dyn Shape> { value }`.
    pub fn rtti_base<B: ?Sized + RttiBase>(mut self, cast: fn(Box<T>) -> Box<B>) -> Self {
        if !self.removing {
            B::reflect_base(self.registry);
        }
        let caster: BoxCaster<B> =
            Box::new(move |value: Box<dyn Any>| value.downcast::<T>().map(cast));

        let class = self.class_mut();
        class.base_classes.push(BaseClassData {
            type_id: B::type_uuid(),
            offset: 0,
            polymorphic: true,
            element: None,
        });
        class.rtti_casts.push(RttiCast {
            base: B::type_uuid(),
            rust_base: TypeId::of::<B>(),
            caster: Box::new(caster),
        });
        self
    }
}

impl<T: ?Sized + 'static> Drop for ClassBuilder<'_, T> {
    fn drop(&mut self) {
        // `register_class` already logged the failure.
        let _ = self.commit();
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use crate::TypeUuid;
    use crate::fixtures::{Circle, Foo, MultiDerived, Shape};
    use crate::registry::TypeRegistry;

    #[test]
    fn attributes_attach_to_last_element() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<Foo>();
        let class = registry.find_class_data(&Foo::type_uuid()).unwrap();

        assert!(class.attributes().contains("category"));
        assert_eq!(class.elements()[0].attributes().get::<i32>("min"), Some(&0));
    }

    #[test]
    fn bases_are_numbered_elements() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<MultiDerived>();
        let class = registry.find_class_data(&MultiDerived::type_uuid()).unwrap();

        let names: Vec<_> = class.elements().iter().map(|e| e.name()).collect();
        assert_eq!(&names[..2], ["BaseClass1", "BaseClass2"]);
        assert!(class.elements()[0].is_base_class());
        assert_eq!(class.base_classes().len(), 2);
    }

    #[test]
    fn trait_bases_register_the_abstract_class() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<Circle>();

        let shape = <dyn Shape as TypeUuid>::type_uuid();
        assert!(registry.find_class_data(&shape).is_some());
        assert!(registry.is_derived_from(&Circle::type_uuid(), &shape));
    }

    #[test]
    fn derive_honors_field_attributes() {
        #[derive(crate::Reflect)]
        #[reflect(uuid = "{5B0E3D71-A2C4-4F98-B6E1-07D3C9A84F25}", name = "Sprite", no_factory)]
        struct Sprite {
            #[reflect(rename = "m_path")]
            path: String,
            #[reflect(skip)]
            _handle: Option<u32>,
            layer: u8,
        }

        let mut registry = TypeRegistry::new();
        registry.reflect::<Sprite>();
        let class = registry.find_class_data(&Sprite::type_uuid()).unwrap();

        assert_eq!(class.name(), "Sprite");
        let names: Vec<_> = class.elements().iter().map(|e| e.name()).collect();
        assert_eq!(names, ["m_path", "layer"]);
        assert!(class.create_instance().is_none());
    }
}
