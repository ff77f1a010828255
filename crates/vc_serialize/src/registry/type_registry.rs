use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::{Any, TypeId};

use uuid::Uuid;
use vc_utils::hash::{HashSet, NoOpHashMap};
use vc_utils::{TypeIdMap, UuidMap};

use crate::reflection::{Reflect, TypeUuid, name_crc, uuid_to_string};
use crate::registry::class_data::BoxCaster;
use crate::registry::{
    ClassBuilder, ClassData, ClassEditData, ClassElement, EditBuilder, EditData, Factory,
    RegistrationError, VersionConverter,
};

// -----------------------------------------------------------------------------
// TypeRegistry

/// The central store of reflected classes.
///
/// Classes are keyed by their persistent [`Uuid`]. Secondary indices map
/// name hashes and Rust [`TypeId`]s back to that key, so the registry can
/// resolve both the types recorded in data and the types of live instances.
///
/// Registration goes through [`reflect`](Self::reflect), which runs a type's
/// [`Reflect::reflect`] once. The same function removes the type again when
/// the registry is in removal mode, see [`unreflect`](Self::unreflect).
///
/// # Examples
///
/// ```
/// use vc_serialize::{Reflect, TypeRegistry, TypeUuid};
///
/// #[derive(Reflect, Default)]
/// #[reflect(uuid = "{9B1C3D5E-7F80-4A2B-9C3D-4E5F60718293}")]
/// struct Position {
///     x: f32,
///     y: f32,
/// }
///
/// let mut registry = TypeRegistry::new();
/// registry.reflect::<Position>();
/// assert_eq!(registry.find_class_id_by_name("Position"), [Position::type_uuid()]);
///
/// registry.unreflect::<Position>();
/// assert!(registry.find_class_data(&Position::type_uuid()).is_none());
/// // Field types are shared and stay registered.
/// assert!(registry.find_class_data(&f32::type_uuid()).is_some());
/// ```
pub struct TypeRegistry {
    classes: UuidMap<ClassData>,
    name_index: NoOpHashMap<u32, Vec<Uuid>>,
    rust_types: TypeIdMap<Uuid>,
    edit_data: UuidMap<ClassEditData>,
    pub(crate) in_progress: HashSet<Uuid>,
    remove_reflection: bool,
}

impl Default for TypeRegistry {
    /// See [`TypeRegistry::new`].
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Creates a registry without any class.
    pub fn empty() -> Self {
        Self {
            classes: UuidMap::new(),
            name_index: NoOpHashMap::default(),
            rust_types: TypeIdMap::new(),
            edit_data: UuidMap::new(),
            in_progress: HashSet::default(),
            remove_reflection: false,
        }
    }

    /// Creates a registry with the leaf types registered.
    ///
    /// - `bool` `char`
    /// - `i8` `i16` `i32` `i64`
    /// - `u8` `u16` `u32` `u64`
    /// - `f32` `f64`
    /// - `String` `Uuid`
    pub fn new() -> Self {
        let mut registry = Self::empty();
        crate::impls::reflect_primitives(&mut registry);
        registry
    }

    // -------------------------------------------------------------------------
    // Reflection

    /// Registers `T` and everything it contains, once.
    ///
    /// In removal mode this unregisters `T` instead. A conflicting class
    /// under the id of `T` is logged and kept, see
    /// [`try_reflect`](Self::try_reflect).
    pub fn reflect<T: Reflect>(&mut self) -> &mut Self {
        let _ = self.try_reflect::<T>();
        self
    }

    /// Registers `T` like [`reflect`](Self::reflect), reporting conflicts.
    ///
    /// The id of `T` may already hold a class bound to another Rust type,
    /// or a deprecation record. Both are kept and the conflict is returned
    /// as [`RegistrationError::IncompatibleShape`].
    pub fn try_reflect<T: Reflect>(&mut self) -> Result<(), RegistrationError> {
        if self.remove_reflection {
            T::reflect(self);
            return Ok(());
        }
        let id = T::type_uuid();
        if self.in_progress.contains(&id) {
            return Ok(());
        }
        match self.classes.get(&id) {
            None => {
                T::reflect(self);
                Ok(())
            }
            Some(existing) if existing.rust_type_id() == Some(TypeId::of::<T>()) => Ok(()),
            Some(existing) => {
                log::error!(
                    "`{}` {} cannot be reflected, the id is already registered as `{}`",
                    T::type_name(),
                    uuid_to_string(&id),
                    existing.name,
                );
                Err(RegistrationError::IncompatibleShape {
                    name: T::type_name().into(),
                    type_id: id,
                })
            }
        }
    }

    /// Removes `T` by running its reflection in removal mode.
    ///
    /// Only the classes `T::reflect` describes directly are removed. Types
    /// reached through fields stay registered.
    pub fn unreflect<T: Reflect>(&mut self) -> &mut Self {
        let previous = core::mem::replace(&mut self.remove_reflection, true);
        T::reflect(self);
        self.remove_reflection = previous;
        self
    }

    /// Registers a dependency of the class being reflected.
    ///
    /// A no-op in removal mode, so that shared types survive.
    #[inline]
    pub fn reflect_dependency<T: Reflect>(&mut self) {
        if !self.remove_reflection {
            self.reflect::<T>();
        }
    }

    /// Turns on removal mode: class registrations unregister instead.
    #[inline]
    pub fn enable_remove_reflection(&mut self) {
        self.remove_reflection = true;
    }

    /// Turns off removal mode.
    #[inline]
    pub fn disable_remove_reflection(&mut self) {
        self.remove_reflection = false;
    }

    #[inline]
    pub fn is_removing_reflection(&self) -> bool {
        self.remove_reflection
    }

    /// Starts describing `T`, with a factory producing `T::default()`.
    pub fn class<T: Reflect + Default>(&mut self) -> ClassBuilder<'_, T> {
        let mut class = Self::class_for::<T>();
        class.factory = Some(Factory::from_default::<T>());
        ClassBuilder::new(self, class)
    }

    /// Starts describing `T`, with a factory calling `create`.
    pub fn class_with_factory<T: Reflect>(&mut self, create: fn() -> T) -> ClassBuilder<'_, T> {
        let mut class = Self::class_for::<T>();
        class.factory = Some(Factory::new(create));
        ClassBuilder::new(self, class)
    }

    /// Starts describing `T` without a factory.
    ///
    /// Such classes can be saved and loaded in place, but never created by
    /// the registry.
    pub fn class_without_factory<T: Reflect>(&mut self) -> ClassBuilder<'_, T> {
        ClassBuilder::new(self, Self::class_for::<T>())
    }

    /// Starts describing an abstract base such as a trait object.
    ///
    /// The class has no Rust type binding and no factory.
    pub fn abstract_class<B: ?Sized + TypeUuid>(&mut self) -> ClassBuilder<'_, B> {
        ClassBuilder::new(self, ClassData::new(B::type_uuid(), B::type_name()))
    }

    /// Records that the class `type_id` no longer exists.
    ///
    /// Data of a deprecated class is dropped while loading, unless
    /// `converter` rewrites it into another class.
    pub fn class_deprecate(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        type_id: Uuid,
        converter: Option<VersionConverter>,
    ) -> Result<(), RegistrationError> {
        let mut class = ClassData::new(type_id, name);
        class.deprecated = true;
        class.converter = converter;
        self.register_class(class)
    }

    fn class_for<T: Reflect>() -> ClassData {
        let mut class = ClassData::new(T::type_uuid(), T::type_name());
        class.rust_type = Some(TypeId::of::<T>());
        class
    }

    // -------------------------------------------------------------------------
    // Registration

    /// Adds a class.
    ///
    /// Registering the same shape twice is a no-op. A different shape under
    /// an existing id is rejected and logged. In removal mode the class is
    /// unregistered instead.
    pub fn register_class(&mut self, class: ClassData) -> Result<(), RegistrationError> {
        if self.remove_reflection {
            self.unregister(&class.type_id);
            return Ok(());
        }

        if let Some(existing) = self.classes.get(&class.type_id) {
            if existing.same_shape(&class) {
                return Ok(());
            }
            log::error!(
                "class `{}` {} is already registered as `{}` with a different shape",
                class.name,
                uuid_to_string(&class.type_id),
                existing.name,
            );
            return Err(RegistrationError::IncompatibleShape {
                name: class.name.into_owned(),
                type_id: class.type_id,
            });
        }

        let id = class.type_id;
        self.name_index.entry(class.name_crc).or_default().push(id);
        if let Some(rust_type) = class.rust_type {
            self.rust_types.insert(rust_type, id);
        }
        log::trace!("registered class `{}` {}", class.name, uuid_to_string(&id));
        self.classes.insert(id, class);
        Ok(())
    }

    /// Removes a class with its indices and edit data.
    pub fn unregister(&mut self, type_id: &Uuid) -> Option<ClassData> {
        let class = self.classes.remove(type_id)?;
        if let Some(ids) = self.name_index.get_mut(&class.name_crc) {
            ids.retain(|id| id != type_id);
            if ids.is_empty() {
                self.name_index.remove(&class.name_crc);
            }
        }
        if let Some(rust_type) = class.rust_type {
            self.rust_types.remove(&rust_type);
        }
        self.edit_data.remove(type_id);
        log::trace!("unregistered class `{}` {}", class.name, uuid_to_string(type_id));
        Some(class)
    }

    /// Runs every registration submitted with `#[reflect(auto_register)]`.
    ///
    /// Returns the number of registration functions run.
    #[cfg(feature = "auto_register")]
    pub fn auto_register(&mut self) -> usize {
        crate::__macro_exports::auto_register::register_all(self)
    }

    // -------------------------------------------------------------------------
    // Lookup

    #[inline]
    pub fn find_class_data(&self, type_id: &Uuid) -> Option<&ClassData> {
        self.classes.get(type_id)
    }

    /// The class of `T`, if reflected.
    #[inline]
    pub fn class_of<T: TypeUuid>(&self) -> Option<&ClassData> {
        self.classes.get(&T::type_uuid())
    }

    /// Ids of the classes called `name`. Names are not unique.
    pub fn find_class_id_by_name(&self, name: &str) -> &[Uuid] {
        self.find_class_id_by_crc(name_crc(name))
    }

    /// Ids of the classes whose name hashes to `crc`.
    pub fn find_class_id_by_crc(&self, crc: u32) -> &[Uuid] {
        self.name_index.get(&crc).map_or(&[], Vec::as_slice)
    }

    /// The class id of a live instance, from its concrete Rust type.
    #[inline]
    pub fn actual_type_id(&self, instance: &dyn Any) -> Option<Uuid> {
        self.rust_types.get(&instance.type_id()).copied()
    }

    /// The class of a live instance.
    pub fn find_class_data_for_instance(&self, instance: &dyn Any) -> Option<&ClassData> {
        self.classes.get(&self.actual_type_id(instance)?)
    }

    /// Every registered class, in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassData> {
        self.classes.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    // -------------------------------------------------------------------------
    // Inheritance

    /// Whether `derived` is `base` or reaches it through the base tables.
    pub fn is_derived_from(&self, derived: &Uuid, base: &Uuid) -> bool {
        if derived == base {
            return true;
        }
        let Some(class) = self.classes.get(derived) else {
            return false;
        };
        class
            .base_classes
            .iter()
            .any(|b| self.is_derived_from(&b.type_id, base))
    }

    /// Collects the base elements leading from `from` to `to`, depth first
    /// in declaration order. Trait bases add no element.
    fn base_path<'a>(
        &'a self,
        from: &Uuid,
        to: &Uuid,
        path: &mut Vec<&'a ClassElement>,
    ) -> bool {
        if from == to {
            return true;
        }
        let Some(class) = self.classes.get(from) else {
            return false;
        };
        for base in &class.base_classes {
            let depth = path.len();
            if let Some(element) = base.element.and_then(|index| class.elements.get(index)) {
                path.push(element);
            }
            if self.base_path(&base.type_id, to, path) {
                return true;
            }
            path.truncate(depth);
        }
        false
    }

    /// Byte offset of the `base` storage inside `derived`.
    ///
    /// The sum of the base offsets along the first path found, `None` when
    /// `derived` does not derive from `base`.
    pub fn base_offset(&self, derived: &Uuid, base: &Uuid) -> Option<usize> {
        let mut path = Vec::new();
        self.base_path(derived, base, &mut path)
            .then(|| path.iter().map(|element| element.offset()).sum())
    }

    /// Views `instance` of class `from` as its base `to`.
    pub fn upcast<'a>(&self, instance: &'a dyn Any, from: &Uuid, to: &Uuid) -> Option<&'a dyn Any> {
        let mut path = Vec::new();
        if !self.base_path(from, to, &mut path) {
            return None;
        }
        path.iter().try_fold(instance, |current, element| element.accessor()?.get(current))
    }

    /// Mutable form of [`upcast`](Self::upcast).
    pub fn upcast_mut<'a>(
        &self,
        instance: &'a mut dyn Any,
        from: &Uuid,
        to: &Uuid,
    ) -> Option<&'a mut dyn Any> {
        let mut path = Vec::new();
        if !self.base_path(from, to, &mut path) {
            return None;
        }
        path.iter().try_fold(instance, |current, element| element.accessor()?.get_mut(current))
    }

    /// Casts a detached instance to the trait-object base `B`.
    ///
    /// Uses the casts registered with
    /// [`ClassBuilder::rtti_base`](crate::registry::ClassBuilder::rtti_base).
    /// Returns the instance unchanged when its class has no cast to `B`.
    pub fn cast_boxed<B: ?Sized + 'static>(
        &self,
        value: Box<dyn Any>,
    ) -> Result<Box<B>, Box<dyn Any>> {
        let Some(class) = self.find_class_data_for_instance(&*value) else {
            return Err(value);
        };
        let target = TypeId::of::<B>();
        let caster = class
            .rtti_casts
            .iter()
            .find(|cast| cast.rust_base == target)
            .and_then(|cast| cast.caster.downcast_ref::<BoxCaster<B>>());
        match caster {
            Some(caster) => caster(value),
            None => Err(value),
        }
    }

    /// Creates a detached instance of `type_id` through its factory.
    pub fn create_instance(&self, type_id: &Uuid) -> Option<Box<dyn Any>> {
        self.classes.get(type_id)?.create_instance()
    }

    // -------------------------------------------------------------------------
    // Edit data

    /// Starts describing how tools present the class `type_id`.
    ///
    /// Returns `None` when the class is unknown or in removal mode.
    pub fn create_edit_metadata(
        &mut self,
        type_id: &Uuid,
        name: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
    ) -> Option<EditBuilder<'_>> {
        if self.remove_reflection {
            return None;
        }
        let class = self.classes.get(type_id)?;
        let known = class.elements.iter().map(ClassElement::name_crc).collect();

        let data = self.edit_data.get_or_insert(*type_id, ClassEditData::default);
        data.class = EditData {
            name: name.into(),
            description: description.into(),
            attributes: Default::default(),
        };
        Some(EditBuilder::new(data, known))
    }

    #[inline]
    pub fn find_edit_data(&self, type_id: &Uuid) -> Option<&ClassEditData> {
        self.edit_data.get(type_id)
    }

    /// Edit data of the element `name_crc` of the class `type_id`.
    pub fn find_element_edit_data(&self, type_id: &Uuid, name_crc: u32) -> Option<&EditData> {
        self.edit_data.get(type_id)?.element(name_crc)
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::string::String;
    use core::any::Any;

    use uuid::Uuid;

    use crate::fixtures::{BaseA, BaseB, Circle, Foo, FooV2, MultiDerived, Shape};
    use crate::reflection::TypeUuid;
    use crate::registry::{ClassData, RegistrationError, TypeRegistry};

    #[test]
    fn primitives_are_registered_by_new() {
        let registry = TypeRegistry::new();
        assert!(registry.class_of::<i32>().unwrap().is_leaf());
        assert!(registry.class_of::<String>().is_some());
        assert!(TypeRegistry::empty().is_empty());
    }

    #[test]
    fn same_shape_twice_is_a_no_op() {
        let mut registry = TypeRegistry::new();
        let id = Uuid::from_u128(0xAB);
        assert!(registry.register_class(ClassData::new(id, "Thing")).is_ok());
        assert!(registry.register_class(ClassData::new(id, "Thing")).is_ok());
        assert_eq!(registry.find_class_id_by_name("thing"), [id]);
    }

    #[test]
    fn incompatible_shape_is_rejected() {
        let mut registry = TypeRegistry::new();
        let id = Uuid::from_u128(0xAC);
        registry.register_class(ClassData::new(id, "Thing")).unwrap();
        let err = registry.register_class(ClassData::new(id, "Other")).unwrap_err();
        assert!(matches!(err, RegistrationError::IncompatibleShape { .. }));
        assert_eq!(registry.find_class_data(&id).unwrap().name(), "Thing");
    }

    #[test]
    fn reflecting_another_type_under_a_taken_id_is_rejected() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<Foo>().reflect::<FooV2>();
        assert_eq!(registry.class_of::<Foo>().unwrap().version(), 1);
        assert!(registry.find_class_data_for_instance(&FooV2::default()).is_none());

        let err = registry.try_reflect::<FooV2>().unwrap_err();
        assert_eq!(
            err,
            RegistrationError::IncompatibleShape {
                name: String::from("Foo"),
                type_id: FooV2::type_uuid(),
            }
        );
        assert!(registry.try_reflect::<Foo>().is_ok());

        let mut stub = TypeRegistry::new();
        stub.class_deprecate("Foo", Foo::type_uuid(), None).unwrap();
        assert!(stub.try_reflect::<Foo>().is_err());
        assert!(stub.class_of::<Foo>().unwrap().is_deprecated());
    }

    #[test]
    fn removal_mode_unregisters_and_cleans_indices() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<Foo>();
        registry
            .create_edit_metadata(&Foo::type_uuid(), "Foo", "")
            .unwrap();

        registry.enable_remove_reflection();
        registry.reflect::<Foo>();
        assert!(registry.create_edit_metadata(&Foo::type_uuid(), "Foo", "").is_none());
        registry.disable_remove_reflection();

        assert!(registry.class_of::<Foo>().is_none());
        assert!(registry.find_class_id_by_name("Foo").is_empty());
        assert!(registry.find_edit_data(&Foo::type_uuid()).is_none());
        assert!(registry.find_class_data_for_instance(&Foo::default()).is_none());
        assert!(registry.class_of::<i32>().is_some());

        registry.reflect::<Foo>();
        assert!(registry.class_of::<Foo>().is_some());
    }

    #[test]
    fn actual_type_comes_from_the_instance() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<Circle>();
        let shape: Box<dyn Shape> = Box::new(Circle { radius: 1.0 });
        let any: &dyn Any = shape.as_ref();
        assert_eq!(registry.actual_type_id(any), Some(Circle::type_uuid()));
    }

    #[test]
    fn upcast_follows_base_offsets() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<MultiDerived>();
        let derived = MultiDerived::default();

        let from = MultiDerived::type_uuid();
        let base_b = registry
            .upcast(&derived, &from, &BaseB::type_uuid())
            .and_then(|b| b.downcast_ref::<BaseB>())
            .unwrap();

        let start = &derived as *const MultiDerived as usize;
        let offset = base_b as *const BaseB as usize - start;
        assert_eq!(registry.base_offset(&from, &BaseB::type_uuid()), Some(offset));
        assert!(registry.is_derived_from(&from, &BaseA::type_uuid()));
        assert!(!registry.is_derived_from(&BaseA::type_uuid(), &from));
    }

    #[test]
    fn cast_boxed_uses_registered_casts() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<Circle>();

        let shape = registry
            .cast_boxed::<dyn Shape>(Box::new(Circle { radius: 2.0 }))
            .ok()
            .unwrap();
        assert_eq!(shape.area(), 12.0);

        assert!(registry.cast_boxed::<dyn Shape>(Box::new(5_i32)).is_err());
    }

    #[cfg(feature = "auto_register")]
    #[test]
    fn auto_register_collects_submitted_types() {
        let mut registry = TypeRegistry::new();
        assert!(registry.class_of::<crate::fixtures::Catalog>().is_none());
        assert!(registry.auto_register() >= 1);
        assert!(registry.class_of::<crate::fixtures::Catalog>().is_some());
        assert!(registry.class_of::<Foo>().is_some());
    }
}
