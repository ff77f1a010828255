use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use core::fmt;

use bitflags::bitflags;
use uuid::Uuid;

use crate::container::ContainerAdapter;
use crate::reflection::{FieldAccessor, Reflect, name_crc};
use crate::registry::{Attributes, TypeRegistry};
use crate::serializer::DataSerializer;
use crate::tree::DataElementNode;

// -----------------------------------------------------------------------------
// Callbacks

/// Rewrites an out-of-date node into the current schema.
///
/// Returns `false` to discard the node. See [`crate::convert`].
pub type VersionConverter = fn(&TypeRegistry, &mut DataElementNode) -> bool;

/// Lifecycle hooks of a class.
///
/// The `read` pair brackets every visit during save and enumeration, the
/// `write` pair brackets every load or clone into an instance. The last two
/// fire once per top-level operation on the root instance only, and never
/// both for the same operation.
pub trait EventHandler: Send + Sync {
    fn on_read_begin(&self, _instance: &dyn Any) {}
    fn on_read_end(&self, _instance: &dyn Any) {}
    fn on_write_begin(&self, _instance: &mut dyn Any) {}
    fn on_write_end(&self, _instance: &mut dyn Any) {}
    fn on_loaded_from_object_stream(&self, _instance: &mut dyn Any) {}
    fn on_object_cloned(&self, _instance: &mut dyn Any) {}
}

/// Creates detached instances of a class.
///
/// Instances are destroyed by dropping the returned box.
#[derive(Clone)]
pub struct Factory(Arc<dyn Fn() -> Box<dyn Any> + Send + Sync>);

impl Factory {
    /// Wraps a constructor.
    #[inline]
    pub fn new<T: Any>(create: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self(Arc::new(move || Box::new(create()) as Box<dyn Any>))
    }

    /// A factory producing `T::default()`.
    #[inline]
    pub fn from_default<T: Any + Default>() -> Self {
        Self::new(T::default)
    }

    /// Creates a new instance.
    #[inline]
    pub fn create(&self) -> Box<dyn Any> {
        (self.0)()
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Factory")
    }
}

// -----------------------------------------------------------------------------
// ClassElement

bitflags! {
    /// Properties of a [`ClassElement`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ElementFlags: u8 {
        /// The element holds a pointer. Its node records the pointee's actual type.
        const POINTER = 1 << 0;
        /// The element is the storage of a base class.
        const BASE_CLASS = 1 << 1;
        /// The pointee may be any class deriving the element type.
        const POLYMORPHIC = 1 << 2;
    }
}

/// One field of a class, or one slot kind of a container.
pub struct ClassElement {
    name: Cow<'static, str>,
    name_crc: u32,
    type_id: Uuid,
    data_size: usize,
    offset: usize,
    flags: ElementFlags,
    accessor: Option<Arc<dyn FieldAccessor>>,
    attributes: Attributes,
}

impl ClassElement {
    /// Creates an element without accessor.
    pub fn new(name: impl Into<Cow<'static, str>>, type_id: Uuid, data_size: usize) -> Self {
        let name = name.into();
        Self {
            name_crc: name_crc(&name),
            name,
            type_id,
            data_size,
            offset: 0,
            flags: ElementFlags::empty(),
            accessor: None,
            attributes: Attributes::new(),
        }
    }

    /// Describes a container slot holding values of type `E`.
    ///
    /// Pointer element types record their pointee type and get
    /// [`ElementFlags::POINTER`].
    pub fn for_container<E: Reflect>(name: impl Into<Cow<'static, str>>) -> Self {
        let mut element = Self::new(name, E::element_type_uuid(), size_of::<E>());
        if E::IS_POINTER {
            element.flags |= ElementFlags::POINTER | ElementFlags::POLYMORPHIC;
        }
        element
    }

    /// Sets the byte offset and accessor of a field element.
    pub fn with_accessor(mut self, offset: usize, accessor: Arc<dyn FieldAccessor>) -> Self {
        self.offset = offset;
        self.accessor = Some(accessor);
        self
    }

    /// Adds `flags` to the element.
    #[inline]
    pub fn with_flags(mut self, flags: ElementFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn name_crc(&self) -> u32 {
        self.name_crc
    }

    #[inline]
    pub fn type_id(&self) -> Uuid {
        self.type_id
    }

    #[inline]
    pub fn data_size(&self) -> usize {
        self.data_size
    }

    /// Byte offset inside the owning instance. Zero for container slots.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn flags(&self) -> ElementFlags {
        self.flags
    }

    #[inline]
    pub fn is_pointer(&self) -> bool {
        self.flags.contains(ElementFlags::POINTER)
    }

    #[inline]
    pub fn is_base_class(&self) -> bool {
        self.flags.contains(ElementFlags::BASE_CLASS)
    }

    /// Field access, absent for container slots.
    #[inline]
    pub fn accessor(&self) -> Option<&dyn FieldAccessor> {
        self.accessor.as_deref()
    }

    #[inline]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    #[inline]
    pub(crate) fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    fn same_shape(&self, other: &Self) -> bool {
        self.name_crc == other.name_crc
            && self.type_id == other.type_id
            && self.offset == other.offset
            && self.flags == other.flags
    }
}

impl fmt::Debug for ClassElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassElement")
            .field("name", &self.name)
            .field("type_id", &self.type_id)
            .field("offset", &self.offset)
            .field("flags", &self.flags)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Bases

/// One entry of the base-class table.
///
/// Composition bases point at the element holding them. Trait bases have no
/// element and an offset of zero, their instances are reached by casting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseClassData {
    pub type_id: Uuid,
    pub offset: usize,
    pub polymorphic: bool,
    pub element: Option<usize>,
}

/// Boxed cast from a concrete instance to the base `B`.
pub(crate) type BoxCaster<B> =
    Box<dyn Fn(Box<dyn Any>) -> Result<Box<B>, Box<dyn Any>> + Send + Sync>;

/// A registered cast to a trait-object base, keyed by the base's `TypeId`.
pub(crate) struct RttiCast {
    pub base: Uuid,
    pub rust_base: TypeId,
    /// A `BoxCaster<B>` for the base `B`.
    pub caster: Box<dyn Any + Send + Sync>,
}

// -----------------------------------------------------------------------------
// ClassData

/// Everything the registry knows about one type.
pub struct ClassData {
    pub(crate) type_id: Uuid,
    pub(crate) name: Cow<'static, str>,
    pub(crate) name_crc: u32,
    pub(crate) version: u32,
    pub(crate) rust_type: Option<TypeId>,
    pub(crate) converter: Option<VersionConverter>,
    pub(crate) factory: Option<Factory>,
    pub(crate) container: Option<Box<dyn ContainerAdapter>>,
    pub(crate) serializer: Option<Arc<dyn DataSerializer>>,
    pub(crate) event_handler: Option<Arc<dyn EventHandler>>,
    pub(crate) attributes: Attributes,
    pub(crate) elements: Vec<ClassElement>,
    pub(crate) base_classes: Vec<BaseClassData>,
    pub(crate) rtti_casts: Vec<RttiCast>,
    pub(crate) deprecated: bool,
}

impl ClassData {
    /// Creates an empty class without Rust type binding.
    ///
    /// Used for classes that only exist in data, such as map entries and
    /// deprecation records. Reflected types go through
    /// [`TypeRegistry::class`] instead.
    pub fn new(type_id: Uuid, name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        Self {
            type_id,
            name_crc: name_crc(&name),
            name,
            version: 0,
            rust_type: None,
            converter: None,
            factory: None,
            container: None,
            serializer: None,
            event_handler: None,
            attributes: Attributes::new(),
            elements: Vec::new(),
            base_classes: Vec::new(),
            rtti_casts: Vec::new(),
            deprecated: false,
        }
    }

    /// Adds an element. Builder style, for data-only classes.
    pub fn with_element(mut self, element: ClassElement) -> Self {
        self.elements.push(element);
        self
    }

    #[inline]
    pub fn type_id(&self) -> Uuid {
        self.type_id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn name_crc(&self) -> u32 {
        self.name_crc
    }

    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The Rust type bound to this class, if any.
    #[inline]
    pub fn rust_type_id(&self) -> Option<TypeId> {
        self.rust_type
    }

    #[inline]
    pub fn converter(&self) -> Option<VersionConverter> {
        self.converter
    }

    #[inline]
    pub fn factory(&self) -> Option<&Factory> {
        self.factory.as_ref()
    }

    #[inline]
    pub fn container(&self) -> Option<&dyn ContainerAdapter> {
        self.container.as_deref()
    }

    #[inline]
    pub fn serializer(&self) -> Option<&dyn DataSerializer> {
        self.serializer.as_deref()
    }

    #[inline]
    pub fn event_handler(&self) -> Option<&dyn EventHandler> {
        self.event_handler.as_deref()
    }

    #[inline]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    #[inline]
    pub fn elements(&self) -> &[ClassElement] {
        &self.elements
    }

    #[inline]
    pub fn base_classes(&self) -> &[BaseClassData] {
        &self.base_classes
    }

    /// `true` for deprecation records registered by
    /// [`TypeRegistry::class_deprecate`].
    #[inline]
    pub fn is_deprecated(&self) -> bool {
        self.deprecated
    }

    /// `true` when instances are (de)serialized by a leaf serializer.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.serializer.is_some()
    }

    /// Finds an element by its name hash.
    pub fn find_element(&self, name_crc: u32) -> Option<&ClassElement> {
        self.elements.iter().find(|e| e.name_crc() == name_crc)
    }

    /// Creates a detached instance, if the class has a factory.
    #[inline]
    pub fn create_instance(&self) -> Option<Box<dyn Any>> {
        self.factory.as_ref().map(Factory::create)
    }

    /// Whether two registrations describe the same layout.
    pub(crate) fn same_shape(&self, other: &Self) -> bool {
        self.type_id == other.type_id
            && self.name_crc == other.name_crc
            && self.version == other.version
            && self.rust_type == other.rust_type
            && self.deprecated == other.deprecated
            && self.container.is_some() == other.container.is_some()
            && self.serializer.is_some() == other.serializer.is_some()
            && self.base_classes == other.base_classes
            && self.elements.len() == other.elements.len()
            && self
                .elements
                .iter()
                .zip(&other.elements)
                .all(|(a, b)| a.same_shape(b))
    }
}

impl fmt::Debug for ClassData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassData")
            .field("name", &self.name)
            .field("type_id", &self.type_id)
            .field("version", &self.version)
            .field("elements", &self.elements)
            .field("base_classes", &self.base_classes)
            .field("container", &self.container.is_some())
            .field("leaf", &self.serializer.is_some())
            .field("deprecated", &self.deprecated)
            .finish()
    }
}
