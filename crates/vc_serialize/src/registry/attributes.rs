use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use crate::reflection::name_crc;

// -----------------------------------------------------------------------------
// Attributes

struct AttributeEntry {
    name: Cow<'static, str>,
    name_crc: u32,
    value: Box<dyn Any + Send + Sync>,
}

/// Ordered name to value side data of a class or an element.
///
/// Attributes are not serialized. They carry information for tools and for
/// code that inspects the registry, in insertion order. Inserting a name
/// twice replaces the earlier value in place.
///
/// # Example
///
/// ```
/// use vc_serialize::registry::Attributes;
///
/// let mut attrs = Attributes::new();
/// attrs.insert("min", 0.0_f32);
/// attrs.insert("max", 10.0_f32);
/// attrs.insert("min", 1.0_f32);
///
/// assert_eq!(attrs.get::<f32>("min"), Some(&1.0));
/// assert_eq!(attrs.names().collect::<Vec<_>>(), ["min", "max"]);
/// assert!(attrs.get::<i32>("max").is_none());
/// ```
#[derive(Default)]
pub struct Attributes {
    entries: Vec<AttributeEntry>,
}

impl Attributes {
    /// Creates an empty attribute list.
    #[inline]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts `value` under `name`, replacing an attribute of the same name.
    pub fn insert<V: Any + Send + Sync>(&mut self, name: impl Into<Cow<'static, str>>, value: V) {
        let name = name.into();
        let crc = name_crc(&name);
        let value: Box<dyn Any + Send + Sync> = Box::new(value);
        match self.entries.iter_mut().find(|entry| entry.name_crc == crc) {
            Some(entry) => entry.value = value,
            None => self.entries.push(AttributeEntry {
                name,
                name_crc: crc,
                value,
            }),
        }
    }

    /// Returns the value stored under `name` if it has type `V`.
    #[inline]
    pub fn get<V: Any>(&self, name: &str) -> Option<&V> {
        self.get_by_crc(name_crc(name))
    }

    /// Returns the value stored under the name hash `crc` if it has type `V`.
    pub fn get_by_crc<V: Any>(&self, crc: u32) -> Option<&V> {
        self.entries
            .iter()
            .find(|entry| entry.name_crc == crc)
            .and_then(|entry| entry.value.downcast_ref::<V>())
    }

    /// Returns `true` if an attribute called `name` exists.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        let crc = name_crc(name);
        self.entries.iter().any(|entry| entry.name_crc == crc)
    }

    /// Attribute names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| &*entry.name)
    }

    /// Name and type-erased value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &(dyn Any + Send + Sync))> {
        self.entries.iter().map(|entry| (&*entry.name, &*entry.value))
    }

    /// Number of attributes.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no attributes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
