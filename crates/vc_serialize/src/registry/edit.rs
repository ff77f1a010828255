use alloc::borrow::Cow;
use alloc::vec::Vec;
use core::any::Any;

use crate::reflection::name_crc;
use crate::registry::Attributes;

// -----------------------------------------------------------------------------
// EditData

/// Display information for a class or one of its elements.
///
/// Edit data is consumed by tools only. It never affects serialization.
#[derive(Debug, Default)]
pub struct EditData {
    pub name: Cow<'static, str>,
    pub description: Cow<'static, str>,
    pub attributes: Attributes,
}

/// Edit data of a class and its elements, keyed by element name hash.
#[derive(Debug, Default)]
pub struct ClassEditData {
    pub class: EditData,
    pub elements: Vec<(u32, EditData)>,
}

impl ClassEditData {
    /// Edit data of the element with the name hash `name_crc`.
    pub fn element(&self, name_crc: u32) -> Option<&EditData> {
        self.elements
            .iter()
            .find(|(crc, _)| *crc == name_crc)
            .map(|(_, data)| data)
    }
}

// -----------------------------------------------------------------------------
// EditBuilder

/// Adds edit data to a registered class.
///
/// Returned by [`TypeRegistry::create_edit_metadata`](crate::TypeRegistry::create_edit_metadata).
///
/// # Examples
///
/// ```
/// use vc_serialize::{Reflect, TypeRegistry, TypeUuid};
/// use vc_serialize::reflection::name_crc;
///
/// #[derive(Reflect, Default)]
/// #[reflect(uuid = "{0F5B7E1A-9A43-4C62-8B21-7D3E5A9C0B44}")]
/// struct Light {
///     intensity: f32,
/// }
///
/// let mut registry = TypeRegistry::new();
/// registry.reflect::<Light>();
/// registry
///     .create_edit_metadata(&Light::type_uuid(), "Light", "A point light")
///     .unwrap()
///     .element("intensity", "Intensity", "Brightness in lumen")
///     .attribute("min", 0.0_f32);
///
/// let data = registry
///     .find_element_edit_data(&Light::type_uuid(), name_crc("intensity"))
///     .unwrap();
/// assert_eq!(data.name, "Intensity");
/// assert_eq!(data.attributes.get::<f32>("min"), Some(&0.0));
/// ```
pub struct EditBuilder<'a> {
    data: &'a mut ClassEditData,
    known_elements: Vec<u32>,
    current: Option<usize>,
    skipping: bool,
}

impl<'a> EditBuilder<'a> {
    pub(crate) fn new(data: &'a mut ClassEditData, known_elements: Vec<u32>) -> Self {
        Self {
            data,
            known_elements,
            current: None,
            skipping: false,
        }
    }

    /// Describes the serialized element `field`.
    ///
    /// Unknown field names are logged and ignored.
    pub fn element(
        mut self,
        field: &str,
        name: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
    ) -> Self {
        let crc = name_crc(field);
        if !self.known_elements.contains(&crc) {
            log::warn!("edit data for unknown element `{field}` ignored");
            self.skipping = true;
            return self;
        }
        self.skipping = false;

        let entry = EditData {
            name: name.into(),
            description: description.into(),
            attributes: Attributes::new(),
        };
        match self.data.elements.iter().position(|(c, _)| *c == crc) {
            Some(index) => {
                self.data.elements[index].1 = entry;
                self.current = Some(index);
            }
            None => {
                self.current = Some(self.data.elements.len());
                self.data.elements.push((crc, entry));
            }
        }
        self
    }

    /// Adds an attribute to the last described element, or to the class.
    pub fn attribute<V: Any + Send + Sync>(
        self,
        name: impl Into<Cow<'static, str>>,
        value: V,
    ) -> Self {
        if self.skipping {
            return self;
        }
        let attributes = match self.current {
            Some(index) => &mut self.data.elements[index].1.attributes,
            None => &mut self.data.class.attributes,
        };
        attributes.insert(name, value);
        self
    }
}
