use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use uuid::Uuid;

use crate::reflection::{Reflect, TypeUuid, name_crc, uuid_to_string};
use crate::registry::TypeRegistry;
use crate::serializer::LeafValue;
use crate::tree::{ConversionState, ElementData, NodeError};
use crate::walker::{Diagnostics, ElementError, LoadFlags, Loader, save_to_node};

/// One node of the generic element tree.
///
/// A node carries the type id and version it was saved with, a name that
/// matches the owning [`ClassElement`](crate::ClassElement), and either a
/// leaf payload or ordered children.
///
/// Version converters receive the node of the outdated object and may rename,
/// add, remove and rewrite children freely.
///
/// # Examples
///
/// ```
/// use vc_serialize::{DataElementNode, TypeRegistry};
/// use vc_serialize::reflection::name_crc;
///
/// let registry = TypeRegistry::new();
/// let mut node = DataElementNode::new("root", uuid::Uuid::nil(), 0);
/// node.add_element_with_data(&registry, "count", &7_i32).unwrap();
///
/// let count: i32 = node.get_child_data(&registry, name_crc("count")).unwrap();
/// assert_eq!(count, 7);
/// ```
#[derive(Clone)]
pub struct DataElementNode {
    name: String,
    name_crc: u32,
    type_id: Uuid,
    version: u32,
    data: ElementData,
    children: Vec<DataElementNode>,
    state: ConversionState,
}

impl DataElementNode {
    pub fn new(name: impl Into<String>, type_id: Uuid, version: u32) -> Self {
        let name = name.into();
        Self {
            name_crc: name_crc(&name),
            name,
            type_id,
            version,
            data: ElementData::None,
            children: Vec::new(),
            state: ConversionState::NeedsConversion,
        }
    }

    /// Creates a leaf node holding the binary form of `value`.
    pub fn leaf<T: LeafValue + TypeUuid>(name: impl Into<String>, value: &T) -> Self {
        let mut node = Self::new(name, T::type_uuid(), 0);
        node.set_leaf_value(value);
        node
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn name_crc(&self) -> u32 {
        self.name_crc
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.name_crc = name_crc(&self.name);
    }

    #[inline]
    pub fn type_id(&self) -> Uuid {
        self.type_id
    }

    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[inline]
    pub fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    #[inline]
    pub fn data(&self) -> &ElementData {
        &self.data
    }

    #[inline]
    pub fn set_raw_data(&mut self, data: ElementData) {
        self.data = data;
    }

    #[inline]
    pub fn children(&self) -> &[DataElementNode] {
        &self.children
    }

    #[inline]
    pub fn children_mut(&mut self) -> &mut Vec<DataElementNode> {
        &mut self.children
    }

    #[inline]
    pub fn state(&self) -> ConversionState {
        self.state
    }

    #[inline]
    pub(crate) fn set_state(&mut self, state: ConversionState) {
        self.state = state;
    }

    // -------------------------------------------------------------------------
    // Lookup

    /// Index of the first child named with hash `name_crc`.
    pub fn find_element(&self, name_crc: u32) -> Option<usize> {
        self.children.iter().position(|c| c.name_crc == name_crc)
    }

    /// The first child named with hash `name_crc`.
    pub fn find_child(&self, name_crc: u32) -> Option<&DataElementNode> {
        self.children.iter().find(|c| c.name_crc == name_crc)
    }

    /// Mutable access to the first child named with hash `name_crc`.
    pub fn find_sub_element(&mut self, name_crc: u32) -> Option<&mut DataElementNode> {
        self.children.iter_mut().find(|c| c.name_crc == name_crc)
    }

    /// Follows `path` of name hashes down the tree.
    ///
    /// An empty path returns the node itself.
    pub fn find_sub_element_by_path(&mut self, path: &[u32]) -> Option<&mut DataElementNode> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self.find_sub_element(*head)?.find_sub_element_by_path(rest),
        }
    }

    #[inline]
    pub fn get_sub_element(&mut self, index: usize) -> Option<&mut DataElementNode> {
        self.children.get_mut(index)
    }

    // -------------------------------------------------------------------------
    // Editing

    /// Appends an empty child of type `T` and returns its index.
    pub fn add_element<T: Reflect>(
        &mut self,
        registry: &TypeRegistry,
        name: &str,
    ) -> Result<usize, NodeError> {
        let class = registry
            .class_of::<T>()
            .ok_or(NodeError::UnknownType(T::type_uuid()))?;
        Ok(self.add_node(Self::new(name, class.type_id(), class.version())))
    }

    /// Appends a child holding the saved form of `value` and returns its index.
    pub fn add_element_with_data<T: Reflect>(
        &mut self,
        registry: &TypeRegistry,
        name: &str,
        value: &T,
    ) -> Result<usize, NodeError> {
        let mut diagnostics = Diagnostics::new();
        let node = save_to_node(registry, value, name, &mut diagnostics)?;
        Ok(self.add_node(node))
    }

    /// Appends an already built child and returns its index.
    pub fn add_node(&mut self, node: DataElementNode) -> usize {
        self.children.push(node);
        self.children.len() - 1
    }

    pub fn remove_element(&mut self, index: usize) -> Option<DataElementNode> {
        (index < self.children.len()).then(|| self.children.remove(index))
    }

    /// Removes the first child named with hash `name_crc`.
    pub fn remove_element_by_name(&mut self, name_crc: u32) -> bool {
        match self.find_element(name_crc) {
            Some(index) => {
                self.children.remove(index);
                true
            }
            None => false,
        }
    }

    // -------------------------------------------------------------------------
    // Typed data

    /// Materializes the node as a `T`.
    ///
    /// Leaves are read directly. Composite nodes are loaded from a copy, so
    /// conversions needed on the way do not alter this node.
    pub fn get_data<T: Reflect>(&self, registry: &TypeRegistry) -> Result<T, NodeError> {
        let expected = T::type_uuid();
        if self.type_id != expected {
            return Err(NodeError::TypeMismatch {
                expected,
                found: self.type_id,
            });
        }
        let class = registry
            .find_class_data(&expected)
            .ok_or(NodeError::UnknownType(expected))?;
        let mut instance = class
            .create_instance()
            .ok_or(NodeError::MissingFactory(expected))?;

        match class.serializer() {
            Some(serializer) => match &self.data {
                ElementData::Binary(bytes) => serializer.load(&mut *instance, bytes, self.version)?,
                ElementData::Text(text) => {
                    let mut bytes = Vec::new();
                    serializer.text_to_data(text, &mut bytes)?;
                    serializer.load(&mut *instance, &bytes, self.version)?;
                }
                ElementData::None => {
                    return Err(ElementError::MissingData { type_id: expected }.into());
                }
            },
            None => {
                let mut node = self.clone();
                let mut diagnostics = Diagnostics::new();
                Loader::new(registry, &mut diagnostics, LoadFlags::empty())
                    .load_node_into(&mut *instance, &mut node)?;
            }
        }

        instance
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| NodeError::TypeMismatch {
                expected,
                found: self.type_id,
            })
    }

    /// Materializes the first child named with hash `name_crc`.
    pub fn get_child_data<T: Reflect>(
        &self,
        registry: &TypeRegistry,
        name_crc: u32,
    ) -> Result<T, NodeError> {
        self.find_child(name_crc)
            .ok_or(NodeError::MissingElement(name_crc))?
            .get_data(registry)
    }

    /// Replaces payload and children with the saved form of `value`.
    ///
    /// The node must already be of type `T`, see [`convert`](Self::convert).
    pub fn set_data<T: Reflect>(
        &mut self,
        registry: &TypeRegistry,
        value: &T,
    ) -> Result<(), NodeError> {
        let expected = T::type_uuid();
        if self.type_id != expected {
            return Err(NodeError::TypeMismatch {
                expected,
                found: self.type_id,
            });
        }
        let mut diagnostics = Diagnostics::new();
        let saved = save_to_node(registry, value, &self.name, &mut diagnostics)?;
        self.version = saved.version;
        self.data = saved.data;
        self.children = saved.children;
        Ok(())
    }

    /// Decodes a leaf payload without consulting the registry.
    pub fn leaf_value<T: LeafValue>(&self) -> Option<T> {
        match &self.data {
            ElementData::Binary(bytes) => T::read_bytes(bytes).ok(),
            ElementData::Text(text) => T::from_text(text).ok(),
            ElementData::None => None,
        }
    }

    pub fn set_leaf_value<T: LeafValue>(&mut self, value: &T) {
        let mut bytes = Vec::new();
        value.write_bytes(&mut bytes);
        self.data = ElementData::Binary(bytes);
    }

    // -------------------------------------------------------------------------
    // Conversion

    /// Rebinds the node to type `T` and drops its payload and children.
    pub fn convert<T: TypeUuid>(&mut self, registry: &TypeRegistry) -> Result<(), NodeError> {
        self.convert_to(registry, T::type_uuid())
    }

    /// Rebinds the node to the registered type `type_id`.
    ///
    /// The version becomes the current version of the class. Payload and
    /// children are cleared so the converter can rebuild them.
    pub fn convert_to(&mut self, registry: &TypeRegistry, type_id: Uuid) -> Result<(), NodeError> {
        let class = registry
            .find_class_data(&type_id)
            .ok_or(NodeError::UnknownType(type_id))?;
        log::trace!("converting `{}` to {}", self.name, class.name());
        self.type_id = type_id;
        self.version = class.version();
        self.data = ElementData::None;
        self.children.clear();
        Ok(())
    }
}

impl PartialEq for DataElementNode {
    /// Structural equality. The conversion state is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.type_id == other.type_id
            && self.version == other.version
            && self.data == other.data
            && self.children == other.children
    }
}

impl Eq for DataElementNode {}

impl fmt::Debug for DataElementNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("DataElementNode");
        s.field("name", &self.name)
            .field("type_id", &uuid_to_string(&self.type_id))
            .field("version", &self.version);
        if !self.data.is_none() {
            s.field("data", &self.data);
        }
        if !self.children.is_empty() {
            s.field("children", &self.children);
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::DataElementNode;
    use crate::TypeUuid;
    use crate::fixtures::Foo;
    use crate::reflection::name_crc;
    use crate::registry::TypeRegistry;
    use crate::tree::{ElementData, NodeError};

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.reflect::<Foo>();
        registry
    }

    #[test]
    fn path_lookup_descends() {
        let mut root = DataElementNode::new("", uuid::Uuid::nil(), 0);
        let mut mid = DataElementNode::new("mid", uuid::Uuid::nil(), 0);
        mid.add_node(DataElementNode::leaf("deep", &3_u8));
        root.add_node(mid);

        let deep = root
            .find_sub_element_by_path(&[name_crc("mid"), name_crc("deep")])
            .unwrap();
        assert_eq!(deep.leaf_value::<u8>(), Some(3));
        assert!(root.find_sub_element_by_path(&[name_crc("nope")]).is_none());
    }

    #[test]
    fn composite_data_round_trips() {
        let registry = registry();
        let mut node = DataElementNode::new("", uuid::Uuid::nil(), 0);
        node.add_element_with_data(&registry, "foo", &Foo { m_data: 5 })
            .unwrap();

        let foo: Foo = node.get_child_data(&registry, name_crc("foo")).unwrap();
        assert_eq!(foo.m_data, 5);
    }

    #[test]
    fn text_leaves_are_parsed() {
        let registry = registry();
        let mut node = DataElementNode::new("x", i32::type_uuid(), 0);
        node.set_raw_data(ElementData::Text("-12".into()));
        assert_eq!(node.get_data::<i32>(&registry), Ok(-12));
    }

    #[test]
    fn typed_access_checks_the_type() {
        let registry = registry();
        let mut node = DataElementNode::leaf("x", &1_u32);
        assert!(matches!(
            node.get_data::<i32>(&registry),
            Err(NodeError::TypeMismatch { .. })
        ));
        assert!(node.set_data(&registry, &1_i32).is_err());

        node.convert::<i32>(&registry).unwrap();
        node.set_data(&registry, &9_i32).unwrap();
        assert_eq!(node.get_data::<i32>(&registry), Ok(9));
    }

    #[test]
    fn remove_by_name_takes_first_match() {
        let mut node = DataElementNode::new("", uuid::Uuid::nil(), 0);
        node.add_node(DataElementNode::leaf("a", &1_i32));
        node.add_node(DataElementNode::leaf("a", &2_i32));

        assert!(node.remove_element_by_name(name_crc("a")));
        assert_eq!(node.children()[0].leaf_value::<i32>(), Some(2));
        assert!(node.remove_element(4).is_none());
    }
}
