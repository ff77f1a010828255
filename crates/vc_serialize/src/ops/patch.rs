//! Differences between two objects of the same type.
//!
//! A patch is computed on saved element trees. Each edit addresses a node
//! by the `(name_crc, occurrence)` pairs leading to it, where `occurrence`
//! counts earlier siblings of the same name. Container elements share one
//! name, so they are addressed by position.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use uuid::Uuid;

use crate::ops::PatchError;
use crate::reflection::{Reflect, uuid_to_string};
use crate::registry::TypeRegistry;
use crate::tree::DataElementNode;
use crate::walker::{Diagnostics, ElementError, LoadFlags, Loader, save_to_node};

const PATCH_TYPE: Uuid = Uuid::from_u128(0x4C1D_92E7_0B35_4E8A_9F26_73A1_D5C8_E014);
const EDIT_TYPE: Uuid = Uuid::from_u128(0x8A53_F0C2_6D17_4B9E_A4E8_21C7_9B36_F5D2);
const STEP_TYPE: Uuid = Uuid::from_u128(0xE2B7_4A19_C058_4D3F_8B61_0F9D_A7E3_C426);
const VALUE_TYPE: Uuid = Uuid::from_u128(0x17F9_C3A5_82E4_4069_B1D7_5E0A_C9F2_3B68);

const PATCH_VERSION: u32 = 1;

// -----------------------------------------------------------------------------
// Addresses

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressElement {
    pub name_crc: u32,
    pub occurrence: u32,
}

/// Path from the root node to an edited node. Empty for the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PatchAddress(Vec<AddressElement>);

impl PatchAddress {
    #[inline]
    pub fn elements(&self) -> &[AddressElement] {
        &self.0
    }

    fn child(&self, name_crc: u32, occurrence: u32) -> Self {
        let mut elements = self.0.clone();
        elements.push(AddressElement { name_crc, occurrence });
        Self(elements)
    }
}

impl fmt::Display for PatchAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("/")?;
        for (i, element) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{:08x}#{}", element.name_crc, element.occurrence)?;
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Operations

#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// Replaces the addressed node with a whole subtree.
    Replace(DataElementNode),
    /// Removes the addressed node.
    Remove,
    /// Adds a node at the addressed position.
    Insert(DataElementNode),
}

impl PatchOp {
    fn code(&self) -> u8 {
        match self {
            Self::Replace(_) => 0,
            Self::Remove => 1,
            Self::Insert(_) => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatchEdit {
    pub address: PatchAddress,
    pub op: PatchOp,
}

// -----------------------------------------------------------------------------
// DataPatch

/// Edits turning one object into another.
///
/// `patch.apply(registry, &a)` returns an object equal to `b` when the patch
/// was created from `a` and `b`.
///
/// # Examples
///
/// ```
/// use vc_serialize::{Reflect, TypeRegistry};
/// use vc_serialize::ops::DataPatch;
///
/// #[derive(Reflect, Default, Debug, PartialEq, Clone)]
/// #[reflect(uuid = "{0F4B7C29-E361-4D8A-B5F0-92C1A6E8D374}")]
/// struct Spawn {
///     count: u32,
///     tags: Vec<String>,
/// }
///
/// let mut registry = TypeRegistry::new();
/// registry.reflect::<Spawn>();
///
/// let base = Spawn { count: 1, tags: vec!["a".into()] };
/// let modified = Spawn { count: 3, tags: vec!["a".into(), "b".into()] };
///
/// let patch = DataPatch::create(&registry, &base, &modified).unwrap();
/// assert_eq!(patch.edits().len(), 2);
/// assert_eq!(patch.apply(&registry, &base).unwrap(), modified);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DataPatch {
    target: Uuid,
    edits: Vec<PatchEdit>,
}

impl DataPatch {
    /// An empty patch for objects of type `target`.
    pub fn new(target: Uuid) -> Self {
        Self {
            target,
            edits: Vec::new(),
        }
    }

    /// Computes the edits turning `base` into `modified`.
    pub fn create<T: Reflect>(registry: &TypeRegistry, base: &T, modified: &T) -> Result<Self, PatchError> {
        Self::create_any(registry, base, modified)
    }

    /// Untyped [`create`](Self::create). Both objects must have the same
    /// registered type.
    pub fn create_any(registry: &TypeRegistry, base: &dyn Any, modified: &dyn Any) -> Result<Self, PatchError> {
        let base_type = registry
            .actual_type_id(base)
            .ok_or(ElementError::UnregisteredInstance)?;
        let modified_type = registry
            .actual_type_id(modified)
            .ok_or(ElementError::UnregisteredInstance)?;
        if base_type != modified_type {
            return Err(PatchError::TargetMismatch {
                expected: base_type,
                found: modified_type,
            });
        }

        let mut diagnostics = Diagnostics::new();
        let from = save_to_node(registry, base, "", &mut diagnostics)?;
        let to = save_to_node(registry, modified, "", &mut diagnostics)?;

        let mut patch = Self::new(base_type);
        diff(&from, &to, &PatchAddress::default(), &mut patch.edits);
        log::debug!("patch for {base_type} holds {} edits", patch.edits.len());
        Ok(patch)
    }

    #[inline]
    pub fn target(&self) -> Uuid {
        self.target
    }

    #[inline]
    pub fn edits(&self) -> &[PatchEdit] {
        &self.edits
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn push(&mut self, address: PatchAddress, op: PatchOp) {
        self.edits.push(PatchEdit { address, op });
    }

    /// Returns a patched copy of `base`.
    pub fn apply<T: Reflect>(&self, registry: &TypeRegistry, base: &T) -> Result<T, PatchError> {
        let patched = self.apply_any(registry, base)?;
        patched
            .downcast::<T>()
            .map(|patched| *patched)
            .map_err(|_| PatchError::Downcast {
                expected: T::type_uuid(),
            })
    }

    /// Untyped [`apply`](Self::apply).
    pub fn apply_any(&self, registry: &TypeRegistry, base: &dyn Any) -> Result<Box<dyn Any>, PatchError> {
        let mut diagnostics = Diagnostics::new();
        let patched = self.apply_any_with(registry, base, &mut diagnostics)?;
        if !diagnostics.is_empty() {
            log::warn!(
                "patch for {} applied with {} dropped elements",
                self.target,
                diagnostics.len()
            );
        }
        Ok(patched)
    }

    /// [`apply_any`](Self::apply_any) with the issues met while rebuilding
    /// the patched object collected in `diagnostics`.
    pub fn apply_any_with(
        &self,
        registry: &TypeRegistry,
        base: &dyn Any,
        diagnostics: &mut Diagnostics,
    ) -> Result<Box<dyn Any>, PatchError> {
        let found = registry
            .actual_type_id(base)
            .ok_or(ElementError::UnregisteredInstance)?;
        if found != self.target {
            return Err(PatchError::TargetMismatch {
                expected: self.target,
                found,
            });
        }

        let mut node = save_to_node(registry, base, "", diagnostics)?;
        self.apply_to_node(&mut node)?;
        let patched = Loader::new(registry, diagnostics, LoadFlags::empty()).create_root(&mut node)?;
        Ok(patched)
    }

    /// Applies the edits to a saved tree of the target type.
    pub fn apply_to_node(&self, node: &mut DataElementNode) -> Result<(), PatchError> {
        let found = DataElementNode::type_id(node);
        if found != self.target {
            return Err(PatchError::TargetMismatch {
                expected: self.target,
                found,
            });
        }
        for edit in &self.edits {
            apply_edit(node, edit)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Persistence

    /// Stores the patch as an element tree, ready for any codec.
    pub fn to_node(&self) -> DataElementNode {
        let mut root = DataElementNode::new("DataPatch", PATCH_TYPE, PATCH_VERSION);
        root.add_node(DataElementNode::leaf("target", &uuid_to_string(&self.target)));
        for edit in &self.edits {
            let mut node = DataElementNode::new("edit", EDIT_TYPE, 0);
            node.add_node(DataElementNode::leaf("op", &edit.op.code()));
            for element in edit.address.elements() {
                let mut step = DataElementNode::new("step", STEP_TYPE, 0);
                step.add_node(DataElementNode::leaf("crc", &element.name_crc));
                step.add_node(DataElementNode::leaf("occurrence", &element.occurrence));
                node.add_node(step);
            }
            if let PatchOp::Replace(value) | PatchOp::Insert(value) = &edit.op {
                let mut wrapper = DataElementNode::new("value", VALUE_TYPE, 0);
                wrapper.add_node(value.clone());
                node.add_node(wrapper);
            }
            root.add_node(node);
        }
        root
    }

    /// Reads a patch written by [`to_node`](Self::to_node).
    pub fn from_node(node: &DataElementNode) -> Result<Self, PatchError> {
        if node.type_id() != PATCH_TYPE {
            return Err(PatchError::Malformed("not a patch"));
        }
        let target = node
            .children()
            .iter()
            .find(|child| child.name() == "target")
            .and_then(DataElementNode::leaf_value::<String>)
            .and_then(|text| Uuid::parse_str(&text).ok())
            .ok_or(PatchError::Malformed("missing target"))?;

        let mut patch = Self::new(target);
        for edit in node.children().iter().filter(|child| DataElementNode::type_id(child) == EDIT_TYPE) {
            patch.edits.push(read_edit(edit)?);
        }
        Ok(patch)
    }
}

fn read_edit(node: &DataElementNode) -> Result<PatchEdit, PatchError> {
    let mut code = None;
    let mut address = PatchAddress::default();
    let mut value = None;
    for child in node.children() {
        match child.type_id() {
            STEP_TYPE => {
                let field = |name: &str| {
                    child
                        .children()
                        .iter()
                        .find(|part| part.name() == name)
                        .and_then(DataElementNode::leaf_value::<u32>)
                        .ok_or(PatchError::Malformed("incomplete address step"))
                };
                address.0.push(AddressElement {
                    name_crc: field("crc")?,
                    occurrence: field("occurrence")?,
                });
            }
            VALUE_TYPE => value = child.children().first().cloned(),
            _ if child.name() == "op" => code = child.leaf_value::<u8>(),
            _ => {}
        }
    }

    let op = match (code, value) {
        (Some(0), Some(value)) => PatchOp::Replace(value),
        (Some(1), _) => PatchOp::Remove,
        (Some(2), Some(value)) => PatchOp::Insert(value),
        _ => return Err(PatchError::Malformed("bad edit operation")),
    };
    Ok(PatchEdit { address, op })
}

// -----------------------------------------------------------------------------
// Diff

/// Key of each child: its name hash and occurrence among same-named siblings.
fn keyed(children: &[DataElementNode]) -> Vec<(u32, u32)> {
    let mut seen: Vec<(u32, u32)> = Vec::new();
    children
        .iter()
        .map(|child| {
            let crc = child.name_crc();
            let occurrence = match seen.iter_mut().find(|(seen_crc, _)| *seen_crc == crc) {
                Some((_, count)) => {
                    *count += 1;
                    *count - 1
                }
                None => {
                    seen.push((crc, 1));
                    0
                }
            };
            (crc, occurrence)
        })
        .collect()
}

fn diff(from: &DataElementNode, to: &DataElementNode, address: &PatchAddress, edits: &mut Vec<PatchEdit>) {
    if from.type_id() != to.type_id() || from.version() != to.version() || from.data() != to.data() {
        edits.push(PatchEdit {
            address: address.clone(),
            op: PatchOp::Replace(to.clone()),
        });
        return;
    }

    let from_keys = keyed(from.children());
    let to_keys = keyed(to.children());

    for (child, &(crc, occurrence)) in to.children().iter().zip(&to_keys) {
        let child_address = address.child(crc, occurrence);
        match from_keys.iter().position(|key| *key == (crc, occurrence)) {
            Some(index) => diff(&from.children()[index], child, &child_address, edits),
            None => edits.push(PatchEdit {
                address: child_address,
                op: PatchOp::Insert(child.clone()),
            }),
        }
    }
    // Backwards, so earlier removals do not shift later occurrences.
    for &(crc, occurrence) in from_keys.iter().rev() {
        if !to_keys.contains(&(crc, occurrence)) {
            edits.push(PatchEdit {
                address: address.child(crc, occurrence),
                op: PatchOp::Remove,
            });
        }
    }
}

// -----------------------------------------------------------------------------
// Apply

fn find_index(node: &DataElementNode, element: AddressElement) -> Option<usize> {
    node.children()
        .iter()
        .enumerate()
        .filter(|(_, child)| child.name_crc() == element.name_crc)
        .nth(element.occurrence as usize)
        .map(|(index, _)| index)
}

fn apply_edit(root: &mut DataElementNode, edit: &PatchEdit) -> Result<(), PatchError> {
    let missing = || PatchError::MissingAddress {
        address: edit.address.to_string(),
    };

    let Some((last, parents)) = edit.address.elements().split_last() else {
        return match &edit.op {
            PatchOp::Replace(value) => {
                *root = value.clone();
                Ok(())
            }
            PatchOp::Remove | PatchOp::Insert(_) => Err(missing()),
        };
    };

    let mut parent = root;
    for element in parents {
        let index = find_index(parent, *element).ok_or_else(missing)?;
        parent = &mut parent.children_mut()[index];
    }

    match &edit.op {
        PatchOp::Replace(value) => {
            let index = find_index(parent, *last).ok_or_else(missing)?;
            parent.children_mut()[index] = value.clone();
        }
        PatchOp::Remove => {
            let index = find_index(parent, *last).ok_or_else(missing)?;
            parent.remove_element(index);
        }
        PatchOp::Insert(value) => {
            // After the previous occurrence, or last when there is none.
            let position = match last.occurrence.checked_sub(1) {
                Some(previous) => {
                    let previous = AddressElement {
                        occurrence: previous,
                        ..*last
                    };
                    find_index(parent, previous).ok_or_else(missing)? + 1
                }
                None => parent.children().len(),
            };
            parent.children_mut().insert(position, value.clone());
        }
    }
    Ok(())
}
