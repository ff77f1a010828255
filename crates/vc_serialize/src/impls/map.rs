use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::format;
use core::any::Any;
use core::hash::Hash;
use core::marker::PhantomData;
use std::collections::HashMap as StdHashMap;

use uuid::Uuid;
use vc_utils::hash::HashMap;

use crate::container::{ContainerAdapter, ElementInstance, ElementRef, ReservedElement};
use crate::impls::template;
use crate::reflection::{Reflect, TypeUuid, generic_uuid};
use crate::registry::{ClassData, ClassElement, TypeRegistry};

// -----------------------------------------------------------------------------
// MapStorage

/// A map the [`MapAdapter`] can drive.
///
/// Multi-value maps are expressed as maps to a sequence, `Map<K, Vec<V>>`.
pub trait MapStorage: Any {
    type Key: Reflect;
    type Value: Reflect;

    fn len(&self) -> usize;

    /// Inserts an entry, replacing the value of an existing key.
    fn insert_entry(&mut self, key: Self::Key, value: Self::Value);

    /// Removes the entry at `index` in iteration order.
    fn remove_nth(&mut self, index: usize) -> bool {
        let before = self.len();
        let mut current = 0;
        self.retain_entries(&mut |_| {
            let keep = current != index;
            current += 1;
            keep
        });
        self.len() != before
    }

    fn retain_entries(&mut self, keep: &mut dyn FnMut(&Self::Key) -> bool);

    fn clear_entries(&mut self);

    fn entries(&self) -> impl Iterator<Item = (&Self::Key, &Self::Value)>;
}

macro_rules! impl_map_storage {
    ($ty:ty, $($bound:tt)+) => {
        impl<K: Reflect + $($bound)+, V: Reflect> MapStorage for $ty {
            type Key = K;
            type Value = V;

            #[inline]
            fn len(&self) -> usize {
                <$ty>::len(self)
            }

            #[inline]
            fn insert_entry(&mut self, key: K, value: V) {
                self.insert(key, value);
            }

            fn retain_entries(&mut self, keep: &mut dyn FnMut(&K) -> bool) {
                self.retain(|key, _| keep(key));
            }

            #[inline]
            fn clear_entries(&mut self) {
                self.clear();
            }

            #[inline]
            fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
                self.iter()
            }
        }
    };
}

impl_map_storage!(BTreeMap<K, V>, Ord);
impl_map_storage!(StdHashMap<K, V>, Eq + Hash);
impl_map_storage!(HashMap<K, V>, Eq + Hash);

// -----------------------------------------------------------------------------
// MapAdapter

/// [`ContainerAdapter`] of every [`MapStorage`].
///
/// Each entry is one `element` slot of the pair class `MapEntry<K, V>`, whose
/// children are the key (`value1`) and the value (`value2`).
pub struct MapAdapter<C> {
    pair: ClassElement,
    key: ClassElement,
    value: ClassElement,
    _marker: PhantomData<fn() -> C>,
}

impl<C: MapStorage> MapAdapter<C> {
    pub fn new() -> Self {
        Self {
            pair: ClassElement::new("element", Self::pair_uuid(), 0),
            key: ClassElement::for_container::<C::Key>("value1"),
            value: ClassElement::for_container::<C::Value>("value2"),
            _marker: PhantomData,
        }
    }

    /// The id of the `MapEntry<K, V>` pair class.
    pub fn pair_uuid() -> Uuid {
        generic_uuid(
            template::MAP_ENTRY,
            &[C::Key::type_uuid(), C::Value::type_uuid()],
        )
    }

    /// The data-only pair class. It has no Rust type and no factory, entries
    /// are built from their key and value.
    pub fn pair_class() -> ClassData {
        let name = format!(
            "MapEntry<{}, {}>",
            C::Key::type_name(),
            C::Value::type_name()
        );
        ClassData::new(Self::pair_uuid(), name)
            .with_element(ClassElement::for_container::<C::Key>("value1"))
            .with_element(ClassElement::for_container::<C::Value>("value2"))
    }
}

impl<C: MapStorage> Default for MapAdapter<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: MapStorage> ContainerAdapter for MapAdapter<C> {
    fn element(&self, name_crc: u32) -> Option<&ClassElement> {
        (self.pair.name_crc() == name_crc).then_some(&self.pair)
    }

    fn enum_types(&self, f: &mut dyn FnMut(&ClassElement)) {
        f(&self.pair);
    }

    fn entry_elements(&self) -> Option<(&ClassElement, &ClassElement)> {
        Some((&self.key, &self.value))
    }

    fn size(&self, instance: &dyn Any) -> usize {
        instance.downcast_ref::<C>().map_or(0, C::len)
    }

    fn reserve_element(
        &self,
        instance: &mut dyn Any,
        _element: Option<&ClassElement>,
    ) -> Option<ReservedElement> {
        let map = instance.downcast_mut::<C>()?;
        Some(ReservedElement::new(map.len()))
    }

    fn store_element(
        &self,
        instance: &mut dyn Any,
        _reserved: ReservedElement,
        value: ElementInstance,
        registry: &TypeRegistry,
    ) -> Result<(), ElementInstance> {
        let Some(map) = instance.downcast_mut::<C>() else {
            return Err(value);
        };
        let (key, value) = match value {
            ElementInstance::Entry { key, value } => (key, value),
            other => return Err(other),
        };
        let key = match C::Key::from_element(key, registry) {
            Ok(key) => key,
            Err(key) => return Err(ElementInstance::Entry { key, value }),
        };
        let value = match C::Value::from_element(value, registry) {
            Ok(value) => value,
            Err(value) => {
                let key: Box<dyn Any> = Box::new(key);
                return Err(ElementInstance::Entry { key, value });
            }
        };
        map.insert_entry(key, value);
        Ok(())
    }

    fn enum_elements<'a>(
        &'a self,
        instance: &'a dyn Any,
        visit: &mut dyn FnMut(ElementRef<'a>) -> bool,
    ) {
        let Some(map) = instance.downcast_ref::<C>() else {
            return;
        };
        for (key, value) in map.entries() {
            let entry = ElementRef::Entry {
                key: key.as_element(),
                value: value.as_element(),
                element: &self.pair,
            };
            if !visit(entry) {
                break;
            }
        }
    }

    fn remove_element(
        &self,
        instance: &mut dyn Any,
        index: usize,
        _registry: Option<&TypeRegistry>,
    ) -> bool {
        instance
            .downcast_mut::<C>()
            .is_some_and(|map| map.remove_nth(index))
    }

    fn clear_elements(&self, instance: &mut dyn Any, _registry: Option<&TypeRegistry>) {
        if let Some(map) = instance.downcast_mut::<C>() {
            map.clear_entries();
        }
    }
}

// -----------------------------------------------------------------------------
// Reflect

macro_rules! impl_map {
    ($template:expr, $name:literal, $ty:ty, $($bound:tt)+) => {
        impl<K: Reflect + $($bound)+, V: Reflect> TypeUuid for $ty {
            fn type_uuid() -> Uuid {
                generic_uuid($template, &[K::type_uuid(), V::type_uuid()])
            }

            fn type_name() -> Cow<'static, str> {
                Cow::Owned(format!(concat!($name, "<{}, {}>"), K::type_name(), V::type_name()))
            }
        }

        impl<K: Reflect + $($bound)+, V: Reflect> Reflect for $ty {
            fn reflect(registry: &mut TypeRegistry) {
                registry.reflect_dependency::<K>();
                registry.reflect_dependency::<V>();
                // Failures are logged by the registry.
                let _ = registry.register_class(MapAdapter::<Self>::pair_class());
                registry.class::<Self>().container(MapAdapter::<Self>::new());
            }
        }
    };
}

impl_map!(template::BTREE_MAP, "BTreeMap", BTreeMap<K, V>, Ord);
impl_map!(template::HASH_MAP, "HashMap", StdHashMap<K, V>, Eq + Hash);
impl_map!(template::FIXED_HASH_MAP, "hashbrown::HashMap", HashMap<K, V>, Eq + Hash);

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::collections::BTreeMap;
    use alloc::string::String;

    use super::MapAdapter;
    use crate::container::{ElementInstance, ElementRef};
    use crate::registry::TypeRegistry;

    type Map = BTreeMap<String, i32>;

    #[test]
    fn entries_store_and_enumerate() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<Map>();
        let pair = registry.find_class_data(&MapAdapter::<Map>::pair_uuid()).unwrap();
        assert_eq!(pair.elements().len(), 2);
        assert!(pair.factory().is_none());

        let class = registry.class_of::<Map>().unwrap();
        let container = class.container().unwrap();
        let mut map = Map::new();
        let slot = container.reserve_element(&mut map, None).unwrap();
        let entry = ElementInstance::Entry {
            key: Box::new(String::from("a")),
            value: Box::new(7_i32),
        };
        container.store_element(&mut map, slot, entry, &registry).unwrap();
        assert_eq!(map.get("a"), Some(&7));

        let mut keys = 0;
        container.enum_elements(&map, &mut |element| {
            if let ElementRef::Entry { key, value, .. } = element {
                assert_eq!(key.downcast_ref::<String>().unwrap(), "a");
                assert_eq!(value.downcast_ref::<i32>(), Some(&7));
                keys += 1;
            }
            true
        });
        assert_eq!(keys, 1);
    }

    #[test]
    fn plain_values_are_rejected() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<Map>();
        let container = registry.class_of::<Map>().unwrap().container().unwrap();

        let mut map = Map::new();
        let slot = container.reserve_element(&mut map, None).unwrap();
        let value = ElementInstance::Value(Box::new(1_i32));
        assert!(container.store_element(&mut map, slot, value, &registry).is_err());
    }
}
