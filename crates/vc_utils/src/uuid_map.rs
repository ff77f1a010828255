use core::fmt::Debug;

use uuid::Uuid;

use crate::hash::FixedHashState;
use crate::hash::hashbrown::HashMap;
use crate::hash::hashbrown::hash_map::Entry;

// -----------------------------------------------------------------------------
// UuidMap

/// A map container with [`Uuid`] as the fixed key type.
///
/// Type identifiers are persisted in data files, so unlike `TypeId` they must
/// stay stable between builds. This map keeps the lookup side of that contract:
/// the interface exposes no [`HashMap`] specific APIs, which leaves room for
/// swapping the storage later.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use vc_utils::UuidMap;
///
/// let id = Uuid::from_u128(0x72039442_EB38_4D42_A1AD_CB68F7E0EEF6);
/// let mut map = UuidMap::new();
/// map.insert(id, "int");
///
/// assert_eq!(map.get(&id), Some(&"int"));
/// assert!(map.contains(&id));
/// ```
pub struct UuidMap<V>(HashMap<Uuid, V, FixedHashState>);

impl<V> UuidMap<V> {
    /// Creates an empty `UuidMap`.
    #[inline]
    pub const fn new() -> Self {
        Self(HashMap::with_hasher(FixedHashState))
    }

    /// Creates an empty `UuidMap` with the specified capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self(HashMap::with_capacity_and_hasher(capacity, FixedHashState))
    }

    /// Inserts the value built by `f` if `id` is absent.
    ///
    /// Returns `false` and leaves the map untouched when the key exists.
    #[inline]
    pub fn try_insert(&mut self, id: Uuid, f: impl FnOnce() -> V) -> bool {
        match self.0.entry(id) {
            Entry::Vacant(entry) => {
                entry.insert(f());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Gets the value for `id`, inserting the result of `f` first if needed.
    #[inline]
    pub fn get_or_insert(&mut self, id: Uuid, f: impl FnOnce() -> V) -> &mut V {
        match self.0.entry(id) {
            Entry::Vacant(entry) => entry.insert(f()),
            Entry::Occupied(entry) => entry.into_mut(),
        }
    }

    /// Returns a reference to the value stored for `id`.
    #[inline]
    pub fn get(&self, id: &Uuid) -> Option<&V> {
        self.0.get(id)
    }

    /// Returns a mutable reference to the value stored for `id`.
    #[inline]
    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut V> {
        self.0.get_mut(id)
    }

    /// Inserts a key-value pair, returning the replaced value.
    #[inline]
    pub fn insert(&mut self, id: Uuid, value: V) -> Option<V> {
        self.0.insert(id, value)
    }

    /// Removes `id`, returning its value if it was present.
    #[inline]
    pub fn remove(&mut self, id: &Uuid) -> Option<V> {
        self.0.remove(id)
    }

    /// Clears the map, keeping the allocated memory for reuse.
    #[inline]
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Returns `true` if the map contains a value for `id`.
    #[inline]
    pub fn contains(&self, id: &Uuid) -> bool {
        self.0.contains_key(id)
    }

    /// Returns the number of elements in the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the map contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// An iterator visiting all pairs in arbitrary order.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&Uuid, &V)> {
        self.0.iter()
    }

    /// An iterator visiting all keys in arbitrary order.
    #[inline]
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &Uuid> {
        self.0.keys()
    }

    /// An iterator visiting all values in arbitrary order.
    #[inline]
    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> {
        self.0.values()
    }

    /// An iterator visiting all values mutably in arbitrary order.
    #[inline]
    pub fn values_mut(&mut self) -> impl ExactSizeIterator<Item = &mut V> {
        self.0.values_mut()
    }
}

impl<V> Default for UuidMap<V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> Clone for UuidMap<V> {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<V: Debug> Debug for UuidMap<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}
