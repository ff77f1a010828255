use alloc::boxed::Box;
use core::any::Any;

use crate::registry::ClassElement;

/// A slot handed out by [`ContainerAdapter::reserve_element`].
///
/// The slot is committed by [`store_element`] or released by
/// [`free_reserved_element`]. Its meaning is private to the adapter.
///
/// [`ContainerAdapter::reserve_element`]: super::ContainerAdapter::reserve_element
/// [`store_element`]: super::ContainerAdapter::store_element
/// [`free_reserved_element`]: super::ContainerAdapter::free_reserved_element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedElement {
    slot: usize,
}

impl ReservedElement {
    #[inline]
    pub const fn new(slot: usize) -> Self {
        Self { slot }
    }

    #[inline]
    pub const fn slot(&self) -> usize {
        self.slot
    }
}

/// A borrowed element of a container instance.
#[derive(Clone, Copy)]
pub enum ElementRef<'a> {
    /// A plain element. Pointer elements refer to their pointee.
    Value {
        value: &'a dyn Any,
        element: &'a ClassElement,
    },
    /// A key and value pair of a map.
    Entry {
        key: &'a dyn Any,
        value: &'a dyn Any,
        element: &'a ClassElement,
    },
}

impl<'a> ElementRef<'a> {
    /// The slot descriptor of the element.
    #[inline]
    pub fn element(&self) -> &'a ClassElement {
        match self {
            Self::Value { element, .. } | Self::Entry { element, .. } => element,
        }
    }
}

/// A detached element ready to be stored into a container.
pub enum ElementInstance {
    Value(Box<dyn Any>),
    Entry {
        key: Box<dyn Any>,
        value: Box<dyn Any>,
    },
}

impl ElementInstance {
    /// The plain value, or the instance itself for an entry.
    pub fn into_value(self) -> Result<Box<dyn Any>, Self> {
        match self {
            Self::Value(value) => Ok(value),
            entry @ Self::Entry { .. } => Err(entry),
        }
    }
}

impl core::fmt::Debug for ElementInstance {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Value(_) => f.write_str("ElementInstance::Value"),
            Self::Entry { .. } => f.write_str("ElementInstance::Entry"),
        }
    }
}
