use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;

use uuid::Uuid;

use crate::codec::{self, LoadFilter, StreamFormat};
use crate::reflection::Reflect;
use crate::registry::{ClassData, TypeRegistry};
use crate::stream::{GenericStream, LoadError, SaveError};
use crate::tree::DataElementNode;
use crate::walker::{Diagnostics, ElementError, ElementPath, LoadFlags, Loader, save_to_node};

// -----------------------------------------------------------------------------
// SaveDriver

/// Collects root objects and writes them as one stream.
///
/// Elements that fail to save are reported to [`diagnostics`](Self::diagnostics)
/// and left out of the tree. Only a failing root is an error.
pub struct SaveDriver<'r> {
    registry: &'r TypeRegistry,
    format: StreamFormat,
    roots: Vec<DataElementNode>,
    diagnostics: Diagnostics,
}

impl<'r> SaveDriver<'r> {
    pub fn new(registry: &'r TypeRegistry, format: StreamFormat) -> Self {
        Self {
            registry,
            format,
            roots: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    #[inline]
    pub fn format(&self) -> StreamFormat {
        self.format
    }

    #[inline]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// The trees saved so far.
    #[inline]
    pub fn roots(&self) -> &[DataElementNode] {
        &self.roots
    }

    /// Adds `value` as the next root.
    pub fn save<T: Reflect>(&mut self, value: &T) -> Result<(), SaveError> {
        self.save_any(value)
    }

    /// Adds a root whose type is only known at runtime.
    pub fn save_any(&mut self, value: &dyn Any) -> Result<(), SaveError> {
        let root = save_to_node(self.registry, value, "", &mut self.diagnostics)?;
        log::trace!("saved root {} into a {} stream", root.type_id(), self.format);
        self.roots.push(root);
        Ok(())
    }

    /// Encodes every saved root.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SaveError> {
        let mut bytes = Vec::new();
        codec::encode(self.format, self.registry, &self.roots, &mut bytes)?;
        Ok(bytes)
    }

    /// Writes the encoded roots to an empty stream.
    pub fn write_to<S: GenericStream + ?Sized>(&self, stream: &mut S) -> Result<(), SaveError> {
        let length = stream.length()?;
        if length != 0 {
            return Err(SaveError::StreamNotEmpty { length });
        }
        let bytes = self.to_bytes()?;
        stream.write_all(&bytes)?;
        stream.flush()?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// LoadDriver

/// Decodes streams and materializes their roots.
///
/// The stream format is detected from its first byte. Framing errors fail
/// the whole call before any object is touched. Failures of single elements
/// only drop that element and are collected in
/// [`diagnostics`](Self::diagnostics), unless the filter has
/// [`LoadFlags::STRICT`].
///
/// Every top-level load fires `on_loaded_from_object_stream` once on the
/// root object.
pub struct LoadDriver<'r> {
    registry: &'r TypeRegistry,
    filter: LoadFilter,
    diagnostics: Diagnostics,
}

impl<'r> LoadDriver<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            filter: LoadFilter::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn with_filter(mut self, filter: LoadFilter) -> Self {
        self.filter = filter;
        self
    }

    #[inline]
    pub fn filter(&self) -> &LoadFilter {
        &self.filter
    }

    /// Issues of the last load call.
    #[inline]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Decodes the stream without loading it.
    ///
    /// The nodes are not converted yet, see [`crate::convert::convert_tree`].
    pub fn load_tree(&self, bytes: &[u8]) -> Result<Vec<DataElementNode>, LoadError> {
        Ok(codec::decode(bytes, &self.filter)?)
    }

    /// Loads the first root of the stream as a `T`.
    pub fn load<T: Reflect>(&mut self, bytes: &[u8]) -> Result<T, LoadError> {
        let value = self.load_any(bytes)?;
        match value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(other) => Err(LoadError::RootTypeMismatch {
                expected: T::type_uuid(),
                found: self.registry.actual_type_id(&*other).unwrap_or(Uuid::nil()),
            }),
        }
    }

    /// Loads the first root of the stream as whatever type it holds.
    ///
    /// Further roots are ignored.
    pub fn load_any(&mut self, bytes: &[u8]) -> Result<Box<dyn Any>, LoadError> {
        self.diagnostics.clear();
        let roots = self.load_tree(bytes)?;
        if roots.len() > 1 {
            log::warn!("stream holds {} objects, loading the first", roots.len());
        }
        let mut root = roots.into_iter().next().ok_or(LoadError::NoRoot)?;

        let mut value = Loader::new(self.registry, &mut self.diagnostics, self.filter.flags())
            .create_root(&mut root)?;
        self.fire_loaded(&mut *value);
        self.check_strict()?;
        Ok(value)
    }

    /// Loads the first root of the stream into `target`.
    ///
    /// The stream is decoded completely first, so a broken or newer stream
    /// leaves `target` untouched. Containers inside `target` are replaced by
    /// the stream content. With [`LoadFlags::STRICT`], `target` may already
    /// be modified when the call reports its issues.
    pub fn load_in_place<T: Reflect>(&mut self, bytes: &[u8], target: &mut T) -> Result<(), LoadError> {
        self.diagnostics.clear();
        let roots = self.load_tree(bytes)?;
        let mut root = roots.into_iter().next().ok_or(LoadError::NoRoot)?;

        Loader::new(self.registry, &mut self.diagnostics, self.filter.flags())
            .load_node_into(target, &mut root)?;
        self.fire_loaded(target);
        self.check_strict()
    }

    /// Loads every root and hands it to `f` with its class.
    ///
    /// Roots that fail are reported and skipped. Returning `false` from `f`
    /// stops the load. Returns the number of roots passed to `f`.
    pub fn load_roots(
        &mut self,
        bytes: &[u8],
        mut f: impl FnMut(Box<dyn Any>, &ClassData) -> bool,
    ) -> Result<usize, LoadError> {
        self.diagnostics.clear();
        let roots = self.load_tree(bytes)?;
        let flags = self.filter.flags();

        let mut loaded = 0;
        for (index, mut root) in roots.into_iter().enumerate() {
            let result = Loader::new(self.registry, &mut self.diagnostics, flags).create_root(&mut root);
            let mut value = match result {
                Ok(value) => value,
                Err(ElementError::Discarded) => continue,
                Err(ElementError::UnknownType { .. })
                    if flags.contains(LoadFlags::IGNORE_UNKNOWN_CLASSES) =>
                {
                    continue;
                }
                Err(error) => {
                    let mut path = ElementPath::new();
                    path.push_index(index);
                    self.diagnostics.report(&path, &error);
                    continue;
                }
            };
            self.fire_loaded(&mut *value);
            let Some(class) = self.registry.find_class_data_for_instance(&*value) else {
                continue;
            };
            loaded += 1;
            if !f(value, class) {
                break;
            }
        }
        self.check_strict()?;
        Ok(loaded)
    }

    fn fire_loaded(&self, instance: &mut dyn Any) {
        if let Some(handler) = self
            .registry
            .find_class_data_for_instance(instance)
            .and_then(ClassData::event_handler)
        {
            handler.on_loaded_from_object_stream(instance);
        }
    }

    fn check_strict(&self) -> Result<(), LoadError> {
        if self.filter.flags().contains(LoadFlags::STRICT) && !self.diagnostics.is_empty() {
            return Err(LoadError::Strict {
                issues: self.diagnostics.len(),
            });
        }
        Ok(())
    }
}
