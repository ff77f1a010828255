//! Top-level save and load over byte streams.
//!
//! [`SaveDriver`] and [`LoadDriver`] own one operation each and keep its
//! [`Diagnostics`](crate::walker::Diagnostics). The free functions cover the
//! common single-object case.
//!
//! # Examples
//!
//! ```
//! use std::io::{Cursor, Seek, SeekFrom};
//!
//! use vc_serialize::{Reflect, TypeRegistry};
//! use vc_serialize::stream::{self, LoadFilter, StreamFormat};
//!
//! #[derive(Reflect, Default, Debug, PartialEq)]
//! #[reflect(uuid = "{3E8C0F52-61D4-4A2B-9C07-B5E1F4A8D293}")]
//! struct Settings {
//!     volume: f32,
//!     muted: bool,
//! }
//!
//! let mut registry = TypeRegistry::new();
//! registry.reflect::<Settings>();
//!
//! let mut file = Cursor::new(Vec::new());
//! let settings = Settings { volume: 0.5, muted: true };
//! stream::save_object_to_stream(&mut file, StreamFormat::Xml, &registry, &settings).unwrap();
//!
//! file.seek(SeekFrom::Start(0)).unwrap();
//! let loaded: Settings =
//!     stream::load_object_from_stream(&mut file, &registry, &LoadFilter::new()).unwrap();
//! assert_eq!(loaded, settings);
//! ```

// -----------------------------------------------------------------------------
// Modules

mod driver;
mod error;
mod generic;

// -----------------------------------------------------------------------------
// Exports

pub use driver::{LoadDriver, SaveDriver};
pub use error::{LoadError, SaveError};
pub use generic::GenericStream;

pub use crate::codec::{LoadFilter, StreamFormat};

use alloc::vec::Vec;

use crate::reflection::Reflect;
use crate::registry::TypeRegistry;

// -----------------------------------------------------------------------------
// Single-object helpers

/// Saves `value` into an empty stream.
///
/// A stream that already holds data is rejected with
/// [`SaveError::StreamNotEmpty`].
pub fn save_object_to_stream<T: Reflect, S: GenericStream + ?Sized>(
    stream: &mut S,
    format: StreamFormat,
    registry: &TypeRegistry,
    value: &T,
) -> Result<(), SaveError> {
    let mut driver = SaveDriver::new(registry, format);
    driver.save(value)?;
    driver.write_to(stream)
}

/// Saves `value` into a new buffer.
pub fn save_object_to_bytes<T: Reflect>(
    format: StreamFormat,
    registry: &TypeRegistry,
    value: &T,
) -> Result<Vec<u8>, SaveError> {
    let mut driver = SaveDriver::new(registry, format);
    driver.save(value)?;
    driver.to_bytes()
}

/// Loads a `T` from the current position to the end of `stream`.
pub fn load_object_from_stream<T: Reflect, S: GenericStream + ?Sized>(
    stream: &mut S,
    registry: &TypeRegistry,
    filter: &LoadFilter,
) -> Result<T, LoadError> {
    let bytes = read_rest(stream)?;
    LoadDriver::new(registry)
        .with_filter(filter.clone())
        .load(&bytes)
}

/// Loads the stream content into an existing `target`.
///
/// A stream that cannot be decoded leaves `target` untouched.
pub fn load_object_in_place<T: Reflect, S: GenericStream + ?Sized>(
    stream: &mut S,
    registry: &TypeRegistry,
    target: &mut T,
    filter: &LoadFilter,
) -> Result<(), LoadError> {
    let bytes = read_rest(stream)?;
    LoadDriver::new(registry)
        .with_filter(filter.clone())
        .load_in_place(&bytes, target)
}

/// Loads a `T` from a buffer with the default filter.
pub fn load_object_from_bytes<T: Reflect>(bytes: &[u8], registry: &TypeRegistry) -> Result<T, LoadError> {
    LoadDriver::new(registry).load(bytes)
}

fn read_rest<S: GenericStream + ?Sized>(stream: &mut S) -> Result<Vec<u8>, LoadError> {
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::string::{String, ToString};
    use alloc::vec;
    use alloc::vec::Vec;
    use core::any::Any;
    use std::io::{Cursor, Seek, SeekFrom};

    use super::{
        LoadDriver, LoadError, LoadFilter, SaveDriver, SaveError, StreamFormat,
        load_object_from_bytes, load_object_in_place, save_object_to_bytes, save_object_to_stream,
    };
    use crate::TypeUuid;
    use crate::codec::CodecError;
    use crate::fixtures::{
        Circle, Foo, FooV2, Shape, ShapeHolder, Square, Tracked, TrackedPair, TreeNode,
        deprecate_square, redirect_square_to_circle,
    };
    use crate::registry::TypeRegistry;
    use crate::walker::{IssueKind, LoadFlags};

    const FORMATS: [StreamFormat; 3] = [StreamFormat::Binary, StreamFormat::Xml, StreamFormat::Json];

    fn shapes() -> ShapeHolder {
        ShapeHolder {
            shapes: vec![
                Box::new(Circle { radius: 1.0 }),
                Box::new(Square { side: 1.0 }),
                Box::new(Circle { radius: 2.0 }),
                Box::new(Square { side: 2.0 }),
            ],
        }
    }

    fn areas(holder: &ShapeHolder) -> Vec<f32> {
        holder.shapes.iter().map(|shape| shape.area()).collect()
    }

    fn full_registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.reflect::<ShapeHolder>().reflect::<Square>().reflect::<Foo>();
        registry
    }

    #[test]
    fn objects_survive_every_format() {
        let registry = full_registry();
        let holder = shapes();
        for format in FORMATS {
            let bytes = save_object_to_bytes(format, &registry, &holder).unwrap();
            let loaded: ShapeHolder = load_object_from_bytes(&bytes, &registry).unwrap();
            assert_eq!(areas(&loaded), areas(&holder), "{format}");
        }
    }

    #[test]
    fn in_place_load_replaces_container_content() {
        let registry = full_registry();
        let saved = ShapeHolder {
            shapes: vec![Box::new(Square { side: 4.0 })],
        };
        let mut stream = Cursor::new(Vec::new());
        save_object_to_stream(&mut stream, StreamFormat::Binary, &registry, &saved).unwrap();
        stream.seek(SeekFrom::Start(0)).unwrap();

        let mut target = shapes();
        load_object_in_place(&mut stream, &registry, &mut target, &LoadFilter::new()).unwrap();
        assert_eq!(areas(&target), [16.0]);
    }

    #[test]
    fn old_streams_load_through_converters() {
        let mut old = TypeRegistry::new();
        old.reflect::<Foo>();
        let bytes = save_object_to_bytes(StreamFormat::Binary, &old, &Foo { m_data: 5 }).unwrap();

        let mut registry = TypeRegistry::new();
        registry.reflect::<FooV2>();
        let loaded: FooV2 = load_object_from_bytes(&bytes, &registry).unwrap();
        assert_eq!(loaded.m_value, 10);
    }

    #[test]
    fn future_streams_leave_the_target_untouched() {
        let registry = full_registry();
        let mut bytes = save_object_to_bytes(StreamFormat::Binary, &registry, &Foo { m_data: 1 }).unwrap();
        bytes[1..5].copy_from_slice(&u32::MAX.to_be_bytes());

        let mut target = Foo { m_data: 42 };
        let err = LoadDriver::new(&registry)
            .load_in_place(&bytes, &mut target)
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Codec(CodecError::UnsupportedVersion { found: u32::MAX, .. })
        ));
        assert_eq!(target.m_data, 42);
    }

    #[test]
    fn deprecated_elements_are_dropped_or_converted() {
        let bytes = save_object_to_bytes(StreamFormat::Json, &full_registry(), &shapes()).unwrap();

        let mut dropped = TypeRegistry::new();
        dropped.reflect::<ShapeHolder>();
        deprecate_square(&mut dropped, None);
        let mut driver = LoadDriver::new(&dropped);
        let loaded: ShapeHolder = driver.load(&bytes).unwrap();
        assert_eq!(areas(&loaded), [3.0, 12.0]);
        assert!(driver.diagnostics().is_empty());

        let mut converted = TypeRegistry::new();
        converted.reflect::<ShapeHolder>();
        deprecate_square(&mut converted, Some(redirect_square_to_circle));
        for format in FORMATS {
            let bytes = save_object_to_bytes(format, &full_registry(), &shapes()).unwrap();
            let loaded: ShapeHolder = load_object_from_bytes(&bytes, &converted).unwrap();
            // Squares of side s come back as circles of radius s, in place.
            assert_eq!(areas(&loaded), [3.0, 3.0, 12.0, 12.0], "{format}");
            for shape in &loaded.shapes {
                let shape: &dyn Any = &**shape;
                assert!(shape.is::<Circle>(), "{format}");
            }
        }
    }

    #[test]
    fn deep_recursive_objects_survive_every_format() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<TreeNode>();

        let mut tree = TreeNode {
            label: String::from("leaf"),
            children: Vec::new(),
        };
        for level in 0..40 {
            tree = TreeNode {
                label: level.to_string(),
                children: vec![tree],
            };
        }

        for format in FORMATS {
            let bytes = save_object_to_bytes(format, &registry, &tree).unwrap();
            let loaded: TreeNode = load_object_from_bytes(&bytes, &registry).unwrap();
            assert_eq!(loaded, tree, "{format}");
        }
    }

    #[test]
    fn unknown_types_are_reported_or_fail_strict_loads() {
        let bytes = save_object_to_bytes(StreamFormat::Binary, &full_registry(), &shapes()).unwrap();
        let mut registry = TypeRegistry::new();
        registry.reflect::<ShapeHolder>();

        let mut driver = LoadDriver::new(&registry);
        let loaded: ShapeHolder = driver.load(&bytes).unwrap();
        assert_eq!(loaded.shapes.len(), 2);
        assert_eq!(driver.diagnostics().count(IssueKind::UnknownType), 2);

        let mut strict = LoadDriver::new(&registry).with_filter(LoadFilter::new().with_flags(LoadFlags::STRICT));
        assert!(matches!(
            strict.load::<ShapeHolder>(&bytes),
            Err(LoadError::Strict { issues: 2 })
        ));
    }

    #[test]
    fn root_type_is_checked() {
        let registry = full_registry();
        let bytes = save_object_to_bytes(StreamFormat::Xml, &registry, &Foo { m_data: 1 }).unwrap();
        assert!(matches!(
            load_object_from_bytes::<ShapeHolder>(&bytes, &registry),
            Err(LoadError::RootTypeMismatch { found, .. }) if found == Foo::type_uuid()
        ));
    }

    #[test]
    fn second_save_into_a_stream_is_rejected() {
        let registry = full_registry();
        let mut stream = Cursor::new(Vec::new());
        save_object_to_stream(&mut stream, StreamFormat::Binary, &registry, &Foo { m_data: 1 }).unwrap();
        let written = stream.get_ref().len();

        let err = save_object_to_stream(&mut stream, StreamFormat::Binary, &registry, &Foo { m_data: 2 })
            .unwrap_err();
        assert!(matches!(err, SaveError::StreamNotEmpty { length } if length == written as u64));
        assert_eq!(stream.get_ref().len(), written);
    }

    #[test]
    fn multiple_roots_reach_the_callback() {
        let registry = full_registry();
        let mut saver = SaveDriver::new(&registry, StreamFormat::Json);
        saver.save(&Foo { m_data: 1 }).unwrap();
        saver.save(&Square { side: 2.0 }).unwrap();
        saver.save(&Foo { m_data: 3 }).unwrap();
        let bytes = saver.to_bytes().unwrap();

        let mut names = Vec::new();
        let count = LoadDriver::new(&registry)
            .load_roots(&bytes, |_, class| {
                names.push(String::from(class.name()));
                true
            })
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(names, ["Foo", "Square", "Foo"]);

        let mut first = None;
        LoadDriver::new(&registry)
            .load_roots(&bytes, |value, _| {
                first = value.downcast::<Foo>().ok();
                false
            })
            .unwrap();
        assert_eq!(first.map(|foo| foo.m_data), Some(1));
    }

    #[test]
    fn load_hook_fires_once_on_the_root() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<TrackedPair>();
        let pair = TrackedPair::default();
        let bytes = save_object_to_bytes(StreamFormat::Binary, &registry, &pair).unwrap();

        let mut target = TrackedPair::default();
        LoadDriver::new(&registry).load_in_place(&bytes, &mut target).unwrap();
        assert_eq!(target.loaded, 1);
        assert_eq!(target.first.loaded, 0);
        assert_eq!(target.second.cloned, 0);

        let tracked: Tracked = load_object_from_bytes(
            &save_object_to_bytes(StreamFormat::Xml, &registry, &Tracked::default()).unwrap(),
            &registry,
        )
        .unwrap();
        assert_eq!((tracked.loaded, tracked.cloned), (1, 0));
    }

    #[test]
    fn empty_streams_have_no_root() {
        let registry = full_registry();
        let bytes = SaveDriver::new(&registry, StreamFormat::Binary).to_bytes().unwrap();
        assert!(matches!(
            load_object_from_bytes::<Foo>(&bytes, &registry),
            Err(LoadError::NoRoot)
        ));
    }

    #[test]
    fn dyn_shape_roots_load_as_their_dynamic_type() {
        let registry = full_registry();
        let shape: Box<dyn Shape> = Box::new(Circle { radius: 1.0 });
        let mut saver = SaveDriver::new(&registry, StreamFormat::Binary);
        saver.save_any(&*shape as &dyn Any).unwrap();
        let loaded: Circle = load_object_from_bytes(&saver.to_bytes().unwrap(), &registry).unwrap();
        assert_eq!(loaded.radius, 1.0);
    }
}
