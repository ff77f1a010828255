//! Leaf serialization, the plug-in point for opaque types.
//!
//! A class with a [`DataSerializer`] is a leaf: it is stored as one payload
//! instead of a field list. Binary streams keep the payload bytes, readable
//! formats keep the text produced by [`DataSerializer::data_to_text`].
//!
//! [`PrimitiveSerializer`] covers every type implementing [`LeafValue`].

// -----------------------------------------------------------------------------
// Modules

mod error;
mod leaf;
mod primitive;

// -----------------------------------------------------------------------------
// Exports

pub use error::DataError;
pub use leaf::LeafValue;
pub use primitive::PrimitiveSerializer;

use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;

// -----------------------------------------------------------------------------
// DataSerializer

/// Converts leaf instances to and from their payload.
///
/// `save` must produce the canonical byte form, which is little endian for
/// numbers. `data_to_text` and `text_to_data` translate between that byte
/// form and the readable form, without involving an instance.
///
/// # Examples
///
/// A serializer storing a newtype as its inner `u32`:
///
/// ```
/// use core::any::Any;
/// use vc_serialize::serializer::{DataError, DataSerializer, LeafValue};
///
/// struct Meters(u32);
///
/// struct MetersSerializer;
///
/// impl DataSerializer for MetersSerializer {
///     fn save(&self, instance: &dyn Any, out: &mut Vec<u8>) -> Result<(), DataError> {
///         let value = instance
///             .downcast_ref::<Meters>()
///             .ok_or(DataError::InstanceType { expected: "Meters" })?;
///         value.0.write_bytes(out);
///         Ok(())
///     }
///
///     fn load(&self, instance: &mut dyn Any, data: &[u8], _version: u32) -> Result<(), DataError> {
///         let value = instance
///             .downcast_mut::<Meters>()
///             .ok_or(DataError::InstanceType { expected: "Meters" })?;
///         value.0 = u32::read_bytes(data)?;
///         Ok(())
///     }
///
///     fn data_to_text(&self, data: &[u8]) -> Result<String, DataError> {
///         Ok(format!("{}m", u32::read_bytes(data)?))
///     }
///
///     fn text_to_data(&self, text: &str, out: &mut Vec<u8>) -> Result<(), DataError> {
///         u32::from_text(text.trim_end_matches('m'))?.write_bytes(out);
///         Ok(())
///     }
///
///     fn compare_value_data(&self, a: &dyn Any, b: &dyn Any) -> bool {
///         match (a.downcast_ref::<Meters>(), b.downcast_ref::<Meters>()) {
///             (Some(a), Some(b)) => a.0 == b.0,
///             _ => false,
///         }
///     }
/// }
///
/// let mut bytes = Vec::new();
/// MetersSerializer.save(&Meters(12), &mut bytes).unwrap();
/// assert_eq!(MetersSerializer.data_to_text(&bytes).unwrap(), "12m");
/// ```
pub trait DataSerializer: Send + Sync {
    /// Appends the payload of `instance` to `out`.
    fn save(&self, instance: &dyn Any, out: &mut Vec<u8>) -> Result<(), DataError>;

    /// Overwrites `instance` from a payload written by version `version`.
    fn load(&self, instance: &mut dyn Any, data: &[u8], version: u32) -> Result<(), DataError>;

    /// Renders a payload as text.
    fn data_to_text(&self, data: &[u8]) -> Result<String, DataError>;

    /// Parses text back into a payload appended to `out`.
    fn text_to_data(&self, text: &str, out: &mut Vec<u8>) -> Result<(), DataError>;

    /// Whether two instances hold the same value.
    fn compare_value_data(&self, a: &dyn Any, b: &dyn Any) -> bool;
}
