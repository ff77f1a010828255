//! Compile-time side of reflection.
//!
//! - [`TypeUuid`] gives a type its persistent identity.
//! - [`Reflect`] registers a type's shape into a [`TypeRegistry`].
//! - [`RttiBase`] lets trait objects act as polymorphic bases.
//! - [`FieldDesc`] and [`field!`](crate::field) describe one field.
//!
//! [`TypeRegistry`]: crate::registry::TypeRegistry

// -----------------------------------------------------------------------------
// Modules

mod field;
mod reflect;
mod rtti;
mod type_uuid;

// -----------------------------------------------------------------------------
// Exports

pub use field::{FieldAccessor, FieldDesc};
pub use reflect::Reflect;
pub use rtti::RttiBase;
pub use type_uuid::{TypeUuid, generic_uuid, name_crc, uuid_to_string};
