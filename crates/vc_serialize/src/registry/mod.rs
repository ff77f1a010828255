//! Runtime side of reflection: the class table.
//!
//! - [`TypeRegistry`] stores one [`ClassData`] per type id.
//! - [`ClassBuilder`] describes a class and commits it.
//! - [`EditBuilder`] attaches tool-only display data.
//! - [`TypeRegistryArc`] shares a registry between threads.

// -----------------------------------------------------------------------------
// Modules

mod arc;
mod attributes;
mod builder;
mod class_data;
mod edit;
mod error;
mod type_registry;

// -----------------------------------------------------------------------------
// Exports

pub use arc::TypeRegistryArc;
pub use attributes::Attributes;
pub use builder::ClassBuilder;
pub use class_data::{BaseClassData, ClassData, ClassElement, ElementFlags};
pub use class_data::{EventHandler, Factory, VersionConverter};
pub use edit::{ClassEditData, EditBuilder, EditData};
pub use error::RegistrationError;
pub use type_registry::TypeRegistry;
