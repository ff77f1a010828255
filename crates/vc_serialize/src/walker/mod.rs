//! The generic traversal behind save, load, enumerate and clone.
//!
//! - [`enumerate_instance`] walks a live instance and calls an
//!   [`InstanceVisitor`] for every element.
//! - [`save_to_node`] is that walk with a visitor building a
//!   [`DataElementNode`](crate::DataElementNode) tree.
//! - [`Loader`] walks a tree and writes it into instances, converting outdated
//!   nodes on the way.
//!
//! Failures below the top-level object never abort the walk. They are
//! recorded in [`Diagnostics`] and the failing element is dropped.

// -----------------------------------------------------------------------------
// Modules

mod diagnostics;
mod enumerate;
mod error;
mod flags;
mod load;
mod path;
mod save;

// -----------------------------------------------------------------------------
// Exports

pub use diagnostics::{Diagnostics, Issue, IssueKind, Severity};
pub use enumerate::{InstanceVisitor, enumerate_instance};
pub use error::ElementError;
pub use flags::LoadFlags;
pub use load::Loader;
pub use path::ElementPath;
pub use save::save_to_node;
