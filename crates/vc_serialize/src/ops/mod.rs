//! Operations built on the walker: deep clone and data patches.

// -----------------------------------------------------------------------------
// Modules

mod clone;
mod error;
mod patch;

// -----------------------------------------------------------------------------
// Exports

pub use clone::{clone_object, clone_object_with, clone_value};
pub use error::{CloneError, PatchError};
pub use patch::{AddressElement, DataPatch, PatchAddress, PatchEdit, PatchOp};
