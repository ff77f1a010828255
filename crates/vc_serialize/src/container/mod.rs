//! Generic access to container instances.
//!
//! A container class carries a [`ContainerAdapter`]. The walker uses it to
//! enumerate, clear and refill instances without knowing the concrete type.
//! One adapter exists per container kind, see [`crate::impls`].

// -----------------------------------------------------------------------------
// Modules

mod adapter;
mod element;

// -----------------------------------------------------------------------------
// Exports

pub use adapter::ContainerAdapter;
pub use element::{ElementInstance, ElementRef, ReservedElement};
