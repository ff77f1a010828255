#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Extern Self

// Usually, we need to use `crate` in the crate itself and use `vc_serialize` in doc testing.
// But `macro_utils::Manifest` can only choose one, so we must have an
// `extern self` to ensure `vc_serialize` can be used as an alias for `crate`.
extern crate self as vc_serialize;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

pub mod codec;
pub mod container;
pub mod convert;
pub mod impls;
pub mod ops;
pub mod reflection;
pub mod registry;
pub mod serializer;
pub mod stream;
pub mod tree;
pub mod walker;

#[cfg(test)]
mod fixtures;

// -----------------------------------------------------------------------------
// Top-level exports

pub use reflection::{Reflect, RttiBase, TypeUuid};
pub use registry::{ClassData, ClassElement, TypeRegistry, TypeRegistryArc};
pub use tree::DataElementNode;

pub use vc_serialize_derive::{Reflect, rtti_base};

pub mod derive {
    //! Re-exports of the proc-macros.
    pub use vc_serialize_derive::{Reflect, rtti_base};
}

// -----------------------------------------------------------------------------
// Macro exports

#[doc(hidden)]
pub mod __macro_exports;
