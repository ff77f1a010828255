//! Procedural macros of `vc_serialize`.
//!
//! - [`Reflect`]
//! - [`rtti_base!`](rtti_base)
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::std_instead_of_core, reason = "proc-macro lib")]
#![allow(clippy::std_instead_of_alloc, reason = "proc-macro lib")]

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

static REFLECT_ATTRIBUTE_NAME: &str = "reflect";

// -----------------------------------------------------------------------------
// Modules

mod attributes;
mod path;
mod reflect_impl;
mod rtti_base;

// -----------------------------------------------------------------------------
// Macros

/// # Derive `Reflect`
///
/// Implements `TypeUuid` and `Reflect` for a struct with named fields or a
/// unit struct. Every field is registered as a serialized element under its
/// own name, in declaration order.
///
/// ## Type attributes
///
/// - `uuid = "{...}"`: the stable type id. Required.
/// - `name = "..."`: the display name. Defaults to the type identifier.
/// - `version = N`: the class version. Defaults to 0.
/// - `converter = path`: a `VersionConverter` for older data.
/// - `no_factory`: registers without factory, so `Default` is not needed.
/// - `polymorphic(dyn Trait, ...)`: trait-object bases declared with
///   [`rtti_base!`](rtti_base).
/// - `auto_register`: submits the type to `TypeRegistry::auto_register`.
///   No-op without the `auto_register` feature.
///
/// ## Field attributes
///
/// - `skip`: the field is not serialized.
/// - `rename = "..."`: the element name used in streams.
/// - `base`: the field is an embedded base class (`BaseClass1`, ...).
///
/// ## Example
///
/// ```rust, ignore
/// #[derive(Reflect, Default)]
/// #[reflect(uuid = "{4A9C8F2D-3B61-4E0A-9D7E-51B2C4E6F801}", version = 2)]
/// struct Player {
///     #[reflect(base)]
///     entity: Entity,
///     #[reflect(rename = "m_name")]
///     name: String,
///     #[reflect(skip)]
///     cache: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    match reflect_impl::impl_reflect(&ast) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

/// # Declare a trait-object base
///
/// `rtti_base!(dyn Trait, "{uuid}")` implements `TypeUuid` and `RttiBase`
/// for `dyn Trait`, which must have `Any` as a supertrait. Concrete types
/// list the trait in `#[reflect(polymorphic(dyn Trait))]`.
///
/// ## Example
///
/// ```rust, ignore
/// pub trait Shape: Any {
///     fn area(&self) -> f32;
/// }
///
/// rtti_base!(dyn Shape, "{0E26C5B2-94C8-4C3B-A7B1-6A0F2E5C9D11}");
/// ```
#[proc_macro]
pub fn rtti_base(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as rtti_base::RttiBaseInput);

    match rtti_base::impl_rtti_base(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}
