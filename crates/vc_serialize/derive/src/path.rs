//! Paths used by generated code.

use proc_macro2::TokenStream;
use quote::quote;

/// The path of `vc_serialize` as seen from the invoking crate.
///
/// Reading the manifest is comparatively expensive, so callers fetch it once
/// per expansion and pass it around.
pub(crate) fn vc_serialize() -> syn::Path {
    vc_macro_utils::Manifest::shared(|manifest| manifest.get_crate_path("vc_serialize"))
}

#[inline(always)]
pub(crate) fn macro_exports_(vc_serialize_path: &syn::Path) -> TokenStream {
    quote! {
        #vc_serialize_path::__macro_exports
    }
}

#[cfg(feature = "auto_register")]
#[inline(always)]
pub(crate) fn auto_register_(vc_serialize_path: &syn::Path) -> TokenStream {
    quote! {
        #vc_serialize_path::__macro_exports::auto_register
    }
}
