//! Code generation of `rtti_base!`.

use proc_macro2::{Literal, TokenStream};
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{LitStr, Token, Type, TypeParamBound};

use crate::attributes::parse_uuid;
use crate::path;

/// `dyn Trait, "{uuid}"` with an optional trailing `, "name"`.
pub(crate) struct RttiBaseInput {
    base: Type,
    uuid: LitStr,
    name: Option<LitStr>,
}

impl Parse for RttiBaseInput {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let base = input.parse()?;
        input.parse::<Token![,]>()?;
        let uuid = input.parse()?;
        let name = if input.parse::<Option<Token![,]>>()?.is_some() && !input.is_empty() {
            Some(input.parse()?)
        } else {
            None
        };
        Ok(Self { base, uuid, name })
    }
}

pub(crate) fn impl_rtti_base(input: &RttiBaseInput) -> syn::Result<TokenStream> {
    let Type::TraitObject(object) = &input.base else {
        return Err(syn::Error::new_spanned(&input.base, "expected `dyn Trait`"));
    };
    let trait_name = object.bounds.iter().find_map(|bound| match bound {
        TypeParamBound::Trait(bound) => bound.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    });
    let name = match (&input.name, trait_name) {
        (Some(name), _) => name.value(),
        (None, Some(name)) => name,
        (None, None) => {
            return Err(syn::Error::new_spanned(&input.base, "expected a trait bound"));
        }
    };

    let uuid = Literal::u128_suffixed(parse_uuid(&input.uuid)?);
    let vc_serialize = path::vc_serialize();
    let exports = path::macro_exports_(&vc_serialize);
    let base = &input.base;

    Ok(quote! {
        impl #vc_serialize::TypeUuid for #base {
            #[inline]
            fn type_uuid() -> #exports::Uuid {
                #exports::Uuid::from_u128(#uuid)
            }

            #[inline]
            fn type_name() -> #exports::Cow<'static, str> {
                #exports::Cow::Borrowed(#name)
            }
        }

        impl #vc_serialize::RttiBase for #base {
            #[inline]
            fn as_any(&self) -> &dyn #exports::Any {
                self
            }

            #[inline]
            fn as_any_mut(&mut self) -> &mut dyn #exports::Any {
                self
            }

            fn from_any(
                value: #exports::Box<dyn #exports::Any>,
                registry: &#vc_serialize::TypeRegistry,
            ) -> ::core::result::Result<#exports::Box<Self>, #exports::Box<dyn #exports::Any>> {
                registry.cast_boxed::<Self>(value)
            }

            fn reflect_base(registry: &mut #vc_serialize::TypeRegistry) {
                let _ = registry.abstract_class::<Self>().finish();
            }
        }
    })
}
