//! Code generation of `#[derive(Reflect)]`.

use proc_macro2::{Literal, Span, TokenStream};
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields};

use crate::attributes::{FieldAttributes, TypeAttributes};
use crate::path;

pub(crate) fn impl_reflect(ast: &DeriveInput) -> syn::Result<TokenStream> {
    let attrs = TypeAttributes::parse_attrs(&ast.attrs)?;
    if !ast.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &ast.generics,
            "`Reflect` cannot be derived for generic types, implement it manually",
        ));
    }
    let Some(uuid) = attrs.uuid else {
        return Err(syn::Error::new(
            Span::call_site(),
            "missing `#[reflect(uuid = \"{...}\")]`",
        ));
    };

    let fields: Vec<&Field> = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named.named.iter().collect(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    &ast.ident,
                    "tuple structs cannot derive `Reflect`, use named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &ast.ident,
                "only structs can derive `Reflect`",
            ));
        }
    };

    let vc_serialize = path::vc_serialize();
    let exports = path::macro_exports_(&vc_serialize);
    let ident = &ast.ident;
    let name = attrs
        .name
        .as_ref()
        .map_or_else(|| ident.to_string(), syn::LitStr::value);
    let uuid = Literal::u128_suffixed(uuid);

    let builder = if attrs.no_factory {
        quote! { class_without_factory::<Self>() }
    } else {
        quote! { class::<Self>() }
    };
    let version = attrs.version.as_ref().map(|version| quote! { .version(#version) });
    let converter = attrs.converter.as_ref().map(|converter| quote! { .converter(#converter) });

    let mut elements = Vec::with_capacity(fields.len());
    for field in fields {
        let field_attrs = FieldAttributes::parse_attrs(&field.attrs)?;
        if field_attrs.skip {
            continue;
        }
        let Some(member) = &field.ident else {
            continue;
        };
        elements.push(if field_attrs.base {
            quote! { .base(#vc_serialize::field!(Self, #member)) }
        } else {
            let element_name = field_attrs
                .rename
                .map_or_else(|| member.to_string(), |rename| rename.value());
            quote! { .field(#element_name, #vc_serialize::field!(Self, #member)) }
        });
    }

    let casts = attrs.polymorphic.iter().map(|base| {
        quote! {
            .rtti_base::<#base>(|value: #exports::Box<Self>| -> #exports::Box<#base> { value })
        }
    });

    let auto_register = auto_register_impl(&vc_serialize, ident, attrs.auto_register);

    Ok(quote! {
        impl #vc_serialize::TypeUuid for #ident {
            #[inline]
            fn type_uuid() -> #exports::Uuid {
                #exports::Uuid::from_u128(#uuid)
            }

            #[inline]
            fn type_name() -> #exports::Cow<'static, str> {
                #exports::Cow::Borrowed(#name)
            }
        }

        impl #vc_serialize::Reflect for #ident {
            fn reflect(registry: &mut #vc_serialize::TypeRegistry) {
                registry
                    .#builder
                    #version
                    #converter
                    #(#elements)*
                    #(#casts)*;
            }
        }

        #auto_register
    })
}

#[cfg(feature = "auto_register")]
fn auto_register_impl(vc_serialize: &syn::Path, ident: &syn::Ident, span: Option<Span>) -> TokenStream {
    let Some(span) = span else {
        return TokenStream::new();
    };
    let auto_register_ = path::auto_register_(vc_serialize);
    quote::quote_spanned! { span =>
        #auto_register_::inventory::submit! {
            #auto_register_::AutoRegistration(<#ident as #vc_serialize::Reflect>::reflect)
        }
    }
}

#[cfg(not(feature = "auto_register"))]
fn auto_register_impl(_: &syn::Path, _: &syn::Ident, _: Option<Span>) -> TokenStream {
    TokenStream::new()
}
