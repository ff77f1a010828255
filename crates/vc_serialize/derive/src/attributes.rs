//! Parsing of `#[reflect(...)]` attributes.

use proc_macro2::Span;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Attribute, LitInt, LitStr, Path, Token, Type, parenthesized};

use crate::REFLECT_ATTRIBUTE_NAME;

// -----------------------------------------------------------------------------
// Type attributes

#[derive(Default)]
pub(crate) struct TypeAttributes {
    pub uuid: Option<u128>,
    pub name: Option<LitStr>,
    pub version: Option<LitInt>,
    pub converter: Option<Path>,
    pub no_factory: bool,
    pub polymorphic: Vec<Type>,
    pub auto_register: Option<Span>,
}

impl TypeAttributes {
    pub fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident(REFLECT_ATTRIBUTE_NAME)) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("uuid") {
                    let lit: LitStr = meta.value()?.parse()?;
                    parsed.uuid = Some(parse_uuid(&lit)?);
                } else if meta.path.is_ident("name") {
                    parsed.name = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("version") {
                    parsed.version = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("converter") {
                    parsed.converter = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("no_factory") {
                    parsed.no_factory = true;
                } else if meta.path.is_ident("polymorphic") {
                    let content;
                    parenthesized!(content in meta.input);
                    let bases = Punctuated::<Type, Token![,]>::parse_terminated(&content)?;
                    parsed.polymorphic.extend(bases);
                } else if meta.path.is_ident("auto_register") {
                    parsed.auto_register = Some(meta.path.span());
                } else {
                    return Err(meta.error("unknown type attribute"));
                }
                Ok(())
            })?;
        }
        Ok(parsed)
    }
}

// -----------------------------------------------------------------------------
// Field attributes

#[derive(Default)]
pub(crate) struct FieldAttributes {
    pub skip: bool,
    pub base: bool,
    pub rename: Option<LitStr>,
}

impl FieldAttributes {
    pub fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident(REFLECT_ATTRIBUTE_NAME)) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    parsed.skip = true;
                } else if meta.path.is_ident("base") {
                    parsed.base = true;
                } else if meta.path.is_ident("rename") {
                    parsed.rename = Some(meta.value()?.parse()?);
                } else {
                    return Err(meta.error("unknown field attribute"));
                }
                Ok(())
            })?;
        }
        if parsed.base && parsed.rename.is_some() {
            return Err(syn::Error::new(
                Span::call_site(),
                "base elements are always named `BaseClassN`",
            ));
        }
        Ok(parsed)
    }
}

// -----------------------------------------------------------------------------
// Uuid

/// Parses `"{01234567-89AB-CDEF-0123-456789ABCDEF}"`, braces optional.
pub(crate) fn parse_uuid(lit: &LitStr) -> syn::Result<u128> {
    let text = lit.value();
    let hex: String = text
        .trim_start_matches('{')
        .trim_end_matches('}')
        .chars()
        .filter(|c| *c != '-')
        .collect();
    if hex.len() != 32 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(syn::Error::new(
            lit.span(),
            "expected a uuid like \"{01234567-89AB-CDEF-0123-456789ABCDEF}\"",
        ));
    }
    u128::from_str_radix(&hex, 16).map_err(|err| syn::Error::new(lit.span(), err))
}

#[cfg(test)]
mod tests {
    use syn::{DeriveInput, parse_quote};

    use super::{FieldAttributes, TypeAttributes, parse_uuid};

    #[test]
    fn uuids_accept_braces_and_hyphens() {
        let braced = parse_uuid(&parse_quote!("{0E26C5B2-94C8-4C3B-A7B1-6A0F2E5C9D11}")).unwrap();
        let bare = parse_uuid(&parse_quote!("0e26c5b294c84c3ba7b16a0f2e5c9d11")).unwrap();
        assert_eq!(braced, 0x0E26_C5B2_94C8_4C3B_A7B1_6A0F_2E5C_9D11);
        assert_eq!(braced, bare);
        assert!(parse_uuid(&parse_quote!("{0E26C5B2}")).is_err());
        assert!(parse_uuid(&parse_quote!("+E26C5B294C84C3BA7B16A0F2E5C9D11")).is_err());
    }

    #[test]
    fn type_attributes_merge_across_lists() {
        let ast: DeriveInput = parse_quote! {
            #[reflect(uuid = "{0E26C5B2-94C8-4C3B-A7B1-6A0F2E5C9D11}", version = 3)]
            #[reflect(no_factory, polymorphic(dyn Shape, dyn Named))]
            struct Thing;
        };
        let attrs = TypeAttributes::parse_attrs(&ast.attrs).unwrap();
        assert!(attrs.uuid.is_some());
        assert_eq!(attrs.version.unwrap().base10_parse::<u32>().unwrap(), 3);
        assert!(attrs.no_factory);
        assert_eq!(attrs.polymorphic.len(), 2);
        assert!(attrs.auto_register.is_none());
    }

    #[test]
    fn unknown_and_conflicting_attributes_fail() {
        let ast: DeriveInput = parse_quote! {
            #[reflect(serializer = "x")]
            struct Thing;
        };
        assert!(TypeAttributes::parse_attrs(&ast.attrs).is_err());

        let ast: DeriveInput = parse_quote! {
            struct Thing {
                #[reflect(base, rename = "b")]
                base: Base,
            }
        };
        let syn::Data::Struct(data) = &ast.data else {
            unreachable!()
        };
        let field = data.fields.iter().next().unwrap();
        assert!(FieldAttributes::parse_attrs(&field.attrs).is_err());
    }
}
