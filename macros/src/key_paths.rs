//! `#[derive(KeyPaths)]`: one `ufos::KeyPath` associated const per named field.

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Error, Field, Fields, Ident, LitStr, Result};

// ---------------------------------------------------------------------------
// Field options
// ---------------------------------------------------------------------------

/// Options parsed from `#[key_path(...)]` on a field.
#[derive(Debug, Default)]
pub(crate) struct FieldOptions {
    pub skip: bool,
    pub name: Option<Ident>,
}

/// Parse `#[key_path(skip)]` and `#[key_path(name = "CONST")]`.
pub(crate) fn field_options(field: &Field) -> Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("key_path") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                options.skip = true;
                Ok(())
            } else if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                options.name = Some(syn::parse_str::<Ident>(&lit.value()).map_err(|_| {
                    Error::new(lit.span(), "key_path name must be a valid identifier")
                })?);
                Ok(())
            } else {
                Err(meta.error("unsupported key_path option; expected `skip` or `name`"))
            }
        })?;
    }
    Ok(options)
}

/// `value1` becomes `VALUE1`, `r#type` becomes `TYPE`.
pub(crate) fn const_name(field: &Ident) -> Ident {
    Ident::new(&field.unraw().to_string().to_uppercase(), Span::call_site())
}

// ---------------------------------------------------------------------------
// Code generation
// ---------------------------------------------------------------------------

pub(crate) fn derive_impl(input: TokenStream) -> Result<TokenStream> {
    let input: DeriveInput = syn::parse2(input)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(Error::new_spanned(
                    &input.ident,
                    "KeyPaths requires a struct with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new_spanned(
                &input.ident,
                "KeyPaths can only be derived for structs",
            ))
        }
    };

    let mut consts = Vec::new();
    for field in fields {
        let options = field_options(field)?;
        if options.skip {
            continue;
        }
        let Some(ident) = &field.ident else {
            continue;
        };
        let name = options.name.unwrap_or_else(|| const_name(ident));
        let ty = &field.ty;
        let vis = &field.vis;
        let doc = format!("Key path to the `{}` field.", ident.unraw());
        consts.push(quote! {
            #[doc = #doc]
            #vis const #name: ::ufos::KeyPath<Self, #ty> = ::ufos::KeyPath::new(|root| &root.#ident);
        });
    }

    let target = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #target #ty_generics #where_clause {
            #(#consts)*
        }
    })
}
