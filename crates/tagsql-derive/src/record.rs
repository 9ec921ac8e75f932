//! Record derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use std::collections::HashSet;
use syn::parse::{Parse, ParseStream};
use syn::{Data, DeriveInput, Fields, Ident, LitStr, Result, Token, Type};

struct BuilderAttr {
    key: LitStr,
    omit: bool,
}

impl Parse for BuilderAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: LitStr = input.parse()?;
        let mut omit = false;
        while input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
            if input.is_empty() {
                break;
            }
            let flag: Ident = input.parse()?;
            if flag == "omit" {
                omit = true;
            } else {
                return Err(syn::Error::new_spanned(
                    flag,
                    "unknown builder option, expected `omit`",
                ));
            }
        }
        Ok(Self { key, omit })
    }
}

struct BoundField<'a> {
    ident: &'a Ident,
    ty: &'a Type,
    key: String,
    omit: bool,
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    let mut bound = Vec::new();
    let mut seen = HashSet::new();
    for field in fields {
        let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("builder")) else {
            continue;
        };
        let parsed: BuilderAttr = attr.parse_args()?;
        let key = parsed.key.value();
        if key.is_empty() {
            return Err(syn::Error::new_spanned(&parsed.key, "builder key must not be empty"));
        }
        if !seen.insert(key.clone()) {
            return Err(syn::Error::new_spanned(
                &parsed.key,
                format!("duplicate builder key `{key}`"),
            ));
        }
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        bound.push(BoundField {
            ident,
            ty: &field.ty,
            key,
            omit: parsed.omit,
        });
    }

    let bindings = bound.iter().map(|f| {
        let field_name = f.ident.to_string();
        let key = &f.key;
        let kind = field_kind(f.ty);
        if f.omit {
            quote! { tagsql::FieldBinding::new(#field_name, #key, #kind).omit() }
        } else {
            quote! { tagsql::FieldBinding::new(#field_name, #key, #kind) }
        }
    });

    let assign_arms = bound.iter().map(|f| {
        let ident = f.ident;
        let ty = f.ty;
        let key = &f.key;
        quote! {
            #key => match <#ty as tagsql::FromValue>::from_value(value) {
                ::core::option::Option::Some(v) => {
                    self.#ident = v;
                    true
                }
                ::core::option::Option::None => false,
            }
        }
    });

    let value_arms = bound.iter().map(|f| {
        let ident = f.ident;
        let key = &f.key;
        quote! {
            #key => ::core::option::Option::Some(tagsql::ToValue::to_value(&self.#ident))
        }
    });

    Ok(quote! {
        impl #impl_generics tagsql::Record for #name #ty_generics #where_clause {
            const BINDINGS: &'static [tagsql::FieldBinding] = &[
                #(#bindings),*
            ];

            #[allow(unused_variables)]
            fn assign(&mut self, key: &str, value: tagsql::Value) -> bool {
                match key {
                    #(#assign_arms,)*
                    _ => false,
                }
            }

            fn value_of(&self, key: &str) -> ::core::option::Option<tagsql::Value> {
                match key {
                    #(#value_arms,)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    })
}

/// Read-coercion kind for a field type, by its last path segment.
fn field_kind(ty: &Type) -> TokenStream {
    let last = match ty {
        Type::Path(path) if path.qself.is_none() => {
            path.path.segments.last().map(|s| s.ident.to_string())
        }
        _ => None,
    };
    match last.as_deref() {
        Some("i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32") => {
            quote!(tagsql::FieldKind::Int)
        }
        Some("String") => quote!(tagsql::FieldKind::Text),
        Some("f32" | "f64") => quote!(tagsql::FieldKind::Float),
        _ => quote!(tagsql::FieldKind::Other),
    }
}
