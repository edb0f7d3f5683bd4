//! Implementation of the `#[derive(Record)]` macro.
//!
//! Generates a `sieve::Record` implementation and attribute key constants.

use std::collections::HashSet;

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{spanned::Spanned, Data, DeriveInput, Error, Fields, Result};

use super::attrs::{parse_container_attrs, parse_field_attrs};

/// Main implementation of the Record derive macro.
pub fn record_derive_impl(input: DeriveInput) -> Result<TokenStream> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(Error::new(
                    input.span(),
                    "Record can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new(
                input.span(),
                "Record can only be derived for structs",
            ))
        }
    };

    let container = parse_container_attrs(&input.attrs)?;

    let mut get_arms: Vec<TokenStream> = Vec::new();
    let mut relation_arms: Vec<TokenStream> = Vec::new();
    let mut computed_arms: Vec<TokenStream> = Vec::new();
    let mut constants: Vec<TokenStream> = Vec::new();
    let mut keys: HashSet<String> = HashSet::new();

    for field in fields.iter() {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new(field.span(), "expected named field"))?;

        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }

        let key = attrs.rename.unwrap_or_else(|| field_name.to_string());
        if !keys.insert(key.clone()) {
            return Err(Error::new(
                field.span(),
                format!("duplicate record attribute key '{}'", key),
            ));
        }

        let const_name = format_ident!("{}", to_screaming_snake_case(&key));
        constants.push(quote! {
            /// Attribute key constant.
            pub const #const_name: &'static str = #key;
        });

        if attrs.relation {
            relation_arms.push(quote! {
                #key => ::std::option::Option::Some(
                    ::std::iter::IntoIterator::into_iter(&self.#field_name)
                        .map(|member| member as &dyn ::sieve::Record)
                        .collect(),
                ),
            });
        } else {
            get_arms.push(quote! {
                #key => ::std::option::Option::Some(::std::borrow::Cow::Owned(
                    ::sieve::Value::from(::std::clone::Clone::clone(&self.#field_name)),
                )),
            });
        }
    }

    for method in &container.computed {
        let name = method.to_string();
        computed_arms.push(quote! {
            #name => ::std::option::Option::Some(::sieve::Value::from(self.#method())),
        });
        if keys.insert(name.clone()) {
            let const_name = format_ident!("{}", to_screaming_snake_case(&name));
            constants.push(quote! {
                /// Computed attribute name constant.
                pub const #const_name: &'static str = #name;
            });
        }
    }

    let computed_fn = (!computed_arms.is_empty()).then(|| {
        quote! {
            fn computed(&self, name: &str) -> ::std::option::Option<::sieve::Value> {
                match name {
                    #(#computed_arms)*
                    _ => ::std::option::Option::None,
                }
            }
        }
    });

    let relation_fn = (!relation_arms.is_empty()).then(|| {
        quote! {
            fn relation(&self, key: &str) -> ::std::option::Option<::std::vec::Vec<&dyn ::sieve::Record>> {
                match key {
                    #(#relation_arms)*
                    _ => ::std::option::Option::None,
                }
            }
        }
    });

    let expanded = quote! {
        impl #impl_generics #struct_name #ty_generics #where_clause {
            #(#constants)*
        }

        impl #impl_generics ::sieve::Record for #struct_name #ty_generics #where_clause {
            fn get(&self, key: &str) -> ::std::option::Option<::std::borrow::Cow<'_, ::sieve::Value>> {
                match key {
                    #(#get_arms)*
                    _ => ::std::option::Option::None,
                }
            }

            #computed_fn
            #relation_fn
        }
    };

    Ok(expanded)
}

/// Convert a string to SCREAMING_SNAKE_CASE.
fn to_screaming_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_was_lower = false;

    for c in s.chars() {
        if c.is_uppercase() {
            if prev_was_lower {
                result.push('_');
            }
            result.push(c);
            prev_was_lower = false;
        } else if c == '_' || c == '-' {
            result.push('_');
            prev_was_lower = false;
        } else {
            result.push(c.to_ascii_uppercase());
            prev_was_lower = true;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(src: &str) -> Result<String> {
        let input: DeriveInput = syn::parse_str(src)?;
        record_derive_impl(input).map(|tokens| tokens.to_string())
    }

    #[test]
    fn test_screaming_snake_case() {
        assert_eq!(to_screaming_snake_case("likes"), "LIKES");
        assert_eq!(to_screaming_snake_case("created_at"), "CREATED_AT");
        assert_eq!(to_screaming_snake_case("sortKey"), "SORT_KEY");
        assert_eq!(to_screaming_snake_case("my-field"), "MY_FIELD");
    }

    #[test]
    fn test_expands_fields_relations_and_computed() {
        let out = expand(
            r#"
            #[record(computed(popularity))]
            struct Post {
                title: String,
                #[record(rename = "score")]
                likes: u32,
                #[record(relation)]
                comments: Vec<Comment>,
                #[record(skip)]
                secret: String,
            }
            "#,
        )
        .unwrap();

        assert!(out.contains("const TITLE"));
        assert!(out.contains("const SCORE"));
        assert!(out.contains("const COMMENTS"));
        assert!(out.contains("const POPULARITY"));
        assert!(!out.contains("SECRET"));
        assert!(out.contains("fn computed"));
        assert!(out.contains("fn relation"));
    }

    #[test]
    fn test_omits_unused_methods() {
        let out = expand("struct Tag { name: String }").unwrap();
        assert!(out.contains("fn get"));
        assert!(!out.contains("fn computed"));
        assert!(!out.contains("fn relation"));
    }

    #[test]
    fn test_rejects_non_structs() {
        assert!(expand("enum Status { Open, Closed }").is_err());
        assert!(expand("struct Pair(u32, u32);").is_err());
    }

    #[test]
    fn test_rejects_duplicate_keys() {
        let result = expand(
            r#"
            struct Post {
                title: String,
                #[record(rename = "title")]
                heading: String,
            }
            "#,
        );
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }
}
