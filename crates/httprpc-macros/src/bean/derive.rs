//! Implementation of the `#[derive(Bean)]` macro.
//!
//! This macro generates a `Bean` impl registering one getter per field and
//! an `Adapt` impl wrapping the struct in a `BeanAdapter`.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{ext::IdentExt, spanned::Spanned, Data, DeriveInput, Error, Fields, Result};

use super::attrs::{parse_container_attrs, parse_field_attrs};

/// Main implementation of the Bean derive macro.
pub fn bean_derive_impl(input: DeriveInput) -> Result<TokenStream> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            Fields::Unit => return Ok(unit_impl(&input)),
            Fields::Unnamed(_) => {
                return Err(Error::new(
                    input.span(),
                    "Bean can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new(
                input.span(),
                "Bean can only be derived for structs",
            ))
        }
    };

    let container = parse_container_attrs(&input.attrs)?;
    let mut registrations: Vec<TokenStream> = Vec::new();

    for field in fields.iter() {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new(field.span(), "expected named field"))?;

        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }

        let key = attrs
            .rename
            .unwrap_or_else(|| to_lower_camel_case(&field_name.unraw().to_string()));

        registrations.push(quote! {
            accessors.add(#key, |bean| ::httprpc_beans::Adapt::adapt(&bean.#field_name));
        });
    }

    for property in &container.properties {
        let key = &property.name;
        let with = &property.with;
        registrations.push(quote! {
            accessors.add(#key, #with);
        });
    }

    let expanded = quote! {
        impl #impl_generics ::httprpc_beans::Bean for #struct_name #ty_generics #where_clause {
            fn describe(accessors: &mut ::httprpc_beans::Accessors<Self>) {
                #(#registrations)*
            }
        }

        impl #impl_generics ::httprpc_beans::Adapt for #struct_name #ty_generics #where_clause {
            fn adapt(&self) -> ::httprpc_beans::Value<'_> {
                ::httprpc_beans::Value::dictionary(::httprpc_beans::BeanAdapter::new(self))
            }
        }
    };

    Ok(expanded)
}

fn unit_impl(input: &DeriveInput) -> TokenStream {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    quote! {
        impl #impl_generics ::httprpc_beans::Bean for #struct_name #ty_generics #where_clause {
            fn describe(_accessors: &mut ::httprpc_beans::Accessors<Self>) {}
        }

        impl #impl_generics ::httprpc_beans::Adapt for #struct_name #ty_generics #where_clause {
            fn adapt(&self) -> ::httprpc_beans::Value<'_> {
                ::httprpc_beans::Value::dictionary(::httprpc_beans::BeanAdapter::new(self))
            }
        }
    }
}

/// Convert a snake_case field name to lowerCamelCase.
fn to_lower_camel_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut upper_next = false;

    for c in s.trim_start_matches('_').chars() {
        if c == '_' {
            upper_next = !result.is_empty();
        } else if upper_next {
            result.extend(c.to_uppercase());
            upper_next = false;
        } else {
            result.push(c);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_camel_case() {
        assert_eq!(to_lower_camel_case("name"), "name");
        assert_eq!(to_lower_camel_case("first_name"), "firstName");
        assert_eq!(to_lower_camel_case("home_address_line_2"), "homeAddressLine2");
        assert_eq!(to_lower_camel_case("_private"), "private");
        assert_eq!(to_lower_camel_case("already_camelCase"), "alreadyCamelCase");
    }

    #[test]
    fn test_rejects_tuple_struct() {
        let input: DeriveInput = syn::parse_str("struct Pair(u8, u8);").unwrap();
        let err = bean_derive_impl(input).unwrap_err();
        assert!(err.to_string().contains("named fields"));
    }

    #[test]
    fn test_skipped_fields_are_not_registered() {
        let input: DeriveInput = syn::parse_str(
            "struct User { user_name: String, #[bean(skip)] secret: String }",
        )
        .unwrap();
        let tokens = bean_derive_impl(input).unwrap().to_string();
        assert!(tokens.contains("\"userName\""));
        assert!(!tokens.contains("\"secret\""));
    }
}
