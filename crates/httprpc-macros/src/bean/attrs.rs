//! Attribute parsing for the Bean derive macro.
//!
//! Field attributes: `#[bean(skip)]`, `#[bean(rename = "...")]`.
//! Container attributes: `#[bean(property(name = "...", with = "..."))]`.

use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
    Attribute, Error, Expr, ExprLit, Lit, LitStr, Meta, Path, Result, Token,
};

/// Field-level attributes from `#[bean(...)]`.
#[derive(Debug, Clone, Default)]
pub struct FieldAttr {
    pub skip: bool,
    pub rename: Option<String>,
}

impl Parse for FieldAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();
        let content: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in content {
            match &meta {
                Meta::Path(p) if p.is_ident("skip") => attr.skip = true,
                Meta::NameValue(nv) if nv.path.is_ident("rename") => {
                    attr.rename = Some(string_value(&nv.value, "rename")?.value());
                }
                _ => {
                    return Err(Error::new(
                        meta.span(),
                        "unknown bean attribute. Expected: skip or rename = \"...\"",
                    ))
                }
            }
        }

        Ok(attr)
    }
}

/// A computed property declared on the container.
#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub with: Path,
}

/// Container-level attributes from `#[bean(...)]`.
#[derive(Debug, Clone, Default)]
pub struct ContainerAttr {
    pub properties: Vec<Property>,
}

impl Parse for ContainerAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = ContainerAttr::default();
        let content: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in content {
            match &meta {
                Meta::List(list) if list.path.is_ident("property") => {
                    let nested =
                        list.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
                    attr.properties.push(parse_property(&meta, nested)?);
                }
                _ => {
                    return Err(Error::new(
                        meta.span(),
                        "unknown bean attribute. Expected: property(name = \"...\", with = \"...\")",
                    ))
                }
            }
        }

        Ok(attr)
    }
}

fn parse_property(meta: &Meta, nested: Punctuated<Meta, Token![,]>) -> Result<Property> {
    let mut name = None;
    let mut with = None;

    for item in nested {
        match &item {
            Meta::NameValue(nv) if nv.path.is_ident("name") => {
                name = Some(string_value(&nv.value, "name")?.value());
            }
            Meta::NameValue(nv) if nv.path.is_ident("with") => {
                with = Some(string_value(&nv.value, "with")?.parse::<Path>()?);
            }
            _ => {
                return Err(Error::new(
                    item.span(),
                    "unknown property option. Expected: name = \"...\" or with = \"...\"",
                ))
            }
        }
    }

    match (name, with) {
        (Some(name), Some(with)) => Ok(Property { name, with }),
        _ => Err(Error::new(
            meta.span(),
            "property requires both name = \"...\" and with = \"...\"",
        )),
    }
}

fn string_value<'a>(expr: &'a Expr, option: &str) -> Result<&'a LitStr> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s),
        other => Err(Error::new(
            other.span(),
            format!("{} must be a string literal", option),
        )),
    }
}

/// Extract `#[bean(...)]` attributes from a field's attributes.
pub fn parse_field_attrs(attrs: &[Attribute]) -> Result<FieldAttr> {
    for attr in attrs {
        if attr.path().is_ident("bean") {
            return attr.parse_args::<FieldAttr>();
        }
    }
    Ok(FieldAttr::default())
}

/// Extract and merge every `#[bean(...)]` attribute on the container.
pub fn parse_container_attrs(attrs: &[Attribute]) -> Result<ContainerAttr> {
    let mut merged = ContainerAttr::default();
    for attr in attrs {
        if attr.path().is_ident("bean") {
            let parsed = attr.parse_args::<ContainerAttr>()?;
            merged.properties.extend(parsed.properties);
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip() {
        let attr = syn::parse_str::<FieldAttr>("skip").unwrap();
        assert!(attr.skip);
        assert_eq!(attr.rename, None);
    }

    #[test]
    fn test_rename() {
        let attr = syn::parse_str::<FieldAttr>(r#"rename = "id""#).unwrap();
        assert!(!attr.skip);
        assert_eq!(attr.rename, Some("id".to_string()));
    }

    #[test]
    fn test_unknown_field_attribute() {
        let result = syn::parse_str::<FieldAttr>("flatten");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("unknown bean attribute"));
    }

    #[test]
    fn test_property() {
        let attr = syn::parse_str::<ContainerAttr>(
            r#"property(name = "fullName", with = "Person::full_name")"#,
        )
        .unwrap();
        assert_eq!(attr.properties.len(), 1);
        assert_eq!(attr.properties[0].name, "fullName");
        assert!(attr.properties[0].with.segments.len() == 2);
    }

    #[test]
    fn test_property_requires_with() {
        let result = syn::parse_str::<ContainerAttr>(r#"property(name = "x")"#);
        assert!(result.is_err());
    }
}
