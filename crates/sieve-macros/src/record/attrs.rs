//! Attribute parsing for the Record derive macro.
//!
//! Parses the `#[record(...)]` attributes on the struct and its fields.

use proc_macro2::Span;
use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
    Attribute, Error, Ident, Lit, Meta, Result, Token,
};

/// Field-level attributes from `#[record(...)]`.
#[derive(Debug, Clone)]
pub struct FieldAttr {
    /// Exclude this field from the record.
    pub skip: bool,
    /// Custom attribute key (default: field name).
    pub rename: Option<String>,
    /// Expose this field as a sub-collection instead of an attribute.
    pub relation: bool,
    /// The span for error reporting.
    pub span: Span,
}

impl Default for FieldAttr {
    fn default() -> Self {
        FieldAttr {
            skip: false,
            rename: None,
            relation: false,
            span: Span::call_site(),
        }
    }
}

impl Parse for FieldAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        let content: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in content {
            match &meta {
                Meta::Path(p) if p.is_ident("skip") => {
                    attr.skip = true;
                    attr.span = p.span();
                }
                Meta::Path(p) if p.is_ident("relation") => {
                    attr.relation = true;
                    attr.span = p.span();
                }
                Meta::NameValue(nv) if nv.path.is_ident("rename") => {
                    if let syn::Expr::Lit(syn::ExprLit {
                        lit: Lit::Str(s), ..
                    }) = &nv.value
                    {
                        attr.rename = Some(s.value());
                    } else {
                        return Err(Error::new(
                            nv.value.span(),
                            "rename must be a string literal",
                        ));
                    }
                }
                _ => {
                    return Err(Error::new(
                        meta.span(),
                        "unknown record attribute. Expected: skip, relation, or rename = \"...\"",
                    ));
                }
            }
        }

        if attr.skip && attr.relation {
            return Err(Error::new(attr.span, "a field cannot be both skip and relation"));
        }

        Ok(attr)
    }
}

/// Struct-level attributes from `#[record(...)]`.
#[derive(Debug, Clone, Default)]
pub struct ContainerAttr {
    /// Zero-argument methods exposed as computed attributes.
    pub computed: Vec<Ident>,
}

impl Parse for ContainerAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = ContainerAttr::default();

        let content: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in content {
            match &meta {
                Meta::List(list) if list.path.is_ident("computed") => {
                    let names = list.parse_args_with(Punctuated::<Ident, Token![,]>::parse_terminated)?;
                    attr.computed.extend(names);
                }
                _ => {
                    return Err(Error::new(
                        meta.span(),
                        "unknown record attribute. Expected: computed(method, ...)",
                    ));
                }
            }
        }

        Ok(attr)
    }
}

/// Extract `#[record(...)]` attributes from a field's attributes.
pub fn parse_field_attrs(attrs: &[Attribute]) -> Result<FieldAttr> {
    for attr in attrs {
        if attr.path().is_ident("record") {
            return attr.parse_args::<FieldAttr>();
        }
    }
    Ok(FieldAttr::default())
}

/// Extract `#[record(...)]` attributes from the struct's attributes.
///
/// Several `#[record(...)]` attributes accumulate.
pub fn parse_container_attrs(attrs: &[Attribute]) -> Result<ContainerAttr> {
    let mut container = ContainerAttr::default();
    for attr in attrs {
        if attr.path().is_ident("record") {
            let parsed = attr.parse_args::<ContainerAttr>()?;
            container.computed.extend(parsed.computed);
        }
    }
    Ok(container)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_field(tokens: &str) -> Result<FieldAttr> {
        syn::parse_str::<FieldAttr>(tokens)
    }

    fn parse_container(tokens: &str) -> Result<ContainerAttr> {
        syn::parse_str::<ContainerAttr>(tokens)
    }

    #[test]
    fn test_field_default() {
        let attr = parse_field("").unwrap();
        assert!(!attr.skip);
        assert!(!attr.relation);
        assert_eq!(attr.rename, None);
    }

    #[test]
    fn test_field_skip() {
        let attr = parse_field("skip").unwrap();
        assert!(attr.skip);
    }

    #[test]
    fn test_field_relation_with_rename() {
        let attr = parse_field(r#"relation, rename = "tags""#).unwrap();
        assert!(attr.relation);
        assert_eq!(attr.rename, Some("tags".to_string()));
    }

    #[test]
    fn test_field_rename_requires_string() {
        let result = parse_field("rename = 3");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("rename must be a string literal"));
    }

    #[test]
    fn test_field_unknown() {
        let result = parse_field("index");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("unknown record attribute"));
    }

    #[test]
    fn test_field_skip_and_relation_conflict() {
        assert!(parse_field("skip, relation").is_err());
    }

    #[test]
    fn test_container_computed() {
        let attr = parse_container("computed(popularity, slug)").unwrap();
        let names: Vec<String> = attr.computed.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["popularity", "slug"]);
    }

    #[test]
    fn test_container_unknown() {
        assert!(parse_container("cache").is_err());
    }
}
