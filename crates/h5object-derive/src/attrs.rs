//! Parsing of `#[h5(...)]` attributes.

use syn::meta::ParseNestedMeta;
use syn::punctuated::Punctuated;
use syn::{Attribute, LitStr, Path, Token};

const H5: &str = "h5";

/// `attr(name = "..", value = "..")` or `attrs(name = "..", values = [..])`.
pub(crate) struct AttrDecl {
    pub name: LitStr,
    pub values: Vec<LitStr>,
    pub multi: bool,
}

/// Options shared by fields and properties.
#[derive(Default)]
pub(crate) struct MemberOptions {
    pub rename: Option<LitStr>,
    pub skip: bool,
    pub as_attribute: bool,
    pub attrs: Vec<AttrDecl>,
}

/// A computed member declared at type level.
pub(crate) struct PropertyDecl {
    pub name: LitStr,
    pub getter: Path,
    pub options: MemberOptions,
}

#[derive(Default)]
pub(crate) struct TypeOptions {
    pub group: Option<LitStr>,
    pub skip: bool,
    pub attrs: Vec<AttrDecl>,
    pub properties: Vec<PropertyDecl>,
}

#[derive(Default)]
pub(crate) struct FieldOptions {
    pub member: MemberOptions,
    pub base: bool,
}

fn parse_attr(meta: &ParseNestedMeta, multi: bool) -> syn::Result<AttrDecl> {
    let mut name = None;
    let mut values = Vec::new();
    let mut has_values = false;

    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("name") {
            if name.is_some() {
                return Err(inner.error("duplicate `name`"));
            }
            name = Some(inner.value()?.parse::<LitStr>()?);
        } else if !multi && inner.path.is_ident("value") {
            if has_values {
                return Err(inner.error("duplicate `value`; use `attrs(values = [..])` for several"));
            }
            values.push(inner.value()?.parse::<LitStr>()?);
            has_values = true;
        } else if multi && inner.path.is_ident("values") {
            if has_values {
                return Err(inner.error("duplicate `values`"));
            }
            let input = inner.value()?;
            let content;
            syn::bracketed!(content in input);
            values.extend(Punctuated::<LitStr, Token![,]>::parse_terminated(&content)?);
            has_values = true;
        } else {
            let expected = if multi { "`name` or `values`" } else { "`name` or `value`" };
            return Err(inner.error(format!("expected {expected}")));
        }
        Ok(())
    })?;

    let name = name.ok_or_else(|| meta.error("missing `name`"))?;
    if name.value().trim().is_empty() {
        return Err(syn::Error::new(name.span(), "attribute name must not be empty"));
    }
    if !has_values {
        return Err(meta.error(if multi { "missing `values`" } else { "missing `value`" }));
    }
    Ok(AttrDecl { name, values, multi })
}

/// A non-blank entry name.
fn parse_name(meta: &ParseNestedMeta) -> syn::Result<LitStr> {
    let name: LitStr = meta.value()?.parse()?;
    if name.value().trim().is_empty() {
        return Err(syn::Error::new(name.span(), "name must not be empty"));
    }
    Ok(name)
}

/// Handle one of the options valid on any member. Returns false if the key
/// is not a member option.
fn parse_member_option(opts: &mut MemberOptions, meta: &ParseNestedMeta) -> syn::Result<bool> {
    if meta.path.is_ident("name") {
        if opts.rename.is_some() {
            return Err(meta.error("duplicate `name`"));
        }
        opts.rename = Some(parse_name(meta)?);
    } else if meta.path.is_ident("skip") {
        opts.skip = true;
    } else if meta.path.is_ident("as_attribute") {
        opts.as_attribute = true;
    } else if meta.path.is_ident("attr") {
        opts.attrs.push(parse_attr(meta, false)?);
    } else if meta.path.is_ident("attrs") {
        opts.attrs.push(parse_attr(meta, true)?);
    } else {
        return Ok(false);
    }
    Ok(true)
}

fn parse_property(meta: &ParseNestedMeta) -> syn::Result<PropertyDecl> {
    let mut name: Option<LitStr> = None;
    let mut getter: Option<Path> = None;
    let mut options = MemberOptions::default();

    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("name") {
            name = Some(parse_name(&inner)?);
            Ok(())
        } else if inner.path.is_ident("get") {
            let lit: LitStr = inner.value()?.parse()?;
            getter = Some(lit.parse()?);
            Ok(())
        } else if parse_member_option(&mut options, &inner)? {
            Ok(())
        } else {
            Err(inner.error("unsupported property option"))
        }
    })?;

    let name = name.ok_or_else(|| meta.error("property needs a `name`"))?;
    let getter = match getter {
        Some(path) => path,
        None => syn::parse_str(&format!("Self::{}", name.value()))
            .map_err(|_| syn::Error::new(name.span(), "name is not an identifier; add `get = \"...\"`"))?,
    };
    Ok(PropertyDecl { name, getter, options })
}

impl TypeOptions {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut opts = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident(H5)) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("group") {
                    if opts.group.is_some() {
                        return Err(meta.error("duplicate `group`"));
                    }
                    opts.group = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("skip") {
                    opts.skip = true;
                } else if meta.path.is_ident("attr") {
                    opts.attrs.push(parse_attr(&meta, false)?);
                } else if meta.path.is_ident("attrs") {
                    opts.attrs.push(parse_attr(&meta, true)?);
                } else if meta.path.is_ident("property") {
                    opts.properties.push(parse_property(&meta)?);
                } else {
                    return Err(meta.error("unsupported type-level h5 option"));
                }
                Ok(())
            })?;
        }
        Ok(opts)
    }
}

impl FieldOptions {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut opts = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident(H5)) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("base") {
                    opts.base = true;
                    Ok(())
                } else if parse_member_option(&mut opts.member, &meta)? {
                    Ok(())
                } else {
                    Err(meta.error("unsupported field-level h5 option"))
                }
            })?;
        }
        Ok(opts)
    }
}
