//! Declarative per-type and per-member configuration, and its resolution.
//!
//! [`TypeMeta`] and [`MemberMeta`] are plain builder-style structs. The
//! `#[derive(H5Object)]` macro builds one `TypeMeta` per type on first use
//! and caches it in a `OnceLock`, so nothing is re-scanned per call.
//!
//! The free functions at the bottom are the resolver: pure lookups that
//! answer naming, skip and attribute questions for the serializer.

use super::Attributes;

/// Configuration declared on a type.
#[derive(Clone, Debug, Default)]
pub struct TypeMeta {
    type_name: &'static str,
    group_name: Option<String>,
    skip: bool,
    attributes: Attributes,
    fields: Vec<MemberMeta>,
    properties: Vec<MemberMeta>,
}

impl TypeMeta {
    /// Create metadata for a type with no declarations.
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            ..Default::default()
        }
    }

    /// Set the group name used when no explicit name is supplied.
    pub fn with_group_name(mut self, name: impl Into<String>) -> Self {
        self.group_name = Some(name.into());
        self
    }

    /// Mark the whole type as not saved.
    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    /// Declare a single-valued attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name, value);
        self
    }

    /// Declare a multi-valued attribute.
    pub fn with_attributes<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.insert_many(name, values);
        self
    }

    /// Append a field declared directly on this type.
    pub fn with_field(mut self, field: MemberMeta) -> Self {
        self.fields.push(field);
        self
    }

    /// Append a property declared on this type.
    pub fn with_property(mut self, property: MemberMeta) -> Self {
        self.properties.push(property);
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn group_name(&self) -> Option<&str> {
        self.group_name.as_deref()
    }

    pub fn is_skipped(&self) -> bool {
        self.skip
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn fields(&self) -> &[MemberMeta] {
        &self.fields
    }

    pub fn properties(&self) -> &[MemberMeta] {
        &self.properties
    }
}

/// Configuration declared on a field or property.
#[derive(Clone, Debug, Default)]
pub struct MemberMeta {
    ident: &'static str,
    entry_name: Option<String>,
    skip: bool,
    as_attribute: bool,
    attributes: Attributes,
}

impl MemberMeta {
    /// Create metadata for a member with its declared identifier.
    pub fn new(ident: &'static str) -> Self {
        Self {
            ident,
            ..Default::default()
        }
    }

    /// Override the entry name written to the container.
    pub fn with_entry_name(mut self, name: impl Into<String>) -> Self {
        self.entry_name = Some(name.into());
        self
    }

    /// Mark the member as not saved.
    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    /// Write the member's scalar value as an attribute of the enclosing group.
    pub fn as_group_attribute(mut self) -> Self {
        self.as_attribute = true;
        self
    }

    /// Declare a single-valued attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name, value);
        self
    }

    /// Declare a multi-valued attribute.
    pub fn with_attributes<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.insert_many(name, values);
        self
    }

    pub fn ident(&self) -> &'static str {
        self.ident
    }

    pub fn entry_name(&self) -> Option<&str> {
        self.entry_name.as_deref()
    }

    pub fn is_skipped(&self) -> bool {
        self.skip
    }

    pub fn is_group_attribute(&self) -> bool {
        self.as_attribute
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Group name for a serialize call: a non-blank explicit name, else the
/// type's group name if non-blank, else none.
pub fn resolve_group_name<'a>(explicit: Option<&'a str>, meta: &'a TypeMeta) -> Option<&'a str> {
    explicit
        .filter(|name| !name.trim().is_empty())
        .or_else(|| meta.group_name().filter(|name| !name.trim().is_empty()))
}

/// Entry name of a member: a non-blank override if declared, else the
/// identifier.
pub fn resolve_entry_name(member: &MemberMeta) -> &str {
    member
        .entry_name()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(member.ident())
}

/// A member is omitted if it is skip-marked or its runtime type is.
pub fn is_skipped(member: &MemberMeta, runtime_type: Option<&TypeMeta>) -> bool {
    member.is_skipped() || runtime_type.is_some_and(TypeMeta::is_skipped)
}

/// Attributes bound to a member.
///
/// The type-level declarations of the member's runtime type go in first;
/// member-level declarations only fill names that are still free.
pub fn resolve_member_attributes(member: &MemberMeta, runtime_type: Option<&TypeMeta>) -> Attributes {
    let mut attrs = runtime_type
        .map(|meta| meta.attributes().clone())
        .unwrap_or_default();
    attrs.merge_first_wins(member.attributes());
    attrs
}
