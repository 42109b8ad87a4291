//! The object trait walked by the serializer.

use std::any::Any;
use std::fmt;

use super::{MemberMeta, ToValue, TypeMeta, Value};

/// A structured value the serializer can walk.
///
/// Normally implemented with `#[derive(H5Object)]`. A hand-written
/// implementation lists its members in declaration order and returns
/// metadata whose `fields()` / `properties()` line up with them.
///
/// Fields are the data declared directly on the type. Properties are
/// computed accessors; properties of the [`base`](Self::base) object are
/// inherited, its fields are not.
pub trait H5Object: Any {
    /// Declared configuration of the concrete type.
    fn type_meta(&self) -> &TypeMeta;

    /// Fields declared directly on this type.
    fn fields(&self) -> Vec<Member<'_>>;

    /// Properties declared on this type.
    fn properties(&self) -> Vec<Member<'_>> {
        Vec::new()
    }

    /// The object this one extends, if any.
    fn base(&self) -> Option<&dyn H5Object> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

enum Source<'a> {
    Field(&'a dyn ToValue),
    Computed(Box<dyn Fn() -> Value<'a> + 'a>),
}

/// One declared member of an object, read lazily.
pub struct Member<'a> {
    meta: &'a MemberMeta,
    source: Source<'a>,
}

impl<'a> Member<'a> {
    /// A stored field.
    pub fn field(meta: &'a MemberMeta, value: &'a dyn ToValue) -> Self {
        Self {
            meta,
            source: Source::Field(value),
        }
    }

    /// A computed property; the getter runs only if the member is visited.
    pub fn property<F>(meta: &'a MemberMeta, getter: F) -> Self
    where
        F: Fn() -> Value<'a> + 'a,
    {
        Self {
            meta,
            source: Source::Computed(Box::new(getter)),
        }
    }

    pub fn meta(&self) -> &'a MemberMeta {
        self.meta
    }

    /// Read the member's current value.
    pub fn value(&self) -> Value<'a> {
        match &self.source {
            Source::Field(v) => ToValue::to_value(*v),
            Source::Computed(get) => get(),
        }
    }
}

impl fmt::Debug for Member<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("ident", &self.meta.ident())
            .field(
                "kind",
                &match self.source {
                    Source::Field(_) => "field",
                    Source::Computed(_) => "property",
                },
            )
            .finish()
    }
}

/// Properties of `object` followed by those inherited through its base chain.
pub fn properties_with_inherited(object: &dyn H5Object) -> Vec<Member<'_>> {
    let mut members = object.properties();
    let mut base = object.base();
    while let Some(b) = base {
        members.extend(b.properties());
        base = b.base();
    }
    members
}
