//! Core layer - the data model the serializer walks.
//!
//! This module provides:
//! - [`Attributes`] - Ordered first-wins attribute lists
//! - [`TypeMeta`] / [`MemberMeta`] - Declarative configuration and its resolution
//! - [`Value`] / [`TypeClass`] - Runtime member values and their storage class
//! - [`ToValue`] / [`Primitive`] / [`Element`] - Conversions from Rust types
//! - [`H5Object`] / [`Member`] - The walkable object trait
//! - [`CompoundTable`] - Row layout of structured arrays

mod attributes;
pub mod meta;
mod value;
mod convert;
mod object;
mod compound;

pub use attributes::Attributes;
pub use meta::{MemberMeta, TypeMeta};
pub use value::{ArrayData, CompoundArray, ScalarValue, TypeClass, Value};
pub use convert::{primitive_array, Element, IntoValue, Primitive, ToValue};
pub use object::{properties_with_inherited, H5Object, Member};
pub use compound::{CompoundField, CompoundTable, CompoundWriter, FieldValue};
