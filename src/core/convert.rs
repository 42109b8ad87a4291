//! Conversions from Rust values to [`Value`].
//!
//! Classification happens here, once per member read:
//! - [`Primitive`] types become [`Value::Scalar`];
//! - sequences of an [`Element`] become [`Value::Array`] for primitive
//!   elements and [`Value::CompoundArray`] for structured ones;
//! - `#[derive(H5Object)]` types become [`Value::Object`];
//! - `None` / unset cells become [`Value::Null`].

use std::cell::OnceCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use half::f16;

use super::{ArrayData, ScalarValue, Value};
use crate::util::{DataType, Dimensions};

/// Read a member as a [`Value`].
pub trait ToValue {
    fn to_value(&self) -> Value<'_>;
}

/// By-value conversion, used for computed properties.
///
/// Owned primitives convert directly; anything else can be returned by
/// reference from the getter.
pub trait IntoValue<'a> {
    fn into_value(self) -> Value<'a>;
}

/// Scalar primitive types.
pub trait Primitive: 'static {
    /// Element type tag.
    const DATA_TYPE: DataType;

    fn scalar(&self) -> ScalarValue;
}

/// Element of an array member.
///
/// Implemented for every [`Primitive`], for fixed-size rows of primitives
/// (giving 2-D arrays) and by `#[derive(H5Object)]` for structured types.
pub trait Element: Sized + 'static {
    fn array_value(items: &[Self]) -> Value<'_>;
}

/// Pack a slice of primitives into a 1-D array.
pub fn primitive_array<T: Primitive>(items: &[T]) -> ArrayData {
    ArrayData::from_scalars(
        T::DATA_TYPE,
        Dimensions::d1(items.len()),
        items.iter().map(Primitive::scalar),
    )
}

macro_rules! impl_primitive {
    ($($ty:ty => $dt:ident, |$v:ident| $scalar:expr);* $(;)?) => {
        $(
            impl Primitive for $ty {
                const DATA_TYPE: DataType = DataType::$dt;

                #[inline]
                fn scalar(&self) -> ScalarValue {
                    let $v = self;
                    $scalar
                }
            }

            impl ToValue for $ty {
                fn to_value(&self) -> Value<'_> {
                    Value::Scalar(self.scalar())
                }
            }

            impl<'a> IntoValue<'a> for $ty {
                fn into_value(self) -> Value<'a> {
                    Value::Scalar(self.scalar())
                }
            }

            impl Element for $ty {
                fn array_value(items: &[Self]) -> Value<'_> {
                    Value::Array(primitive_array(items))
                }
            }
        )*
    };
}

impl_primitive! {
    bool => BOOL, |v| ScalarValue::Bool(*v);
    i8 => INT8, |v| ScalarValue::Int8(*v);
    u8 => UINT8, |v| ScalarValue::Uint8(*v);
    i16 => INT16, |v| ScalarValue::Int16(*v);
    u16 => UINT16, |v| ScalarValue::Uint16(*v);
    i32 => INT32, |v| ScalarValue::Int32(*v);
    u32 => UINT32, |v| ScalarValue::Uint32(*v);
    i64 => INT64, |v| ScalarValue::Int64(*v);
    u64 => UINT64, |v| ScalarValue::Uint64(*v);
    isize => INT64, |v| ScalarValue::Int64(*v as i64);
    usize => UINT64, |v| ScalarValue::Uint64(*v as u64);
    f16 => FLOAT16, |v| ScalarValue::Float16(*v);
    f32 => FLOAT32, |v| ScalarValue::Float32(*v);
    f64 => FLOAT64, |v| ScalarValue::Float64(*v);
    char => UINT32, |v| ScalarValue::Char(*v);
    String => STRING, |v| ScalarValue::String(v.clone());
    Duration => UINT64, |v| ScalarValue::Duration(*v);
}

impl ToValue for str {
    fn to_value(&self) -> Value<'_> {
        Value::Scalar(ScalarValue::String(self.to_owned()))
    }
}

// === Rows of primitives: 2-D arrays ===

impl<T: Primitive, const M: usize> Element for [T; M] {
    fn array_value(items: &[Self]) -> Value<'_> {
        Value::Array(ArrayData::from_scalars(
            T::DATA_TYPE,
            Dimensions::d2(items.len(), M),
            items.iter().flat_map(|row| row.iter().map(Primitive::scalar)),
        ))
    }
}

// === Sequences ===

impl<T: Element> ToValue for [T] {
    fn to_value(&self) -> Value<'_> {
        T::array_value(self)
    }
}

impl<T: Element, const N: usize> ToValue for [T; N] {
    fn to_value(&self) -> Value<'_> {
        T::array_value(self)
    }
}

impl<T: Element> ToValue for Vec<T> {
    fn to_value(&self) -> Value<'_> {
        T::array_value(self)
    }
}

impl<'a, T: Primitive> IntoValue<'a> for Vec<T> {
    fn into_value(self) -> Value<'a> {
        Value::Array(primitive_array(&self))
    }
}

// === Wrappers ===

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value<'_> {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<'a, T: IntoValue<'a>> IntoValue<'a> for Option<T> {
    fn into_value(self) -> Value<'a> {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

impl<T: ToValue> ToValue for OnceCell<T> {
    fn to_value(&self) -> Value<'_> {
        self.get().map_or(Value::Null, ToValue::to_value)
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value<'_> {
        (**self).to_value()
    }
}

impl<T: ToValue + ?Sized> ToValue for Box<T> {
    fn to_value(&self) -> Value<'_> {
        (**self).to_value()
    }
}

impl<T: ToValue + ?Sized> ToValue for Rc<T> {
    fn to_value(&self) -> Value<'_> {
        (**self).to_value()
    }
}

impl<T: ToValue + ?Sized> ToValue for Arc<T> {
    fn to_value(&self) -> Value<'_> {
        (**self).to_value()
    }
}

impl<'a, T: ToValue + ?Sized> IntoValue<'a> for &'a T {
    fn into_value(self) -> Value<'a> {
        self.to_value()
    }
}

// === ndarray ===

#[cfg(feature = "ndarray")]
impl<S, D> ToValue for ndarray::ArrayBase<S, D>
where
    S: ndarray::Data,
    S::Elem: Primitive,
    D: ndarray::Dimension,
{
    fn to_value(&self) -> Value<'_> {
        Value::Array(ArrayData::from_scalars(
            <S::Elem as Primitive>::DATA_TYPE,
            Dimensions::from_slice(self.shape()),
            self.iter().map(Primitive::scalar),
        ))
    }
}
