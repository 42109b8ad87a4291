//! Plain Old Data types - element storage types of datasets.

use bytemuck::{Pod, Zeroable};
use half::f16;
use std::fmt;

/// Plain Old Data type enum - the element type tag of a dataset.
///
/// Every scalar primitive the serializer understands maps onto exactly one
/// of these. Strings are variable length and are kept out of the byte
/// payloads (see [`crate::core::ArrayData`]).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PlainOldDataType {
    /// Boolean (stored as u8: 0 = false, non-zero = true)
    Boolean = 0,
    /// Unsigned 8-bit integer
    Uint8 = 1,
    /// Signed 8-bit integer
    Int8 = 2,
    /// Unsigned 16-bit integer
    Uint16 = 3,
    /// Signed 16-bit integer
    Int16 = 4,
    /// Unsigned 32-bit integer
    Uint32 = 5,
    /// Signed 32-bit integer
    Int32 = 6,
    /// Unsigned 64-bit integer
    Uint64 = 7,
    /// Signed 64-bit integer
    Int64 = 8,
    /// 16-bit floating point (IEEE 754 half precision)
    Float16 = 9,
    /// 32-bit floating point (IEEE 754 single precision)
    Float32 = 10,
    /// 64-bit floating point (IEEE 754 double precision)
    Float64 = 11,
    /// UTF-8 string
    String = 12,
    /// Unknown/invalid type
    #[default]
    Unknown = 127,
}

impl PlainOldDataType {
    /// Returns the size in bytes of a single element of this type.
    /// Strings have no fixed size and report 0.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Boolean => 1,
            Self::Uint8 => 1,
            Self::Int8 => 1,
            Self::Uint16 => 2,
            Self::Int16 => 2,
            Self::Uint32 => 4,
            Self::Int32 => 4,
            Self::Uint64 => 8,
            Self::Int64 => 8,
            Self::Float16 => 2,
            Self::Float32 => 4,
            Self::Float64 => 8,
            Self::String => 0,
            Self::Unknown => 0,
        }
    }

    /// Returns the name of this type as a string.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "bool_t",
            Self::Uint8 => "uint8_t",
            Self::Int8 => "int8_t",
            Self::Uint16 => "uint16_t",
            Self::Int16 => "int16_t",
            Self::Uint32 => "uint32_t",
            Self::Int32 => "int32_t",
            Self::Uint64 => "uint64_t",
            Self::Int64 => "int64_t",
            Self::Float16 => "float16_t",
            Self::Float32 => "float32_t",
            Self::Float64 => "float64_t",
            Self::String => "string",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Returns true if this is the string type.
    #[inline]
    pub const fn is_string(self) -> bool {
        matches!(self, Self::String)
    }
}

impl fmt::Display for PlainOldDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// === POD Trait for typed read-back of array payloads ===

/// Fixed-size types that can be read back out of a dataset byte payload.
pub trait H5Pod: Pod + Zeroable + Copy + Default {
    /// The corresponding PlainOldDataType enum value.
    const POD_TYPE: PlainOldDataType;

    /// Size of this type in bytes.
    const SIZE: usize = std::mem::size_of::<Self>();
}

macro_rules! impl_h5_pod {
    ($($ty:ty => $pod:ident),* $(,)?) => {
        $(
            impl H5Pod for $ty {
                const POD_TYPE: PlainOldDataType = PlainOldDataType::$pod;
            }
        )*
    };
}

impl_h5_pod! {
    u8 => Uint8,
    i8 => Int8,
    u16 => Uint16,
    i16 => Int16,
    u32 => Uint32,
    i32 => Int32,
    u64 => Uint64,
    i64 => Int64,
    f16 => Float16,
    f32 => Float32,
    f64 => Float64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_sizes() {
        assert_eq!(PlainOldDataType::Boolean.num_bytes(), 1);
        assert_eq!(PlainOldDataType::Int32.num_bytes(), 4);
        assert_eq!(PlainOldDataType::Float16.num_bytes(), 2);
        assert_eq!(PlainOldDataType::Float64.num_bytes(), 8);
        assert_eq!(PlainOldDataType::String.num_bytes(), 0);
    }

    #[test]
    fn test_pod_names() {
        assert_eq!(PlainOldDataType::Boolean.name(), "bool_t");
        assert_eq!(PlainOldDataType::Float32.name(), "float32_t");
        assert_eq!(PlainOldDataType::String.to_string(), "string");
        assert!(PlainOldDataType::String.is_string());
        assert!(!PlainOldDataType::Uint8.is_string());
    }

    #[test]
    fn test_pod_type_tags() {
        assert_eq!(<u16 as H5Pod>::POD_TYPE, PlainOldDataType::Uint16);
        assert_eq!(<f16 as H5Pod>::SIZE, 2);
    }
}
