//! Runtime values read out of members, and their classification.

use std::any::TypeId;
use std::fmt;
use std::time::Duration;

use half::f16;

use super::{CompoundWriter, H5Object};
use crate::util::{DataType, Dimensions, H5Pod, PlainOldDataType};

/// Storage strategy chosen for a member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeClass {
    /// Numeric, boolean, char, string or an allow-listed built-in (`Duration`).
    ScalarPrimitive,
    /// Homogeneous array of scalar primitives.
    PrimitiveArray,
    /// Homogeneous array of structured elements.
    CompoundArray,
    /// Anything else: becomes a subgroup.
    NestedObject,
}

/// Value of a member at the time it is read.
pub enum Value<'a> {
    /// Absent value; the member is omitted.
    Null,
    Scalar(ScalarValue),
    Array(ArrayData),
    CompoundArray(CompoundArray<'a>),
    Object(&'a dyn H5Object),
}

impl Value<'_> {
    /// Classify the value, `None` for [`Value::Null`].
    pub fn class(&self) -> Option<TypeClass> {
        match self {
            Self::Null => None,
            Self::Scalar(_) => Some(TypeClass::ScalarPrimitive),
            Self::Array(_) => Some(TypeClass::PrimitiveArray),
            Self::CompoundArray(_) => Some(TypeClass::CompoundArray),
            Self::Object(_) => Some(TypeClass::NestedObject),
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Scalar(v) => f.debug_tuple("Scalar").field(v).finish(),
            Self::Array(a) => f.debug_tuple("Array").field(a).finish(),
            Self::CompoundArray(c) => f.debug_tuple("CompoundArray").field(c).finish(),
            Self::Object(o) => f
                .debug_tuple("Object")
                .field(&o.type_meta().type_name())
                .finish(),
        }
    }
}

// ============================================================================
// Scalars
// ============================================================================

/// A single primitive value.
#[derive(Clone, Debug, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Int8(i8),
    Uint8(u8),
    Int16(i16),
    Uint16(u16),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Float16(f16),
    Float32(f32),
    Float64(f64),
    /// Stored as `uint32_t` code point.
    Char(char),
    String(String),
    /// Stored as `uint64_t` nanoseconds, saturating.
    Duration(Duration),
}

impl ScalarValue {
    /// Element type tag this value is stored with.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Bool(_) => DataType::BOOL,
            Self::Int8(_) => DataType::INT8,
            Self::Uint8(_) => DataType::UINT8,
            Self::Int16(_) => DataType::INT16,
            Self::Uint16(_) => DataType::UINT16,
            Self::Int32(_) => DataType::INT32,
            Self::Uint32(_) | Self::Char(_) => DataType::UINT32,
            Self::Int64(_) => DataType::INT64,
            Self::Uint64(_) | Self::Duration(_) => DataType::UINT64,
            Self::Float16(_) => DataType::FLOAT16,
            Self::Float32(_) => DataType::FLOAT32,
            Self::Float64(_) => DataType::FLOAT64,
            Self::String(_) => DataType::STRING,
        }
    }

    /// Append the fixed-size encoding of this value. Strings append nothing.
    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::Bool(v) => out.push(*v as u8),
            Self::Int8(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            Self::Uint8(v) => out.push(*v),
            Self::Int16(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            Self::Uint16(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            Self::Int32(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            Self::Uint32(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            Self::Int64(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            Self::Uint64(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            Self::Float16(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            Self::Float32(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            Self::Float64(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            Self::Char(c) => out.extend_from_slice(bytemuck::bytes_of(&(*c as u32))),
            Self::Duration(d) => {
                let nanos = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
                out.extend_from_slice(bytemuck::bytes_of(&nanos));
            }
            Self::String(_) => {}
        }
    }

    /// Decode one element of `pod` from the start of `bytes`.
    fn decode(pod: PlainOldDataType, bytes: &[u8]) -> Option<Self> {
        let bytes = bytes.get(..pod.num_bytes())?;
        Some(match pod {
            PlainOldDataType::Boolean => Self::Bool(bytes[0] != 0),
            PlainOldDataType::Int8 => Self::Int8(bytemuck::pod_read_unaligned(bytes)),
            PlainOldDataType::Uint8 => Self::Uint8(bytes[0]),
            PlainOldDataType::Int16 => Self::Int16(bytemuck::pod_read_unaligned(bytes)),
            PlainOldDataType::Uint16 => Self::Uint16(bytemuck::pod_read_unaligned(bytes)),
            PlainOldDataType::Int32 => Self::Int32(bytemuck::pod_read_unaligned(bytes)),
            PlainOldDataType::Uint32 => Self::Uint32(bytemuck::pod_read_unaligned(bytes)),
            PlainOldDataType::Int64 => Self::Int64(bytemuck::pod_read_unaligned(bytes)),
            PlainOldDataType::Uint64 => Self::Uint64(bytemuck::pod_read_unaligned(bytes)),
            PlainOldDataType::Float16 => Self::Float16(bytemuck::pod_read_unaligned(bytes)),
            PlainOldDataType::Float32 => Self::Float32(bytemuck::pod_read_unaligned(bytes)),
            PlainOldDataType::Float64 => Self::Float64(bytemuck::pod_read_unaligned(bytes)),
            PlainOldDataType::String | PlainOldDataType::Unknown => return None,
        })
    }

    /// Numeric view as `f64`, None for strings.
    pub fn as_f64(&self) -> Option<f64> {
        Some(match self {
            Self::Bool(v) => *v as u8 as f64,
            Self::Int8(v) => *v as f64,
            Self::Uint8(v) => *v as f64,
            Self::Int16(v) => *v as f64,
            Self::Uint16(v) => *v as f64,
            Self::Int32(v) => *v as f64,
            Self::Uint32(v) => *v as f64,
            Self::Int64(v) => *v as f64,
            Self::Uint64(v) => *v as f64,
            Self::Float16(v) => v.to_f64(),
            Self::Float32(v) => *v as f64,
            Self::Float64(v) => *v,
            Self::Char(c) => *c as u32 as f64,
            Self::Duration(d) => d.as_secs_f64(),
            Self::String(_) => return None,
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int8(v) => write!(f, "{v}"),
            Self::Uint8(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::Uint16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Uint32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Uint64(v) => write!(f, "{v}"),
            Self::Float16(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
            Self::Duration(d) => write!(f, "{}", d.as_nanos()),
        }
    }
}

// ============================================================================
// Primitive arrays
// ============================================================================

#[derive(Clone, PartialEq)]
enum Payload {
    Bytes(Vec<u8>),
    Strings(Vec<String>),
}

/// A homogeneous, possibly multi-dimensional array of primitives.
///
/// Fixed-size elements are packed into one byte buffer in row-major order;
/// strings are kept as a list.
#[derive(Clone, PartialEq)]
pub struct ArrayData {
    data_type: DataType,
    dims: Dimensions,
    payload: Payload,
}

impl ArrayData {
    /// Build from a flat row-major sequence of scalars.
    ///
    /// Every scalar must have `data_type`'s POD; values of another type are
    /// the caller's bug and are packed as-is.
    pub fn from_scalars<I>(data_type: DataType, dims: Dimensions, values: I) -> Self
    where
        I: IntoIterator<Item = ScalarValue>,
    {
        let payload = if data_type.pod.is_string() {
            Payload::Strings(
                values
                    .into_iter()
                    .map(|v| match v {
                        ScalarValue::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect(),
            )
        } else {
            let mut bytes = Vec::with_capacity(dims.num_points() * data_type.num_bytes());
            for v in values {
                v.encode_into(&mut bytes);
            }
            Payload::Bytes(bytes)
        };
        Self {
            data_type,
            dims,
            payload,
        }
    }

    /// Element type tag.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Shape of the array.
    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.dims.num_points()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw packed bytes, None for string arrays.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Bytes(b) => Some(b),
            Payload::Strings(_) => None,
        }
    }

    /// String elements, None for fixed-size arrays.
    pub fn strings(&self) -> Option<&[String]> {
        match &self.payload {
            Payload::Strings(s) => Some(s),
            Payload::Bytes(_) => None,
        }
    }

    /// Copy the elements out as `T`, None if `T` does not match the POD.
    pub fn to_vec<T: H5Pod>(&self) -> Option<Vec<T>> {
        if T::POD_TYPE != self.data_type.pod {
            return None;
        }
        self.as_bytes().map(bytemuck::pod_collect_to_vec::<u8, T>)
    }

    /// Decode the element at a flat row-major index.
    pub fn get(&self, index: usize) -> Option<ScalarValue> {
        match &self.payload {
            Payload::Strings(s) => s.get(index).cloned().map(ScalarValue::String),
            Payload::Bytes(b) => {
                let size = self.data_type.pod.num_bytes();
                let start = index.checked_mul(size)?;
                ScalarValue::decode(self.data_type.pod, b.get(start..)?)
            }
        }
    }
}

impl fmt::Debug for ArrayData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.data_type, self.dims)
    }
}

// ============================================================================
// Compound arrays
// ============================================================================

/// A borrowed array of structured elements, erased to `dyn H5Object`.
///
/// The element `TypeId` selects the compound writer at serialization time.
/// Arrays built by `#[derive(H5Object)]` types also carry the element's own
/// writer, used when no registry has one for the type.
pub struct CompoundArray<'a> {
    element: TypeId,
    type_name: &'static str,
    items: Vec<&'a dyn H5Object>,
    writer: Option<CompoundWriter>,
}

impl<'a> CompoundArray<'a> {
    pub fn new<T: H5Object>(items: &'a [T]) -> Self {
        Self {
            element: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            items: items.iter().map(|item| item as &dyn H5Object).collect(),
            writer: None,
        }
    }

    /// Attach the writer that lays out this element type.
    pub fn with_writer(mut self, writer: CompoundWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Writer carried by the array itself, if any.
    pub fn writer(&self) -> Option<CompoundWriter> {
        self.writer
    }

    pub fn element_type(&self) -> TypeId {
        self.element
    }

    pub fn element_type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn items(&self) -> &[&'a dyn H5Object] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Debug for CompoundArray<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.type_name, self.items.len())
    }
}
