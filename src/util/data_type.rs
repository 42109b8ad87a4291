//! DataType - combines POD type with extent.

use super::PlainOldDataType;
use std::fmt;

/// DataType describes how one element of a dataset is stored.
///
/// It combines a [`PlainOldDataType`] with an extent. Plain datasets always
/// use extent 1; compound columns built from fixed-length primitive arrays
/// carry the array length as their extent.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    /// The base plain old data type
    pub pod: PlainOldDataType,
    /// Number of POD values per element
    pub extent: u32,
}

impl DataType {
    /// Create a new DataType with given POD and extent.
    #[inline]
    pub const fn new(pod: PlainOldDataType, extent: u32) -> Self {
        Self { pod, extent }
    }

    /// Create a scalar DataType (extent = 1).
    #[inline]
    pub const fn scalar(pod: PlainOldDataType) -> Self {
        Self { pod, extent: 1 }
    }

    /// Returns the total size in bytes for one element (0 for strings).
    #[inline]
    pub const fn num_bytes(&self) -> usize {
        self.pod.num_bytes() * self.extent as usize
    }

    /// Returns true if this is a valid (known) type.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        !matches!(self.pod, PlainOldDataType::Unknown) && self.extent > 0
    }

    /// Same POD with a different extent.
    #[inline]
    pub const fn with_extent(self, extent: u32) -> Self {
        Self { pod: self.pod, extent }
    }

    /// Unknown/invalid DataType.
    pub const UNKNOWN: Self = Self::new(PlainOldDataType::Unknown, 0);

    pub const BOOL: Self = Self::scalar(PlainOldDataType::Boolean);
    pub const UINT8: Self = Self::scalar(PlainOldDataType::Uint8);
    pub const INT8: Self = Self::scalar(PlainOldDataType::Int8);
    pub const UINT16: Self = Self::scalar(PlainOldDataType::Uint16);
    pub const INT16: Self = Self::scalar(PlainOldDataType::Int16);
    pub const UINT32: Self = Self::scalar(PlainOldDataType::Uint32);
    pub const INT32: Self = Self::scalar(PlainOldDataType::Int32);
    pub const UINT64: Self = Self::scalar(PlainOldDataType::Uint64);
    pub const INT64: Self = Self::scalar(PlainOldDataType::Int64);
    pub const FLOAT16: Self = Self::scalar(PlainOldDataType::Float16);
    pub const FLOAT32: Self = Self::scalar(PlainOldDataType::Float32);
    pub const FLOAT64: Self = Self::scalar(PlainOldDataType::Float64);
    pub const STRING: Self = Self::scalar(PlainOldDataType::String);
}

impl Default for DataType {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extent == 1 {
            write!(f, "{}", self.pod.name())
        } else {
            write!(f, "{}[{}]", self.pod.name(), self.extent)
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl PartialOrd for DataType {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DataType {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.pod.cmp(&other.pod) {
            std::cmp::Ordering::Equal => self.extent.cmp(&other.extent),
            ord => ord,
        }
    }
}
