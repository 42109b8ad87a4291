//! Dataset shapes.

use smallvec::SmallVec;

/// Shape of a dataset: the ordered extents of each dimension.
///
/// An empty shape is a scalar (rank 0). A `Vec<i32>` of 5 elements has
/// shape `[5]`, a `[[f32; 3]; 2]` has shape `[2, 3]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dimensions {
    dims: SmallVec<[usize; 4]>,
}

impl Dimensions {
    /// Create scalar dimensions (rank 0).
    pub fn scalar() -> Self {
        Self { dims: SmallVec::new() }
    }

    /// Create 1D dimensions.
    pub fn d1(size: usize) -> Self {
        Self { dims: smallvec::smallvec![size] }
    }

    /// Create 2D dimensions.
    pub fn d2(rows: usize, cols: usize) -> Self {
        Self { dims: smallvec::smallvec![rows, cols] }
    }

    /// Create from a slice of sizes.
    pub fn from_slice(sizes: &[usize]) -> Self {
        Self { dims: SmallVec::from_slice(sizes) }
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Size of a specific dimension, None if out of range.
    pub fn size(&self, dim: usize) -> Option<usize> {
        self.dims.get(dim).copied()
    }

    /// All dimension sizes.
    pub fn sizes(&self) -> &[usize] {
        &self.dims
    }

    /// Total number of elements (product of all dimensions).
    pub fn num_points(&self) -> usize {
        if self.dims.is_empty() {
            1
        } else {
            self.dims.iter().product()
        }
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, s) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, " x ")?;
            }
            write!(f, "{}", s)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar() {
        let d = Dimensions::scalar();
        assert_eq!(d.rank(), 0);
        assert!(d.is_scalar());
        assert_eq!(d.num_points(), 1);
        assert_eq!(d.to_string(), "[]");
    }

    #[test]
    fn test_2d() {
        let d = Dimensions::d2(2, 3);
        assert_eq!(d.sizes(), &[2, 3]);
        assert_eq!(d.num_points(), 6);
        assert_eq!(d.to_string(), "[2 x 3]");
    }

    #[test]
    fn test_zero_extent() {
        let d = Dimensions::d1(0);
        assert_eq!(d.num_points(), 0);
        assert!(!d.is_scalar());
    }
}
