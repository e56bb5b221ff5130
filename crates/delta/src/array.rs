//! Core array types for comparisons.

use glance_common::{GlanceError, GlanceResult};
use serde::{Deserialize, Serialize};

/// Dimensions of an array, outermost first. An empty shape is a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape(Vec<usize>);

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Self(dims)
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements (product of the dimensions).
    pub fn len(&self) -> usize {
        self.0.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self(dims.to_vec())
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dims: Vec<String> = self.0.iter().map(|d| d.to_string()).collect();
        write!(f, "({})", dims.join(", "))
    }
}

/// Boolean array in row-major order.
///
/// Binary operations require both operands to share a shape and panic
/// otherwise; use [`Mask::broadcast_to`] first when shapes may differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    shape: Shape,
    bits: Vec<bool>,
}

impl Mask {
    pub fn new(shape: impl Into<Shape>, bits: Vec<bool>) -> GlanceResult<Self> {
        let shape = shape.into();
        if bits.len() != shape.len() {
            return Err(GlanceError::shape_mismatch(
                "mask data",
                shape.dims(),
                &[bits.len()],
            ));
        }
        Ok(Self { shape, bits })
    }

    pub fn all_false(shape: &Shape) -> Self {
        Self {
            shape: shape.clone(),
            bits: vec![false; shape.len()],
        }
    }

    pub fn all_true(shape: &Shape) -> Self {
        Self {
            shape: shape.clone(),
            bits: vec![true; shape.len()],
        }
    }

    pub(crate) fn from_fn(shape: &Shape, f: impl Fn(usize) -> bool) -> Self {
        Self {
            shape: shape.clone(),
            bits: (0..shape.len()).map(f).collect(),
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> bool {
        self.bits[index]
    }

    /// Number of set points.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Set points over all points; 0 for an empty mask.
    pub fn fraction(&self) -> f64 {
        crate::stats::fraction(self.count(), self.len())
    }

    pub fn any(&self) -> bool {
        self.bits.iter().any(|&b| b)
    }

    /// Indices of set points.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| if b { Some(i) } else { None })
    }

    pub fn and(&self, other: &Mask) -> Mask {
        self.zip_with(other, |a, b| a && b)
    }

    pub fn or(&self, other: &Mask) -> Mask {
        self.zip_with(other, |a, b| a || b)
    }

    pub fn xor(&self, other: &Mask) -> Mask {
        self.zip_with(other, |a, b| a != b)
    }

    /// `self & !other`
    pub fn and_not(&self, other: &Mask) -> Mask {
        self.zip_with(other, |a, b| a && !b)
    }

    pub fn not(&self) -> Mask {
        Mask {
            shape: self.shape.clone(),
            bits: self.bits.iter().map(|&b| !b).collect(),
        }
    }

    fn zip_with(&self, other: &Mask, f: impl Fn(bool, bool) -> bool) -> Mask {
        assert_eq!(
            self.shape, other.shape,
            "mask operands must share a shape"
        );
        Mask {
            shape: self.shape.clone(),
            bits: self
                .bits
                .iter()
                .zip(&other.bits)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }

    /// Expand to `target` following NumPy broadcasting rules: dimensions are
    /// aligned from the right and each must either match or be 1.
    pub fn broadcast_to(&self, target: &Shape) -> GlanceResult<Mask> {
        if self.shape == *target {
            return Ok(self.clone());
        }

        let src = self.shape.dims();
        let dst = target.dims();
        let mismatch = || GlanceError::shape_mismatch("ignore mask broadcast", dst, src);

        if src.len() > dst.len() {
            return Err(mismatch());
        }
        let offset = dst.len() - src.len();
        for (i, &d) in src.iter().enumerate() {
            if d != dst[offset + i] && d != 1 {
                return Err(mismatch());
            }
        }

        // Stride 0 along broadcast dimensions.
        let mut strides = vec![0usize; dst.len()];
        let mut stride = 1;
        for i in (0..src.len()).rev() {
            strides[offset + i] = if src[i] == 1 { 0 } else { stride };
            stride *= src[i];
        }

        let total = target.len();
        let mut bits = Vec::with_capacity(total);
        let mut index = vec![0usize; dst.len()];
        for _ in 0..total {
            let src_index: usize = index.iter().zip(&strides).map(|(i, s)| i * s).sum();
            bits.push(self.bits[src_index]);

            for d in (0..dst.len()).rev() {
                index[d] += 1;
                if index[d] < dst[d] {
                    break;
                }
                index[d] = 0;
            }
        }

        Ok(Mask {
            shape: target.clone(),
            bits,
        })
    }
}

/// One side ("A" or "B") of a variable comparison.
///
/// Immutable once built; the ignore mask is already broadcast to the data
/// shape.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    values: Vec<f64>,
    shape: Shape,
    missing_value: Option<f64>,
    ignore_mask: Option<Mask>,
}

impl DataSet {
    pub fn new(values: Vec<f64>, shape: impl Into<Shape>) -> GlanceResult<Self> {
        let shape = shape.into();
        if values.len() != shape.len() {
            return Err(GlanceError::shape_mismatch(
                "data values",
                shape.dims(),
                &[values.len()],
            ));
        }
        Ok(Self {
            values,
            shape,
            missing_value: None,
            ignore_mask: None,
        })
    }

    /// A one-dimensional dataset.
    pub fn from_vec(values: Vec<f64>) -> Self {
        let shape = Shape::new(vec![values.len()]);
        Self {
            values,
            shape,
            missing_value: None,
            ignore_mask: None,
        }
    }

    pub fn with_missing_value(mut self, missing_value: Option<f64>) -> Self {
        self.missing_value = missing_value;
        self
    }

    /// Attach an ignore mask, broadcasting it to the data shape.
    pub fn with_ignore_mask(mut self, mask: Mask) -> GlanceResult<Self> {
        self.ignore_mask = Some(mask.broadcast_to(&self.shape)?);
        Ok(self)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn missing_value(&self) -> Option<f64> {
        self.missing_value
    }

    pub fn ignore_mask(&self) -> Option<&Mask> {
        self.ignore_mask.as_ref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_len() {
        assert_eq!(Shape::from([3, 4]).len(), 12);
        assert_eq!(Shape::from(Vec::<usize>::new()).len(), 1);
        assert!(Shape::from([0, 5]).is_empty());
        assert_eq!(Shape::from([2, 3]).to_string(), "(2, 3)");
    }

    #[test]
    fn test_mask_logic() {
        let a = Mask::new([4], vec![true, true, false, false]).unwrap();
        let b = Mask::new([4], vec![true, false, true, false]).unwrap();
        assert_eq!(a.and(&b).bits(), &[true, false, false, false]);
        assert_eq!(a.or(&b).bits(), &[true, true, true, false]);
        assert_eq!(a.xor(&b).bits(), &[false, true, true, false]);
        assert_eq!(a.and_not(&b).bits(), &[false, true, false, false]);
        assert_eq!(a.not().count(), 2);
        assert_eq!(a.indices().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_broadcast_row_to_grid() {
        let row = Mask::new([3], vec![true, false, true]).unwrap();
        let grid = row.broadcast_to(&Shape::from([2, 3])).unwrap();
        assert_eq!(grid.bits(), &[true, false, true, true, false, true]);
    }

    #[test]
    fn test_broadcast_column_to_grid() {
        let col = Mask::new([2, 1], vec![false, true]).unwrap();
        let grid = col.broadcast_to(&Shape::from([2, 3])).unwrap();
        assert_eq!(grid.bits(), &[false, false, false, true, true, true]);
    }

    #[test]
    fn test_broadcast_scalar() {
        let scalar = Mask::new(Vec::<usize>::new(), vec![true]).unwrap();
        let grid = scalar.broadcast_to(&Shape::from([2, 2])).unwrap();
        assert_eq!(grid.count(), 4);
    }

    #[test]
    fn test_broadcast_incompatible() {
        let mask = Mask::new([3], vec![true; 3]).unwrap();
        let err = mask.broadcast_to(&Shape::from([2, 4])).unwrap_err();
        assert!(matches!(err, GlanceError::ShapeMismatch { .. }));

        let too_many_dims = Mask::new([1, 2, 2], vec![true; 4]).unwrap();
        assert!(too_many_dims.broadcast_to(&Shape::from([2, 2])).is_err());
    }

    #[test]
    fn test_dataset_length_check() {
        assert!(DataSet::new(vec![1.0, 2.0, 3.0], [2, 2]).is_err());
        let ds = DataSet::new(vec![1.0; 4], [2, 2]).unwrap();
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.missing_value(), None);
    }

    #[test]
    fn test_dataset_ignore_mask_broadcast() {
        let ds = DataSet::new(vec![0.0; 6], [2, 3])
            .unwrap()
            .with_ignore_mask(Mask::new([3], vec![false, true, false]).unwrap())
            .unwrap();
        assert_eq!(ds.ignore_mask().unwrap().count(), 2);

        let bad = DataSet::new(vec![0.0; 6], [2, 3])
            .unwrap()
            .with_ignore_mask(Mask::new([2], vec![true, false]).unwrap());
        assert!(bad.is_err());
    }
}
