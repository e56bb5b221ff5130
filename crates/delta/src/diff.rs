//! Point-wise differences and the epsilon test.

use crate::array::{DataSet, Mask};
use crate::mask::MaskSet;
use glance_common::{EpsilonSpec, GlanceError, GlanceResult};

/// Output of [`compute_diff`].
///
/// `diff` and `abs_diff` are filled everywhere but only meaningful inside
/// `valid_both`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffResult {
    pub diff: Vec<f64>,
    pub abs_diff: Vec<f64>,
    pub outside_epsilon: Mask,
    pub valid_both: Mask,
    pub epsilon: EpsilonSpec,
}

impl DiffResult {
    /// Signed differences at valid-both points, in index order.
    pub fn valid_diffs(&self) -> Vec<f64> {
        self.valid_both.indices().map(|i| self.diff[i]).collect()
    }

    pub fn valid_both_count(&self) -> usize {
        self.valid_both.count()
    }

    pub fn outside_epsilon_count(&self) -> usize {
        self.outside_epsilon.count()
    }
}

/// Compute `a - b` and mark valid-both points whose absolute difference
/// exceeds the epsilon threshold.
///
/// Points outside `valid_both` are never outside epsilon; they are counted
/// by the other statistic groups instead.
pub fn compute_diff(
    a: &DataSet,
    b: &DataSet,
    mask_a: &MaskSet,
    mask_b: &MaskSet,
    epsilon: EpsilonSpec,
) -> GlanceResult<DiffResult> {
    if a.shape() != b.shape() {
        return Err(GlanceError::shape_mismatch(
            "A/B data",
            a.shape().dims(),
            b.shape().dims(),
        ));
    }
    if mask_a.shape() != a.shape() || mask_b.shape() != b.shape() {
        return Err(GlanceError::shape_mismatch(
            "masks for data",
            a.shape().dims(),
            mask_a.shape().dims(),
        ));
    }

    let av = a.values();
    let bv = b.values();
    let valid_both = mask_a.valid.and(&mask_b.valid);

    let diff: Vec<f64> = av.iter().zip(bv).map(|(x, y)| x - y).collect();
    let abs_diff: Vec<f64> = diff.iter().map(|d| d.abs()).collect();
    let outside_epsilon = Mask::from_fn(a.shape(), |i| {
        valid_both.get(i) && abs_diff[i] > epsilon.threshold(av[i], bv[i])
    });

    Ok(DiffResult {
        diff,
        abs_diff,
        outside_epsilon,
        valid_both,
        epsilon,
    })
}
