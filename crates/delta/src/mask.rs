//! Per-point classification of comparison inputs.
//!
//! [`classify`] derives the masks for one side of a comparison,
//! [`PairMaskSet`] combines two sides, and [`PointClass`] gives every point a
//! single label for imagery consumers.

use crate::array::{DataSet, Mask, Shape};
use glance_common::{GlanceError, GlanceResult};
use serde::Serialize;

/// Masks derived from one [`DataSet`].
///
/// `non_finite`, `missing` and `ignore` may overlap; `valid` is set only
/// where none of them is.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskSet {
    pub non_finite: Mask,
    pub missing: Mask,
    pub ignore: Mask,
    pub valid: Mask,
}

impl MaskSet {
    pub fn shape(&self) -> &Shape {
        self.valid.shape()
    }

    /// Why the point at `index` is unusable, highest priority first.
    pub fn reason_at(&self, index: usize) -> InvalidReason {
        if self.ignore.get(index) {
            InvalidReason::Ignored
        } else if self.non_finite.get(index) {
            InvalidReason::NonFinite
        } else if self.missing.get(index) {
            InvalidReason::Missing
        } else {
            InvalidReason::Valid
        }
    }
}

/// Classify raw values.
///
/// NaN and infinities always mark `non_finite`. The sentinel is matched by
/// exact equality, so a NaN sentinel never marks anything missing. The
/// ignore mask is broadcast to `shape`.
pub fn classify(
    values: &[f64],
    shape: &Shape,
    missing_value: Option<f64>,
    ignore_mask: Option<&Mask>,
) -> GlanceResult<MaskSet> {
    if values.len() != shape.len() {
        return Err(GlanceError::shape_mismatch(
            "classified values",
            shape.dims(),
            &[values.len()],
        ));
    }

    let non_finite = Mask::from_fn(shape, |i| !values[i].is_finite());
    let missing = match missing_value {
        Some(sentinel) => Mask::from_fn(shape, |i| values[i] == sentinel),
        None => Mask::all_false(shape),
    };
    let ignore = match ignore_mask {
        Some(mask) => mask.broadcast_to(shape)?,
        None => Mask::all_false(shape),
    };
    let valid = non_finite.or(&missing).or(&ignore).not();

    Ok(MaskSet {
        non_finite,
        missing,
        ignore,
        valid,
    })
}

impl DataSet {
    /// Classify this dataset with its own sentinel and ignore mask.
    pub fn masks(&self) -> GlanceResult<MaskSet> {
        classify(
            self.values(),
            self.shape(),
            self.missing_value(),
            self.ignore_mask(),
        )
    }
}

/// Why a point cannot be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    Valid,
    Missing,
    NonFinite,
    Ignored,
}

/// Masks relating the A and B sides of one comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct PairMaskSet {
    /// Usable in both A and B.
    pub valid_both: Mask,
    /// Usable in exactly one side, at points neither side ignores.
    pub finite_in_only_one: Mask,
    pub common_missing: Mask,
    /// Non-finite in both A and B.
    pub common_nan: Mask,
    /// Not valid in both, and A and B disagree on the reason.
    pub mismatch: Mask,
    pub ignore_either: Mask,
    pub ignore_both: Mask,
}

impl PairMaskSet {
    pub fn new(a: &MaskSet, b: &MaskSet) -> GlanceResult<Self> {
        if a.shape() != b.shape() {
            return Err(GlanceError::shape_mismatch(
                "A/B masks",
                a.shape().dims(),
                b.shape().dims(),
            ));
        }
        let shape = a.shape();

        let valid_both = a.valid.and(&b.valid);
        let ignore_either = a.ignore.or(&b.ignore);
        let ignore_both = a.ignore.and(&b.ignore);
        let finite_in_only_one = a.valid.xor(&b.valid).and_not(&ignore_either);
        let common_missing = a.missing.and(&b.missing);
        let common_nan = a.non_finite.and(&b.non_finite);
        let mismatch = Mask::from_fn(shape, |i| {
            !valid_both.get(i) && a.reason_at(i) != b.reason_at(i)
        });

        Ok(Self {
            valid_both,
            finite_in_only_one,
            common_missing,
            common_nan,
            mismatch,
            ignore_either,
            ignore_both,
        })
    }

    pub fn shape(&self) -> &Shape {
        self.valid_both.shape()
    }

    /// Label every point. `outside_epsilon` must share this pair's shape.
    pub fn point_classes(&self, outside_epsilon: &Mask) -> Vec<PointClass> {
        (0..self.valid_both.len())
            .map(|i| {
                if self.valid_both.get(i) {
                    if outside_epsilon.get(i) {
                        PointClass::OutsideEpsilon
                    } else {
                        PointClass::Good
                    }
                } else if self.ignore_either.get(i) {
                    PointClass::SpatiallyInvalid
                } else if self.mismatch.get(i) {
                    PointClass::Mismatched
                } else if self.common_nan.get(i) {
                    PointClass::NonFinite
                } else {
                    PointClass::Missing
                }
            })
            .collect()
    }
}

/// Single label per point. Every point gets exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointClass {
    Good,
    OutsideEpsilon,
    SpatiallyInvalid,
    Mismatched,
    Missing,
    NonFinite,
}
