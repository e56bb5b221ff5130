//! Aggregate statistics for one variable comparison.
//!
//! The report is typed, but consumers that read statistics by name (report
//! renderers, the CLI) go through [`StatisticsReport::groups`] or
//! [`StatisticsReport::get`], which expose the exact group and key strings.
//!
//! Denominators:
//! - `*_fraction` and `*_percent` keys divide by `num_data_points`, except
//! - `diff_outside_epsilon_fraction` and `perfect_match_fraction`, which divide
//!   by the number of points valid in both A and B.

use std::collections::BTreeMap;

use glance_common::{EpsilonSpec, GlanceError, GlanceResult};
use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::array::{DataSet, Mask, Shape};
use crate::diff::DiffResult;
use crate::mask::{MaskSet, PairMaskSet};

pub const GENERAL_STATISTICS: &str = "General Statistics";
pub const FINITE_DATA_STATISTICS: &str = "Finite Data Statistics";
pub const MISSING_VALUE_STATISTICS: &str = "Missing Value Statistics";
pub const NAN_STATISTICS: &str = "NaN Statistics";
pub const NUMERICAL_COMPARISON_STATISTICS: &str = "Numerical Comparison Statistics";

/// One named statistic value.
#[derive(Debug, Clone, PartialEq)]
pub enum StatValue {
    Count(usize),
    Number(f64),
    Shape(Vec<usize>),
    Flag(bool),
    /// An optional setting that was not configured.
    NotSet,
    /// Nothing to aggregate over: no point is valid in both A and B.
    NoValidData,
    /// Mathematically undefined, e.g. correlation of constant data.
    Undefined,
}

impl StatValue {
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            StatValue::Count(c) => Some(c as f64),
            StatValue::Number(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<usize> {
        match *self {
            StatValue::Count(c) => Some(c),
            _ => None,
        }
    }

    fn setting(value: Option<f64>) -> Self {
        value.map_or(StatValue::NotSet, StatValue::Number)
    }

    fn over_valid(value: Option<f64>) -> Self {
        value.map_or(StatValue::NoValidData, StatValue::finite)
    }

    /// A non-finite aggregate is reported as undefined, never as NaN.
    fn finite(value: f64) -> Self {
        if value.is_finite() {
            StatValue::Number(value)
        } else {
            StatValue::Undefined
        }
    }
}

impl Serialize for StatValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StatValue::Count(c) => serializer.serialize_u64(*c as u64),
            StatValue::Number(v) => serializer.serialize_f64(*v),
            StatValue::Shape(dims) => {
                let mut seq = serializer.serialize_seq(Some(dims.len()))?;
                for d in dims {
                    seq.serialize_element(d)?;
                }
                seq.end()
            }
            StatValue::Flag(b) => serializer.serialize_bool(*b),
            StatValue::NotSet => serializer.serialize_none(),
            StatValue::NoValidData => serializer.serialize_str("no valid data"),
            StatValue::Undefined => serializer.serialize_str("undefined"),
        }
    }
}

impl std::fmt::Display for StatValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatValue::Count(c) => write!(f, "{}", c),
            StatValue::Number(v) => write!(f, "{}", v),
            StatValue::Shape(dims) => write!(f, "{}", Shape::from(dims.as_slice())),
            StatValue::Flag(b) => write!(f, "{}", b),
            StatValue::NotSet => write!(f, "none"),
            StatValue::NoValidData => write!(f, "no valid data"),
            StatValue::Undefined => write!(f, "undefined"),
        }
    }
}

type Group = BTreeMap<&'static str, StatValue>;

// ============================================================================
// Statistic groups
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GeneralStatistics {
    pub num_data_points: usize,
    pub a_data_shape: Shape,
    pub b_data_shape: Shape,
    /// Points not valid in both A and B.
    pub total_invalid_points: usize,
    pub valid_both_count: usize,
    pub a_missing_value: Option<f64>,
    pub b_missing_value: Option<f64>,
    pub epsilon: EpsilonSpec,
    pub min_a: Option<f64>,
    pub max_a: Option<f64>,
    pub min_b: Option<f64>,
    pub max_b: Option<f64>,
    pub spatially_invalid_pts_ignored_in_a: usize,
    pub spatially_invalid_pts_ignored_in_b: usize,
}

impl GeneralStatistics {
    fn entries(&self) -> Group {
        let (epsilon, epsilon_percent) = match self.epsilon {
            EpsilonSpec::Absolute(v) => (Some(v), None),
            EpsilonSpec::Percent(v) => (None, Some(v * 100.0)),
        };
        BTreeMap::from([
            ("num_data_points", StatValue::Count(self.num_data_points)),
            ("a_data_shape", StatValue::Shape(self.a_data_shape.dims().to_vec())),
            ("b_data_shape", StatValue::Shape(self.b_data_shape.dims().to_vec())),
            ("total_invalid_points", StatValue::Count(self.total_invalid_points)),
            ("valid_both_count", StatValue::Count(self.valid_both_count)),
            ("a_missing_value", StatValue::setting(self.a_missing_value)),
            ("b_missing_value", StatValue::setting(self.b_missing_value)),
            ("epsilon", StatValue::setting(epsilon)),
            ("epsilon_percent", StatValue::setting(epsilon_percent)),
            ("min_a", StatValue::over_valid(self.min_a)),
            ("max_a", StatValue::over_valid(self.max_a)),
            ("min_b", StatValue::over_valid(self.min_b)),
            ("max_b", StatValue::over_valid(self.max_b)),
            (
                "spatially_invalid_pts_ignored_in_a",
                StatValue::Count(self.spatially_invalid_pts_ignored_in_a),
            ),
            (
                "spatially_invalid_pts_ignored_in_b",
                StatValue::Count(self.spatially_invalid_pts_ignored_in_b),
            ),
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FiniteDataStatistics {
    pub a_finite_count: usize,
    pub a_finite_fraction: f64,
    pub b_finite_count: usize,
    pub b_finite_fraction: f64,
    pub common_finite_count: usize,
    pub common_finite_fraction: f64,
    pub finite_in_only_one_count: usize,
    pub finite_in_only_one_fraction: f64,
    pub finite_in_only_one_percent: f64,
}

impl FiniteDataStatistics {
    fn entries(&self) -> Group {
        BTreeMap::from([
            ("a_finite_count", StatValue::Count(self.a_finite_count)),
            ("a_finite_fraction", StatValue::Number(self.a_finite_fraction)),
            ("b_finite_count", StatValue::Count(self.b_finite_count)),
            ("b_finite_fraction", StatValue::Number(self.b_finite_fraction)),
            ("common_finite_count", StatValue::Count(self.common_finite_count)),
            ("common_finite_fraction", StatValue::Number(self.common_finite_fraction)),
            ("finite_in_only_one_count", StatValue::Count(self.finite_in_only_one_count)),
            (
                "finite_in_only_one_fraction",
                StatValue::Number(self.finite_in_only_one_fraction),
            ),
            (
                "finite_in_only_one_percent",
                StatValue::Number(self.finite_in_only_one_percent),
            ),
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissingValueStatistics {
    pub a_missing_count: usize,
    pub a_missing_fraction: f64,
    pub b_missing_count: usize,
    pub b_missing_fraction: f64,
    pub common_missing_count: usize,
    pub common_missing_fraction: f64,
    pub common_missing_percent: f64,
}

impl MissingValueStatistics {
    fn entries(&self) -> Group {
        BTreeMap::from([
            ("a_missing_count", StatValue::Count(self.a_missing_count)),
            ("a_missing_fraction", StatValue::Number(self.a_missing_fraction)),
            ("b_missing_count", StatValue::Count(self.b_missing_count)),
            ("b_missing_fraction", StatValue::Number(self.b_missing_fraction)),
            ("common_missing_count", StatValue::Count(self.common_missing_count)),
            ("common_missing_fraction", StatValue::Number(self.common_missing_fraction)),
            ("common_missing_percent", StatValue::Number(self.common_missing_percent)),
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NanStatistics {
    pub a_nan_count: usize,
    pub a_nan_fraction: f64,
    pub b_nan_count: usize,
    pub b_nan_fraction: f64,
    pub common_nan_count: usize,
    pub common_nan_fraction: f64,
    pub common_nan_percent: f64,
}

impl NanStatistics {
    fn entries(&self) -> Group {
        BTreeMap::from([
            ("a_nan_count", StatValue::Count(self.a_nan_count)),
            ("a_nan_fraction", StatValue::Number(self.a_nan_fraction)),
            ("b_nan_count", StatValue::Count(self.b_nan_count)),
            ("b_nan_fraction", StatValue::Number(self.b_nan_fraction)),
            ("common_nan_count", StatValue::Count(self.common_nan_count)),
            ("common_nan_fraction", StatValue::Number(self.common_nan_fraction)),
            ("common_nan_percent", StatValue::Number(self.common_nan_percent)),
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericalComparisonStatistics {
    pub diff_outside_epsilon_count: usize,
    /// Divided by the valid-both count; 0 when nothing is valid in both.
    pub diff_outside_epsilon_fraction: f64,
    /// `None` when fewer than two valid points or either side is constant.
    pub correlation: Option<f64>,
    pub diff_min: Option<f64>,
    pub diff_max: Option<f64>,
    pub diff_mean: Option<f64>,
    pub diff_std: Option<f64>,
    pub diff_median: Option<f64>,
    pub diff_rms: Option<f64>,
    pub perfect_match_count: usize,
    pub perfect_match_fraction: f64,
    pub mismatch_points_count: usize,
    pub mismatch_points_fraction: f64,
    /// No point is valid in both A and B, so the fractions above are vacuous.
    pub insufficient_valid_data: bool,
}

impl NumericalComparisonStatistics {
    pub fn r_squared_correlation(&self) -> Option<f64> {
        self.correlation.map(|r| r * r)
    }

    fn entries(&self) -> Group {
        let correlation = |v: Option<f64>| match v {
            Some(r) => StatValue::finite(r),
            None if self.insufficient_valid_data => StatValue::NoValidData,
            None => StatValue::Undefined,
        };
        BTreeMap::from([
            ("diff_outside_epsilon_count", StatValue::Count(self.diff_outside_epsilon_count)),
            (
                "diff_outside_epsilon_fraction",
                StatValue::Number(self.diff_outside_epsilon_fraction),
            ),
            ("correlation", correlation(self.correlation)),
            ("r_squared_correlation", correlation(self.r_squared_correlation())),
            ("diff_min", StatValue::over_valid(self.diff_min)),
            ("diff_max", StatValue::over_valid(self.diff_max)),
            ("diff_mean", StatValue::over_valid(self.diff_mean)),
            ("diff_std", StatValue::over_valid(self.diff_std)),
            ("diff_median", StatValue::over_valid(self.diff_median)),
            ("diff_rms", StatValue::over_valid(self.diff_rms)),
            ("perfect_match_count", StatValue::Count(self.perfect_match_count)),
            ("perfect_match_fraction", StatValue::Number(self.perfect_match_fraction)),
            ("mismatch_points_count", StatValue::Count(self.mismatch_points_count)),
            ("mismatch_points_fraction", StatValue::Number(self.mismatch_points_fraction)),
            ("insufficient_valid_data", StatValue::Flag(self.insufficient_valid_data)),
        ])
    }
}

// ============================================================================
// Report
// ============================================================================

/// All statistics for one variable.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsReport {
    pub general: GeneralStatistics,
    pub finite: FiniteDataStatistics,
    pub missing: MissingValueStatistics,
    pub nan: NanStatistics,
    pub numerical: NumericalComparisonStatistics,
}

impl StatisticsReport {
    /// Group name -> statistic name -> value.
    pub fn groups(&self) -> BTreeMap<&'static str, Group> {
        BTreeMap::from([
            (GENERAL_STATISTICS, self.general.entries()),
            (FINITE_DATA_STATISTICS, self.finite.entries()),
            (MISSING_VALUE_STATISTICS, self.missing.entries()),
            (NAN_STATISTICS, self.nan.entries()),
            (NUMERICAL_COMPARISON_STATISTICS, self.numerical.entries()),
        ])
    }

    /// Look up one statistic by its group and key.
    pub fn get(&self, group: &str, key: &str) -> Option<StatValue> {
        let entries = match group {
            GENERAL_STATISTICS => self.general.entries(),
            FINITE_DATA_STATISTICS => self.finite.entries(),
            MISSING_VALUE_STATISTICS => self.missing.entries(),
            NAN_STATISTICS => self.nan.entries(),
            NUMERICAL_COMPARISON_STATISTICS => self.numerical.entries(),
            _ => return None,
        };
        entries.get(key).cloned()
    }

    pub fn num_data_points(&self) -> usize {
        self.general.num_data_points
    }

    pub fn insufficient_valid_data(&self) -> bool {
        self.numerical.insufficient_valid_data
    }
}

impl Serialize for StatisticsReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.groups().serialize(serializer)
    }
}

// ============================================================================
// Aggregation
// ============================================================================

/// Reduce the masks and differences of one comparison into a report.
pub fn summarize(
    a: &DataSet,
    b: &DataSet,
    mask_a: &MaskSet,
    mask_b: &MaskSet,
    diff: &DiffResult,
) -> GlanceResult<StatisticsReport> {
    let pair = PairMaskSet::new(mask_a, mask_b)?;
    summarize_pair(a, b, mask_a, mask_b, &pair, diff)
}

pub(crate) fn summarize_pair(
    a: &DataSet,
    b: &DataSet,
    mask_a: &MaskSet,
    mask_b: &MaskSet,
    pair: &PairMaskSet,
    diff: &DiffResult,
) -> GlanceResult<StatisticsReport> {
    if a.shape() != b.shape() {
        return Err(GlanceError::shape_mismatch(
            "A/B data",
            a.shape().dims(),
            b.shape().dims(),
        ));
    }
    if pair.shape() != a.shape() || diff.valid_both.shape() != a.shape() {
        return Err(GlanceError::shape_mismatch(
            "comparison masks",
            a.shape().dims(),
            pair.shape().dims(),
        ));
    }

    let total = a.len();
    let valid_both_count = pair.valid_both.count();
    let frac = |count: usize| fraction(count, total);

    let (min_a, max_a) = range_over(a.values(), &mask_a.valid);
    let (min_b, max_b) = range_over(b.values(), &mask_b.valid);

    let general = GeneralStatistics {
        num_data_points: total,
        a_data_shape: a.shape().clone(),
        b_data_shape: b.shape().clone(),
        total_invalid_points: total - valid_both_count,
        valid_both_count,
        a_missing_value: a.missing_value(),
        b_missing_value: b.missing_value(),
        epsilon: diff.epsilon,
        min_a,
        max_a,
        min_b,
        max_b,
        spatially_invalid_pts_ignored_in_a: mask_a.ignore.count(),
        spatially_invalid_pts_ignored_in_b: mask_b.ignore.count(),
    };

    let a_finite = mask_a.valid.count();
    let b_finite = mask_b.valid.count();
    let only_one = pair.finite_in_only_one.count();
    let finite = FiniteDataStatistics {
        a_finite_count: a_finite,
        a_finite_fraction: frac(a_finite),
        b_finite_count: b_finite,
        b_finite_fraction: frac(b_finite),
        common_finite_count: valid_both_count,
        common_finite_fraction: frac(valid_both_count),
        finite_in_only_one_count: only_one,
        finite_in_only_one_fraction: frac(only_one),
        finite_in_only_one_percent: frac(only_one) * 100.0,
    };

    let a_missing = mask_a.missing.count();
    let b_missing = mask_b.missing.count();
    let common_missing = pair.common_missing.count();
    let missing = MissingValueStatistics {
        a_missing_count: a_missing,
        a_missing_fraction: frac(a_missing),
        b_missing_count: b_missing,
        b_missing_fraction: frac(b_missing),
        common_missing_count: common_missing,
        common_missing_fraction: frac(common_missing),
        common_missing_percent: frac(common_missing) * 100.0,
    };

    let a_nan = mask_a.non_finite.count();
    let b_nan = mask_b.non_finite.count();
    let common_nan = pair.common_nan.count();
    let nan = NanStatistics {
        a_nan_count: a_nan,
        a_nan_fraction: frac(a_nan),
        b_nan_count: b_nan,
        b_nan_fraction: frac(b_nan),
        common_nan_count: common_nan,
        common_nan_fraction: frac(common_nan),
        common_nan_percent: frac(common_nan) * 100.0,
    };

    let valid_a: Vec<f64> = pair.valid_both.indices().map(|i| a.values()[i]).collect();
    let valid_b: Vec<f64> = pair.valid_both.indices().map(|i| b.values()[i]).collect();
    let diffs = diff.valid_diffs();
    let described = describe(&diffs);
    let outside = diff.outside_epsilon.and(&pair.valid_both).count();
    let perfect = diffs.iter().filter(|&&d| d == 0.0).count();
    let mismatched = pair.mismatch.count();

    let numerical = NumericalComparisonStatistics {
        diff_outside_epsilon_count: outside,
        diff_outside_epsilon_fraction: fraction(outside, valid_both_count),
        correlation: pearson(&valid_a, &valid_b),
        diff_min: described.map(|d| d.min),
        diff_max: described.map(|d| d.max),
        diff_mean: described.map(|d| d.mean),
        diff_std: described.map(|d| d.std),
        diff_median: described.map(|d| d.median),
        diff_rms: described.map(|d| d.rms),
        perfect_match_count: perfect,
        perfect_match_fraction: fraction(perfect, valid_both_count),
        mismatch_points_count: mismatched,
        mismatch_points_fraction: frac(mismatched),
        insufficient_valid_data: valid_both_count == 0,
    };

    Ok(StatisticsReport {
        general,
        finite,
        missing,
        nan,
        numerical,
    })
}

/// `count / total`, defined as 0 for an empty denominator.
#[inline]
pub fn fraction(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

fn range_over(values: &[f64], mask: &Mask) -> (Option<f64>, Option<f64>) {
    mask.indices()
        .map(|i| values[i])
        .fold((None, None), |(lo, hi), v| {
            (
                Some(lo.map_or(v, |m: f64| m.min(v))),
                Some(hi.map_or(v, |m: f64| m.max(v))),
            )
        })
}

#[derive(Debug, Clone, Copy)]
struct Described {
    min: f64,
    max: f64,
    mean: f64,
    std: f64,
    median: f64,
    rms: f64,
}

/// Largest magnitude in `values`, or 1 when that is zero or not finite.
///
/// Sums are taken over `v / scale` so squares of large finite values do
/// not overflow.
fn scale_of(values: &[f64]) -> f64 {
    let max = values.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if max > 0.0 && max.is_finite() {
        max
    } else {
        1.0
    }
}

/// Population statistics of `values`; `None` when empty.
fn describe(values: &[f64]) -> Option<Described> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let scale = scale_of(values);
    let mean_scaled = values.iter().map(|v| v / scale).sum::<f64>() / n;
    let variance_scaled = values
        .iter()
        .map(|v| (v / scale - mean_scaled).powi(2))
        .sum::<f64>()
        / n;
    let rms_scaled = (values.iter().map(|v| (v / scale).powi(2)).sum::<f64>() / n).sqrt();

    let mut sorted = values.to_vec();
    sorted.sort_by(|x, y| x.total_cmp(y));
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    Some(Described {
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        mean: mean_scaled * scale,
        std: variance_scaled.sqrt() * scale,
        median,
        rms: rms_scaled * scale,
    })
}

/// Pearson correlation; `None` for fewer than two points, zero variance or
/// a non-finite result.
///
/// Each side is divided by its largest magnitude first; correlation is
/// invariant under that scaling.
fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() < 2 || a.len() != b.len() {
        return None;
    }
    let n = a.len() as f64;
    let (scale_a, scale_b) = (scale_of(a), scale_of(b));
    let mean_a = a.iter().map(|x| x / scale_a).sum::<f64>() / n;
    let mean_b = b.iter().map(|y| y / scale_b).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x / scale_a - mean_a;
        let dy = y / scale_b - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    let r = cov / (var_a.sqrt() * var_b.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}
