//! End-to-end comparisons of small, hand-checked arrays.

use delta::{
    compare_variable, compute_diff, evaluate, summarize, DataSet, Mask, StatValue,
    StatisticsReport, Verdict, NUMERICAL_COMPARISON_STATISTICS,
};
use glance_common::{AnalysisDefaults, EpsilonSpec, GlanceError, ResolvedVariable, ToleranceConfig};
use test_utils::{assert_approx_eq, assert_values_eq, fixtures::mixed};

fn report(a: &DataSet, b: &DataSet, epsilon: EpsilonSpec) -> StatisticsReport {
    let (ma, mb) = (a.masks().unwrap(), b.masks().unwrap());
    let diff = compute_diff(a, b, &ma, &mb, epsilon).unwrap();
    summarize(a, b, &ma, &mb, &diff).unwrap()
}

fn mixed_pair() -> (DataSet, DataSet) {
    (
        DataSet::from_vec(mixed::a()).with_missing_value(Some(mixed::MISSING_VALUE)),
        DataSet::from_vec(mixed::b()).with_missing_value(Some(mixed::MISSING_VALUE)),
    )
}

// =============================================================================
// Mixed NaN / missing / difference case
// =============================================================================

#[test]
fn test_mixed_case_counts() {
    let (a, b) = mixed_pair();
    let stats = report(&a, &b, EpsilonSpec::Absolute(mixed::EPSILON));

    assert_eq!(stats.general.num_data_points, 4);
    assert_eq!(stats.general.a_data_shape.dims(), &[4]);
    assert_eq!(stats.general.valid_both_count, 2);
    assert_eq!(stats.general.total_invalid_points, 2);

    assert_eq!(stats.missing.common_missing_count, 1);
    assert_eq!(stats.missing.common_missing_percent, 25.0);
    assert_eq!(stats.nan.common_nan_count, 0);
    assert_eq!(stats.nan.common_nan_percent, 0.0);
    assert_eq!(stats.finite.finite_in_only_one_count, 1);
    assert_eq!(stats.finite.finite_in_only_one_percent, 25.0);

    assert_eq!(stats.numerical.diff_outside_epsilon_count, 1);
    assert_eq!(stats.numerical.diff_outside_epsilon_fraction, 0.5);
    assert_eq!(stats.numerical.diff_min, Some(-0.5));
    assert_eq!(stats.numerical.diff_max, Some(0.0));
    assert_approx_eq!(stats.numerical.diff_mean.unwrap(), -0.25, 1e-12);
    assert_approx_eq!(stats.numerical.diff_std.unwrap(), 0.25, 1e-12);
}

#[test]
fn test_mixed_case_named_lookup() {
    let (a, b) = mixed_pair();
    let stats = report(&a, &b, EpsilonSpec::Absolute(mixed::EPSILON));

    assert_eq!(
        stats.get(NUMERICAL_COMPARISON_STATISTICS, "diff_outside_epsilon_fraction"),
        Some(StatValue::Number(0.5))
    );
    assert_eq!(
        stats.get("Missing Value Statistics", "common_missing_count"),
        Some(StatValue::Count(1))
    );
    assert_eq!(stats.get("General Statistics", "no_such_key"), None);
}

#[test]
fn test_mixed_case_verdicts() {
    let (a, b) = mixed_pair();
    let stats = report(&a, &b, EpsilonSpec::Absolute(mixed::EPSILON));

    let epsilon_only = ToleranceConfig::new(Some(0.6), None).unwrap();
    assert_eq!(evaluate(&stats, &epsilon_only), Verdict::Pass);

    let strict = ToleranceConfig::new(Some(0.0), None).unwrap();
    assert_eq!(evaluate(&stats, &strict), Verdict::Fail);

    assert_eq!(evaluate(&stats, &ToleranceConfig::unset()), Verdict::NotEvaluated);
}

#[test]
fn test_mixed_case_differences() {
    let (a, b) = mixed_pair();
    let (ma, mb) = (a.masks().unwrap(), b.masks().unwrap());
    let diff = compute_diff(&a, &b, &ma, &mb, EpsilonSpec::Absolute(mixed::EPSILON)).unwrap();

    // Computed everywhere, including the NaN and the shared sentinel.
    assert_values_eq!(&diff.diff, &[0.0, -0.5, f64::NAN, 0.0]);
    assert_values_eq!(&diff.abs_diff, &[0.0, 0.5, f64::NAN, 0.0]);
    assert_eq!(diff.valid_diffs(), vec![0.0, -0.5]);
}

#[test]
fn test_mixed_case_through_compare_variable() {
    let (a, b) = mixed_pair();
    let defaults = AnalysisDefaults {
        epsilon: Some(mixed::EPSILON),
        epsilon_failure_tolerance: Some(0.6),
        ..Default::default()
    };
    let settings = ResolvedVariable::with_defaults("tpw", &defaults).unwrap();
    let result = compare_variable(&a, &b, &settings).unwrap();

    assert_eq!(result.verdict(), Verdict::Pass);
    assert_eq!(result.masks.valid_both.bits(), &[true, true, false, false]);
    assert_eq!(result.masks.outside_epsilon.bits(), &[false, true, false, false]);
    assert_eq!(result.masks.missing_a.bits(), &[false, false, false, true]);
    assert_eq!(result.masks.non_finite_a.bits(), &[false, false, true, false]);
}

// =============================================================================
// Epsilon forms
// =============================================================================

#[test]
fn test_percent_epsilon_scales_with_magnitude() {
    let a = DataSet::from_vec(vec![100.0]);
    let b = DataSet::from_vec(vec![105.0]);

    let stats = report(&a, &b, EpsilonSpec::percent(0.1).unwrap());
    assert_eq!(stats.numerical.diff_outside_epsilon_count, 0);

    let tight = report(&a, &b, EpsilonSpec::percent(0.01).unwrap());
    assert_eq!(tight.numerical.diff_outside_epsilon_count, 1);
}

#[test]
fn test_difference_equal_to_epsilon_is_inside() {
    let a = DataSet::from_vec(vec![1.0]);
    let b = DataSet::from_vec(vec![1.5]);
    let stats = report(&a, &b, EpsilonSpec::Absolute(0.5));
    assert_eq!(stats.numerical.diff_outside_epsilon_count, 0);
}

#[test]
fn test_infinite_values_are_non_finite() {
    let a = DataSet::from_vec(vec![f64::INFINITY, 1.0]);
    let b = DataSet::from_vec(vec![f64::INFINITY, 1.0]);
    let stats = report(&a, &b, EpsilonSpec::default());
    assert_eq!(stats.nan.common_nan_count, 1);
    assert_eq!(stats.general.valid_both_count, 1);
    assert_eq!(stats.numerical.diff_outside_epsilon_count, 0);
}

// =============================================================================
// Empty valid set and ignore masks
// =============================================================================

#[test]
fn test_empty_valid_set_reports_sentinels() {
    let a = DataSet::from_vec(vec![f64::NAN, -999.0]).with_missing_value(Some(-999.0));
    let b = DataSet::from_vec(vec![f64::NAN, 5.0]).with_missing_value(Some(-999.0));
    let stats = report(&a, &b, EpsilonSpec::default());

    assert!(stats.insufficient_valid_data());
    assert_eq!(stats.numerical.diff_outside_epsilon_fraction, 0.0);
    assert_eq!(
        stats.get(NUMERICAL_COMPARISON_STATISTICS, "diff_mean"),
        Some(StatValue::NoValidData)
    );
    assert_eq!(
        stats.get(NUMERICAL_COMPARISON_STATISTICS, "correlation"),
        Some(StatValue::NoValidData)
    );

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json[NUMERICAL_COMPARISON_STATISTICS]["diff_std"], "no valid data");
}

#[test]
fn test_constant_data_correlation_is_undefined() {
    let a = DataSet::from_vec(vec![2.0, 2.0, 2.0]);
    let b = DataSet::from_vec(vec![1.0, 2.0, 3.0]);
    let stats = report(&a, &b, EpsilonSpec::default());
    assert_eq!(
        stats.get(NUMERICAL_COMPARISON_STATISTICS, "correlation"),
        Some(StatValue::Undefined)
    );
}

#[test]
fn test_ignore_mask_excludes_points() {
    let ignore = Mask::new([3], vec![false, true, false]).unwrap();
    let a = DataSet::from_vec(vec![1.0, 50.0, 3.0])
        .with_ignore_mask(ignore.clone())
        .unwrap();
    let b = DataSet::from_vec(vec![1.0, 2.0, 3.0]).with_ignore_mask(ignore).unwrap();
    let stats = report(&a, &b, EpsilonSpec::default());

    assert_eq!(stats.general.valid_both_count, 2);
    assert_eq!(stats.general.spatially_invalid_pts_ignored_in_a, 1);
    assert_eq!(stats.numerical.diff_outside_epsilon_count, 0);
}

#[test]
fn test_row_ignore_mask_broadcasts_over_grid() {
    let row = Mask::new([3], vec![true, false, false]).unwrap();
    let a = DataSet::new(vec![0.0; 6], [2, 3]).unwrap().with_ignore_mask(row).unwrap();
    assert_eq!(a.masks().unwrap().ignore.count(), 2);

    let bad = Mask::new([2], vec![true, false]).unwrap();
    let err = DataSet::new(vec![0.0; 6], [2, 3])
        .unwrap()
        .with_ignore_mask(bad)
        .unwrap_err();
    assert!(matches!(err, GlanceError::ShapeMismatch { .. }));
}

#[test]
fn test_shape_mismatch_fails_before_masking() {
    let a = DataSet::new(vec![0.0; 6], [2, 3]).unwrap();
    let b = DataSet::new(vec![0.0; 6], [3, 2]).unwrap();
    let settings = ResolvedVariable::with_defaults("x", &AnalysisDefaults::default()).unwrap();
    let err = compare_variable(&a, &b, &settings).unwrap_err();
    assert!(matches!(err, GlanceError::ShapeMismatch { .. }));
}
