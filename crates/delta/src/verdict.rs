//! Pass/fail evaluation against configured tolerances.

use glance_common::ToleranceConfig;
use serde::Serialize;

use crate::stats::{fraction, StatisticsReport};

/// Outcome for one variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    /// No tolerance was configured.
    NotEvaluated,
}

impl Verdict {
    pub fn did_pass(&self) -> Option<bool> {
        match self {
            Verdict::Pass => Some(true),
            Verdict::Fail => Some(false),
            Verdict::NotEvaluated => None,
        }
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Verdict::Fail)
    }
}

impl From<Option<bool>> for Verdict {
    fn from(did_pass: Option<bool>) -> Self {
        match did_pass {
            Some(true) => Verdict::Pass,
            Some(false) => Verdict::Fail,
            None => Verdict::NotEvaluated,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Pass => "pass",
            Verdict::Fail => "fail",
            Verdict::NotEvaluated => "not evaluated",
        };
        write!(f, "{}", s)
    }
}

/// Verdict together with the individual checks behind it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    pub verdict: Verdict,
    /// `None` when no epsilon failure tolerance is configured.
    pub epsilon_check: Option<bool>,
    /// `None` when no non-finite data tolerance is configured.
    pub nonfinite_check: Option<bool>,
    /// Finite-in-only-one, common-missing and common-NaN points over all points.
    pub non_finite_fraction: f64,
    /// The verdict rests on an empty valid-both set.
    pub low_confidence: bool,
}

/// Evaluate a report against a tolerance configuration.
pub fn evaluate(stats: &StatisticsReport, tolerance: &ToleranceConfig) -> Verdict {
    evaluate_detailed(stats, tolerance).verdict
}

/// Like [`evaluate`], keeping each check's result.
///
/// An unset tolerance skips its check rather than failing it; with both set
/// the verdict is the conjunction.
pub fn evaluate_detailed(stats: &StatisticsReport, tolerance: &ToleranceConfig) -> Evaluation {
    let epsilon_check = tolerance
        .epsilon_failure_tolerance()
        .map(|limit| stats.numerical.diff_outside_epsilon_fraction <= limit);

    let non_finite_points = stats.finite.finite_in_only_one_count
        + stats.missing.common_missing_count
        + stats.nan.common_nan_count;
    let non_finite_fraction = fraction(non_finite_points, stats.general.num_data_points);
    let nonfinite_check = tolerance
        .nonfinite_data_tolerance()
        .map(|limit| non_finite_fraction <= limit);

    let did_pass = match (epsilon_check, nonfinite_check) {
        (None, None) => None,
        (Some(e), None) => Some(e),
        (None, Some(n)) => Some(n),
        (Some(e), Some(n)) => Some(e && n),
    };

    Evaluation {
        verdict: Verdict::from(did_pass),
        epsilon_check,
        nonfinite_check,
        non_finite_fraction,
        low_confidence: epsilon_check.is_some() && stats.insufficient_valid_data(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compute_diff, summarize, DataSet};
    use glance_common::EpsilonSpec;

    fn scenario_stats() -> StatisticsReport {
        let a = DataSet::from_vec(vec![1.0, 2.0, f64::NAN, -999.0]).with_missing_value(Some(-999.0));
        let b = DataSet::from_vec(vec![1.0, 2.5, 3.0, -999.0]).with_missing_value(Some(-999.0));
        let (ma, mb) = (a.masks().unwrap(), b.masks().unwrap());
        let diff = compute_diff(&a, &b, &ma, &mb, EpsilonSpec::Absolute(0.1)).unwrap();
        summarize(&a, &b, &ma, &mb, &diff).unwrap()
    }

    #[test]
    fn test_no_tolerance_is_not_evaluated() {
        let verdict = evaluate(&scenario_stats(), &ToleranceConfig::unset());
        assert_eq!(verdict, Verdict::NotEvaluated);
        assert_eq!(verdict.did_pass(), None);
    }

    #[test]
    fn test_epsilon_only() {
        let stats = scenario_stats();
        let pass = ToleranceConfig::new(Some(0.6), None).unwrap();
        assert_eq!(evaluate(&stats, &pass), Verdict::Pass);

        let boundary = ToleranceConfig::new(Some(0.5), None).unwrap();
        assert_eq!(evaluate(&stats, &boundary), Verdict::Pass);

        let fail = ToleranceConfig::new(Some(0.4), None).unwrap();
        assert_eq!(evaluate(&stats, &fail), Verdict::Fail);
    }

    #[test]
    fn test_nonfinite_only() {
        // (1 finite-in-only-one + 1 common missing + 0 common nan) / 4 = 0.5
        let stats = scenario_stats();
        let detailed =
            evaluate_detailed(&stats, &ToleranceConfig::new(None, Some(0.5)).unwrap());
        assert_eq!(detailed.non_finite_fraction, 0.5);
        assert_eq!(detailed.verdict, Verdict::Pass);
        assert_eq!(detailed.epsilon_check, None);

        let fail = ToleranceConfig::new(None, Some(0.25)).unwrap();
        assert_eq!(evaluate(&stats, &fail), Verdict::Fail);
    }

    #[test]
    fn test_both_checks_are_combined() {
        let stats = scenario_stats();
        let tol = ToleranceConfig::new(Some(0.6), Some(0.1)).unwrap();
        let detailed = evaluate_detailed(&stats, &tol);
        assert_eq!(detailed.epsilon_check, Some(true));
        assert_eq!(detailed.nonfinite_check, Some(false));
        assert_eq!(detailed.verdict, Verdict::Fail);
    }

    #[test]
    fn test_empty_valid_set_is_low_confidence() {
        let a = DataSet::from_vec(vec![f64::NAN]);
        let b = DataSet::from_vec(vec![f64::NAN]);
        let (ma, mb) = (a.masks().unwrap(), b.masks().unwrap());
        let diff = compute_diff(&a, &b, &ma, &mb, EpsilonSpec::default()).unwrap();
        let stats = summarize(&a, &b, &ma, &mb, &diff).unwrap();

        let detailed =
            evaluate_detailed(&stats, &ToleranceConfig::new(Some(0.0), None).unwrap());
        assert_eq!(detailed.verdict, Verdict::Pass);
        assert!(detailed.low_confidence);
    }
}
