//! Judging a product against truth, with a noise-added copy of truth as the
//! baseline.
//!
//! Each selected variable is compared twice: truth against the actual
//! product, and truth against the noise file. The actual product is doing
//! well when its difference from truth is small relative to the noise.

use std::collections::BTreeMap;

use delta::{compare_all, DataSet, VariableComparison, VariableJob};
use glance_common::{AnalysisDefaults, GlanceError, GlanceResult, ResolvedVariable};
use serde::Serialize;
use tracing::{info, warn};

use crate::compare::load_pair;
use crate::names::{check_file_names, resolve_selected, Selector};
use crate::sources::DataFile;

/// Headline numbers of a noise check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoiseSummary {
    pub actual_diff_rms: Option<f64>,
    pub noise_diff_rms: Option<f64>,
    pub actual_correlation: Option<f64>,
    pub noise_correlation: Option<f64>,
    /// Actual RMS over noise RMS; below 1 the actual product is closer to
    /// truth than the noise baseline. `None` when the noise RMS is zero or
    /// either RMS is unavailable.
    pub rms_ratio: Option<f64>,
}

impl NoiseSummary {
    pub fn new(actual: &VariableComparison, noise: &VariableComparison) -> Self {
        let actual_diff_rms = actual.stats.numerical.diff_rms;
        let noise_diff_rms = noise.stats.numerical.diff_rms;
        let rms_ratio = match (actual_diff_rms, noise_diff_rms) {
            (Some(a), Some(n)) if n > 0.0 && (a / n).is_finite() => Some(a / n),
            _ => None,
        };

        Self {
            actual_diff_rms,
            noise_diff_rms,
            actual_correlation: actual.stats.numerical.correlation,
            noise_correlation: noise.stats.numerical.correlation,
            rms_ratio,
        }
    }

    /// `(name, value)` rows in display order.
    pub fn rows(&self) -> [(&'static str, Option<f64>); 5] {
        [
            ("actual_correlation", self.actual_correlation),
            ("actual_diff_rms", self.actual_diff_rms),
            ("noise_correlation", self.noise_correlation),
            ("noise_diff_rms", self.noise_diff_rms),
            ("rms_ratio", self.rms_ratio),
        ]
    }
}

/// Both comparisons for one variable.
#[derive(Debug, Clone, Serialize)]
pub struct NoiseCheck {
    pub summary: NoiseSummary,
    pub actual: VariableComparison,
    pub noise: VariableComparison,
}

impl NoiseCheck {
    pub fn new(actual: VariableComparison, noise: VariableComparison) -> Self {
        Self {
            summary: NoiseSummary::new(&actual, &noise),
            actual,
            noise,
        }
    }
}

/// Run the noise check over every variable shared by `truth` and `actual`
/// that a selector matches.
///
/// The noise side uses the selector's missing value when one is given and
/// the noise file's own otherwise. A variable absent from the noise file,
/// or shaped differently there, is an error for that variable only.
pub fn noise_check(
    truth: &dyn DataFile,
    noise: &dyn DataFile,
    actual: &dyn DataFile,
    selectors: &[Selector],
    defaults: &AnalysisDefaults,
) -> GlanceResult<BTreeMap<String, GlanceResult<NoiseCheck>>> {
    let names = check_file_names(truth, actual);
    let actual_settings = resolve_selected(&names, selectors, defaults, truth, actual)?;
    let noise_settings = resolve_selected(&names, selectors, defaults, truth, noise)?;

    let mut actual_jobs = Vec::with_capacity(actual_settings.len());
    let mut noise_jobs = Vec::with_capacity(noise_settings.len());
    let mut errors = BTreeMap::new();

    for (settings, noise_side) in actual_settings.into_iter().zip(noise_settings) {
        match load_triple(truth, noise, actual, &settings) {
            Ok((truth_data, noise_data, actual_data)) => {
                actual_jobs.push(VariableJob::new(truth_data.clone(), actual_data, settings));
                noise_jobs.push(VariableJob::new(truth_data, noise_data, noise_side));
            }
            Err(e) => {
                warn!(variable = %settings.variable_name, error = %e, "Variable could not be noise checked");
                errors.insert(settings.variable_name, e);
            }
        }
    }

    let mut noise_results = compare_all(noise_jobs);
    let mut results: BTreeMap<String, GlanceResult<NoiseCheck>> = compare_all(actual_jobs)
        .into_iter()
        .map(|(name, actual_result)| {
            let noise_result = noise_results.remove(&name).unwrap_or_else(|| {
                Err(GlanceError::InternalError(format!(
                    "no noise comparison for '{}'",
                    name
                )))
            });
            let check = actual_result.and_then(|a| noise_result.map(|n| NoiseCheck::new(a, n)));
            (name, check)
        })
        .collect();
    results.extend(errors.into_iter().map(|(name, e)| (name, Err(e))));

    info!(variables = results.len(), "Noise check complete");
    Ok(results)
}

fn load_triple(
    truth: &dyn DataFile,
    noise: &dyn DataFile,
    actual: &dyn DataFile,
    settings: &ResolvedVariable,
) -> GlanceResult<(DataSet, DataSet, DataSet)> {
    let (truth_data, actual_data) = load_pair(truth, actual, settings, None)?;
    let noise_data = noise.read(&settings.variable_name)?;
    if noise_data.shape() != truth_data.shape() {
        return Err(GlanceError::shape_mismatch(
            format!("variable '{}' truth/noise data", settings.variable_name),
            truth_data.shape().dims(),
            noise_data.shape().dims(),
        ));
    }
    Ok((truth_data, noise_data, actual_data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::parse_selectors;
    use crate::sources::JsonDataFile;
    use std::path::Path;

    fn write(dir: &Path, name: &str, variables: serde_json::Value) -> JsonDataFile {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::json!({ "variables": variables }).to_string()).unwrap();
        JsonDataFile::open(path).unwrap()
    }

    fn files(dir: &Path) -> (JsonDataFile, JsonDataFile, JsonDataFile) {
        let truth = write(
            dir,
            "truth.json",
            serde_json::json!({
                "lst": {"shape": [4], "data": [1.0, 2.0, 3.0, 4.0]},
                "cth": {"shape": [2], "data": [10.0, 20.0]},
                "sst": {"shape": [2], "data": [280.0, -1.0], "missing_value": -1.0}
            }),
        );
        let noise = write(
            dir,
            "noise.json",
            serde_json::json!({
                "lst": {"shape": [4], "data": [1.5, 2.5, 3.5, 4.5]},
                "sst": {"shape": [2], "data": [281.0, -2.0], "missing_value": -2.0}
            }),
        );
        let actual = write(
            dir,
            "actual.json",
            serde_json::json!({
                "lst": {"shape": [4], "data": [1.0, 2.0, 3.0, 4.1]},
                "cth": {"shape": [2], "data": [10.0, 21.0]},
                "sst": {"shape": [2], "data": [280.0, -1.0], "missing_value": -1.0}
            }),
        );
        (truth, noise, actual)
    }

    #[test]
    fn test_rms_ratio_against_noise_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let (truth, noise, actual) = files(dir.path());
        let selectors = parse_selectors(&["lst".to_string()]).unwrap();

        let results =
            noise_check(&truth, &noise, &actual, &selectors, &AnalysisDefaults::default()).unwrap();
        assert_eq!(results.len(), 1);

        let lst = results["lst"].as_ref().unwrap();
        assert!((lst.summary.noise_diff_rms.unwrap() - 0.5).abs() < 1e-12);
        assert!((lst.summary.actual_diff_rms.unwrap() - 0.05).abs() < 1e-9);
        assert!((lst.summary.rms_ratio.unwrap() - 0.1).abs() < 1e-9);
        assert!(lst.summary.noise_correlation.unwrap() > 0.999);
        assert_eq!(lst.actual.stats.numerical.diff_outside_epsilon_count, 1);
        assert_eq!(lst.noise.stats.numerical.diff_outside_epsilon_count, 4);
    }

    #[test]
    fn test_variable_missing_from_noise_file() {
        let dir = tempfile::tempdir().unwrap();
        let (truth, noise, actual) = files(dir.path());
        let selectors = parse_selectors(&[]).unwrap();

        let results =
            noise_check(&truth, &noise, &actual, &selectors, &AnalysisDefaults::default()).unwrap();
        assert_eq!(results.len(), 3);
        assert!(matches!(results["cth"], Err(GlanceError::VariableNotFound(_))));
        assert!(results["lst"].is_ok());
    }

    #[test]
    fn test_noise_side_uses_noise_file_missing_value() {
        let dir = tempfile::tempdir().unwrap();
        let (truth, noise, actual) = files(dir.path());
        let selectors = parse_selectors(&["sst".to_string()]).unwrap();

        let results =
            noise_check(&truth, &noise, &actual, &selectors, &AnalysisDefaults::default()).unwrap();
        let sst = results["sst"].as_ref().unwrap();
        assert_eq!(sst.noise.stats.missing.common_missing_count, 1);
        assert_eq!(sst.actual.stats.missing.common_missing_count, 1);
        // Identical valid data gives a zero actual RMS.
        assert_eq!(sst.summary.actual_diff_rms, Some(0.0));
        assert_eq!(sst.summary.rms_ratio, Some(0.0));
    }
}
