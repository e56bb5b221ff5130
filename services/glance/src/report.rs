//! The machine-readable comparison report.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use delta::{VariableComparison, Verdict};
use glance_common::{AnalysisDefaults, GlanceResult, LonLatConfig};
use serde::Serialize;
use tracing::info;

use crate::compare::GeolocationAnalysis;
use crate::names::NameComparison;
use crate::sources::FileInfo;

pub const REPORT_FILE_NAME: &str = "report.json";

/// Who ran the comparison, when, and with which global settings.
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub version: String,
    pub time: DateTime<Utc>,
    pub machine: Option<String>,
    pub user: Option<String>,
    pub used_config_file: bool,
    pub lat_lon: LonLatConfig,
    pub defaults: AnalysisDefaults,
    pub short_circuit_diffs: bool,
}

impl RunInfo {
    pub fn new(lat_lon: LonLatConfig, defaults: AnalysisDefaults, used_config_file: bool) -> Self {
        Self {
            version: format!("glance, version {}", env!("CARGO_PKG_VERSION")),
            time: Utc::now(),
            machine: std::env::var("HOSTNAME").ok(),
            user: std::env::var("USER").ok(),
            used_config_file,
            lat_lon,
            defaults,
            short_circuit_diffs: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InputFiles {
    pub file_a: FileInfo,
    pub file_b: FileInfo,
}

/// Report entry for one variable.
#[derive(Debug, Clone, Serialize)]
pub struct VariableReport {
    pub explanation_name: String,
    pub verdict: Verdict,
    /// Share of valid-in-both points within epsilon, in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_epsilon_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<VariableComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VariableReport {
    pub fn from_result(name: &str, result: GlanceResult<VariableComparison>) -> Self {
        match result {
            Ok(comparison) => Self {
                explanation_name: comparison.settings.explanation_name(),
                verdict: comparison.verdict(),
                pass_epsilon_percent: Some(
                    (1.0 - comparison.stats.numerical.diff_outside_epsilon_fraction) * 100.0,
                ),
                comparison: Some(comparison),
                error: None,
            },
            Err(e) => Self {
                explanation_name: name.to_string(),
                verdict: Verdict::NotEvaluated,
                pass_epsilon_percent: None,
                comparison: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Everything written for one run.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub run_info: RunInfo,
    pub files: InputFiles,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spatial: Option<GeolocationAnalysis>,
    pub names: NameComparison,
    pub variables: BTreeMap<String, VariableReport>,
}

impl ComparisonReport {
    pub fn new(
        mut run_info: RunInfo,
        files: InputFiles,
        spatial: Option<GeolocationAnalysis>,
        names: NameComparison,
        results: BTreeMap<String, GlanceResult<VariableComparison>>,
    ) -> Self {
        run_info.short_circuit_diffs = spatial.as_ref().is_some_and(|s| s.short_circuit_diffs);
        let variables = results
            .into_iter()
            .map(|(name, result)| {
                let entry = VariableReport::from_result(&name, result);
                (name, entry)
            })
            .collect();
        Self {
            run_info,
            files,
            spatial,
            names,
            variables,
        }
    }

    /// No evaluated variable failed.
    pub fn all_passed(&self) -> bool {
        !self.variables.values().any(|v| v.verdict.is_fail())
    }

    pub fn failed_variables(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|(_, v)| v.verdict.is_fail())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Write `report.json` into `output_dir`, creating the directory if
    /// needed.
    pub fn write_to(&self, output_dir: &Path) -> GlanceResult<PathBuf> {
        if !output_dir.is_dir() {
            info!(path = %output_dir.display(), "Creating output directory");
            fs::create_dir_all(output_dir)?;
        }
        let path = output_dir.join(REPORT_FILE_NAME);
        let file = fs::File::create(&path)?;
        serde_json::to_writer_pretty(file, self)?;
        info!(path = %path.display(), variables = self.variables.len(), "Wrote report");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delta::{compare_variable, DataSet};
    use glance_common::{GlanceError, ResolvedVariable};

    fn comparison(epsilon_failure_tolerance: f64) -> VariableComparison {
        let defaults = AnalysisDefaults {
            epsilon: Some(0.1),
            epsilon_failure_tolerance: Some(epsilon_failure_tolerance),
            ..Default::default()
        };
        let settings = ResolvedVariable::with_defaults("tpw", &defaults).unwrap();
        let a = DataSet::from_vec(vec![1.0, 2.0]);
        let b = DataSet::from_vec(vec![1.0, 2.5]);
        compare_variable(&a, &b, &settings).unwrap()
    }

    fn report(results: BTreeMap<String, GlanceResult<VariableComparison>>) -> ComparisonReport {
        let info = FileInfo {
            path: "a.json".to_string(),
            size_bytes: 0,
            last_modified: None,
        };
        ComparisonReport::new(
            RunInfo::new(LonLatConfig::default(), AnalysisDefaults::default(), false),
            InputFiles {
                file_a: info.clone(),
                file_b: info,
            },
            None,
            NameComparison::default(),
            results,
        )
    }

    #[test]
    fn test_variable_report_from_success() {
        let entry = VariableReport::from_result("tpw", Ok(comparison(0.6)));
        assert_eq!(entry.verdict, Verdict::Pass);
        assert_eq!(entry.pass_epsilon_percent, Some(50.0));
        assert_eq!(entry.explanation_name, "tpw (tpw)");
    }

    #[test]
    fn test_errors_do_not_fail_the_run() {
        let results = BTreeMap::from([
            ("tpw".to_string(), Ok(comparison(0.6))),
            (
                "bad".to_string(),
                Err(GlanceError::VariableNotFound("bad".to_string())),
            ),
        ]);
        let report = report(results);
        assert!(report.all_passed());
        assert_eq!(report.variables["bad"].verdict, Verdict::NotEvaluated);
        assert!(report.variables["bad"].error.is_some());
    }

    #[test]
    fn test_failed_variables() {
        let results = BTreeMap::from([("tpw".to_string(), Ok(comparison(0.1)))]);
        let report = report(results);
        assert!(!report.all_passed());
        assert_eq!(report.failed_variables(), vec!["tpw"]);
    }

    #[test]
    fn test_write_report_json() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/output");
        let results = BTreeMap::from([("tpw".to_string(), Ok(comparison(0.6)))]);

        let path = report(results).write_to(&out).unwrap();
        assert!(path.ends_with(REPORT_FILE_NAME));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["variables"]["tpw"]["verdict"], "pass");
        assert_eq!(
            json["variables"]["tpw"]["comparison"]["stats"]["Numerical Comparison Statistics"]
                ["diff_outside_epsilon_fraction"],
            0.5
        );
        assert_eq!(json["run_info"]["short_circuit_diffs"], false);
        assert!(json.get("spatial").is_none());
    }
}
