//! Run configuration for glance comparisons.
//!
//! Settings come either from a YAML file or from command-line options:
//!
//! ```yaml
//! lat_lon:
//!   longitude: pixel_longitude
//!   latitude: pixel_latitude
//!   lon_lat_epsilon: 0.0
//! defaults:
//!   epsilon: 0.0
//!   missing_value: ${GLANCE_MISSING:--999.0}
//! variables:
//!   total_totals_index:
//!     display_name: Total Totals
//!     epsilon: 1.0
//!     epsilon_failure_tolerance: 0.0
//! ```
//!
//! Supports environment variable substitution using ${VAR} syntax.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glance_common::{AnalysisDefaults, LonLatConfig, VariableConfig};
use serde::{Deserialize, Serialize};

/// Everything a comparison run needs to know besides the input files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub lat_lon: LonLatConfig,
    pub defaults: AnalysisDefaults,
    /// Variables to compare, keyed by their name in file A. Empty means
    /// every variable the files share.
    pub variables: BTreeMap<String, VariableConfig>,
}

/// Settings given as command-line options instead of a config file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandLineSettings {
    pub epsilon: Option<f64>,
    pub epsilon_percent: Option<f64>,
    pub missing_value: Option<f64>,
    pub epsilon_failure_tolerance: Option<f64>,
    pub nonfinite_data_tolerance: Option<f64>,
    pub longitude: Option<String>,
    pub latitude: Option<String>,
    pub lon_lat_epsilon: Option<f64>,
}

impl RunConfig {
    pub fn from_command_line(settings: CommandLineSettings) -> Result<Self> {
        let mut lat_lon = LonLatConfig::default();
        if let Some(longitude) = settings.longitude {
            lat_lon.longitude = longitude;
        }
        if let Some(latitude) = settings.latitude {
            lat_lon.latitude = latitude;
        }
        if let Some(eps) = settings.lon_lat_epsilon {
            lat_lon.lon_lat_epsilon = eps;
        }

        let config = Self {
            lat_lon,
            defaults: AnalysisDefaults {
                epsilon: settings.epsilon,
                epsilon_percent: settings.epsilon_percent,
                missing_value: settings.missing_value,
                epsilon_failure_tolerance: settings.epsilon_failure_tolerance,
                nonfinite_data_tolerance: settings.nonfinite_data_tolerance,
            },
            variables: BTreeMap::new(),
        };
        validate_run_config(&config)?;
        Ok(config)
    }
}

// ============================================================================
// Loading Functions
// ============================================================================

/// Load and parse a run configuration with environment variable substitution
pub fn load_run_config<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read run config from {:?}", path.as_ref()))?;

    let expanded = expand_env_vars(&content)?;

    let config: RunConfig = serde_yaml::from_str(&expanded)
        .with_context(|| format!("Failed to parse run config YAML from {:?}", path.as_ref()))?;

    validate_run_config(&config)?;

    Ok(config)
}

/// Expand environment variables in the format ${VAR} or ${VAR:-default}
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            let mut depth = 1;

            while depth > 0 {
                match chars.next() {
                    Some('{') => {
                        depth += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        depth -= 1;
                        if depth > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr))
    }
}

// ============================================================================
// Validation
// ============================================================================

fn validate_run_config(config: &RunConfig) -> Result<()> {
    config
        .lat_lon
        .validate()
        .context("Invalid lat_lon section")?;
    config
        .defaults
        .validate()
        .context("Invalid defaults section")?;

    for (name, variable) in &config.variables {
        anyhow::ensure!(!name.trim().is_empty(), "Variable names cannot be empty");
        anyhow::ensure!(
            variable.alternate_name_in_b.as_deref() != Some(""),
            "Variable {} has an empty alternate_name_in_b",
            name
        );
        variable
            .resolve(name, &config.defaults)
            .with_context(|| format!("Invalid settings for variable {}", name))?;
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_expand_env_vars_simple() {
        std::env::set_var("GLANCE_TEST_VAR", "test_value");
        let result = expand_env_vars("prefix_${GLANCE_TEST_VAR}_suffix").unwrap();
        assert_eq!(result, "prefix_test_value_suffix");
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        std::env::remove_var("GLANCE_NONEXISTENT_VAR");
        let result = expand_env_vars("missing_value: ${GLANCE_NONEXISTENT_VAR:--999.0}").unwrap();
        assert_eq!(result, "missing_value: -999.0");
    }

    #[test]
    fn test_expand_env_vars_missing_required() {
        std::env::remove_var("GLANCE_REQUIRED_VAR");
        assert!(expand_env_vars("${GLANCE_REQUIRED_VAR}").is_err());
        assert!(expand_env_vars("${UNCLOSED").is_err());
    }

    #[test]
    fn test_resolve_var_expr_override_default() {
        std::env::set_var("GLANCE_SET_VAR", "0.25");
        assert_eq!(resolve_var_expr("GLANCE_SET_VAR:-0.0").unwrap(), "0.25");
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
lat_lon:
  longitude: lon
  latitude: lat
  longitude_alt_name_in_b: longitude
  lon_lat_epsilon: 0.001
defaults:
  epsilon: 0.0
  missing_value: -999.0
  nonfinite_data_tolerance: 0.02
variables:
  total_totals_index:
    display_name: Total Totals
    epsilon: 1.0
    epsilon_failure_tolerance: 0.0
  cloud_mask:
    alternate_name_in_b: cloud_mask_b
    nonfinite_data_tolerance: ~
"#,
        );

        let config = load_run_config(file.path()).unwrap();
        assert_eq!(config.lat_lon.longitude, "lon");
        assert_eq!(config.lat_lon.b_longitude(), "longitude");
        assert_eq!(config.lat_lon.b_latitude(), "lat");
        assert_eq!(config.defaults.missing_value, Some(-999.0));
        assert_eq!(config.variables.len(), 2);

        let tti = config.variables["total_totals_index"]
            .resolve("total_totals_index", &config.defaults)
            .unwrap();
        assert_eq!(tti.display_name, "Total Totals");
        assert_eq!(tti.tolerance.epsilon_failure_tolerance(), Some(0.0));
        assert_eq!(tti.tolerance.nonfinite_data_tolerance(), Some(0.02));

        let mask = config.variables["cloud_mask"]
            .resolve("cloud_mask", &config.defaults)
            .unwrap();
        assert_eq!(mask.tolerance.nonfinite_data_tolerance(), None);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let file = write_config("{}\n");
        let config = load_run_config(file.path()).unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.lat_lon.longitude, "pixel_longitude");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let negative = write_config("defaults:\n  epsilon: -1.0\n");
        assert!(load_run_config(negative.path()).is_err());

        let tolerance = write_config("variables:\n  x:\n    epsilon_failure_tolerance: 1.5\n");
        assert!(load_run_config(tolerance.path()).is_err());

        let both = write_config("defaults:\n  epsilon: 0.1\n  epsilon_percent: 0.1\n");
        assert!(load_run_config(both.path()).is_err());

        let unknown = write_config("defaults:\n  epsilonn: 0.1\n");
        assert!(load_run_config(unknown.path()).is_err());
    }

    #[test]
    fn test_from_command_line() {
        let config = RunConfig::from_command_line(CommandLineSettings {
            epsilon: Some(0.5),
            missing_value: Some(-9999.0),
            latitude: Some("lat".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(config.defaults.epsilon, Some(0.5));
        assert_eq!(config.lat_lon.latitude, "lat");
        assert_eq!(config.lat_lon.longitude, "pixel_longitude");
        assert!(config.variables.is_empty());

        assert!(RunConfig::from_command_line(CommandLineSettings {
            lon_lat_epsilon: Some(-1.0),
            ..Default::default()
        })
        .is_err());
    }
}
