//! Typed configuration for variable comparisons.
//!
//! Every comparison setting lives in an explicit, validated record. There are
//! no process-wide defaults: callers build an [`AnalysisDefaults`] once and
//! resolve each [`VariableConfig`] against it.

use crate::error::{GlanceError, GlanceResult};
use serde::{Deserialize, Deserializer, Serialize};

/// Longitude variable compared when none is configured.
pub const DEFAULT_LONGITUDE_NAME: &str = "pixel_longitude";

/// Latitude variable compared when none is configured.
pub const DEFAULT_LATITUDE_NAME: &str = "pixel_latitude";

// ============================================================================
// Epsilon
// ============================================================================

/// Threshold below which two values count as equal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EpsilonSpec {
    /// Constant threshold on `|a - b|`.
    Absolute(f64),
    /// Fraction of `max(|a|, |b|)` at each point (0.01 = 1%).
    Percent(f64),
}

impl Default for EpsilonSpec {
    fn default() -> Self {
        Self::Absolute(0.0)
    }
}

impl EpsilonSpec {
    /// Absolute epsilon; must be finite and non-negative.
    pub fn absolute(value: f64) -> GlanceResult<Self> {
        check_non_negative("epsilon", value)?;
        Ok(Self::Absolute(value))
    }

    /// Percent epsilon expressed as a fraction; must be finite and non-negative.
    pub fn percent(value: f64) -> GlanceResult<Self> {
        check_non_negative("epsilon_percent", value)?;
        Ok(Self::Percent(value))
    }

    /// Build from the two optional config fields. Setting both is an error,
    /// setting neither yields `None`.
    pub fn from_fields(
        epsilon: Option<f64>,
        epsilon_percent: Option<f64>,
    ) -> GlanceResult<Option<Self>> {
        match (epsilon, epsilon_percent) {
            (Some(_), Some(_)) => Err(GlanceError::invalid_config(
                "epsilon",
                "epsilon and epsilon_percent are mutually exclusive",
            )),
            (Some(e), None) => Self::absolute(e).map(Some),
            (None, Some(p)) => Self::percent(p).map(Some),
            (None, None) => Ok(None),
        }
    }

    /// Effective threshold for the pair `(a, b)`.
    #[inline]
    pub fn threshold(&self, a: f64, b: f64) -> f64 {
        match *self {
            Self::Absolute(eps) => eps,
            Self::Percent(fraction) => fraction * a.abs().max(b.abs()),
        }
    }

    /// The configured number, regardless of kind.
    pub fn value(&self) -> f64 {
        match *self {
            Self::Absolute(v) | Self::Percent(v) => v,
        }
    }

    pub fn is_percent(&self) -> bool {
        matches!(self, Self::Percent(_))
    }
}

impl std::fmt::Display for EpsilonSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absolute(v) => write!(f, "{}", v),
            Self::Percent(v) => write!(f, "{}%", v * 100.0),
        }
    }
}

// ============================================================================
// Tolerances
// ============================================================================

/// Pass/fail tolerances for one variable. `None` disables that check.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ToleranceConfig {
    epsilon_failure_tolerance: Option<f64>,
    nonfinite_data_tolerance: Option<f64>,
}

impl ToleranceConfig {
    /// Both values, when set, must lie in [0, 1].
    pub fn new(
        epsilon_failure_tolerance: Option<f64>,
        nonfinite_data_tolerance: Option<f64>,
    ) -> GlanceResult<Self> {
        if let Some(v) = epsilon_failure_tolerance {
            check_unit_interval("epsilon_failure_tolerance", v)?;
        }
        if let Some(v) = nonfinite_data_tolerance {
            check_unit_interval("nonfinite_data_tolerance", v)?;
        }
        Ok(Self {
            epsilon_failure_tolerance,
            nonfinite_data_tolerance,
        })
    }

    /// No checks configured.
    pub fn unset() -> Self {
        Self::default()
    }

    /// Max allowed fraction of valid-both points outside epsilon.
    pub fn epsilon_failure_tolerance(&self) -> Option<f64> {
        self.epsilon_failure_tolerance
    }

    /// Max allowed fraction of finite-in-only-one, common-missing and
    /// common-NaN points.
    pub fn nonfinite_data_tolerance(&self) -> Option<f64> {
        self.nonfinite_data_tolerance
    }

    pub fn is_unset(&self) -> bool {
        self.epsilon_failure_tolerance.is_none() && self.nonfinite_data_tolerance.is_none()
    }
}

// ============================================================================
// Defaults and per-variable records
// ============================================================================

/// Settings applied to every variable that does not override them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisDefaults {
    pub epsilon: Option<f64>,
    pub epsilon_percent: Option<f64>,
    pub missing_value: Option<f64>,
    pub epsilon_failure_tolerance: Option<f64>,
    pub nonfinite_data_tolerance: Option<f64>,
}

impl AnalysisDefaults {
    /// Validate every field.
    pub fn validate(&self) -> GlanceResult<()> {
        self.epsilon_spec()?;
        self.tolerance()?;
        Ok(())
    }

    /// Default epsilon; absolute 0.0 when nothing is configured.
    pub fn epsilon_spec(&self) -> GlanceResult<EpsilonSpec> {
        Ok(EpsilonSpec::from_fields(self.epsilon, self.epsilon_percent)?.unwrap_or_default())
    }

    pub fn tolerance(&self) -> GlanceResult<ToleranceConfig> {
        ToleranceConfig::new(self.epsilon_failure_tolerance, self.nonfinite_data_tolerance)
    }
}

/// Per-variable overrides.
///
/// Tolerances distinguish "absent" (inherit the default) from an explicit
/// `null` (disable the check for this variable).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VariableConfig {
    pub display_name: Option<String>,
    pub alternate_name_in_b: Option<String>,
    pub epsilon: Option<f64>,
    pub epsilon_percent: Option<f64>,
    pub missing_value: Option<f64>,
    pub missing_value_alt_in_b: Option<f64>,
    #[serde(deserialize_with = "explicit_option")]
    pub epsilon_failure_tolerance: Option<Option<f64>>,
    #[serde(deserialize_with = "explicit_option")]
    pub nonfinite_data_tolerance: Option<Option<f64>>,
}

impl VariableConfig {
    /// Merge with `defaults` and validate.
    pub fn resolve(&self, name: &str, defaults: &AnalysisDefaults) -> GlanceResult<ResolvedVariable> {
        let epsilon = match EpsilonSpec::from_fields(self.epsilon, self.epsilon_percent)? {
            Some(spec) => spec,
            None => defaults.epsilon_spec()?,
        };

        let tolerance = ToleranceConfig::new(
            self.epsilon_failure_tolerance
                .unwrap_or(defaults.epsilon_failure_tolerance),
            self.nonfinite_data_tolerance
                .unwrap_or(defaults.nonfinite_data_tolerance),
        )?;

        let missing_value = self.missing_value.or(defaults.missing_value);

        Ok(ResolvedVariable {
            variable_name: name.to_string(),
            b_variable_name: self
                .alternate_name_in_b
                .clone()
                .unwrap_or_else(|| name.to_string()),
            display_name: self.display_name.clone().unwrap_or_else(|| name.to_string()),
            epsilon,
            missing_value,
            missing_value_alt_in_b: self.missing_value_alt_in_b.or(missing_value),
            tolerance,
        })
    }

    /// Resolve a variable listed in a run configuration.
    ///
    /// Each side's unset missing value comes from its own file: B never
    /// inherits A's configured sentinel, only an explicit
    /// `missing_value_alt_in_b`.
    pub fn resolve_for_files(
        &self,
        name: &str,
        defaults: &AnalysisDefaults,
        file_a_missing: Option<f64>,
        file_b_missing: Option<f64>,
    ) -> GlanceResult<ResolvedVariable> {
        let mut resolved = self.resolve(name, defaults)?;
        resolved.missing_value_alt_in_b = self.missing_value_alt_in_b;
        Ok(resolved.with_file_missing_values(file_a_missing, file_b_missing))
    }
}

/// Fully merged, validated settings for one variable comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedVariable {
    pub variable_name: String,
    pub b_variable_name: String,
    pub display_name: String,
    pub epsilon: EpsilonSpec,
    pub missing_value: Option<f64>,
    pub missing_value_alt_in_b: Option<f64>,
    pub tolerance: ToleranceConfig,
}

impl ResolvedVariable {
    /// Settings with all defaults and no overrides.
    pub fn with_defaults(name: &str, defaults: &AnalysisDefaults) -> GlanceResult<Self> {
        VariableConfig::default().resolve(name, defaults)
    }

    /// Fill unset missing values from the files' own attributes.
    pub fn with_file_missing_values(mut self, file_a: Option<f64>, file_b: Option<f64>) -> Self {
        if self.missing_value.is_none() {
            self.missing_value = file_a;
        }
        if self.missing_value_alt_in_b.is_none() {
            self.missing_value_alt_in_b = file_b;
        }
        self
    }

    pub fn has_alternate_b_name(&self) -> bool {
        self.b_variable_name != self.variable_name
    }

    /// Label such as `Total Totals (tti / tti_b)`.
    pub fn explanation_name(&self) -> String {
        if self.has_alternate_b_name() {
            format!(
                "{} ({} / {})",
                self.display_name, self.variable_name, self.b_variable_name
            )
        } else {
            format!("{} ({})", self.display_name, self.variable_name)
        }
    }
}

// ============================================================================
// Longitude / latitude
// ============================================================================

/// Which variables hold geolocation, and how strictly they must agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LonLatConfig {
    pub longitude: String,
    pub latitude: String,
    pub longitude_alt_name_in_b: Option<String>,
    pub latitude_alt_name_in_b: Option<String>,
    pub lon_lat_epsilon: f64,
}

impl Default for LonLatConfig {
    fn default() -> Self {
        Self {
            longitude: DEFAULT_LONGITUDE_NAME.to_string(),
            latitude: DEFAULT_LATITUDE_NAME.to_string(),
            longitude_alt_name_in_b: None,
            latitude_alt_name_in_b: None,
            lon_lat_epsilon: 0.0,
        }
    }
}

impl LonLatConfig {
    pub fn validate(&self) -> GlanceResult<()> {
        if self.longitude.is_empty() {
            return Err(GlanceError::invalid_config("longitude", "must not be empty"));
        }
        if self.latitude.is_empty() {
            return Err(GlanceError::invalid_config("latitude", "must not be empty"));
        }
        check_non_negative("lon_lat_epsilon", self.lon_lat_epsilon)
    }

    pub fn b_longitude(&self) -> &str {
        self.longitude_alt_name_in_b.as_deref().unwrap_or(&self.longitude)
    }

    pub fn b_latitude(&self) -> &str {
        self.latitude_alt_name_in_b.as_deref().unwrap_or(&self.latitude)
    }

    /// True if `name` is one of the geolocation variables in either file.
    pub fn is_geolocation(&self, name: &str) -> bool {
        name == self.longitude
            || name == self.latitude
            || name == self.b_longitude()
            || name == self.b_latitude()
    }
}

// ============================================================================
// Validation helpers
// ============================================================================

fn check_non_negative(field: &str, value: f64) -> GlanceResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(GlanceError::invalid_config(
            field,
            format!("must be a finite value >= 0, got {}", value),
        ));
    }
    Ok(())
}

fn check_unit_interval(field: &str, value: f64) -> GlanceResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(GlanceError::invalid_config(
            field,
            format!("must be within [0, 1], got {}", value),
        ));
    }
    Ok(())
}

/// Present-but-null deserializes to `Some(None)`; absence is handled by
/// `#[serde(default)]`.
fn explicit_option<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}
