//! Orchestration of a two-file comparison: geolocation checks, variable
//! loading and the parallel per-variable batch.

use std::collections::BTreeMap;

use delta::{
    check_lon_lat_equality, compare_all, compare_spatial_invalidity, spatial_invalidity, DataSet,
    LonLatEquality, Mask, Shape, SpatialComparison, SpatialSummary, VariableComparison,
    VariableJob,
};
use glance_common::{GlanceError, GlanceResult, LonLatConfig, ResolvedVariable};
use serde::Serialize;
use tracing::{info, warn};

use crate::config_loader::RunConfig;
use crate::names::{resolve_configured, resolve_selected, NameComparison, Selector};
use crate::sources::DataFile;

/// Where the variable list comes from.
#[derive(Debug, Clone)]
pub enum Selection {
    /// The run configuration's `variables` section.
    Configured,
    /// Command-line selectors over the shared variables.
    Patterns(Vec<Selector>),
}

pub fn select_variables(
    config: &RunConfig,
    selection: &Selection,
    names: &NameComparison,
    a: &dyn DataFile,
    b: &dyn DataFile,
) -> GlanceResult<Vec<ResolvedVariable>> {
    match selection {
        Selection::Configured => {
            resolve_configured(names, &config.variables, &config.defaults, a, b)
        }
        Selection::Patterns(selectors) => {
            resolve_selected(names, selectors, &config.defaults, a, b)
        }
    }
}

// ============================================================================
// Geolocation
// ============================================================================

/// Geolocation analysis shared by every variable of a run.
#[derive(Debug, Clone, Serialize)]
pub struct GeolocationAnalysis {
    pub file_a: SpatialSummary,
    pub file_b: SpatialSummary,
    pub lon_lat_equality: LonLatEquality,
    pub spatial_comparison: SpatialComparison,
    /// Longitude/latitude disagree, so per-point difference imagery cannot
    /// be trusted.
    pub short_circuit_diffs: bool,
    pub shape: Shape,
    #[serde(skip)]
    pub invalid_in_a: Mask,
    #[serde(skip)]
    pub invalid_in_b: Mask,
}

fn read_lon_lat(file: &dyn DataFile, longitude: &str, latitude: &str) -> GlanceResult<(DataSet, DataSet)> {
    Ok((file.read(longitude)?, file.read(latitude)?))
}

/// Load both files' geolocation, flag spatially invalid points and compare.
///
/// Geolocation that cannot be reconciled in shape is an error for the whole
/// run.
pub fn analyze_geolocation(
    a: &dyn DataFile,
    b: &dyn DataFile,
    lat_lon: &LonLatConfig,
) -> GlanceResult<GeolocationAnalysis> {
    let (lon_a, lat_a) = read_lon_lat(a, &lat_lon.longitude, &lat_lon.latitude)?;
    let (lon_b, lat_b) = read_lon_lat(b, lat_lon.b_longitude(), lat_lon.b_latitude())?;

    let (invalid_in_a, file_a) = spatial_invalidity(&lon_a, &lat_a)?;
    let (invalid_in_b, file_b) = spatial_invalidity(&lon_b, &lat_b)?;
    info!(
        invalid_in_a = file_a.invalid_count,
        invalid_in_b = file_b.invalid_count,
        "Analyzed geolocation"
    );

    let lon_lat_equality = check_lon_lat_equality(
        &lon_a,
        &lat_a,
        &lon_b,
        &lat_b,
        &invalid_in_a,
        &invalid_in_b,
        lat_lon.lon_lat_epsilon,
    )?;
    let spatial_comparison = compare_spatial_invalidity(&invalid_in_a, &invalid_in_b)?;

    Ok(GeolocationAnalysis {
        file_a,
        file_b,
        short_circuit_diffs: !lon_lat_equality.is_equal(),
        lon_lat_equality,
        spatial_comparison,
        shape: lon_a.shape().clone(),
        invalid_in_a,
        invalid_in_b,
    })
}

// ============================================================================
// Variables
// ============================================================================

/// Load both sides of every selected variable.
///
/// Variables that cannot be read, or whose shapes disagree with each other
/// or with the geolocation, are returned as errors keyed by name.
pub fn build_jobs(
    a: &dyn DataFile,
    b: &dyn DataFile,
    variables: Vec<ResolvedVariable>,
    geolocation: Option<&GeolocationAnalysis>,
) -> (Vec<VariableJob>, BTreeMap<String, GlanceError>) {
    let mut jobs = Vec::with_capacity(variables.len());
    let mut errors = BTreeMap::new();

    for settings in variables {
        let name = settings.variable_name.clone();
        match load_pair(a, b, &settings, geolocation) {
            Ok((data_a, data_b)) => jobs.push(VariableJob::new(data_a, data_b, settings)),
            Err(e) => {
                warn!(
                    variable = %settings.explanation_name(),
                    error = %e,
                    "Variable could not be compared"
                );
                errors.insert(name, e);
            }
        }
    }

    (jobs, errors)
}

pub(crate) fn load_pair(
    a: &dyn DataFile,
    b: &dyn DataFile,
    settings: &ResolvedVariable,
    geolocation: Option<&GeolocationAnalysis>,
) -> GlanceResult<(DataSet, DataSet)> {
    let data_a = a.read(&settings.variable_name)?;
    let data_b = b.read(&settings.b_variable_name)?;

    if data_a.shape() != data_b.shape() {
        return Err(GlanceError::shape_mismatch(
            format!("variable '{}' A/B data", settings.variable_name),
            data_a.shape().dims(),
            data_b.shape().dims(),
        ));
    }

    match geolocation {
        Some(geo) => {
            if data_a.shape() != &geo.shape {
                return Err(GlanceError::shape_mismatch(
                    format!("variable '{}' against longitude/latitude", settings.variable_name),
                    geo.shape.dims(),
                    data_a.shape().dims(),
                ));
            }
            Ok((
                data_a.with_ignore_mask(geo.invalid_in_a.clone())?,
                data_b.with_ignore_mask(geo.invalid_in_b.clone())?,
            ))
        }
        None => Ok((data_a, data_b)),
    }
}

/// Compare every loadable variable, merging load errors with comparison
/// errors.
pub fn run_comparisons(
    a: &dyn DataFile,
    b: &dyn DataFile,
    variables: Vec<ResolvedVariable>,
    geolocation: Option<&GeolocationAnalysis>,
) -> BTreeMap<String, GlanceResult<VariableComparison>> {
    let (jobs, errors) = build_jobs(a, b, variables, geolocation);
    let mut results = compare_all(jobs);
    results.extend(errors.into_iter().map(|(name, e)| (name, Err(e))));
    results
}
