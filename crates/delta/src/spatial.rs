//! Geolocation checks.
//!
//! Points whose longitude or latitude falls off the earth are excluded from
//! data comparisons through the datasets' ignore masks. This module builds
//! those masks and compares the two files' geolocation.

use glance_common::{EpsilonSpec, GlanceError, GlanceResult};
use serde::Serialize;
use tracing::{info, warn};

use crate::array::{DataSet, Mask};
use crate::diff::compute_diff;

const MIN_LATITUDE: f64 = -90.0;
const MAX_LATITUDE: f64 = 90.0;
const MIN_LONGITUDE: f64 = -180.0;
const MAX_LONGITUDE: f64 = 360.0;

/// How much of one file's geolocation is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpatialSummary {
    pub invalid_count: usize,
    pub invalid_percent: f64,
}

impl SpatialSummary {
    pub fn from_mask(mask: &Mask) -> Self {
        Self {
            invalid_count: mask.count(),
            invalid_percent: mask.fraction() * 100.0,
        }
    }
}

/// Mask of points with latitude outside [-90, 90] or longitude outside
/// [-180, 360].
///
/// Only out-of-range values are flagged. NaN compares false against both
/// bounds and is left to the data's own non-finite checks.
pub fn spatial_invalidity(
    longitude: &DataSet,
    latitude: &DataSet,
) -> GlanceResult<(Mask, SpatialSummary)> {
    if longitude.shape() != latitude.shape() {
        return Err(GlanceError::shape_mismatch(
            "longitude/latitude",
            longitude.shape().dims(),
            latitude.shape().dims(),
        ));
    }

    let lon = longitude.values();
    let lat = latitude.values();
    let mask = Mask::from_fn(longitude.shape(), |i| {
        lat[i] < MIN_LATITUDE
            || lat[i] > MAX_LATITUDE
            || lon[i] < MIN_LONGITUDE
            || lon[i] > MAX_LONGITUDE
    });
    let summary = SpatialSummary::from_mask(&mask);
    Ok((mask, summary))
}

/// Where the two files' spatial invalidity agrees and disagrees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpatialComparison {
    /// Invalid in A or B.
    #[serde(skip)]
    pub combined: Mask,
    pub masks_match: bool,
    pub valid_only_in_a_count: usize,
    pub valid_only_in_b_count: usize,
    pub invalid_in_either_percent: f64,
}

pub fn compare_spatial_invalidity(
    invalid_in_a: &Mask,
    invalid_in_b: &Mask,
) -> GlanceResult<SpatialComparison> {
    if invalid_in_a.shape() != invalid_in_b.shape() {
        return Err(GlanceError::shape_mismatch(
            "spatial invalidity masks",
            invalid_in_a.shape().dims(),
            invalid_in_b.shape().dims(),
        ));
    }

    let combined = invalid_in_a.or(invalid_in_b);
    let masks_match = invalid_in_a == invalid_in_b;
    let valid_only_in_a_count = invalid_in_b.and_not(invalid_in_a).count();
    let valid_only_in_b_count = invalid_in_a.and_not(invalid_in_b).count();

    if !masks_match {
        info!(
            valid_only_in_a = valid_only_in_a_count,
            valid_only_in_b = valid_only_in_b_count,
            "Spatially invalid points differ between files; data may not correspond where expected"
        );
    }

    Ok(SpatialComparison {
        invalid_in_either_percent: combined.fraction() * 100.0,
        combined,
        masks_match,
        valid_only_in_a_count,
        valid_only_in_b_count,
    })
}

/// Result of comparing the two files' longitude and latitude.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LonLatEquality {
    pub not_equal_count: usize,
    pub not_equal_percent: f64,
    #[serde(skip)]
    pub not_equal_mask: Mask,
}

impl LonLatEquality {
    pub fn is_equal(&self) -> bool {
        self.not_equal_count == 0
    }
}

/// Compare geolocation outside both ignore masks, allowing `lon_lat_epsilon`
/// of absolute difference. An epsilon of 0 demands exact equality.
#[allow(clippy::too_many_arguments)]
pub fn check_lon_lat_equality(
    longitude_a: &DataSet,
    latitude_a: &DataSet,
    longitude_b: &DataSet,
    latitude_b: &DataSet,
    ignore_a: &Mask,
    ignore_b: &Mask,
    lon_lat_epsilon: f64,
) -> GlanceResult<LonLatEquality> {
    if longitude_a.shape() != longitude_b.shape() || latitude_a.shape() != latitude_b.shape() {
        return Err(GlanceError::shape_mismatch(
            "A/B longitude and latitude",
            longitude_a.shape().dims(),
            longitude_b.shape().dims(),
        ));
    }
    if ignore_a.shape() != ignore_b.shape() {
        return Err(GlanceError::shape_mismatch(
            "A/B spatial ignore masks",
            ignore_a.shape().dims(),
            ignore_b.shape().dims(),
        ));
    }

    let epsilon = EpsilonSpec::absolute(lon_lat_epsilon)?;
    let ignore = ignore_a.or(ignore_b);

    let not_equal = |a: &DataSet, b: &DataSet| -> GlanceResult<Mask> {
        let a = a.clone().with_ignore_mask(ignore.clone())?;
        let b = b.clone().with_ignore_mask(ignore.clone())?;
        let (ma, mb) = (a.masks()?, b.masks()?);
        Ok(compute_diff(&a, &b, &ma, &mb, epsilon)?.outside_epsilon)
    };

    let lon_mask = not_equal(longitude_a, longitude_b)?;
    let lat_mask = not_equal(latitude_a, latitude_b)?;
    if lon_mask.shape() != lat_mask.shape() {
        return Err(GlanceError::shape_mismatch(
            "longitude/latitude",
            lon_mask.shape().dims(),
            lat_mask.shape().dims(),
        ));
    }
    let not_equal_mask = lon_mask.or(&lat_mask);
    let not_equal_count = not_equal_mask.count();

    if not_equal_count > 0 {
        warn!(
            points = not_equal_count,
            "Longitude/latitude differ between file A and file B; data comparisons may be spatially distorted"
        );
    }

    Ok(LonLatEquality {
        not_equal_percent: not_equal_mask.fraction() * 100.0,
        not_equal_count,
        not_equal_mask,
    })
}
