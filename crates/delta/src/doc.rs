//! Plain-language descriptions of every statistic key.

/// `(key, description)` for every key a [`StatisticsReport`] produces.
///
/// [`StatisticsReport`]: crate::StatisticsReport
pub const STATISTICS_DOC: &[(&str, &str)] = &[
    // General Statistics
    ("num_data_points", "number of data values in A"),
    ("a_data_shape", "shape of the A data array"),
    ("b_data_shape", "shape of the B data array"),
    ("total_invalid_points", "number of points that are not valid in both A and B"),
    ("valid_both_count", "number of points that are finite, not missing and not spatially invalid in both A and B"),
    ("a_missing_value", "the value used to mark missing data in A"),
    ("b_missing_value", "the value used to mark missing data in B"),
    ("epsilon", "absolute difference below which A and B count as equal"),
    ("epsilon_percent", "percent of the larger magnitude of A and B below which they count as equal"),
    ("min_a", "minimum valid value in A"),
    ("max_a", "maximum valid value in A"),
    ("min_b", "minimum valid value in B"),
    ("max_b", "maximum valid value in B"),
    ("spatially_invalid_pts_ignored_in_a", "number of points ignored in A because of invalid longitude or latitude"),
    ("spatially_invalid_pts_ignored_in_b", "number of points ignored in B because of invalid longitude or latitude"),
    // Finite Data Statistics
    ("a_finite_count", "number of valid values in A"),
    ("a_finite_fraction", "fraction of all points that are valid in A"),
    ("b_finite_count", "number of valid values in B"),
    ("b_finite_fraction", "fraction of all points that are valid in B"),
    ("common_finite_count", "number of points valid in both A and B"),
    ("common_finite_fraction", "fraction of all points that are valid in both A and B"),
    ("finite_in_only_one_count", "number of points valid in exactly one of A and B, excluding spatially invalid points"),
    ("finite_in_only_one_fraction", "fraction of all points valid in exactly one of A and B"),
    ("finite_in_only_one_percent", "percent of all points valid in exactly one of A and B"),
    // Missing Value Statistics
    ("a_missing_count", "number of values in A equal to its missing value"),
    ("a_missing_fraction", "fraction of all points that are missing in A"),
    ("b_missing_count", "number of values in B equal to its missing value"),
    ("b_missing_fraction", "fraction of all points that are missing in B"),
    ("common_missing_count", "number of points missing in both A and B"),
    ("common_missing_fraction", "fraction of all points missing in both A and B"),
    ("common_missing_percent", "percent of all points missing in both A and B"),
    // NaN Statistics
    ("a_nan_count", "number of NaN or infinite values in A"),
    ("a_nan_fraction", "fraction of all points that are NaN or infinite in A"),
    ("b_nan_count", "number of NaN or infinite values in B"),
    ("b_nan_fraction", "fraction of all points that are NaN or infinite in B"),
    ("common_nan_count", "number of points that are NaN or infinite in both A and B"),
    ("common_nan_fraction", "fraction of all points that are NaN or infinite in both A and B"),
    ("common_nan_percent", "percent of all points that are NaN or infinite in both A and B"),
    // Numerical Comparison Statistics
    ("diff_outside_epsilon_count", "number of valid-both points where |A - B| exceeds epsilon"),
    ("diff_outside_epsilon_fraction", "fraction of valid-both points (not of all points) where |A - B| exceeds epsilon"),
    ("correlation", "Pearson correlation of A and B over valid-both points"),
    ("r_squared_correlation", "square of the Pearson correlation"),
    ("diff_min", "minimum of A - B over valid-both points"),
    ("diff_max", "maximum of A - B over valid-both points"),
    ("diff_mean", "mean of A - B over valid-both points"),
    ("diff_std", "population standard deviation of A - B over valid-both points"),
    ("diff_median", "median of A - B over valid-both points"),
    ("diff_rms", "root mean square of A - B over valid-both points"),
    ("perfect_match_count", "number of valid-both points where A equals B exactly"),
    ("perfect_match_fraction", "fraction of valid-both points where A equals B exactly"),
    ("mismatch_points_count", "number of points where A and B are invalid for different reasons, or valid in only one"),
    ("mismatch_points_fraction", "fraction of all points counted in mismatch_points_count"),
    ("insufficient_valid_data", "true when no point is valid in both A and B, so the comparison is vacuous"),
];

/// Description of a statistic key.
pub fn statistic_doc(key: &str) -> Option<&'static str> {
    STATISTICS_DOC
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, doc)| *doc)
}
