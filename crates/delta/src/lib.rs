//! Difference statistics for pairs of gridded geophysical fields.
//!
//! Given the same variable read from two files ("A" and "B"), this crate
//! works out which points can be compared, how far apart the comparable
//! points are, and whether the result is within the configured tolerances.
//!
//! # Pipeline
//!
//! ```text
//! DataSet A ──► classify ──► MaskSet A ─┐
//!                                       ├─► compute_diff ──► DiffResult
//! DataSet B ──► classify ──► MaskSet B ─┘          │
//!                                                  ▼
//!                                     summarize ──► StatisticsReport
//!                                                  │
//!                                                  ▼
//!                                     evaluate  ──► Verdict
//! ```
//!
//! Each variable is an independent, side-effect free computation;
//! [`compare_all`] runs a batch of them on the rayon thread pool.
//!
//! # Example
//!
//! ```
//! use delta::{compare_variable, DataSet, Verdict};
//! use glance_common::{AnalysisDefaults, ResolvedVariable};
//!
//! let defaults = AnalysisDefaults {
//!     epsilon: Some(0.1),
//!     epsilon_failure_tolerance: Some(0.6),
//!     ..Default::default()
//! };
//! let settings = ResolvedVariable::with_defaults("tpw", &defaults).unwrap();
//!
//! let a = DataSet::from_vec(vec![1.0, 2.0, f64::NAN, -999.0]).with_missing_value(Some(-999.0));
//! let b = DataSet::from_vec(vec![1.0, 2.5, 3.0, -999.0]).with_missing_value(Some(-999.0));
//!
//! let result = compare_variable(&a, &b, &settings).unwrap();
//! assert_eq!(result.stats.numerical.diff_outside_epsilon_fraction, 0.5);
//! assert_eq!(result.verdict(), Verdict::Pass);
//! ```

pub mod array;
pub mod batch;
pub mod diff;
pub mod doc;
pub mod mask;
pub mod spatial;
pub mod stats;
pub mod verdict;

// Re-export commonly used types at crate root
pub use array::{DataSet, Mask, Shape};
pub use batch::{compare_all, compare_variable, ComparisonMasks, VariableComparison, VariableJob};
pub use diff::{compute_diff, DiffResult};
pub use doc::{statistic_doc, STATISTICS_DOC};
pub use mask::{classify, InvalidReason, MaskSet, PairMaskSet, PointClass};
pub use spatial::{
    check_lon_lat_equality, compare_spatial_invalidity, spatial_invalidity, LonLatEquality,
    SpatialComparison, SpatialSummary,
};
pub use stats::{
    summarize, StatValue, StatisticsReport, FINITE_DATA_STATISTICS, GENERAL_STATISTICS,
    MISSING_VALUE_STATISTICS, NAN_STATISTICS, NUMERICAL_COMPARISON_STATISTICS,
};
pub use verdict::{evaluate, evaluate_detailed, Evaluation, Verdict};
