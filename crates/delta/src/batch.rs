//! Whole-variable comparisons, one at a time or as a parallel batch.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::Instant;

use glance_common::{GlanceError, GlanceResult, ResolvedVariable};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::array::{DataSet, Mask};
use crate::diff::compute_diff;
use crate::mask::{PairMaskSet, PointClass};
use crate::stats::{summarize_pair, StatisticsReport};
use crate::verdict::{evaluate_detailed, Evaluation, Verdict};

/// Masks kept for imagery consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonMasks {
    pub valid_both: Mask,
    pub outside_epsilon: Mask,
    pub mismatch: Mask,
    pub missing_a: Mask,
    pub missing_b: Mask,
    pub non_finite_a: Mask,
    pub non_finite_b: Mask,
}

/// Everything produced for one variable.
#[derive(Debug, Clone, Serialize)]
pub struct VariableComparison {
    pub settings: ResolvedVariable,
    pub stats: StatisticsReport,
    pub evaluation: Evaluation,
    /// Point count per class; sums to the number of data points.
    pub classification: BTreeMap<PointClass, usize>,
    #[serde(skip)]
    pub masks: ComparisonMasks,
}

impl VariableComparison {
    pub fn verdict(&self) -> Verdict {
        self.evaluation.verdict
    }
}

/// `data` with `sentinel` as its missing value, when one is resolved.
fn with_resolved_sentinel(data: &DataSet, sentinel: Option<f64>) -> Cow<'_, DataSet> {
    match sentinel {
        Some(value) if data.missing_value() != Some(value) => {
            Cow::Owned(data.clone().with_missing_value(Some(value)))
        }
        _ => Cow::Borrowed(data),
    }
}

/// Run the full pipeline for one variable.
///
/// The resolved missing values in `settings` (`missing_value` for A,
/// `missing_value_alt_in_b` for B) replace the datasets' own; an unset one
/// keeps the dataset's sentinel. Ignore masks come from the datasets,
/// epsilon and tolerances from `settings`.
pub fn compare_variable(
    a: &DataSet,
    b: &DataSet,
    settings: &ResolvedVariable,
) -> GlanceResult<VariableComparison> {
    let a = with_resolved_sentinel(a, settings.missing_value);
    let b = with_resolved_sentinel(b, settings.missing_value_alt_in_b);
    let (a, b) = (a.as_ref(), b.as_ref());

    if a.shape() != b.shape() {
        return Err(GlanceError::shape_mismatch(
            format!("variable '{}' A/B data", settings.variable_name),
            a.shape().dims(),
            b.shape().dims(),
        ));
    }

    let mask_a = a.masks()?;
    let mask_b = b.masks()?;
    let pair = PairMaskSet::new(&mask_a, &mask_b)?;
    let diff = compute_diff(a, b, &mask_a, &mask_b, settings.epsilon)?;
    let stats = summarize_pair(a, b, &mask_a, &mask_b, &pair, &diff)?;
    let evaluation = evaluate_detailed(&stats, &settings.tolerance);

    let mut classification = BTreeMap::new();
    for class in pair.point_classes(&diff.outside_epsilon) {
        *classification.entry(class).or_insert(0) += 1;
    }

    debug!(
        variable = %settings.variable_name,
        points = stats.num_data_points(),
        outside_epsilon = stats.numerical.diff_outside_epsilon_count,
        verdict = %evaluation.verdict,
        "Compared variable"
    );

    Ok(VariableComparison {
        settings: settings.clone(),
        stats,
        evaluation,
        classification,
        masks: ComparisonMasks {
            valid_both: pair.valid_both,
            outside_epsilon: diff.outside_epsilon,
            mismatch: pair.mismatch,
            missing_a: mask_a.missing,
            missing_b: mask_b.missing,
            non_finite_a: mask_a.non_finite,
            non_finite_b: mask_b.non_finite,
        },
    })
}

/// One unit of batch work.
#[derive(Debug, Clone)]
pub struct VariableJob {
    pub name: String,
    pub a: DataSet,
    pub b: DataSet,
    pub settings: ResolvedVariable,
}

impl VariableJob {
    pub fn new(a: DataSet, b: DataSet, settings: ResolvedVariable) -> Self {
        Self {
            name: settings.variable_name.clone(),
            a,
            b,
            settings,
        }
    }
}

/// Compare every job in parallel. A failing variable never affects the
/// others; its error is returned under its name.
pub fn compare_all(jobs: Vec<VariableJob>) -> BTreeMap<String, GlanceResult<VariableComparison>> {
    let started = Instant::now();
    let total = jobs.len();

    let results: BTreeMap<String, GlanceResult<VariableComparison>> = jobs
        .into_par_iter()
        .map(|job| {
            let result = compare_variable(&job.a, &job.b, &job.settings);
            if let Err(e) = &result {
                warn!(variable = %job.name, error = %e, "Variable comparison failed");
            }
            (job.name, result)
        })
        .collect();

    let failed = results.values().filter(|r| r.is_err()).count();
    info!(
        variables = total,
        failed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Batch comparison complete"
    );

    results
}
