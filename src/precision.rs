/// Read-level precision and recall over the expected and observed read sets
use anyhow::{bail, Result};
use std::collections::HashSet;

use crate::observed::ObservedAlignments;
use crate::truth::GroundTruthIndex;

/// Confusion counts over read ids and the rates derived from them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrecisionStats {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
}

impl PrecisionStats {
    /// Derive the rates from raw confusion counts
    ///
    /// Fails on degenerate inputs where precision, recall, or the F-measure
    /// denominator would be zero; callers guard empty collections.
    pub fn from_counts(
        true_positives: usize,
        false_positives: usize,
        false_negatives: usize,
    ) -> Result<Self> {
        if true_positives + false_positives == 0 {
            bail!("precision undefined: no observed reads");
        }
        if true_positives + false_negatives == 0 {
            bail!("recall undefined: no expected reads");
        }

        let precision = true_positives as f64 / (true_positives + false_positives) as f64;
        let recall = true_positives as f64 / (true_positives + false_negatives) as f64;

        if precision + recall == 0.0 {
            bail!("F-measure undefined: precision and recall are both zero");
        }
        let f_measure = 2.0 * precision * recall / (precision + recall);

        Ok(PrecisionStats {
            true_positives,
            false_positives,
            false_negatives,
            precision,
            recall,
            f_measure,
        })
    }
}

/// Compare the read sets of the ground truth and the observed alignments
///
/// True positives are reads both maps contain, false positives reads only
/// the tool reported, false negatives reads only the ground truth knows.
pub fn compute_precision(
    expected: &GroundTruthIndex,
    observed: &ObservedAlignments,
) -> Result<PrecisionStats> {
    let expected_ids: HashSet<&str> = expected.read_ids().collect();
    let observed_ids: HashSet<&str> = observed.read_ids().collect();

    let true_positives = observed_ids.intersection(&expected_ids).count();
    let false_positives = observed_ids.difference(&expected_ids).count();
    let false_negatives = expected_ids.difference(&observed_ids).count();

    PrecisionStats::from_counts(true_positives, false_positives, false_negatives)
}
