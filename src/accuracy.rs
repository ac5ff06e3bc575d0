/// Weighted accuracy scoring of observed alignments against ranked
/// ground-truth candidates
///
/// Each read's candidates are ranked by bit score. Matching any candidate
/// tied with the best bit score earns full credit, and every strictly lower
/// distinct bit-score tier costs one unit of weight. With six candidates
/// scored 400, 400, 350, 350, 250, 150 there are four tiers, so a read whose
/// observed alignment matches a 350-tier candidate scores 3/4, a 250-tier
/// match scores 2/4, and so on. Ties are equally "best" on purpose:
/// simulated reads drawn from genomic repeats have several equally valid
/// origin loci.
use anyhow::{bail, Result};

use crate::blast::BlastRecord;
use crate::observed::{ObservedAln, ObservedAlignments};
use crate::truth::GroundTruthIndex;

/// Origin coordinate of a candidate for strand-aware matching: reverse
/// observations are anchored at the candidate's target end
pub fn select_origin_coordinate(candidate: &BlastRecord, reverse: bool) -> u64 {
    if reverse {
        candidate.target_end
    } else {
        candidate.target_start
    }
}

/// Number of distinct bit-score values in a descending-sorted candidate list
fn count_score_tiers(candidates: &[BlastRecord]) -> usize {
    let mut tiers = 0;
    let mut prev = None;
    for candidate in candidates {
        if prev != Some(candidate.bit_score) {
            tiers += 1;
            prev = Some(candidate.bit_score);
        }
    }
    tiers
}

/// Score one observed alignment against its ranked candidates
///
/// Returns the weighted score in [0,1] for the first candidate matching by
/// contig and coordinate (within `offset`), or None when nothing matches.
pub fn score_read(candidates: &[BlastRecord], observed: &ObservedAln, offset: u64) -> Option<f64> {
    let tiers = count_score_tiers(candidates);
    let mut weight = tiers;

    let mut iter = candidates.iter().peekable();
    while let Some(candidate) = iter.next() {
        let origin = select_origin_coordinate(candidate, observed.reverse);
        if candidate.ref_name == observed.ref_name && origin.abs_diff(observed.coord) <= offset {
            return Some(weight as f64 / tiers as f64);
        }
        // One weight unit per distinct tier boundary, not per candidate
        if let Some(next) = iter.peek() {
            if next.bit_score < candidate.bit_score {
                weight -= 1;
            }
        }
    }

    None
}

/// Mean accuracy over every observed alignment, as a percentage in [0,100]
///
/// Reads absent from the ground-truth index contribute nothing to the sum
/// but still count in the denominator, which is the observed-map size.
pub fn compute_accuracy(
    expected: &GroundTruthIndex,
    observed: &ObservedAlignments,
    offset: u64,
) -> Result<f64> {
    if observed.is_empty() {
        bail!("no observed alignments to score");
    }

    let mut total = 0.0;
    for (read_id, aln) in observed.iter() {
        let Some(candidates) = expected.candidates(read_id) else {
            continue;
        };
        if let Some(score) = score_read(candidates, aln, offset) {
            total += score;
        }
    }

    Ok(total / observed.len() as f64 * 100.0)
}
