/// The one-line evaluation record emitted per tool run
use std::fmt;

use crate::precision::PrecisionStats;

/// Everything the evaluation reports for one tool's alignments
#[derive(Debug, Clone, Copy)]
pub struct EvalSummary {
    pub observed_count: usize,
    /// Total reads given to the aligner, mapped or not
    pub total_reads: u64,
    pub stats: PrecisionStats,
    pub accuracy: f64,
}

impl EvalSummary {
    /// Fraction of the sequenced reads the tool mapped at all
    pub fn fraction_mapped(&self) -> f64 {
        self.observed_count as f64 / self.total_reads as f64
    }
}

impl fmt::Display for EvalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{:.2}\t{}\t{}\t{}\t{:.3}\t{:.3}\t{:.3}\t{:.2}",
            self.observed_count,
            self.fraction_mapped(),
            self.stats.true_positives,
            self.stats.false_positives,
            self.stats.false_negatives,
            self.stats.precision,
            self.stats.recall,
            self.stats.f_measure,
            self.accuracy
        )
    }
}
