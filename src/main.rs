use anyhow::Result;
use clap::Parser;
use log::info;

use alneval::accuracy::compute_accuracy;
use alneval::observed::{AlnFormat, ObservedAlignments};
use alneval::precision::compute_precision;
use alneval::summary::EvalSummary;
use alneval::truth::GroundTruthIndex;

/// Parse the observed-alignment format selector
fn parse_format(s: &str) -> Result<AlnFormat, String> {
    s.parse().map_err(|e: anyhow::Error| e.to_string())
}

/// Parse a read count that must be at least 1
fn parse_total_reads(s: &str) -> Result<u64, String> {
    let count: u64 = s.parse().map_err(|e| format!("Invalid read count: {e}"))?;
    if count == 0 {
        return Err("total read count must be at least 1".to_string());
    }
    Ok(count)
}

/// alneval - score a tool's alignments against ground-truth alignments
///
/// Reads ground-truth candidates (BLAST tabular, several per read) and one
/// observed alignment per read, then emits a single tab-separated summary
/// line: observed count, fraction of reads mapped, TP, FP, FN, precision,
/// recall, F-measure, accuracy percentage.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Ground-truth alignments (BLAST tabular, best candidates per read)
    expected: String,

    /// Observed alignments, one per read (SAM or BLAST tabular)
    observed: String,

    /// Name of the tool that produced the observed alignments
    #[clap(long = "tool")]
    tool: String,

    /// Maximum absolute difference between expected and observed origin positions
    #[clap(long = "offset", default_value = "0")]
    offset: u64,

    /// File format of the observed alignments (sam or blast)
    #[clap(long = "format", default_value = "sam", value_parser = parse_format)]
    format: AlnFormat,

    /// Total number of reads given to the aligner
    #[clap(long = "total-reads", value_parser = parse_total_reads)]
    total_reads: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let expected = GroundTruthIndex::from_path(&args.expected)?;
    let observed = ObservedAlignments::from_path(&args.observed, args.format)?;
    info!(
        "{}: {} observed alignments against {} ground-truth reads",
        args.tool,
        observed.len(),
        expected.num_reads()
    );

    let accuracy = compute_accuracy(&expected, &observed, args.offset)?;
    let stats = compute_precision(&expected, &observed)?;

    let summary = EvalSummary {
        observed_count: observed.len(),
        total_reads: args.total_reads,
        stats,
        accuracy,
    };
    println!("{summary}");

    Ok(())
}
