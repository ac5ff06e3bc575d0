/// alnstats - Statistics for SAM alignments of simulated reads
///
/// Single-file mode reports per-tool coverage, score, and indel statistics
/// against the simulated reads FASTA. With a second SAM file the two tools
/// are compared read by read: identical loci, score wins, and reads only
/// one of them mapped.
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use indexmap::IndexMap;
use log::debug;

use alneval::cigar::{cigar_stats, CigarStats};
use alneval::input::open_input;
use alneval::sam::read_sam_file;

#[derive(Parser, Debug)]
#[clap(
    name = "alnstats",
    about = "Statistics for SAM alignments of simulated reads"
)]
struct Args {
    /// First alignment file (SAM)
    file1: String,

    /// Optional second SAM file for head-to-head comparison
    file2: Option<String>,

    /// Simulated reads (FASTA; may be gzip-compressed)
    #[clap(short = 'r', long = "reads")]
    reads: String,

    /// Minimum alignment score for the passing-alignment count
    #[clap(long = "min-score", default_value = "0")]
    min_score: i64,

    /// Coordinate tolerance when deciding two tools found the same locus
    #[clap(long = "offset", default_value = "0")]
    offset: u64,
}

/// Per-read facts taken from the simulated reads file
struct ReadInfo {
    length: u64,
    ambiguous: u64,
}

/// Read lengths and ambiguous-base counts, keyed by read id
fn read_fasta_info(path: &str) -> Result<IndexMap<String, ReadInfo>> {
    let reader = bio::io::fasta::Reader::new(open_input(path)?);
    let mut info = IndexMap::new();

    for result in reader.records() {
        let record = result.with_context(|| format!("Failed to parse FASTA record in {path}"))?;
        let name = record.id().to_string();
        if info.contains_key(&name) {
            bail!("read seen twice in {path}: {name}");
        }
        let ambiguous = record
            .seq()
            .iter()
            .filter(|&&b| b == b'N' || b == b'n')
            .count() as u64;
        info.insert(
            name,
            ReadInfo {
                length: record.seq().len() as u64,
                ambiguous,
            },
        );
    }

    debug!("read {} simulated reads from {path}", info.len());
    Ok(info)
}

/// One tool's alignment of a read, reduced to the compared quantities
struct MappedRead {
    ref_name: String,
    pos: u64,
    cigar: CigarStats,
    score: i64,
}

/// Load a SAM file, keeping only reads present in the simulated set
fn load_alignments(
    path: &str,
    reads: &IndexMap<String, ReadInfo>,
) -> Result<IndexMap<String, MappedRead>> {
    let records = read_sam_file(path)?;
    let mut mapped = IndexMap::new();

    for (read_id, record) in records {
        if !reads.contains_key(&read_id) {
            continue;
        }
        let cigar =
            cigar_stats(&record.cigar).with_context(|| format!("read {read_id} in {path}"))?;
        let score = record
            .alignment_score()
            .ok_or_else(|| anyhow!("read {read_id} in {path} has no AS tag"))?;
        mapped.insert(
            read_id,
            MappedRead {
                ref_name: record.ref_name,
                pos: record.pos,
                cigar,
                score,
            },
        );
    }

    Ok(mapped)
}

#[derive(Debug, Default)]
struct AlignmentStats {
    total_alignments: usize,
    total_indels: u64,
    total_coverage: f64,
    low_coverage: f64,
    high_coverage: f64,
    total_ambiguous: u64,
    total_score: i64,
    total_read_length: u64,
    passing_score: usize,
}

fn collect_stats(
    mapped: &IndexMap<String, MappedRead>,
    reads: &IndexMap<String, ReadInfo>,
    min_score: i64,
) -> AlignmentStats {
    let mut stats = AlignmentStats {
        low_coverage: 1.0,
        ..Default::default()
    };

    for (read_id, aln) in mapped {
        let Some(info) = reads.get(read_id) else {
            continue;
        };
        let coverage = aln.cigar.aligned_len as f64 / info.length as f64;

        stats.total_alignments += 1;
        stats.total_indels += aln.cigar.num_indels;
        stats.total_coverage += coverage;
        stats.low_coverage = stats.low_coverage.min(coverage);
        stats.high_coverage = stats.high_coverage.max(coverage);
        stats.total_ambiguous += info.ambiguous;
        stats.total_score += aln.score;
        stats.total_read_length += info.length;
        if aln.score >= min_score {
            stats.passing_score += 1;
        }
    }

    stats
}

fn print_stats(path: &str, stats: &AlignmentStats, min_score: i64) {
    let n = stats.total_alignments;
    let avg = |total: f64| if n > 0 { total / n as f64 } else { 0.0 };

    println!("\nStatistics for {path}:");
    println!("{}", "=".repeat(60));
    println!("Total alignments:      {n:>12}");
    println!(
        "Avg indels/alignment:  {:>12.2}",
        avg(stats.total_indels as f64)
    );
    println!("Avg query coverage:    {:>12.3}", avg(stats.total_coverage));
    println!(
        "Coverage range:        {:>12}",
        format!("{:.3}-{:.3}", stats.low_coverage, stats.high_coverage)
    );
    println!(
        "Avg N's per read:      {:>12.2}",
        avg(stats.total_ambiguous as f64)
    );
    println!(
        "Avg alignment score:   {:>12.2}",
        avg(stats.total_score as f64)
    );
    println!(
        "Avg read length:       {:>12.1}",
        avg(stats.total_read_length as f64)
    );
    println!(
        "Score >= {min_score}:  {:>12}",
        format!("{}/{}", stats.passing_score, n)
    );
}

/// Accumulated facts about reads only one tool mapped
#[derive(Debug, Default)]
struct ExclusiveStats {
    reads: usize,
    total_indels: u64,
    total_read_length: u64,
    total_coverage: f64,
}

impl ExclusiveStats {
    fn add(&mut self, aln: &MappedRead, info: &ReadInfo) {
        self.reads += 1;
        self.total_indels += aln.cigar.num_indels;
        self.total_read_length += info.length;
        self.total_coverage += aln.cigar.aligned_len as f64 / info.length as f64;
    }
}

#[derive(Debug, Default)]
struct Comparison {
    common_reads: usize,
    same_alignments: usize,
    different_scores: usize,
    same_total_indels: u64,
    same_total_read_length: u64,
    same_total_coverage: f64,
    cigar_longer: [usize; 2],
    score_higher: [usize; 2],
    score_equal: usize,
    only: [ExclusiveStats; 2],
}

/// Walk the simulated reads and classify how the two tools placed each one
fn compare_alignments(
    reads: &IndexMap<String, ReadInfo>,
    mapped1: &IndexMap<String, MappedRead>,
    mapped2: &IndexMap<String, MappedRead>,
    offset: u64,
) -> Comparison {
    let mut cmp = Comparison::default();

    for (read_id, info) in reads {
        match (mapped1.get(read_id), mapped2.get(read_id)) {
            (Some(a), Some(b)) => {
                cmp.common_reads += 1;
                if a.cigar.aligned_len > b.cigar.aligned_len {
                    cmp.cigar_longer[0] += 1;
                } else if a.cigar.aligned_len < b.cigar.aligned_len {
                    cmp.cigar_longer[1] += 1;
                }
                if a.ref_name == b.ref_name && a.pos.abs_diff(b.pos) <= offset {
                    cmp.same_alignments += 1;
                    if a.score != b.score {
                        cmp.different_scores += 1;
                    }
                    cmp.same_total_indels += a.cigar.num_indels;
                    cmp.same_total_read_length += info.length;
                    cmp.same_total_coverage += a.cigar.aligned_len as f64 / info.length as f64;
                } else if a.score > b.score {
                    cmp.score_higher[0] += 1;
                } else if a.score < b.score {
                    cmp.score_higher[1] += 1;
                } else {
                    cmp.score_equal += 1;
                }
            }
            (Some(a), None) => cmp.only[0].add(a, info),
            (None, Some(b)) => cmp.only[1].add(b, info),
            (None, None) => {}
        }
    }

    cmp
}

fn print_exclusive(file: &str, stats: &ExclusiveStats) {
    println!("\nReads mapped only by {file}: {}", stats.reads);
    if stats.reads > 0 {
        let n = stats.reads as f64;
        println!(
            "  {:30} {:>12.2}",
            "Avg indels/alignment",
            stats.total_indels as f64 / n
        );
        println!(
            "  {:30} {:>12.1}",
            "Avg read length",
            stats.total_read_length as f64 / n
        );
        println!(
            "  {:30} {:>12.3}",
            "Avg query coverage",
            stats.total_coverage / n
        );
    }
}

fn print_comparison(file1: &str, file2: &str, cmp: &Comparison) {
    println!("\nComparison: {file1} vs {file2}");
    println!("{}", "=".repeat(60));
    println!("Common reads mapped:   {:>12}", cmp.common_reads);
    println!("Same alignments:       {:>12}", cmp.same_alignments);
    println!("  with differing score:{:>12}", cmp.different_scores);
    if cmp.same_alignments > 0 {
        let n = cmp.same_alignments as f64;
        println!(
            "  avg indels/alignment:{:>12.2}",
            cmp.same_total_indels as f64 / n
        );
        println!(
            "  avg read length:     {:>12.1}",
            cmp.same_total_read_length as f64 / n
        );
        println!(
            "  avg query coverage:  {:>12.3}",
            cmp.same_total_coverage / n
        );
    }

    println!("\nLonger aligned span:");
    println!("  {:30} {:>12}", file1, cmp.cigar_longer[0]);
    println!("  {:30} {:>12}", file2, cmp.cigar_longer[1]);

    println!("\nHigher score on differing alignments:");
    println!("  {:30} {:>12}", file1, cmp.score_higher[0]);
    println!("  {:30} {:>12}", file2, cmp.score_higher[1]);
    println!("  {:30} {:>12}", "Equal", cmp.score_equal);

    print_exclusive(file1, &cmp.only[0]);
    print_exclusive(file2, &cmp.only[1]);
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let reads = read_fasta_info(&args.reads)?;
    let mapped1 = load_alignments(&args.file1, &reads)?;

    if let Some(ref file2) = args.file2 {
        let mapped2 = load_alignments(file2, &reads)?;
        println!("Alignments by {}: {}", args.file1, mapped1.len());
        println!("Alignments by {}: {}", file2, mapped2.len());
        let cmp = compare_alignments(&reads, &mapped1, &mapped2, args.offset);
        print_comparison(&args.file1, file2, &cmp);
    } else {
        let stats = collect_stats(&mapped1, &reads, args.min_score);
        print_stats(&args.file1, &stats, args.min_score);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(length: u64, ambiguous: u64) -> ReadInfo {
        ReadInfo { length, ambiguous }
    }

    fn mapped(ref_name: &str, pos: u64, cigar: &str, score: i64) -> MappedRead {
        MappedRead {
            ref_name: ref_name.to_string(),
            pos,
            cigar: cigar_stats(cigar).unwrap(),
            score,
        }
    }

    fn read_set(entries: Vec<(&str, ReadInfo)>) -> IndexMap<String, ReadInfo> {
        entries
            .into_iter()
            .map(|(id, info)| (id.to_string(), info))
            .collect()
    }

    fn mapped_set(entries: Vec<(&str, MappedRead)>) -> IndexMap<String, MappedRead> {
        entries
            .into_iter()
            .map(|(id, aln)| (id.to_string(), aln))
            .collect()
    }

    #[test]
    fn single_file_stats_accumulate() {
        let reads = read_set(vec![
            ("r1", info(150, 0)),
            ("r2", info(150, 2)),
            ("r3", info(100, 0)),
        ]);
        let alignments = mapped_set(vec![
            ("r1", mapped("ref1", 100, "150M", 295)),
            ("r2", mapped("ref1", 900, "110M3I37M", 285)),
        ]);

        let stats = collect_stats(&alignments, &reads, 290);
        assert_eq!(stats.total_alignments, 2);
        assert_eq!(stats.total_indels, 1);
        assert_eq!(stats.total_ambiguous, 2);
        assert_eq!(stats.total_score, 580);
        assert_eq!(stats.total_read_length, 300);
        assert_eq!(stats.passing_score, 1);
        assert_eq!(stats.low_coverage, 1.0);
        assert_eq!(stats.high_coverage, 1.0);
    }

    #[test]
    fn comparison_classifies_same_and_differing_loci() {
        let reads = read_set(vec![
            ("r1", info(150, 0)),
            ("r2", info(150, 0)),
            ("r3", info(150, 0)),
            ("r4", info(150, 0)),
        ]);
        let tool1 = mapped_set(vec![
            ("r1", mapped("ref1", 1000, "150M", 300)),
            ("r2", mapped("ref1", 2000, "140M10S", 250)),
            ("r3", mapped("ref1", 5000, "150M", 280)),
        ]);
        let tool2 = mapped_set(vec![
            ("r1", mapped("ref1", 1003, "150M", 300)),
            ("r2", mapped("ref2", 2000, "150M", 270)),
        ]);

        let cmp = compare_alignments(&reads, &tool1, &tool2, 5);
        assert_eq!(cmp.common_reads, 2);
        assert_eq!(cmp.same_alignments, 1);
        assert_eq!(cmp.different_scores, 0);
        // r2 maps to different contigs; tool2 scored higher
        assert_eq!(cmp.score_higher, [0, 1]);
        assert_eq!(cmp.cigar_longer, [0, 1]);
        assert_eq!(cmp.only[0].reads, 1);
        assert_eq!(cmp.only[1].reads, 0);
    }
}
