/// CIGAR run-length tallying
use anyhow::{bail, Result};

/// Aggregate shape of one alignment's CIGAR string
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CigarStats {
    /// Read bases placed in the alignment (M/=/X runs plus insertions)
    pub aligned_len: u64,
    /// Indel events: each I or D run counts once, whatever its length
    pub num_indels: u64,
}

/// Tally aligned length and indel events from a CIGAR string
///
/// Soft/hard clips, skips, and padding do not contribute. A `*` CIGAR
/// (alignment shape unavailable) tallies as zero.
pub fn cigar_stats(cigar: &str) -> Result<CigarStats> {
    let mut stats = CigarStats::default();
    if cigar == "*" {
        return Ok(stats);
    }

    let mut num_str = String::new();
    for ch in cigar.chars() {
        if ch.is_ascii_digit() {
            num_str.push(ch);
            continue;
        }
        if num_str.is_empty() {
            bail!("CIGAR operation '{ch}' without a length");
        }
        let count: u64 = num_str
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid number in CIGAR: {num_str}"))?;
        num_str.clear();

        match ch {
            'M' | '=' | 'X' => stats.aligned_len += count,
            'I' => {
                stats.aligned_len += count;
                stats.num_indels += 1;
            }
            'D' => stats.num_indels += 1,
            'S' | 'H' | 'N' | 'P' => {}
            _ => bail!("Unknown CIGAR operation: {ch}"),
        }
    }

    if !num_str.is_empty() {
        bail!("CIGAR ends with a dangling length: {num_str}");
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_clips_do_not_count() {
        let stats = cigar_stats("68S82M").unwrap();
        assert_eq!(stats.aligned_len, 82);
        assert_eq!(stats.num_indels, 0);
    }

    #[test]
    fn insertion_extends_span_and_counts_one_event() {
        let stats = cigar_stats("110M3I37M").unwrap();
        assert_eq!(stats.aligned_len, 150);
        assert_eq!(stats.num_indels, 1);
    }

    #[test]
    fn deletion_counts_without_extending_span() {
        let stats = cigar_stats("10M2D5M").unwrap();
        assert_eq!(stats.aligned_len, 15);
        assert_eq!(stats.num_indels, 1);
    }

    #[test]
    fn extended_operations_tally_like_matches() {
        let stats = cigar_stats("5=2X3=").unwrap();
        assert_eq!(stats.aligned_len, 10);
        assert_eq!(stats.num_indels, 0);
    }

    #[test]
    fn each_indel_run_counts_once() {
        let stats = cigar_stats("3M1D9M1I10M1D25M").unwrap();
        assert_eq!(stats.aligned_len, 48);
        assert_eq!(stats.num_indels, 3);
    }

    #[test]
    fn star_cigar_is_empty() {
        assert_eq!(cigar_stats("*").unwrap(), CigarStats::default());
    }

    #[test]
    fn malformed_cigars_are_errors() {
        assert!(cigar_stats("M").is_err());
        assert!(cigar_stats("10M5").is_err());
        assert!(cigar_stats("10Q").is_err());
    }
}
