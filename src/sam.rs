/// Line-oriented SAM reading
///
/// Keeps only the columns the evaluation consumes: read id, flag, reference
/// name, position, mapping quality, CIGAR, and the optional tags. Header
/// lines and unmapped records are skipped at read time.
use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use log::debug;
use std::io::BufRead;
use std::path::Path;

use crate::input::open_input;

/// One mapped SAM record
#[derive(Debug, Clone)]
pub struct SamRecord {
    pub read_id: String,
    pub flag: u16,
    pub ref_name: String,
    /// 1-based leftmost mapping position
    pub pos: u64,
    pub mapq: u8,
    pub cigar: String,
    pub tags: Vec<(String, String)>,
}

impl SamRecord {
    /// Aligner-reported alignment score (the AS:i: tag), if present
    pub fn alignment_score(&self) -> Option<i64> {
        self.tags
            .iter()
            .find(|(tag, _)| tag == "AS:i")
            .and_then(|(_, val)| val.parse().ok())
    }
}

/// Parse one alignment line; None for unmapped records
fn parse_sam_line(line: &str) -> Result<Option<SamRecord>> {
    let fields: Vec<&str> = line.trim_end().split('\t').collect();

    if fields.len() < 11 {
        bail!("SAM line has fewer than 11 required fields");
    }

    // Unmapped reads carry '*' in the reference column
    let ref_name = fields[2].split_whitespace().next().unwrap_or(fields[2]);
    if ref_name == "*" {
        return Ok(None);
    }

    // Read labels may contain spaces; only the leading token identifies the read
    let read_id = fields[0].split_whitespace().next().unwrap_or(fields[0]);

    let mut record = SamRecord {
        read_id: read_id.to_string(),
        flag: fields[1].parse().context("Invalid SAM flag")?,
        ref_name: ref_name.to_string(),
        pos: fields[3].parse().context("Invalid SAM position")?,
        mapq: fields[4].parse().context("Invalid mapping quality")?,
        cigar: fields[5].to_string(),
        tags: Vec::new(),
    };

    for field in &fields[11..] {
        if let Some((tag, rest)) = field.split_once(':') {
            if let Some((typ, val)) = rest.split_once(':') {
                record.tags.push((format!("{tag}:{typ}"), val.to_string()));
            }
        }
    }

    Ok(Some(record))
}

/// Collect mapped records into a one-record-per-read map
///
/// A second mapped record for the same read is a fatal error: the evaluation
/// assumes single-best-alignment output.
pub fn collect_sam_records<R: BufRead>(reader: R) -> Result<IndexMap<String, SamRecord>> {
    let mut records = IndexMap::new();
    let mut unmapped = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.starts_with('@') || line.trim().is_empty() {
            continue;
        }
        let parsed =
            parse_sam_line(&line).with_context(|| format!("SAM line {}", line_no + 1))?;
        let Some(record) = parsed else {
            unmapped += 1;
            continue;
        };
        if records.contains_key(&record.read_id) {
            bail!("only one alignment per read: {}", record.read_id);
        }
        records.insert(record.read_id.clone(), record);
    }

    debug!(
        "collected {} mapped records ({} unmapped skipped)",
        records.len(),
        unmapped
    );
    Ok(records)
}

/// Read a SAM file into a one-record-per-read map (auto-detects gzip)
pub fn read_sam_file<P: AsRef<Path>>(path: P) -> Result<IndexMap<String, SamRecord>> {
    let input = open_input(path)?;
    collect_sam_records(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const MAPPED: &str = "seq.000001004\t0\tref1\t525642\t255\t150M\t*\t0\t0\tACGT\t*\tAS:i:295\tNM:i:1";

    #[test]
    fn parses_a_mapped_record() {
        let record = parse_sam_line(MAPPED).unwrap().unwrap();
        assert_eq!(record.read_id, "seq.000001004");
        assert_eq!(record.flag, 0);
        assert_eq!(record.ref_name, "ref1");
        assert_eq!(record.pos, 525642);
        assert_eq!(record.mapq, 255);
        assert_eq!(record.cigar, "150M");
        assert_eq!(record.alignment_score(), Some(295));
    }

    #[test]
    fn unmapped_record_is_skipped() {
        let line = "seq.x\t4\t*\t0\t0\t*\t*\t0\t0\tACGT\t*";
        assert!(parse_sam_line(line).unwrap().is_none());
    }

    #[test]
    fn missing_score_tag_is_none() {
        let line = "seq.x\t0\tref1\t100\t60\t4M\t*\t0\t0\tACGT\t*\tNM:i:0";
        let record = parse_sam_line(line).unwrap().unwrap();
        assert_eq!(record.alignment_score(), None);
    }

    #[test]
    fn short_line_is_an_error() {
        assert!(parse_sam_line("seq.x\t0\tref1").is_err());
    }

    #[test]
    fn collects_skipping_headers() {
        let sam = format!(
            "@HD\tVN:1.0\tSO:unsorted\n@PG\tID:tool\tVN:1.0\n{MAPPED}\nseq.x\t4\t*\t0\t0\t*\t*\t0\t0\tACGT\t*\n"
        );
        let records = collect_sam_records(Cursor::new(sam)).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records.contains_key("seq.000001004"));
    }

    #[test]
    fn duplicate_read_is_fatal() {
        let sam = format!("{MAPPED}\n{MAPPED}\n");
        let err = collect_sam_records(Cursor::new(sam)).unwrap_err();
        assert!(err.to_string().contains("seq.000001004"));
    }
}
