/// BLAST tabular (outfmt 6 / m8) alignment records
///
/// One line per alignment: the read id followed by eleven positional fields
/// (contig, percent identity, alignment length, mismatches, gap opens,
/// query start/end, target start/end, e-value, bit score).
use anyhow::{bail, Context, Result};
use std::io::BufRead;
use std::path::Path;

use crate::input::open_input;

/// A single BLAST tabular alignment
#[derive(Debug, Clone, PartialEq)]
pub struct BlastRecord {
    pub read_id: String,
    pub ref_name: String,
    pub identity: f64,
    pub align_len: u64,
    pub mismatches: u64,
    pub gap_opens: u64,
    pub query_start: u64,
    pub query_end: u64,
    pub target_start: u64,
    pub target_end: u64,
    pub evalue: f64,
    pub bit_score: f64,
}

impl BlastRecord {
    /// Reverse-complemented alignments report descending target coordinates
    pub fn is_reverse(&self) -> bool {
        self.target_start > self.target_end
    }
}

fn parse_blast_line(line: &str) -> Result<BlastRecord> {
    let fields: Vec<&str> = line.split_whitespace().collect();

    if fields.len() < 12 {
        bail!("BLAST tabular line has fewer than 12 required fields");
    }

    Ok(BlastRecord {
        read_id: fields[0].to_string(),
        ref_name: fields[1].to_string(),
        identity: fields[2].parse().context("Invalid percent identity")?,
        align_len: fields[3].parse().context("Invalid alignment length")?,
        mismatches: fields[4].parse().context("Invalid mismatch count")?,
        gap_opens: fields[5].parse().context("Invalid gap open count")?,
        query_start: fields[6].parse().context("Invalid query start")?,
        query_end: fields[7].parse().context("Invalid query end")?,
        target_start: fields[8].parse().context("Invalid target start")?,
        target_end: fields[9].parse().context("Invalid target end")?,
        evalue: fields[10].parse().context("Invalid e-value")?,
        bit_score: fields[11].parse().context("Invalid bit score")?,
    })
}

pub struct BlastReader<R: BufRead> {
    reader: R,
    line_no: usize,
}

impl<R: BufRead> BlastReader<R> {
    pub fn new(reader: R) -> Self {
        BlastReader { reader, line_no: 0 }
    }

    pub fn read_record(&mut self) -> Result<Option<BlastRecord>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let record = parse_blast_line(&line)
                .with_context(|| format!("BLAST tabular line {}", self.line_no))?;
            return Ok(Some(record));
        }
    }

    pub fn read_all(&mut self) -> Result<Vec<BlastRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_record()? {
            records.push(record);
        }
        Ok(records)
    }
}

/// Read a BLAST tabular file (auto-detects gzip compression)
pub fn read_blast_file<P: AsRef<Path>>(path: P) -> Result<Vec<BlastRecord>> {
    let input = open_input(path)?;
    let mut reader = BlastReader::new(input);
    reader.read_all()
}
