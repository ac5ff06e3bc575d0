/// Observed (tool-reported) alignments, one per read
///
/// Both input formats reduce to the same view for scoring: the reference
/// contig, the origin coordinate, and the strand sense that decides which
/// candidate coordinate to match against.
use anyhow::{bail, Result};
use indexmap::IndexMap;
use log::debug;
use std::path::Path;
use std::str::FromStr;

use crate::blast::{BlastReader, BlastRecord};
use crate::input::open_input;
use crate::sam::{read_sam_file, SamRecord};

/// Alignment file formats the evaluation accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlnFormat {
    Sam,
    Blast,
}

impl FromStr for AlnFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sam" => Ok(AlnFormat::Sam),
            "blast" => Ok(AlnFormat::Blast),
            _ => bail!("{s} file format not supported"),
        }
    }
}

/// What the scorer needs to know about one observed alignment
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedAln {
    pub ref_name: String,
    /// Origin coordinate on the reference: SAM POS or BLAST target start
    pub coord: u64,
    /// Reverse observations are matched against candidate target ends
    pub reverse: bool,
}

impl ObservedAln {
    /// SAM POS is already the leftmost reference base, so forward-style
    /// matching applies regardless of the flag strand bit
    pub fn from_sam(record: &SamRecord) -> Self {
        ObservedAln {
            ref_name: record.ref_name.clone(),
            coord: record.pos,
            reverse: false,
        }
    }

    pub fn from_blast(record: &BlastRecord) -> Self {
        ObservedAln {
            ref_name: record.ref_name.clone(),
            coord: record.target_start,
            reverse: record.is_reverse(),
        }
    }
}

/// One observed alignment per read, in file order
#[derive(Debug, Default)]
pub struct ObservedAlignments {
    alignments: IndexMap<String, ObservedAln>,
}

impl ObservedAlignments {
    pub fn new() -> Self {
        ObservedAlignments {
            alignments: IndexMap::new(),
        }
    }

    /// Register a read's single alignment; a second record for the same
    /// read is a fatal input error
    pub fn insert(&mut self, read_id: String, aln: ObservedAln) -> Result<()> {
        if self.alignments.contains_key(&read_id) {
            bail!("only one alignment per read: {read_id}");
        }
        self.alignments.insert(read_id, aln);
        Ok(())
    }

    /// Read a file of observed alignments in the given format
    pub fn from_path<P: AsRef<Path>>(path: P, format: AlnFormat) -> Result<Self> {
        let observed = match format {
            AlnFormat::Sam => Self::from_sam_path(path)?,
            AlnFormat::Blast => Self::from_blast_path(path)?,
        };
        debug!("collected {} observed alignments", observed.len());
        Ok(observed)
    }

    fn from_sam_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        // The SAM reader already enforces one record per read
        let records = read_sam_file(path)?;
        let mut observed = ObservedAlignments::new();
        for (read_id, record) in records {
            observed
                .alignments
                .insert(read_id, ObservedAln::from_sam(&record));
        }
        Ok(observed)
    }

    fn from_blast_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = BlastReader::new(open_input(path)?);
        let mut observed = ObservedAlignments::new();
        while let Some(record) = reader.read_record()? {
            let aln = ObservedAln::from_blast(&record);
            observed.insert(record.read_id, aln)?;
        }
        Ok(observed)
    }

    pub fn get(&self, read_id: &str) -> Option<&ObservedAln> {
        self.alignments.get(read_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ObservedAln)> {
        self.alignments.iter().map(|(id, aln)| (id.as_str(), aln))
    }

    pub fn read_ids(&self) -> impl Iterator<Item = &str> {
        self.alignments.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.alignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alignments.is_empty()
    }
}
