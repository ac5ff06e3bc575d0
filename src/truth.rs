/// Ground-truth candidate index
///
/// Groups the reference alignments simulated reads are known to have, one
/// group per read, each group sorted best-first by bit score.
use anyhow::Result;
use indexmap::IndexMap;
use log::debug;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::path::Path;

use crate::blast::{read_blast_file, BlastRecord};

/// Candidate reference alignments grouped per read, best bit score first
#[derive(Debug, Default)]
pub struct GroundTruthIndex {
    groups: IndexMap<String, Vec<BlastRecord>>,
}

impl GroundTruthIndex {
    pub fn new() -> Self {
        GroundTruthIndex {
            groups: IndexMap::new(),
        }
    }

    /// Add a candidate to its read's group, preserving arrival order
    fn add_candidate(&mut self, record: BlastRecord) {
        self.groups
            .entry(record.read_id.clone())
            .or_default()
            .push(record);
    }

    /// Sort every group by descending bit score. The sort is stable, so
    /// candidates tied on bit score keep their encounter order.
    fn sort_groups(&mut self) {
        for candidates in self.groups.values_mut() {
            candidates.sort_by_key(|r| Reverse(OrderedFloat(r.bit_score)));
        }
    }

    /// Build the index from already-parsed records
    pub fn from_records(records: Vec<BlastRecord>) -> Self {
        let mut index = GroundTruthIndex::new();
        for record in records {
            index.add_candidate(record);
        }
        index.sort_groups();
        index
    }

    /// Build the index from a BLAST tabular file (auto-detects gzip)
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let index = GroundTruthIndex::from_records(read_blast_file(path)?);
        debug!(
            "indexed {} candidates for {} reads",
            index.num_candidates(),
            index.num_reads()
        );
        Ok(index)
    }

    /// Ranked candidates for a read; groups are non-empty by construction
    pub fn candidates(&self, read_id: &str) -> Option<&[BlastRecord]> {
        self.groups.get(read_id).map(|v| v.as_slice())
    }

    pub fn read_ids(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(|s| s.as_str())
    }

    pub fn num_reads(&self) -> usize {
        self.groups.len()
    }

    pub fn num_candidates(&self) -> usize {
        self.groups.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
