/// filterhits - Reads whose search hits beat or tie their simulated origin
///
/// Simulators record each read's true origin differently: Mason keeps it in
/// the FASTA label (Illumina) or emits a SAM file (454), CureSim encodes it
/// in the read name (Ion Torrent). Given those origins and the search tool's
/// tabular hits (best hit first per read), a read is flagged when its best
/// hit lands somewhere other than the declared origin, or when a later hit
/// ties the best bit score, leaving the origin ambiguous.
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use indexmap::IndexMap;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::str::FromStr;

use alneval::blast::{read_blast_file, BlastRecord};
use alneval::input::open_input;
use alneval::sam::read_sam_file;

/// Sequencing technologies and the ground-truth convention each one uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadTech {
    /// Mason FASTA, origin in `contig=` / `orig_begin=` label fields
    Illumina,
    /// Mason SAM, origin in the reference name and position columns
    Roche454,
    /// CureSim FASTA, origin in underscore-delimited read names
    IonTorrent,
}

impl FromStr for ReadTech {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "illumina" => Ok(ReadTech::Illumina),
            "454" => Ok(ReadTech::Roche454),
            "ion" => Ok(ReadTech::IonTorrent),
            _ => bail!("unrecognized technology {s}"),
        }
    }
}

fn parse_tech(s: &str) -> Result<ReadTech, String> {
    s.parse().map_err(|e: anyhow::Error| e.to_string())
}

#[derive(Parser, Debug)]
#[clap(
    name = "filterhits",
    about = "Reads whose search hits beat or tie their simulated origin"
)]
struct Args {
    /// Read technology: illumina, 454, or ion
    #[clap(value_parser = parse_tech)]
    tech: ReadTech,

    /// Ground truth: Mason FASTA (illumina), Mason SAM (454), or CureSim FASTA (ion)
    ground_truth: String,

    /// Search hits for the same reads (BLAST tabular, best hit first per read)
    hits: String,

    /// Output file, one flagged read id per line
    output: String,
}

/// Declared origin of one simulated read
#[derive(Debug, Clone, PartialEq)]
struct ReadOrigin {
    ref_name: String,
    pos: u64,
}

/// Value of a `key=value` token in a Mason FASTA description
fn labeled_field<'a>(desc: &'a str, key: &str) -> Option<&'a str> {
    desc.split_whitespace().find_map(|token| {
        let (k, v) = token.split_once('=')?;
        (k == key).then_some(v)
    })
}

/// Origins from Mason read labels: `>name contig=X ... orig_begin=N ...`
fn origins_from_mason_fasta(path: &str) -> Result<IndexMap<String, ReadOrigin>> {
    let reader = bio::io::fasta::Reader::new(open_input(path)?);
    let mut origins = IndexMap::new();

    for result in reader.records() {
        let record = result.with_context(|| format!("Failed to parse FASTA record in {path}"))?;
        let name = record.id().to_string();
        let desc = record
            .desc()
            .ok_or_else(|| anyhow!("read {name} has no origin fields in its label"))?;
        let ref_name = labeled_field(desc, "contig")
            .ok_or_else(|| anyhow!("read {name} has no contig= label field"))?;
        let pos = labeled_field(desc, "orig_begin")
            .ok_or_else(|| anyhow!("read {name} has no orig_begin= label field"))?
            .parse()
            .with_context(|| format!("Invalid orig_begin for read {name}"))?;
        if origins.contains_key(&name) {
            bail!("{name} seen twice");
        }
        origins.insert(
            name,
            ReadOrigin {
                ref_name: ref_name.to_string(),
                pos,
            },
        );
    }

    Ok(origins)
}

/// Origins from a Mason SAM file, one mapped record per read
fn origins_from_mason_sam(path: &str) -> Result<IndexMap<String, ReadOrigin>> {
    let records = read_sam_file(path)?;
    Ok(records
        .into_iter()
        .map(|(name, record)| {
            (
                name,
                ReadOrigin {
                    ref_name: record.ref_name,
                    pos: record.pos,
                },
            )
        })
        .collect())
}

/// Origins from CureSim read names: `contig_<pos>_<strand>_<origin>_...`
fn origins_from_curesim_fasta(path: &str) -> Result<IndexMap<String, ReadOrigin>> {
    let reader = bio::io::fasta::Reader::new(open_input(path)?);
    let mut origins = IndexMap::new();

    for result in reader.records() {
        let record = result.with_context(|| format!("Failed to parse FASTA record in {path}"))?;
        let name = record.id().to_string();
        let segments: Vec<&str> = name.split('_').collect();
        if segments.len() < 4 {
            bail!("read name {name} does not carry an origin");
        }
        let origin = ReadOrigin {
            ref_name: segments[0].to_string(),
            pos: segments[3]
                .parse()
                .with_context(|| format!("Invalid origin position in read name {name}"))?,
        };
        if origins.contains_key(&name) {
            bail!("{name} seen twice");
        }
        origins.insert(name, origin);
    }

    Ok(origins)
}

fn collect_origins(tech: ReadTech, path: &str) -> Result<IndexMap<String, ReadOrigin>> {
    match tech {
        ReadTech::Illumina => origins_from_mason_fasta(path),
        ReadTech::Roche454 => origins_from_mason_sam(path),
        ReadTech::IonTorrent => origins_from_curesim_fasta(path),
    }
}

/// Flag reads whose hits disagree with the declared origin
///
/// Hits arrive grouped per read with the best hit first. A read is flagged
/// once: when its best hit is at a different locus than the origin, or when
/// a later hit ties the best bit score. A hit for a read with no declared
/// origin is a fatal error.
fn better_hits(
    records: &[BlastRecord],
    origins: &IndexMap<String, ReadOrigin>,
) -> Result<Vec<String>> {
    let mut flagged = Vec::new();
    let mut current_read: Option<&str> = None;
    let mut best_score = 0.0;
    let mut written = false;

    for record in records {
        if current_read == Some(record.read_id.as_str()) {
            if !written && record.bit_score == best_score {
                flagged.push(record.read_id.clone());
                written = true;
            }
            continue;
        }

        let origin = origins
            .get(&record.read_id)
            .ok_or_else(|| anyhow!("read {} has no declared origin", record.read_id))?;
        written = record.ref_name != origin.ref_name || record.target_start != origin.pos;
        if written {
            flagged.push(record.read_id.clone());
        }
        current_read = Some(record.read_id.as_str());
        best_score = record.bit_score;
    }

    Ok(flagged)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let origins = collect_origins(args.tech, &args.ground_truth)?;
    let records = read_blast_file(&args.hits)?;
    let flagged = better_hits(&records, &origins)?;

    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output))?;
    let mut writer = BufWriter::new(file);
    for read_id in &flagged {
        writeln!(writer, "{read_id}")?;
    }

    info!(
        "flagged {} of {} reads with origins",
        flagged.len(),
        origins.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(read_id: &str, ref_name: &str, target_start: u64, bit_score: f64) -> BlastRecord {
        BlastRecord {
            read_id: read_id.to_string(),
            ref_name: ref_name.to_string(),
            identity: 97.0,
            align_len: 150,
            mismatches: 1,
            gap_opens: 0,
            query_start: 1,
            query_end: 150,
            target_start,
            target_end: target_start + 149,
            evalue: 1e-70,
            bit_score,
        }
    }

    fn origin_set(entries: &[(&str, &str, u64)]) -> IndexMap<String, ReadOrigin> {
        entries
            .iter()
            .map(|&(name, ref_name, pos)| {
                (
                    name.to_string(),
                    ReadOrigin {
                        ref_name: ref_name.to_string(),
                        pos,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn technology_selector_parses() {
        assert_eq!("illumina".parse::<ReadTech>().unwrap(), ReadTech::Illumina);
        assert_eq!("454".parse::<ReadTech>().unwrap(), ReadTech::Roche454);
        assert_eq!("ion".parse::<ReadTech>().unwrap(), ReadTech::IonTorrent);
        assert!("pacbio".parse::<ReadTech>().is_err());
    }

    #[test]
    fn matching_best_hit_is_not_flagged() {
        let origins = origin_set(&[("r1", "ref1", 1000)]);
        let records = vec![hit("r1", "ref1", 1000, 270.0), hit("r1", "ref1", 5000, 220.0)];
        assert!(better_hits(&records, &origins).unwrap().is_empty());
    }

    #[test]
    fn misplaced_best_hit_is_flagged() {
        let origins = origin_set(&[("r1", "ref1", 1000), ("r2", "ref1", 2000)]);
        let records = vec![
            hit("r1", "ref1", 7000, 270.0),
            hit("r2", "ref2", 2000, 250.0),
        ];
        assert_eq!(better_hits(&records, &origins).unwrap(), vec!["r1", "r2"]);
    }

    #[test]
    fn tied_best_scores_flag_the_read_once() {
        let origins = origin_set(&[("r1", "ref1", 1000)]);
        let records = vec![
            hit("r1", "ref1", 1000, 270.0),
            hit("r1", "ref1", 5000, 270.0),
            hit("r1", "ref1", 9000, 270.0),
        ];
        assert_eq!(better_hits(&records, &origins).unwrap(), vec!["r1"]);
    }

    #[test]
    fn lower_scored_hits_do_not_flag() {
        let origins = origin_set(&[("r1", "ref1", 1000)]);
        let records = vec![
            hit("r1", "ref1", 1000, 270.0),
            hit("r1", "ref1", 5000, 269.9),
        ];
        assert!(better_hits(&records, &origins).unwrap().is_empty());
    }

    #[test]
    fn already_flagged_reads_are_not_repeated_on_ties() {
        let origins = origin_set(&[("r1", "ref1", 1000)]);
        let records = vec![
            hit("r1", "ref2", 1000, 270.0),
            hit("r1", "ref1", 1000, 270.0),
        ];
        assert_eq!(better_hits(&records, &origins).unwrap(), vec!["r1"]);
    }

    #[test]
    fn hit_without_an_origin_is_fatal() {
        let origins = origin_set(&[("r1", "ref1", 1000)]);
        let records = vec![hit("r9", "ref1", 1000, 270.0)];
        let err = better_hits(&records, &origins).unwrap_err();
        assert!(err.to_string().contains("r9"));
    }

    #[test]
    fn mason_label_fields_are_keyed() {
        let desc = "contig=chr2 haplotype=0 length=150 orig_begin=52340 orig_end=52490";
        assert_eq!(labeled_field(desc, "contig"), Some("chr2"));
        assert_eq!(labeled_field(desc, "orig_begin"), Some("52340"));
        assert_eq!(labeled_field(desc, "strand"), None);
    }

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(contents.as_bytes()).unwrap();
        temp
    }

    #[test]
    fn mason_fasta_origins_come_from_label_fields() {
        let temp = write_temp(
            ">seq.1 contig=chr2 haplotype=0 length=150 orig_begin=52340 orig_end=52490\nACGT\n\
             >seq.2 contig=chr1 haplotype=0 length=150 orig_begin=998 orig_end=1148\nACGT\n",
        );
        let origins = origins_from_mason_fasta(temp.path().to_str().unwrap()).unwrap();
        assert_eq!(
            origins.get("seq.1"),
            Some(&ReadOrigin {
                ref_name: "chr2".to_string(),
                pos: 52340
            })
        );
        assert_eq!(origins.get("seq.2").unwrap().pos, 998);
    }

    #[test]
    fn mason_fasta_without_origin_fields_is_fatal() {
        let temp = write_temp(">seq.1 length=150\nACGT\n");
        let err = origins_from_mason_fasta(temp.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("seq.1"));
    }

    #[test]
    fn curesim_names_carry_the_origin() {
        let temp = write_temp(">chr1_0_1_45210_150\nACGT\n>chr3_0_0_998_150\nACGT\n");
        let origins = origins_from_curesim_fasta(temp.path().to_str().unwrap()).unwrap();
        assert_eq!(
            origins.get("chr1_0_1_45210_150"),
            Some(&ReadOrigin {
                ref_name: "chr1".to_string(),
                pos: 45210
            })
        );
        assert_eq!(origins.get("chr3_0_0_998_150").unwrap().pos, 998);
    }

    #[test]
    fn short_curesim_names_are_fatal() {
        let temp = write_temp(">chr1_0\nACGT\n");
        assert!(origins_from_curesim_fasta(temp.path().to_str().unwrap()).is_err());
    }
}
