use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use regex::Regex;

/// Matches paired FASTQ names, with or without compression:
/// `<prefix><sep>R?<1|2>[_001]?.<fastq|fq>[.gz]` where `<sep>` is one of
/// `.`, `_` or `-`.  Group 1 is the sample key, group 2 the mate number.
const PAIR_PATTERN: &str = r"(?i)(.+?)[._-]R?([12])(?:_001)?\.(?:fastq|fq)(?:\.gz)?$";

/// Recognized raw read extensions (used when scanning directories)
const READ_EXT_PATTERN: &str = r"(?i)\.(?:fastq|fq)(?:\.gz)?$";

/// A complete mate pair sharing one sample key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairGroup {
    pub key: String,
    pub mate1: PathBuf,
    pub mate2: PathBuf,
}

/// Partition of an input file list into pairs and leftovers.  Every input
/// path lands in exactly one of the four sets.
#[derive(Debug, Default)]
pub struct PairPartition {
    pub pairs: Vec<PairGroup>,
    pub mate1_only: Vec<PathBuf>,
    pub mate2_only: Vec<PathBuf>,
    pub unmatched: Vec<PathBuf>,
}

/// Extract (sample key, mate number) from a file name
fn key_and_mate(re: &Regex, path: &Path) -> Option<(String, u8)> {
    let name = path.file_name()?.to_str()?;
    let caps = re.captures(name)?;
    let key = caps.get(1).unwrap().as_str().to_owned();
    let mate = if caps.get(2).unwrap().as_str() == "1" {
        1
    } else {
        2
    };
    Some((key, mate))
}

/// Group a file list into mate pairs by sample key.
///
/// Files are taken in the order supplied and pairs are emitted in
/// first-seen-key order.  A second file claiming an already filled
/// (key, mate) slot replaces the earlier one; the replacement is logged.
pub fn partition(files: &[PathBuf]) -> PairPartition {
    let re = Regex::new(PAIR_PATTERN).expect("invalid pair pattern");

    // Insertion ordered key buckets
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, (Option<PathBuf>, Option<PathBuf>)> = HashMap::new();

    let mut part = PairPartition::default();

    for f in files {
        let Some((key, mate)) = key_and_mate(&re, f) else {
            part.unmatched.push(f.clone());
            continue;
        };
        let slot = buckets.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            (None, None)
        });
        let entry = if mate == 1 { &mut slot.0 } else { &mut slot.1 };
        if let Some(prev) = entry.replace(f.clone()) {
            warn!(
                "Duplicate mate {} for sample {}: {} replaces {}",
                mate,
                key,
                f.display(),
                prev.display()
            );
        }
    }

    for key in order {
        match buckets.remove(&key).unwrap() {
            (Some(m1), Some(m2)) => part.pairs.push(PairGroup {
                key,
                mate1: m1,
                mate2: m2,
            }),
            (Some(m1), None) => part.mate1_only.push(m1),
            (None, Some(m2)) => part.mate2_only.push(m2),
            (None, None) => unreachable!(),
        }
    }

    part
}

/// True if the file name looks like a raw read file
pub fn is_read_file(path: &Path) -> bool {
    let re = Regex::new(READ_EXT_PATTERN).expect("invalid extension pattern");
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| re.is_match(n))
        .unwrap_or(false)
}

/// File name with the read extension removed; used to derive sample names
/// for single-end jobs
pub fn strip_read_ext(path: &Path) -> String {
    let re = Regex::new(READ_EXT_PATTERN).expect("invalid extension pattern");
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    re.replace(&name, "").into_owned()
}
