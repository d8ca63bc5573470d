use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::Context;
use compress_io::compress::CompressIo;
use csv::StringRecord;

use crate::job::{
    Bridging, FastpOpts, JobInputs, JobSpec, ReadMode, SpadesOpts, Tool, ToolOptions,
    UnicyclerOpts,
};

/// Fixed column set of a batch file.  Loading tolerates missing columns
/// (defaults apply); saving always writes the full set.
pub const BATCH_COLUMNS: &[&str] = &[
    "sample",
    "tool",
    "mode",
    "r1",
    "r2",
    "se",
    "long",
    "threads",
    "uc_mode",
    "keep",
    "min_fasta_length",
    "linear_seqs",
    "spades_careful",
    "spades_kmers",
    "fastp_only_report",
    "fastp_qualified_quality",
    "fastp_min_length",
];

const DEFAULT_THREADS: u32 = 16;

type ColumnIndex = HashMap<String, usize>;

fn field<'a>(idx: &ColumnIndex, rec: &'a StringRecord, name: &str) -> Option<&'a str> {
    idx.get(name)
        .and_then(|&i| rec.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn path_field(idx: &ColumnIndex, rec: &StringRecord, name: &str) -> Option<PathBuf> {
    field(idx, rec, name).map(PathBuf::from)
}

fn num_field(idx: &ColumnIndex, rec: &StringRecord, name: &str, default: u32) -> anyhow::Result<u32> {
    match field(idx, rec, name) {
        Some(s) => s
            .parse::<u32>()
            .with_context(|| format!("Invalid value {} for column {}", s, name)),
        None => Ok(default),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

fn bool_field(idx: &ColumnIndex, rec: &StringRecord, name: &str, default: bool) -> anyhow::Result<bool> {
    match field(idx, rec, name) {
        Some(s) => {
            parse_bool(s).ok_or_else(|| anyhow!("Invalid value {} for column {}", s, name))
        }
        None => Ok(default),
    }
}

fn job_from_record(idx: &ColumnIndex, rec: &StringRecord) -> anyhow::Result<JobSpec> {
    let tool = match field(idx, rec, "tool") {
        Some(s) => s
            .parse::<Tool>()
            .map_err(|_| anyhow!("Unrecognized tool {}", s))?,
        None => Tool::Unicycler,
    };
    let mode = match field(idx, rec, "mode") {
        Some(s) => s
            .parse::<ReadMode>()
            .map_err(|_| anyhow!("Unrecognized read mode {}", s))?,
        None => ReadMode::Paired,
    };

    let inputs = JobInputs {
        mate1: path_field(idx, rec, "r1"),
        mate2: path_field(idx, rec, "r2"),
        single: path_field(idx, rec, "se"),
        long_reads: path_field(idx, rec, "long"),
    };

    let options = match tool {
        Tool::Unicycler => {
            let d = UnicyclerOpts::default();
            let bridging = match field(idx, rec, "uc_mode") {
                Some(s) => s
                    .parse::<Bridging>()
                    .map_err(|_| anyhow!("Unrecognized bridging mode {}", s))?,
                None => d.bridging,
            };
            ToolOptions::Unicycler(UnicyclerOpts {
                bridging,
                keep: num_field(idx, rec, "keep", d.keep)?,
                min_fasta_length: num_field(idx, rec, "min_fasta_length", d.min_fasta_length)?,
                linear_seqs: num_field(idx, rec, "linear_seqs", d.linear_seqs)?,
            })
        }
        Tool::Spades => {
            let d = SpadesOpts::default();
            ToolOptions::Spades(SpadesOpts {
                careful: bool_field(idx, rec, "spades_careful", d.careful)?,
                kmers: field(idx, rec, "spades_kmers").unwrap_or("").to_owned(),
            })
        }
        Tool::Fastp => {
            let defaults = FastpOpts::default();
            ToolOptions::Fastp(FastpOpts {
                only_report: bool_field(idx, rec, "fastp_only_report", false)?,
                qualified_quality: num_field(
                    idx,
                    rec,
                    "fastp_qualified_quality",
                    defaults.qualified_quality,
                )?,
                min_length: num_field(idx, rec, "fastp_min_length", defaults.min_length)?,
                ..defaults
            })
        }
    };

    Ok(JobSpec::new(
        field(idx, rec, "sample").unwrap_or(""),
        mode,
        inputs,
        num_field(idx, rec, "threads", DEFAULT_THREADS)?,
        options,
    ))
}

/// Read a batch file (plain or gzipped CSV with a header line)
pub fn load_batch<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<JobSpec>> {
    let path = path.as_ref();
    debug!("Reading batch file {}", path.display());

    let rdr = CompressIo::new()
        .path(path)
        .bufreader()
        .with_context(|| format!("Could not open batch file {}", path.display()))?;
    let mut csv_rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(rdr);

    let idx: ColumnIndex = csv_rdr
        .headers()
        .with_context(|| format!("Could not read header from {}", path.display()))?
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_lowercase(), i))
        .collect();

    let mut jobs = Vec::new();
    for (i, rec) in csv_rdr.records().enumerate() {
        let rec = rec.with_context(|| {
            format!("Error reading record {} from {}", i + 1, path.display())
        })?;
        let job = job_from_record(&idx, &rec)
            .with_context(|| format!("Invalid job record {} in {}", i + 1, path.display()))?;
        jobs.push(job);
    }

    debug!("Read {} job(s) from {}", jobs.len(), path.display());
    Ok(jobs)
}

fn opt_path(p: Option<&PathBuf>) -> String {
    p.map(|p| p.display().to_string()).unwrap_or_default()
}

fn bool_str(b: bool) -> String {
    String::from(if b { "1" } else { "0" })
}

/// Write the queue as a batch file with the full fixed column set.
/// Columns belonging to another tool hold that tool's defaults.
pub fn save_batch<P: AsRef<Path>>(path: P, jobs: &[JobSpec]) -> anyhow::Result<()> {
    let path = path.as_ref();
    let w = CompressIo::new()
        .path(path)
        .bufwriter()
        .with_context(|| format!("Could not open batch file {} for writing", path.display()))?;
    let mut wtr = csv::Writer::from_writer(w);
    wtr.write_record(BATCH_COLUMNS)?;

    for job in jobs {
        let uc = match job.options() {
            ToolOptions::Unicycler(o) => o.clone(),
            _ => UnicyclerOpts::default(),
        };
        let sp = match job.options() {
            ToolOptions::Spades(o) => o.clone(),
            _ => SpadesOpts::default(),
        };
        let fp = match job.options() {
            ToolOptions::Fastp(o) => o.clone(),
            _ => FastpOpts::default(),
        };
        let inp = job.inputs();
        wtr.write_record(&[
            job.sample().to_owned(),
            job.tool().to_string(),
            job.mode().to_string(),
            opt_path(inp.mate1.as_ref()),
            opt_path(inp.mate2.as_ref()),
            opt_path(inp.single.as_ref()),
            opt_path(inp.long_reads.as_ref()),
            job.threads().to_string(),
            uc.bridging.to_string(),
            uc.keep.to_string(),
            uc.min_fasta_length.to_string(),
            uc.linear_seqs.to_string(),
            bool_str(sp.careful),
            sp.kmers,
            bool_str(fp.only_report),
            fp.qualified_quality.to_string(),
            fp.min_length.to_string(),
        ])?;
    }
    wtr.flush()?;

    debug!("Saved {} job(s) to {}", jobs.len(), path.display());
    Ok(())
}
