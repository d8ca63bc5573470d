use std::{
    collections::HashSet,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use clap::{
    crate_description, crate_name, crate_version, value_parser, Arg, ArgAction, Command,
};

use anyhow::Context;

use utils::{init_log, LogLevel};

use crate::{config::*, env::EnvWrapper, pairing};

/// Set up definition of command options for clap
fn cli_model() -> Command {
    Command::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .arg(
            Arg::new("timestamp")
                .short('X')
                .long("timestamp")
                .value_parser(value_parser!(stderrlog::Timestamp))
                .value_name("GRANULARITY")
                .default_value("none")
                .help("Prepend log entries with a timestamp"),
        )
        .arg(
            Arg::new("loglevel")
                .short('l')
                .long("loglevel")
                .value_name("LOGLEVEL")
                .value_parser(value_parser!(LogLevel))
                .ignore_case(true)
                .default_value("warn")
                .help("Set log level"),
        )
        .arg(
            Arg::new("quiet")
                .action(ArgAction::SetTrue)
                .long("quiet")
                .conflicts_with("loglevel")
                .help("Silence all output"),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_parser(value_parser!(NonZeroUsize))
                .value_name("INT")
                .help("Threads per tool invocation for jobs built from read files [default: available cores]"),
        )
        .arg(
            Arg::new("env")
                .short('e')
                .long("env")
                .value_parser(value_parser!(String))
                .value_name("NAME")
                .help("Run the wrapped tools inside this conda environment [default: run directly]"),
        )
        .arg(
            Arg::new("output_dir")
                .short('d')
                .long("output-dir")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .default_value(".")
                .help("Root directory for trim and assembly outputs"),
        )
        .arg(
            Arg::new("reads")
                .short('r')
                .long("reads")
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf))
                .value_name("FASTQ")
                .help("Read file to queue for trimming; may be given several times"),
        )
        .arg(
            Arg::new("reads_dir")
                .short('D')
                .long("reads-dir")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .help("Queue every FASTQ found under this directory for trimming"),
        )
        .arg(
            Arg::new("single")
                .long("single")
                .action(ArgAction::SetTrue)
                .help("Treat read files as single-end instead of pairing them"),
        )
        .arg(
            Arg::new("only_report")
                .long("only-report")
                .action(ArgAction::SetTrue)
                .help("Trim jobs produce QC reports only, no cleaned output files"),
        )
        .arg(
            Arg::new("dry_run")
                .short('n')
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Print the command line of every queued job and exit"),
        )
        .arg(
            Arg::new("save")
                .long("save")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .help("Write the assembled queue to a batch file and exit"),
        )
        .arg(
            Arg::new("qc")
                .long("qc")
                .action(ArgAction::SetTrue)
                .help("Aggregate QC reports with multiqc after the queue completes"),
        )
        .arg(
            Arg::new("batch")
                .value_parser(value_parser!(PathBuf))
                .value_name("BATCH_CSV")
                .help("Batch file with one job per record"),
        )
}

/// Collect read files below dir, recursively
fn scan_reads_dir(dir: &Path, files: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    for f in dir
        .read_dir()
        .with_context(|| format!("Error reading directory {}", dir.display()))?
    {
        let entry =
            f.with_context(|| format!("Could not get directory entry from {}", dir.display()))?;
        let path = entry.path();
        if path.is_dir() {
            scan_reads_dir(&path, files)?;
        } else if pairing::is_read_file(&path) {
            trace!("Found read file {}", path.display());
            files.push(path);
        }
    }
    Ok(())
}

/// Handle command line options.  Set up Config structure
pub fn handle_cli() -> anyhow::Result<Config> {
    // Get matches from command line
    let m = cli_model().get_matches();

    // Setup logging
    init_log(&m);

    debug!("Processing command line options");

    let threads = m
        .get_one::<NonZeroUsize>("threads")
        .map(|x| usize::from(*x))
        .unwrap_or_else(num_cpus::get) as u32;

    let env = match m.get_one::<String>("env") {
        Some(name) => EnvWrapper::conda(name),
        None => EnvWrapper::Direct,
    };

    let output_dir = m
        .get_one::<PathBuf>("output_dir")
        .expect("Missing default output dir");
    let layout = OutputLayout::new(output_dir);

    let mut reads: Vec<PathBuf> = m
        .get_many::<PathBuf>("reads")
        .map(|v| v.cloned().collect())
        .unwrap_or_default();

    if let Some(dir) = m.get_one::<PathBuf>("reads_dir") {
        let mut found = Vec::new();
        scan_reads_dir(dir, &mut found)
            .with_context(|| format!("Error collecting read files from {}", dir.display()))?;
        found.sort();
        debug!("Found {} read file(s) under {}", found.len(), dir.display());
        reads.extend(found);
    }

    // Drop duplicate paths, keeping first occurrence order
    let mut seen = HashSet::new();
    reads.retain(|p| seen.insert(p.clone()));

    let mut cfg = Config::new(env, layout);
    if let Some(p) = m.get_one::<PathBuf>("batch") {
        cfg.set_batch_file(p.clone())
    }
    cfg.set_reads(reads);
    cfg.set_single(m.get_flag("single"));
    cfg.set_only_report(m.get_flag("only_report"));
    cfg.set_threads(threads);
    cfg.set_dry_run(m.get_flag("dry_run"));
    if let Some(p) = m.get_one::<PathBuf>("save") {
        cfg.set_save_file(p.clone())
    }
    cfg.set_run_qc(m.get_flag("qc"));

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_finds_reads_recursively() {
        let tmp = tempfile::tempdir().unwrap();
        let sub = tmp.path().join("run1");
        fs::create_dir(&sub).unwrap();
        fs::write(tmp.path().join("a_R1.fastq.gz"), b"").unwrap();
        fs::write(sub.join("a_R2.fastq.gz"), b"").unwrap();
        fs::write(sub.join("notes.txt"), b"").unwrap();

        let mut found = Vec::new();
        scan_reads_dir(tmp.path(), &mut found).unwrap();
        found.sort();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| pairing::is_read_file(p)));
    }
}
