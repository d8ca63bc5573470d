use std::path::Path;

use crate::{
    config::OutputLayout,
    error::ValidationError,
    job::{FastpOpts, JobSpec, ReadMode, SpadesOpts, Tool, ToolOptions, UnicyclerOpts},
};

fn path_arg(p: &Path) -> String {
    p.display().to_string()
}

/// Check that the job's inputs are consistent with its tool and read mode
pub fn validate(job: &JobSpec) -> Result<(), ValidationError> {
    if job.threads() == 0 {
        return Err(ValidationError::NoThreads);
    }
    let inp = job.inputs();
    let both_mates = inp.mate1.is_some() && inp.mate2.is_some();
    match (job.tool(), job.mode()) {
        (Tool::Fastp | Tool::Spades, ReadMode::Paired) if !both_mates => {
            Err(ValidationError::MissingMates {
                tool: job.tool(),
                mode: job.mode(),
            })
        }
        (Tool::Fastp | Tool::Spades, ReadMode::Single) if inp.single.is_none() => {
            Err(ValidationError::MissingSingle { tool: job.tool() })
        }
        (Tool::Unicycler, ReadMode::Paired)
            if !both_mates && inp.single.is_none() && inp.long_reads.is_none() =>
        {
            Err(ValidationError::MissingUnicyclerPaired)
        }
        (Tool::Unicycler, ReadMode::Single)
            if inp.single.is_none() && inp.long_reads.is_none() =>
        {
            Err(ValidationError::MissingUnicyclerSingle)
        }
        _ => Ok(()),
    }
}

/// Render the job as an argument vector for the wrapped tool.
///
/// Pure: nothing is read from or written to the filesystem or the
/// environment, so the same job and layout always produce the same
/// vector.  Numeric and string options holding their declared default are
/// left off the command line so the wrapped tool's own defaults stay in
/// charge; boolean flags appear only when true.
pub fn build_argv(job: &JobSpec, layout: &OutputLayout) -> Result<Vec<String>, ValidationError> {
    validate(job)?;
    Ok(match job.options() {
        ToolOptions::Fastp(o) => build_fastp(job, o, layout),
        ToolOptions::Spades(o) => build_spades(job, o, layout),
        ToolOptions::Unicycler(o) => build_unicycler(job, o, layout),
    })
}

/// Push `flag value` when the value differs from its default
fn push_if<T: PartialEq + ToString>(v: &mut Vec<String>, flag: &str, val: T, default: T) {
    if val != default {
        v.push(String::from(flag));
        v.push(val.to_string());
    }
}

fn build_fastp(job: &JobSpec, o: &FastpOpts, layout: &OutputLayout) -> Vec<String> {
    let trim = layout.trim_dir();
    let sample = job.sample();
    let inp = job.inputs();
    let d = FastpOpts::default();

    let mut v = vec![
        String::from(Tool::Fastp.binary()),
        String::from("-w"),
        job.threads().to_string(),
    ];
    if o.dont_overwrite {
        v.push(String::from("--dont_overwrite"));
    }

    // Reports are always produced
    v.push(String::from("-j"));
    v.push(path_arg(&trim.join(format!("{}_fastp_report.json", sample))));
    v.push(String::from("-h"));
    v.push(path_arg(&trim.join(format!("{}_fastp_report.html", sample))));

    if o.only_report {
        // Report only: disable adapter trimming, quality and length
        // filtering and polyG trimming instead of emitting the filter
        // group below
        v.extend(["-A", "-Q", "-L", "-G"].map(String::from));
    } else {
        push_if(&mut v, "-q", o.qualified_quality, d.qualified_quality);
        push_if(&mut v, "-u", o.unqualified_percent, d.unqualified_percent);
        push_if(&mut v, "-n", o.n_base_limit, d.n_base_limit);
        push_if(&mut v, "-l", o.min_length, d.min_length);
        push_if(&mut v, "--length_limit", o.length_limit, 0);

        // Sliding window trimming; window size and quality only make
        // sense while some cut flag is active
        let cutting = o.cut_front || o.cut_tail || o.cut_right;
        if o.cut_front {
            v.push(String::from("-5"));
        }
        if o.cut_tail {
            v.push(String::from("-3"));
        }
        if o.cut_right {
            v.push(String::from("-r"));
        }
        if cutting {
            push_if(&mut v, "-W", o.cut_window_size, d.cut_window_size);
            push_if(&mut v, "-M", o.cut_mean_quality, d.cut_mean_quality);
        }

        push_if(&mut v, "-f", o.trim_front1, 0);
        push_if(&mut v, "-t", o.trim_tail1, 0);
        push_if(&mut v, "-b", o.max_len1, 0);
        push_if(&mut v, "-F", o.trim_front2, 0);
        push_if(&mut v, "-T", o.trim_tail2, 0);
        push_if(&mut v, "-B", o.max_len2, 0);

        if job.mode() == ReadMode::Paired && o.detect_adapter_for_pe {
            v.push(String::from("--detect_adapter_for_pe"));
        }
        if !o.adapter_sequence.is_empty() && o.adapter_sequence != d.adapter_sequence {
            v.push(String::from("-a"));
            v.push(o.adapter_sequence.clone());
        }
        if !o.adapter_sequence_r2.is_empty() {
            v.push(String::from("--adapter_sequence_r2"));
            v.push(o.adapter_sequence_r2.clone());
        }

        if o.split_conflict() {
            // Reported at run time; neither split option is emitted
        } else if o.split_files > 0 || o.split_by_lines > 0 {
            if o.split_files > 0 {
                v.push(String::from("-s"));
                v.push(o.split_files.to_string());
            } else {
                v.push(String::from("-S"));
                v.push(o.split_by_lines.to_string());
            }
            push_if(&mut v, "-d", o.split_prefix_digits, d.split_prefix_digits);
        }

        if job.mode() == ReadMode::Paired && o.correction {
            v.push(String::from("-c"));
        }
    }

    match job.mode() {
        ReadMode::Paired => {
            v.push(String::from("-i"));
            v.push(path_arg(inp.mate1.as_ref().unwrap()));
            v.push(String::from("-I"));
            v.push(path_arg(inp.mate2.as_ref().unwrap()));
            if !o.only_report {
                v.push(String::from("-o"));
                v.push(path_arg(&trim.join(format!("{}_R1_cleaned.fastq.gz", sample))));
                v.push(String::from("-O"));
                v.push(path_arg(&trim.join(format!("{}_R2_cleaned.fastq.gz", sample))));
                v.push(String::from("--failed_out"));
                v.push(String::from("/dev/null"));
            }
        }
        ReadMode::Single => {
            v.push(String::from("-i"));
            v.push(path_arg(inp.single.as_ref().unwrap()));
            if !o.only_report {
                v.push(String::from("-o"));
                v.push(path_arg(&trim.join(format!("{}_cleaned.fastq.gz", sample))));
                v.push(String::from("--failed_out"));
                v.push(String::from("/dev/null"));
            }
        }
    }

    v
}

fn build_spades(job: &JobSpec, o: &SpadesOpts, layout: &OutputLayout) -> Vec<String> {
    let inp = job.inputs();
    let mut v = vec![
        String::from(Tool::Spades.binary()),
        String::from("-t"),
        job.threads().to_string(),
        String::from("-o"),
        path_arg(&layout.assembly_dir().join(job.sample())),
    ];
    if o.careful {
        v.push(String::from("--careful"));
    }
    if !o.kmers.is_empty() {
        v.push(String::from("--kmers"));
        v.push(o.kmers.clone());
    }
    match job.mode() {
        ReadMode::Paired => {
            v.push(String::from("-1"));
            v.push(path_arg(inp.mate1.as_ref().unwrap()));
            v.push(String::from("-2"));
            v.push(path_arg(inp.mate2.as_ref().unwrap()));
        }
        ReadMode::Single => {
            v.push(String::from("-s"));
            v.push(path_arg(inp.single.as_ref().unwrap()));
        }
    }
    v
}

fn build_unicycler(job: &JobSpec, o: &UnicyclerOpts, layout: &OutputLayout) -> Vec<String> {
    let inp = job.inputs();
    let d = UnicyclerOpts::default();
    let mut v = vec![
        String::from(Tool::Unicycler.binary()),
        String::from("-o"),
        path_arg(&layout.assembly_dir().join(job.sample())),
        String::from("-t"),
        job.threads().to_string(),
    ];
    push_if(&mut v, "--mode", o.bridging, d.bridging);
    push_if(&mut v, "--keep", o.keep, d.keep);
    push_if(&mut v, "--min_fasta_length", o.min_fasta_length, d.min_fasta_length);
    push_if(&mut v, "--linear_seqs", o.linear_seqs, d.linear_seqs);
    if let (Some(m1), Some(m2)) = (inp.mate1.as_ref(), inp.mate2.as_ref()) {
        v.push(String::from("-1"));
        v.push(path_arg(m1));
        v.push(String::from("-2"));
        v.push(path_arg(m2));
    }
    if let Some(se) = inp.single.as_ref() {
        v.push(String::from("-s"));
        v.push(path_arg(se));
    }
    if let Some(long) = inp.long_reads.as_ref() {
        v.push(String::from("-l"));
        v.push(path_arg(long));
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Bridging, JobInputs};
    use std::path::PathBuf;

    fn layout() -> OutputLayout {
        OutputLayout::new(Path::new("/out"))
    }

    fn paired_inputs() -> JobInputs {
        JobInputs::paired(PathBuf::from("S_R1.fq.gz"), PathBuf::from("S_R2.fq.gz"))
    }

    fn fastp_job(opts: FastpOpts) -> JobSpec {
        JobSpec::new(
            "S",
            ReadMode::Paired,
            paired_inputs(),
            4,
            ToolOptions::Fastp(opts),
        )
    }

    #[test]
    fn same_job_gives_identical_argv() {
        let job = fastp_job(FastpOpts::default());
        assert_eq!(
            build_argv(&job, &layout()).unwrap(),
            build_argv(&job, &layout()).unwrap()
        );
    }

    #[test]
    fn fastp_paired_defaults_emit_only_the_always_on_parts() {
        let argv = build_argv(&fastp_job(FastpOpts::default()), &layout()).unwrap();
        assert_eq!(
            argv,
            [
                "fastp",
                "-w",
                "4",
                "-j",
                "/out/fastp_output/S_fastp_report.json",
                "-h",
                "/out/fastp_output/S_fastp_report.html",
                "-5",
                "-3",
                "-i",
                "S_R1.fq.gz",
                "-I",
                "S_R2.fq.gz",
                "-o",
                "/out/fastp_output/S_R1_cleaned.fastq.gz",
                "-O",
                "/out/fastp_output/S_R2_cleaned.fastq.gz",
                "--failed_out",
                "/dev/null",
            ]
        );
    }

    #[test]
    fn non_default_options_are_included() {
        let argv = build_argv(
            &fastp_job(FastpOpts {
                qualified_quality: 20,
                min_length: 30,
                length_limit: 300,
                cut_window_size: 8,
                trim_front1: 5,
                max_len2: 150,
                ..FastpOpts::default()
            }),
            &layout(),
        )
        .unwrap();
        let s = argv.join(" ");
        assert!(s.contains("-q 20"));
        assert!(s.contains("-l 30"));
        assert!(s.contains("--length_limit 300"));
        assert!(s.contains("-W 8"));
        assert!(s.contains("-f 5"));
        assert!(s.contains("-B 150"));
        // Untouched knobs stay off the command line
        assert!(!s.contains("-u "));
        assert!(!s.contains("-M "));
        assert!(!s.contains("-a "));
    }

    #[test]
    fn window_options_need_an_active_cut_flag() {
        let argv = build_argv(
            &fastp_job(FastpOpts {
                cut_front: false,
                cut_tail: false,
                cut_window_size: 10,
                ..FastpOpts::default()
            }),
            &layout(),
        )
        .unwrap();
        assert!(!argv.contains(&String::from("-5")));
        assert!(!argv.contains(&String::from("-W")));
    }

    #[test]
    fn only_report_replaces_filter_group() {
        let argv = build_argv(
            &fastp_job(FastpOpts {
                only_report: true,
                min_length: 30,
                ..FastpOpts::default()
            }),
            &layout(),
        )
        .unwrap();
        for flag in ["-A", "-Q", "-L", "-G"] {
            assert!(argv.contains(&String::from(flag)), "missing {}", flag);
        }
        // No filtering, no cutting, no output files
        for flag in ["-l", "-5", "-W", "-o", "--failed_out"] {
            assert!(!argv.contains(&String::from(flag)), "unexpected {}", flag);
        }
        assert!(argv.contains(&String::from("-i")));
    }

    #[test]
    fn split_modes_are_mutually_exclusive() {
        let argv = build_argv(
            &fastp_job(FastpOpts {
                split_files: 4,
                split_by_lines: 1000,
                ..FastpOpts::default()
            }),
            &layout(),
        )
        .unwrap();
        assert!(!argv.contains(&String::from("-s")));
        assert!(!argv.contains(&String::from("-S")));

        let argv = build_argv(
            &fastp_job(FastpOpts {
                split_files: 4,
                split_prefix_digits: 5,
                ..FastpOpts::default()
            }),
            &layout(),
        )
        .unwrap();
        let s = argv.join(" ");
        assert!(s.contains("-s 4 -d 5"));

        let argv = build_argv(
            &fastp_job(FastpOpts {
                split_by_lines: 4000,
                ..FastpOpts::default()
            }),
            &layout(),
        )
        .unwrap();
        let s = argv.join(" ");
        assert!(s.contains("-S 4000"));
        // Prefix digits at their default are left out
        assert!(!s.contains("-d "));
    }

    #[test]
    fn fastp_paired_booleans_appear_only_when_true() {
        let argv = build_argv(
            &fastp_job(FastpOpts {
                detect_adapter_for_pe: true,
                correction: true,
                dont_overwrite: true,
                adapter_sequence_r2: String::from("ACGT"),
                ..FastpOpts::default()
            }),
            &layout(),
        )
        .unwrap();
        assert!(argv.contains(&String::from("--detect_adapter_for_pe")));
        assert!(argv.contains(&String::from("-c")));
        assert!(argv.contains(&String::from("--dont_overwrite")));
        let s = argv.join(" ");
        assert!(s.contains("--adapter_sequence_r2 ACGT"));

        let plain = build_argv(&fastp_job(FastpOpts::default()), &layout()).unwrap();
        assert!(!plain.contains(&String::from("--detect_adapter_for_pe")));
        assert!(!plain.contains(&String::from("-c")));
        assert!(!plain.contains(&String::from("--dont_overwrite")));
    }

    #[test]
    fn spades_paired_needs_both_mates() {
        let job = JobSpec::new(
            "s1",
            ReadMode::Paired,
            JobInputs {
                mate1: Some(PathBuf::from("s1_R1.fq")),
                ..JobInputs::default()
            },
            8,
            ToolOptions::Spades(SpadesOpts::default()),
        );
        assert_eq!(
            build_argv(&job, &layout()),
            Err(ValidationError::MissingMates {
                tool: Tool::Spades,
                mode: ReadMode::Paired,
            })
        );
    }

    #[test]
    fn spades_single_end() {
        let job = JobSpec::new(
            "s1",
            ReadMode::Single,
            JobInputs::single(PathBuf::from("se.fq")),
            8,
            ToolOptions::Spades(SpadesOpts::default()),
        );
        assert_eq!(
            build_argv(&job, &layout()).unwrap(),
            [
                "spades.py",
                "-t",
                "8",
                "-o",
                "/out/assembly_output/s1",
                "--careful",
                "-s",
                "se.fq",
            ]
        );
    }

    #[test]
    fn spades_options_follow_values() {
        let job = JobSpec::new(
            "s1",
            ReadMode::Single,
            JobInputs::single(PathBuf::from("se.fq")),
            8,
            ToolOptions::Spades(SpadesOpts {
                careful: false,
                kmers: String::from("21,33,55"),
            }),
        );
        let argv = build_argv(&job, &layout()).unwrap();
        assert!(!argv.contains(&String::from("--careful")));
        assert!(argv.join(" ").contains("--kmers 21,33,55"));
    }

    #[test]
    fn unicycler_defaults_stay_off_the_command_line() {
        let job = JobSpec::new(
            "iso",
            ReadMode::Paired,
            paired_inputs(),
            16,
            ToolOptions::Unicycler(UnicyclerOpts::default()),
        );
        assert_eq!(
            build_argv(&job, &layout()).unwrap(),
            [
                "unicycler",
                "-o",
                "/out/assembly_output/iso",
                "-t",
                "16",
                "-1",
                "S_R1.fq.gz",
                "-2",
                "S_R2.fq.gz",
            ]
        );
    }

    #[test]
    fn unicycler_hybrid_with_tuned_options() {
        let mut inputs = paired_inputs();
        inputs.long_reads = Some(PathBuf::from("nanopore.fq.gz"));
        let job = JobSpec::new(
            "iso",
            ReadMode::Paired,
            inputs,
            16,
            ToolOptions::Unicycler(UnicyclerOpts {
                bridging: Bridging::Bold,
                keep: 2,
                min_fasta_length: 200,
                linear_seqs: 1,
            }),
        );
        assert_eq!(
            build_argv(&job, &layout()).unwrap(),
            [
                "unicycler",
                "-o",
                "/out/assembly_output/iso",
                "-t",
                "16",
                "--mode",
                "bold",
                "--keep",
                "2",
                "--min_fasta_length",
                "200",
                "--linear_seqs",
                "1",
                "-1",
                "S_R1.fq.gz",
                "-2",
                "S_R2.fq.gz",
                "-l",
                "nanopore.fq.gz",
            ]
        );
    }

    #[test]
    fn unicycler_accepts_long_reads_alone() {
        let job = JobSpec::new(
            "iso",
            ReadMode::Single,
            JobInputs {
                long_reads: Some(PathBuf::from("long.fq")),
                ..JobInputs::default()
            },
            16,
            ToolOptions::Unicycler(UnicyclerOpts::default()),
        );
        assert!(build_argv(&job, &layout()).is_ok());

        let empty = JobSpec::new(
            "iso",
            ReadMode::Single,
            JobInputs::default(),
            16,
            ToolOptions::Unicycler(UnicyclerOpts::default()),
        );
        assert_eq!(
            build_argv(&empty, &layout()),
            Err(ValidationError::MissingUnicyclerSingle)
        );
    }

    #[test]
    fn zero_threads_rejected() {
        let job = JobSpec::new(
            "s1",
            ReadMode::Single,
            JobInputs::single(PathBuf::from("se.fq")),
            0,
            ToolOptions::Spades(SpadesOpts::default()),
        );
        assert_eq!(build_argv(&job, &layout()), Err(ValidationError::NoThreads));
    }
}
