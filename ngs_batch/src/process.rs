use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use crossbeam_channel::RecvTimeoutError;

use crate::{
    command,
    config::Config,
    controller::BatchController,
    io,
    job::{FastpOpts, JobInputs, JobSpec, ReadMode, ToolOptions},
    pairing, qc,
    runner::{CancelToken, ProcessRunner},
    sink::{ChannelSink, ConsoleSink, OutputSink},
};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_sig: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Route Ctrl-C to a flag checked by the drain loop.  The tools run in
/// their own process groups, so the terminal's SIGINT does not reach
/// them; a clean stop through the controller does.
fn install_sigint_handler() {
    unsafe {
        libc::signal(
            libc::SIGINT,
            on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t,
        );
    }
}

/// Build trim jobs from the read files given on the command line
fn trim_jobs(cfg: &Config) -> Vec<JobSpec> {
    let opts = FastpOpts {
        only_report: cfg.only_report(),
        ..FastpOpts::default()
    };
    let mut jobs = Vec::new();

    if cfg.single() {
        for f in cfg.reads() {
            let sample = pairing::strip_read_ext(f);
            jobs.push(JobSpec::new(
                &sample,
                ReadMode::Single,
                JobInputs::single(f.clone()),
                cfg.threads(),
                ToolOptions::Fastp(opts.clone()),
            ));
        }
    } else {
        let part = pairing::partition(cfg.reads());
        if !part.mate1_only.is_empty() {
            warn!(
                "{} R1 file(s) without a mate will be ignored",
                part.mate1_only.len()
            );
        }
        if !part.mate2_only.is_empty() {
            warn!(
                "{} R2 file(s) without a mate will be ignored",
                part.mate2_only.len()
            );
        }
        if !part.unmatched.is_empty() {
            warn!(
                "{} file(s) with unrecognized names will be ignored",
                part.unmatched.len()
            );
        }
        for pg in part.pairs {
            let pairing::PairGroup { key, mate1, mate2 } = pg;
            jobs.push(JobSpec::new(
                &key,
                ReadMode::Paired,
                JobInputs::paired(mate1, mate2),
                cfg.threads(),
                ToolOptions::Fastp(opts.clone()),
            ));
        }
    }

    jobs
}

/// Distinct executables the queue will invoke
fn required_tools(jobs: &[JobSpec], run_qc: bool) -> Vec<&'static str> {
    let mut v = Vec::new();
    for j in jobs {
        let t = j.tool().binary();
        if !v.contains(&t) {
            v.push(t);
        }
    }
    if run_qc && !v.contains(&"multiqc") {
        v.push("multiqc");
    }
    v
}

fn dry_run(cfg: &Config, jobs: &[JobSpec]) -> anyhow::Result<()> {
    let console = ConsoleSink;
    let n = jobs.len();
    for (i, job) in jobs.iter().enumerate() {
        match command::build_argv(job, cfg.layout()) {
            Ok(argv) => console.append(&format!(
                "({}/{}) {}\n    {}\n",
                i + 1,
                n,
                job.label(),
                cfg.env().wrap(argv).join(" ")
            )),
            Err(e) => console.append(&format!(
                "({}/{}) {}\n    ERROR: {}\n",
                i + 1,
                n,
                job.label(),
                e
            )),
        }
    }
    Ok(())
}

/// Assemble the queue from the command line, run it and relay output
pub fn run(cfg: &Config) -> anyhow::Result<()> {
    let mut jobs = Vec::new();
    if let Some(p) = cfg.batch_file() {
        let loaded = io::load_batch(p)?;
        info!("Loaded {} job(s) from {}", loaded.len(), p.display());
        jobs.extend(loaded);
    }
    if !cfg.reads().is_empty() {
        jobs.extend(trim_jobs(cfg));
    }
    if jobs.is_empty() {
        return Err(anyhow!(
            "No jobs to run: supply a batch file, --reads or --reads-dir"
        ));
    }

    if let Some(path) = cfg.save_file() {
        io::save_batch(path, &jobs)?;
        info!("Saved {} job(s) to {}", jobs.len(), path.display());
        return Ok(());
    }

    if cfg.dry_run() {
        return dry_run(cfg, &jobs);
    }

    cfg.env().check_tools(&required_tools(&jobs, cfg.run_qc()));

    let mut ctl = BatchController::new(cfg.layout().clone(), cfg.env().clone());
    for j in jobs {
        ctl.enqueue(j);
    }

    install_sigint_handler();
    let console = ConsoleSink;
    let (sink, rx) = ChannelSink::new();
    ctl.start(Arc::new(sink))?;

    // Drain worker output on a timer tick, as a display front end would
    let mut stopped = false;
    loop {
        if INTERRUPTED.swap(false, Ordering::SeqCst) && !stopped {
            console.append("[batch] interrupt received, stopping\n");
            ctl.stop();
            stopped = true;
        }
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(text) => console.append(&text),
            Err(RecvTimeoutError::Timeout) => {
                if !ctl.is_running() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    while let Ok(text) = rx.try_recv() {
        console.append(&text);
    }
    ctl.wait();

    if cfg.run_qc() && !stopped {
        let code = qc::aggregate_reports(
            cfg.layout().trim_dir(),
            cfg.env(),
            &ProcessRunner::new(),
            &console,
            &CancelToken::new(),
        );
        if code != 0 {
            warn!("QC aggregation failed with code {}", code);
        }
    }

    Ok(())
}
