use std::{
    fs,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crate::{
    command,
    config::OutputLayout,
    env::EnvWrapper,
    error::ControllerError,
    job::{JobSpec, ToolOptions},
    runner::{CancelToken, JobRunner, ProcessRunner},
    sink::{OutputSink, PrefixSink},
};

/// Sequential batch execution of queued jobs.
///
/// The queue is owned by the foreground.  `start` freezes a snapshot of
/// the current order and hands it to one worker thread, which runs the
/// jobs strictly one at a time.  Queue edits made while the worker is
/// busy affect only the live queue, never the running snapshot.
///
/// The state shared with the worker is two flags: `running`, which also
/// serves as the keep-going signal for the loop, and the cancel token
/// polled by the runner at line boundaries.  `stop` clears the first and
/// sets the second; `stop_current` sets only the token, so the queue
/// carries on with the next job.
pub struct BatchController {
    queue: Vec<JobSpec>,
    layout: OutputLayout,
    env: EnvWrapper,
    runner: Arc<dyn JobRunner>,
    running: Arc<AtomicBool>,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
}

impl BatchController {
    pub fn new(layout: OutputLayout, env: EnvWrapper) -> Self {
        Self::with_runner(layout, env, Arc::new(ProcessRunner::new()))
    }

    pub fn with_runner(
        layout: OutputLayout,
        env: EnvWrapper,
        runner: Arc<dyn JobRunner>,
    ) -> Self {
        Self {
            queue: Vec::new(),
            layout,
            env,
            runner,
            running: Arc::new(AtomicBool::new(false)),
            cancel: CancelToken::new(),
            worker: None,
        }
    }

    pub fn enqueue(&mut self, job: JobSpec) {
        debug!("Queued job {}", job.label());
        self.queue.push(job);
    }

    /// Remove the queue entry at `idx` from the live queue.  Has no
    /// effect on a snapshot already being executed.
    pub fn remove_at(&mut self, idx: usize) -> Option<JobSpec> {
        if idx < self.queue.len() {
            Some(self.queue.remove(idx))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn jobs(&self) -> &[JobSpec] {
        &self.queue
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Snapshot the queue and begin sequential execution on a worker
    /// thread.  Returns without blocking; progress and job output arrive
    /// through the sink.
    pub fn start(&mut self, sink: Arc<dyn OutputSink>) -> Result<(), ControllerError> {
        if self.is_running() {
            return Err(ControllerError::AlreadyRunning);
        }
        // Reap the worker of a finished run
        if let Some(h) = self.worker.take() {
            let _ = h.join();
        }
        if self.queue.is_empty() {
            return Err(ControllerError::EmptyQueue);
        }

        let snapshot = self.queue.clone();
        self.cancel.clear();
        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let cancel = self.cancel.clone();
        let layout = self.layout.clone();
        let env = self.env.clone();
        let runner = Arc::clone(&self.runner);

        debug!("Starting batch of {} job(s)", snapshot.len());
        self.worker = Some(thread::spawn(move || {
            let n = snapshot.len();
            for (i, job) in snapshot.iter().enumerate() {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                sink.append(&format!("[batch] ({}/{}) {}\n", i + 1, n, job.label()));
                run_job(job, &layout, &env, runner.as_ref(), sink.as_ref(), &cancel);
                if !running.load(Ordering::SeqCst) {
                    break;
                }
            }
            if running.load(Ordering::SeqCst) {
                sink.append("[batch] queue complete\n");
            } else {
                sink.append("[batch] queue stopped\n");
            }
            running.store(false, Ordering::SeqCst);
            debug!("Batch worker finished");
        }));
        Ok(())
    }

    /// Interrupt the current job and cancel the rest of the queue
    pub fn stop(&self) {
        debug!("Stop requested");
        self.running.store(false, Ordering::SeqCst);
        self.cancel.set();
    }

    /// Interrupt the current job only; the queue moves on to the next one
    pub fn stop_current(&self) {
        debug!("Stop of current job requested");
        self.cancel.set();
    }

    /// Block until the worker finishes.  Intended for non interactive
    /// callers; the foreground of a display application polls
    /// `is_running` instead.
    pub fn wait(&mut self) {
        if let Some(h) = self.worker.take() {
            let _ = h.join();
        }
    }
}

/// Validate, build and run a single job, reporting everything through the
/// sink with the sample label prefixed.  A failure here never propagates;
/// the batch loop always moves on unless stopped.
fn run_job(
    job: &JobSpec,
    layout: &OutputLayout,
    env: &EnvWrapper,
    runner: &dyn JobRunner,
    sink: &dyn OutputSink,
    cancel: &CancelToken,
) {
    cancel.clear();
    let psink = PrefixSink::new(sink, format!("[{}] ", job.sample()));

    let argv = match command::build_argv(job, layout) {
        Ok(v) => v,
        Err(e) => {
            psink.append(&format!("ERROR: {}\n", e));
            return;
        }
    };
    if let ToolOptions::Fastp(o) = job.options() {
        if o.split_conflict() {
            psink.append("warning: use only one of -s or -S; splitting disabled\n");
        }
    }

    let outdir = layout.job_output_dir(job);
    if let Err(e) = fs::create_dir_all(&outdir) {
        psink.append(&format!(
            "ERROR: could not create {}: {}\n",
            outdir.display(),
            e
        ));
        return;
    }

    let argv = env.wrap(argv);
    psink.append(&format!("[{}] {}\n", job.tool(), argv.join(" ")));
    let code = runner.run(&argv, &psink, cancel);
    if code == 0 {
        psink.append("job complete\n");
    } else {
        psink.append(&format!("job finished with code {}\n", code));
    }
}
