use std::path::{Path, PathBuf};

use crate::{
    env::EnvWrapper,
    job::{JobSpec, Tool},
};

/// Output directory layout.  Trim jobs write cleaned reads and reports to
/// one shared directory; each assembly job gets its own subdirectory named
/// after the sample.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    trim_dir: PathBuf,
    assembly_dir: PathBuf,
}

impl OutputLayout {
    pub fn new(root: &Path) -> Self {
        Self {
            trim_dir: root.join("fastp_output"),
            assembly_dir: root.join("assembly_output"),
        }
    }

    pub fn trim_dir(&self) -> &Path {
        &self.trim_dir
    }

    pub fn assembly_dir(&self) -> &Path {
        &self.assembly_dir
    }

    /// Directory that must exist before the given job starts
    pub fn job_output_dir(&self, job: &JobSpec) -> PathBuf {
        match job.tool() {
            Tool::Fastp => self.trim_dir.clone(),
            Tool::Spades | Tool::Unicycler => self.assembly_dir.join(job.sample()),
        }
    }
}

pub struct Config {
    env: EnvWrapper,
    layout: OutputLayout,
    batch_file: Option<PathBuf>,
    reads: Vec<PathBuf>,
    single: bool,
    only_report: bool,
    threads: u32,
    dry_run: bool,
    save_file: Option<PathBuf>,
    run_qc: bool,
}

impl Config {
    pub fn new(env: EnvWrapper, layout: OutputLayout) -> Self {
        Self {
            env,
            layout,
            batch_file: None,
            reads: Vec::new(),
            single: false,
            only_report: false,
            threads: 1,
            dry_run: false,
            save_file: None,
            run_qc: false,
        }
    }

    pub fn set_batch_file(&mut self, p: PathBuf) {
        self.batch_file = Some(p)
    }

    pub fn set_reads(&mut self, reads: Vec<PathBuf>) {
        self.reads = reads
    }

    pub fn set_single(&mut self, single: bool) {
        self.single = single
    }

    pub fn set_only_report(&mut self, only_report: bool) {
        self.only_report = only_report
    }

    pub fn set_threads(&mut self, threads: u32) {
        self.threads = threads
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run
    }

    pub fn set_save_file(&mut self, p: PathBuf) {
        self.save_file = Some(p)
    }

    pub fn set_run_qc(&mut self, run_qc: bool) {
        self.run_qc = run_qc
    }

    pub fn batch_file(&self) -> Option<&Path> {
        self.batch_file.as_deref()
    }

    pub fn reads(&self) -> &[PathBuf] {
        &self.reads
    }

    pub fn single(&self) -> bool {
        self.single
    }

    pub fn only_report(&self) -> bool {
        self.only_report
    }

    pub fn threads(&self) -> u32 {
        self.threads
    }

    pub fn env(&self) -> &EnvWrapper {
        &self.env
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn save_file(&self) -> Option<&Path> {
        self.save_file.as_deref()
    }

    pub fn run_qc(&self) -> bool {
        self.run_qc
    }
}
