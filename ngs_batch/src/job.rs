use std::{fmt, path::PathBuf, str::FromStr};

/// External programs that can be queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Fastp,
    Spades,
    Unicycler,
}

impl Tool {
    /// Name of the executable the tool is invoked as
    pub fn binary(&self) -> &'static str {
        match self {
            Self::Fastp => "fastp",
            Self::Spades => "spades.py",
            Self::Unicycler => "unicycler",
        }
    }
}

impl FromStr for Tool {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fastp" => Ok(Self::Fastp),
            "spades" => Ok(Self::Spades),
            "unicycler" => Ok(Self::Unicycler),
            _ => Err("no match"),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fastp => f.write_str("fastp"),
            Self::Spades => f.write_str("spades"),
            Self::Unicycler => f.write_str("unicycler"),
        }
    }
}

/// Short read layout for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    Paired,
    Single,
}

impl FromStr for ReadMode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pe" | "paired" => Ok(Self::Paired),
            "se" | "single" => Ok(Self::Single),
            _ => Err("no match"),
        }
    }
}

impl fmt::Display for ReadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paired => f.write_str("PE"),
            Self::Single => f.write_str("SE"),
        }
    }
}

/// Input read files for one job.  Which fields must be present depends on
/// the tool and read mode, and is checked at submission time rather than
/// at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobInputs {
    pub mate1: Option<PathBuf>,
    pub mate2: Option<PathBuf>,
    pub single: Option<PathBuf>,
    pub long_reads: Option<PathBuf>,
}

impl JobInputs {
    pub fn paired(mate1: PathBuf, mate2: PathBuf) -> Self {
        Self {
            mate1: Some(mate1),
            mate2: Some(mate2),
            ..Self::default()
        }
    }

    pub fn single(single: PathBuf) -> Self {
        Self {
            single: Some(single),
            ..Self::default()
        }
    }
}

/// fastp knobs.  A knob holding its default value here stays off the
/// built command line.
#[derive(Debug, Clone, PartialEq)]
pub struct FastpOpts {
    /// Report only: no trimming, no filtering, no output FASTQs
    pub only_report: bool,
    pub dont_overwrite: bool,
    pub qualified_quality: u32,
    pub unqualified_percent: u32,
    pub n_base_limit: u32,
    pub min_length: u32,
    /// 0 disables the maximum length filter
    pub length_limit: u32,
    pub cut_front: bool,
    pub cut_tail: bool,
    pub cut_right: bool,
    pub cut_window_size: u32,
    pub cut_mean_quality: u32,
    pub trim_front1: u32,
    pub trim_tail1: u32,
    pub max_len1: u32,
    pub trim_front2: u32,
    pub trim_tail2: u32,
    pub max_len2: u32,
    pub detect_adapter_for_pe: bool,
    pub correction: bool,
    pub adapter_sequence: String,
    pub adapter_sequence_r2: String,
    pub split_files: u32,
    pub split_by_lines: u64,
    pub split_prefix_digits: u32,
}

impl Default for FastpOpts {
    fn default() -> Self {
        Self {
            only_report: false,
            dont_overwrite: false,
            qualified_quality: 15,
            unqualified_percent: 40,
            n_base_limit: 5,
            min_length: 50,
            length_limit: 0,
            cut_front: true,
            cut_tail: true,
            cut_right: false,
            cut_window_size: 4,
            cut_mean_quality: 20,
            trim_front1: 0,
            trim_tail1: 0,
            max_len1: 0,
            trim_front2: 0,
            trim_tail2: 0,
            max_len2: 0,
            detect_adapter_for_pe: false,
            correction: false,
            adapter_sequence: String::from("auto"),
            adapter_sequence_r2: String::new(),
            split_files: 0,
            split_by_lines: 0,
            split_prefix_digits: 4,
        }
    }
}

impl FastpOpts {
    /// Splitting by file count and by line count are mutually exclusive;
    /// when both are requested neither is emitted
    pub fn split_conflict(&self) -> bool {
        self.split_files > 0 && self.split_by_lines > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpadesOpts {
    pub careful: bool,
    /// Comma separated k-mer list; empty selects the tool's automatic choice
    pub kmers: String,
}

impl Default for SpadesOpts {
    fn default() -> Self {
        Self {
            careful: true,
            kmers: String::new(),
        }
    }
}

/// Unicycler bridging mode (its --mode option)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Bridging {
    Conservative,
    #[default]
    Normal,
    Bold,
}

impl FromStr for Bridging {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conservative" => Ok(Self::Conservative),
            "normal" => Ok(Self::Normal),
            "bold" => Ok(Self::Bold),
            _ => Err("no match"),
        }
    }
}

impl fmt::Display for Bridging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conservative => f.write_str("conservative"),
            Self::Normal => f.write_str("normal"),
            Self::Bold => f.write_str("bold"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnicyclerOpts {
    pub bridging: Bridging,
    pub keep: u32,
    pub min_fasta_length: u32,
    pub linear_seqs: u32,
}

impl Default for UnicyclerOpts {
    fn default() -> Self {
        Self {
            bridging: Bridging::Normal,
            keep: 1,
            min_fasta_length: 100,
            linear_seqs: 0,
        }
    }
}

/// Tool selection together with that tool's options.  Deriving the tool
/// from the variant means a job can never carry options for a different
/// tool than the one it runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOptions {
    Fastp(FastpOpts),
    Spades(SpadesOpts),
    Unicycler(UnicyclerOpts),
}

impl ToolOptions {
    pub fn tool(&self) -> Tool {
        match self {
            Self::Fastp(_) => Tool::Fastp,
            Self::Spades(_) => Tool::Spades,
            Self::Unicycler(_) => Tool::Unicycler,
        }
    }
}

/// Description of one queued invocation of one external tool.  Not
/// modified after being enqueued; a re-run works on a fresh copy.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    sample: String,
    mode: ReadMode,
    inputs: JobInputs,
    threads: u32,
    options: ToolOptions,
}

impl JobSpec {
    pub fn new(
        sample: &str,
        mode: ReadMode,
        inputs: JobInputs,
        threads: u32,
        options: ToolOptions,
    ) -> Self {
        let sample = sample.trim();
        let sample = if sample.is_empty() {
            String::from("sample1")
        } else {
            sample.to_owned()
        };
        Self {
            sample,
            mode,
            inputs,
            threads,
            options,
        }
    }

    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    pub fn inputs(&self) -> &JobInputs {
        &self.inputs
    }

    pub fn threads(&self) -> u32 {
        self.threads
    }

    pub fn options(&self) -> &ToolOptions {
        &self.options
    }

    pub fn tool(&self) -> Tool {
        self.options.tool()
    }

    /// One line description used in progress notices
    pub fn label(&self) -> String {
        let lr = if self.inputs.long_reads.is_some() {
            "+long"
        } else {
            ""
        };
        format!(
            "{} - {} [{}{}] threads={}",
            self.sample,
            self.tool(),
            self.mode,
            lr,
            self.threads
        )
    }
}
