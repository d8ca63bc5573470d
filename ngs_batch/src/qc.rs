use std::{fs, path::Path};

use crate::{
    env::EnvWrapper,
    runner::{CancelToken, JobRunner, LAUNCH_FAILED},
    sink::OutputSink,
};

/// Aggregate the per sample QC reports under `dir` into one summary with
/// MultiQC, streaming its output to the sink.  Returns the tool's exit
/// code; a missing multiqc surfaces as a launch failure on the sink.
pub fn aggregate_reports(
    dir: &Path,
    env: &EnvWrapper,
    runner: &dyn JobRunner,
    sink: &dyn OutputSink,
    cancel: &CancelToken,
) -> i32 {
    if let Err(e) = fs::create_dir_all(dir) {
        sink.append(&format!(
            "[multiqc] could not create {}: {}\n",
            dir.display(),
            e
        ));
        return LAUNCH_FAILED;
    }
    let dir_arg = dir.display().to_string();
    let argv = env.wrap(vec![
        String::from("multiqc"),
        String::from("-f"),
        String::from("-o"),
        dir_arg.clone(),
        dir_arg,
    ]);
    sink.append(&format!("[multiqc] aggregating reports in {}\n", dir.display()));
    let code = runner.run(&argv, sink, cancel);
    if code == 0 {
        sink.append("[multiqc] summary report generated\n");
    } else {
        sink.append(&format!("[multiqc] failed with code {}\n", code));
    }
    code
}
