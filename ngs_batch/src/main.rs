use anyhow::Context;

use ngs_batch::{cli, process};

fn main() -> anyhow::Result<()> {
    let cfg = cli::handle_cli().with_context(|| "Error processing command line arguments")?;
    process::run(&cfg)
}
