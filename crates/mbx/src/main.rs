use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod ui;

fn main() -> Result<()> {
    let parsed = cli::Cli::parse();

    // Outcome exit codes: 1 failed, 2 blocked, 3 aborted, 4 history stranded.
    // Errors raised before a run starts (bad config, logging) surface through
    // anyhow and exit with 1.
    let code = parsed.dispatch()?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
