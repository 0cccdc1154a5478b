mod bootstrap_helpers;
mod cli_args;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use openqa_bisect_runtime::{BisectOutcome, BisectRuntime};

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::Cli;

fn run(cli: &Cli) -> Result<BisectOutcome> {
    let runtime = BisectRuntime::new(cli.runtime_config())?;
    runtime.run(&cli.url)
}

fn log_outcome(outcome: &BisectOutcome) {
    match outcome {
        BisectOutcome::Excluded(exclusion) => {
            tracing::debug!("finished: {} ({})", outcome.as_str(), exclusion.guard.as_str());
        }
        BisectOutcome::Simulated { planned } => {
            tracing::info!("dry-run finished, {planned} bisect jobs planned");
        }
        BisectOutcome::Reported {
            cloned,
            prioritized,
        } => {
            tracing::info!("created {cloned} bisect jobs, adjusted priority of {prioritized}");
        }
        BisectOutcome::NothingToBisect | BisectOutcome::RepositoriesUnavailable => {
            tracing::debug!("finished: {}", outcome.as_str());
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(&cli) {
        Ok(outcome) => {
            log_outcome(&outcome);
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
