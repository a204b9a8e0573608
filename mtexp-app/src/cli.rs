use clap::Parser;
use mtexp_experiment::DEFAULT_ENDPOINT;
use std::path::PathBuf;

/// Timed visual search trials with yes/no responses
#[derive(Debug, Parser)]
#[command(name = "mtexp")]
#[command(version)]
#[command(about = "Runs red-vertical-line detection trials and records every response")]
pub struct Cli {
    /// Identifier stamped on every result row
    #[arg(long, default_value = "")]
    pub experiment_id: String,

    /// Append results to this file instead of submitting them
    #[arg(long)]
    pub results_file: Option<PathBuf>,

    /// Save each trial's stimulus as a PNG into this existing directory
    #[arg(long)]
    pub images_directory: Option<PathBuf>,

    /// Form endpoint used when no results file is given
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Seed for stimulus generation; drawn from the OS when absent
    #[arg(long)]
    pub seed: Option<u64>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
