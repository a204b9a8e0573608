mod app;
mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use mtexp_core::ResultSink;
use mtexp_experiment::{ConfigError, ExperimentConfig, FileSink, HttpSink, Identity};
use mtexp_render::PngExporter;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use app::App;
use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let config = ExperimentConfig::default();
    config.validate()?;

    let sink: Box<dyn ResultSink> = match &cli.results_file {
        Some(path) => {
            info!(path = %path.display(), "recording results to file");
            Box::new(FileSink::new(path))
        }
        None => {
            info!(endpoint = %cli.endpoint, "submitting results over http");
            Box::new(HttpSink::new(&cli.endpoint)?)
        }
    };

    let exporter = match &cli.images_directory {
        Some(dir) if !dir.is_dir() => return Err(ConfigError::ImagesDirectory(dir.clone()).into()),
        Some(dir) => Some(PngExporter::new(dir)),
        None => None,
    };

    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let identity = Identity::at_startup(cli.experiment_id.clone());
    let app = App::new(config, identity, sink, exporter, rng);
    app.run().context("experiment aborted")?;

    Ok(())
}
