//! Command-line front end: argument parsing, configuration, logging and the
//! session file around the job lifecycle client.
mod app;
mod args;
mod config;
mod logging;
mod notices;
mod persistence;

use anyhow::Result;
use clap::Parser;
use studio_logging::studio_info;

use app::Studio;
use args::{Cli, Command};
use config::{ResolvedConfig, StudioConfig};

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.global.log, cli.global.verbose);

    let file = match &cli.global.config {
        Some(path) => StudioConfig::load(path)?,
        None => StudioConfig::default(),
    };
    let command = match cli.command {
        Command::Reset => {
            app::reset(&config::state_dir(&file, &cli.global));
            return Ok(());
        }
        Command::Job(command) => command,
    };

    let config = ResolvedConfig::resolve(file, &cli.global)?;
    studio_info!(
        "backend {} poll every {:?} state in {:?}",
        config.api_base,
        config.lifecycle.poll_interval,
        config.state_dir
    );
    let mut studio = Studio::new(config)?;
    studio.execute(command).await
}
