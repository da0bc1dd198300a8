mod cli;
mod config;
mod error;
mod logging;
mod protocol;
mod worker;

use crate::cli::Cli;
use crate::error::Result;
use crate::worker::Channels;
use clap::Parser;
use msd::engine::MetropolisEngine;
use std::io;
use tracing::{debug, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    info!("MSD worker v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let config = config::build_config(&cli)?;
    debug!(?config, "Resolved worker configuration.");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let channels = Channels::new(stdin.lock(), stdout.lock(), io::stderr());

    worker::serve(channels, MetropolisEngine::from_entropy(), &config)
}
