use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use trailloop::cli::{Cli, CliOutcome};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().run() {
        Ok(CliOutcome::Success) => ExitCode::from(0),
        Ok(CliOutcome::NoRoutes) => ExitCode::from(1),
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::from(2)
        }
    }
}
