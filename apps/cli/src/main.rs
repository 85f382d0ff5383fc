//! `vegh` entry point.

mod cli;
mod commands;
mod output;

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::commands::App;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match App::new() {
        Ok(app) => app.run(cli.command).await,
        Err(e) => Err(e),
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

/// Logs go to stderr so command output on stdout stays parseable.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,vegh=debug"
    } else {
        "warn,vegh=info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}
