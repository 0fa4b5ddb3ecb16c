mod cli;
mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use commands::{run_cluster, run_ingest, run_unify};
use logging::setup_logging;

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level)?;

    match cli.command {
        Commands::Unify(args) => {
            run_unify(args)?;
        }
        Commands::Ingest(args) => {
            run_ingest(args)?;
        }
        Commands::Cluster(args) => {
            run_cluster(args)?;
        }
    }

    Ok(())
}
