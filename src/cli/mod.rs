pub mod deploy;
pub mod error;
mod manage;
pub mod parser;
mod preflight;
pub mod ui;

use clap::Parser;
use error::CliError;
use parser::Cli;

// Helper function to parse args
pub fn parse_args() -> Result<Cli, clap::Error> {
    Cli::try_parse()
}

// Main CLI execution function, receives parsed args
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let store = cli.store()?;
    if cli.manage {
        manage::run(&store).await
    } else {
        deploy::run(&cli, &store).await
    }
}
