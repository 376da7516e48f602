use std::process::ExitCode;

use clap::Parser as _;
use rootcause::Report;

use crate::cli_args::{Cli, Commands};

mod cli {
    pub mod check;
    pub mod common;
    pub mod scrub;
    pub mod write;
}
mod cli_args;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Cli) -> Result<(), Report> {
    let config = args.load_config()?;

    match args.command {
        Commands::Write => cli::write::write(&config).await?,
        Commands::Scrub { manifest } => cli::scrub::scrub(&config, manifest)?,
        Commands::Check => cli::check::check(&config)?,
    }
    Ok(())
}
