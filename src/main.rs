mod cli;
mod commands;
mod installers;
mod libs;
mod logger;
mod schemas;

use clap::Parser;
use cli::cmd_enums::{Cli, Commands};
use commands::{generate, list, run};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.debug);

    let result = match cli.command {
        Commands::Run(args) => run::run(args),
        Commands::List { config } => list::run(config).map(|_| ExitCode::SUCCESS),
        Commands::Generate { output } => generate::run(output).map(|_| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            log_error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
