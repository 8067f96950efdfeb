//! NextNode CLI Binary
//!
//! Command-line interface for the hierarchical notes store.

use clap::Parser;
use nextnode::logging::init_logging;
use nextnode::tooling::cli::{Cli, CliContext};
use std::process;

fn main() {
    let cli = Cli::parse();

    let config = match CliContext::load_config(&cli.workspace, cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = init_logging(Some(&config.logging), &cli.logging_overrides()) {
        eprintln!("Error initializing logging: {}", e);
        process::exit(1);
    }

    let mut context = match CliContext::with_config(cli.workspace.clone(), config) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error opening workspace: {}", e);
            process::exit(1);
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
