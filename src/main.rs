mod cli;
mod error;
mod exporter;
mod filter;
mod fmt;
mod importer;
mod models;
mod normalizer;
mod reports;
mod settings;
mod tui;

use clap::{CommandFactory, Parser};

use cli::{Cli, Commands, ConfigCommands};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Preview { file, rows } => cli::preview::run(&file, rows),
        Commands::Report {
            file,
            filters,
            json,
        } => cli::report::run(&file, &filters, json),
        Commands::Export {
            file,
            filters,
            output,
        } => cli::export::run(&file, &filters, output),
        Commands::Dashboard { file, filters } => cli::dashboard::run(&file, &filters),
        Commands::Config { command } => match command {
            ConfigCommands::Show => cli::config::show(),
            ConfigCommands::Set { key, value } => cli::config::set(&key, &value),
        },
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "smartmed", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
