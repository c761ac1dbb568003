mod catalog;
mod cli;
mod dates;
mod error;
mod fmt;
mod matcher;
mod models;
mod pipeline;
mod reconciler;
mod schema;
mod settings;
mod tokenizer;
mod transformer;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Import {
            source,
            exclude,
            output,
        } => cli::import::run(&source, &exclude, output.as_deref()),
        Commands::Preview { source } => cli::preview::run(&source),
        Commands::Schemas => cli::schemas::run(),
        Commands::Config {
            delimiter,
            currency,
        } => cli::config::run(delimiter, currency),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
