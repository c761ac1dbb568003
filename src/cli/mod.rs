pub mod config;
pub mod import;
pub mod preview;
pub mod schemas;

use std::path::Path;

use clap::{Args, Parser, Subcommand};

use crate::catalog::{load_catalog, Catalog};
use crate::dates::DateFormat;
use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::schema::ImportType;
use crate::settings::load_settings;
use crate::transformer::{AccountSource, AmountMode};

#[derive(Parser)]
#[command(name = "tally", about = "Imports delimited files into typed personal-finance records.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full import pipeline and publish typed records.
    Import {
        #[command(flatten)]
        source: SourceArgs,
        /// Row index to exclude before publishing (repeatable)
        #[arg(long)]
        exclude: Vec<usize>,
        /// Write the publish result as JSON to this path
        #[arg(long)]
        output: Option<String>,
    },
    /// Parse, match and clean a file, then show the preview table.
    Preview {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Show the import schema catalog.
    Schemas,
    /// Show or change persisted defaults.
    Config {
        /// Default field delimiter
        #[arg(long)]
        delimiter: Option<char>,
        /// Default currency substituted for blank currency cells
        #[arg(long)]
        currency: Option<String>,
    },
}

/// Options shared by every command that feeds a file into the pipeline.
#[derive(Args)]
pub struct SourceArgs {
    /// Path to the delimited file to import
    pub file: String,
    /// Import type: transactions, accounts, categories
    #[arg(long = "type", default_value = "transactions")]
    pub import_type: String,
    /// Field delimiter (default from settings, usually ',')
    #[arg(long)]
    pub delimiter: Option<char>,
    /// Date format override: YYYY-MM-DD, MM/DD/YYYY or DD/MM/YYYY
    #[arg(long = "date-format")]
    pub date_format: Option<DateFormat>,
    /// Derive amounts from separate credit/debit columns
    #[arg(long = "double-entry")]
    pub double_entry: bool,
    /// Import every row into this existing account id
    #[arg(long)]
    pub account: Option<i64>,
    /// JSON file with existing accounts/categories/currencies/types
    #[arg(long)]
    pub catalog: Option<String>,
}

/// Read the file, apply the configure options and run the pipeline up to
/// the Preview step (tokenize, match columns, clean rows).
pub(crate) fn open_pipeline(args: &SourceArgs) -> Result<(Pipeline, String)> {
    let settings = load_settings();
    let import_type = ImportType::from_key(&args.import_type)?;
    let catalog = match &args.catalog {
        Some(path) => load_catalog(Path::new(path))?,
        None => Catalog::default(),
    };
    let raw = std::fs::read_to_string(&args.file)?;
    let file_name = Path::new(&args.file)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(&args.file)
        .to_string();

    let mut pipeline = Pipeline::new(import_type, catalog);
    pipeline.set_default_currency(settings.default_currency);
    pipeline.set_delimiter(args.delimiter.unwrap_or(settings.default_delimiter));
    pipeline.set_raw_text(raw);

    // Upload -> Configure: tokenize, match columns, detect the date format
    pipeline.advance()?;

    if let Some(format) = args.date_format {
        pipeline.set_date_format(format);
    }
    if args.double_entry {
        pipeline.set_amount_mode(AmountMode::DoubleEntry);
    }
    if let Some(id) = args.account {
        pipeline.set_account_source(AccountSource::Single(id))?;
    }

    // Configure -> Preview: coerce and validate every row
    pipeline.advance()?;
    Ok((pipeline, file_name))
}
