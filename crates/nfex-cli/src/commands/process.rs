//! Process command - extract the records of a single invoice file.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use console::style;
use tracing::info;

use nfex_core::{Extraction, NfeExtractor, RecordWriter, Row};

use super::load_config;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input NF-e XML file
    #[arg(required = true)]
    input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Keep item quantity, unit price and amount exactly as written
    #[arg(long)]
    no_round: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON array of objects keyed by column
    Json,
    /// Delimited rows under the column header
    Csv,
}

pub fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if args.no_round {
        config.extraction.round_item_values = false;
    }

    if !args.input.is_file() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let extractor = NfeExtractor::with_config(config.extraction);
    let records = match extractor
        .extract_file(&args.input)
        .with_context(|| format!("Failed to process {}", args.input.display()))?
    {
        Extraction::Records(records) => records,
        Extraction::Skipped => {
            eprintln!(
                "{} {} is not an NF-e invoice",
                style("⚠").yellow(),
                args.input.display()
            );
            return Ok(());
        }
    };

    let stdout = std::io::stdout();
    match args.format {
        OutputFormat::Json => {
            let mut out = stdout.lock();
            serde_json::to_writer_pretty(&mut out, &records)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            let rows: Vec<Row> = records.into_iter().map(Row::Record).collect();
            let mut writer = RecordWriter::new(stdout.lock(), config.output.delimiter)?;
            writer.write_rows(&rows)?;
            writer.flush()?;
        }
    }

    Ok(())
}
