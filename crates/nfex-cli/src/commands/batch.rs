//! Batch command: every invoice under a directory into one delimited file.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use nfex_core::{BatchOutcome, BatchRunner, Delimiter, RecordWriter, find_documents};

use super::load_config;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input directory (searched recursively) or a single XML file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: output.file_name from the configuration)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Field delimiter
    #[arg(short, long, value_enum)]
    delimiter: Option<DelimiterArg>,

    /// Insert a blank row before the first item of each later document
    #[arg(long)]
    separators: bool,

    /// Keep item quantity, unit price and amount exactly as written
    #[arg(long)]
    no_round: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum DelimiterArg {
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// Tab character
    Tab,
}

impl From<DelimiterArg> for Delimiter {
    fn from(arg: DelimiterArg) -> Self {
        match arg {
            DelimiterArg::Semicolon => Delimiter::Semicolon,
            DelimiterArg::Comma => Delimiter::Comma,
            DelimiterArg::Tab => Delimiter::Tab,
        }
    }
}

pub fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(delimiter) = args.delimiter {
        config.output.delimiter = delimiter.into();
    }
    if args.separators {
        config.output.separate_documents = true;
    }
    if args.no_round {
        config.extraction.round_item_values = false;
    }

    let files = find_documents(&args.input, &config.output.extension)
        .with_context(|| format!("Cannot search {}", args.input.display()))?;

    if files.is_empty() {
        warn!(
            "No .{} files found in {}",
            config.output.extension,
            args.input.display()
        );
        println!(
            "{} No .{} files found, writing the header only",
            style("⚠").yellow(),
            config.output.extension
        );
    } else {
        println!(
            "{} Found {} files to process",
            style("ℹ").blue(),
            files.len()
        );
    }

    let output_path = args
        .output
        .unwrap_or_else(|| PathBuf::from(&config.output.file_name));
    let mut writer = RecordWriter::create(&output_path, config.output.delimiter)
        .with_context(|| format!("Cannot create output file {}", output_path.display()))?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let runner = BatchRunner::from_config(&config);
    let mut outcome = BatchOutcome::default();
    for path in &files {
        let status = runner.process(path, &mut outcome);
        debug!("{}: {:?}", path.display(), status);
        pb.inc(1);
    }
    pb.finish_and_clear();

    writer.write_rows(&outcome.rows)?;
    writer.flush()?;
    info!("Wrote {} rows to {}", writer.rows(), output_path.display());

    print_summary(&outcome, files.len(), &output_path, start);
    Ok(())
}

fn print_summary(outcome: &BatchOutcome, found: usize, output_path: &std::path::Path, start: Instant) {
    println!(
        "{} Processed {} of {} documents in {:?}",
        style("✓").green(),
        outcome.processed,
        found,
        start.elapsed()
    );
    println!(
        "{} Wrote {} records to {}",
        style("✓").green(),
        outcome.record_count(),
        output_path.display()
    );

    if !outcome.skipped.is_empty() {
        println!(
            "{} Skipped {} files that are not NF-e invoices",
            style("⚠").yellow(),
            outcome.skipped.len()
        );
    }

    if !outcome.failures.is_empty() {
        println!(
            "{} {} documents failed:",
            style("✗").red(),
            outcome.failures.len()
        );
        for failure in &outcome.failures {
            println!("  - {}: {}", failure.path.display(), failure.error);
        }
    }
}
