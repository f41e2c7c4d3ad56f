//! Batch runner: extraction over many files with per-document isolation.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::error::NfexError;
use crate::invoice::{Extraction, NfeExtractor};
use crate::models::config::NfexConfig;
use crate::models::record::Row;

/// A document that contributed no records because extraction failed.
#[derive(Debug)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub error: NfexError,
}

/// Accumulated result of a run.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Output rows in discovery order, then item order.
    pub rows: Vec<Row>,
    /// Documents extracted successfully.
    pub processed: usize,
    /// Files whose root is not an NF-e invoice.
    pub skipped: Vec<PathBuf>,
    pub failures: Vec<DocumentFailure>,
}

impl BatchOutcome {
    /// Number of rows that carry a record.
    pub fn record_count(&self) -> usize {
        self.rows.iter().filter(|row| row.as_record().is_some()).count()
    }
}

/// Per-document status reported by [`BatchRunner::process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    Extracted(usize),
    Skipped,
    Failed,
}

/// Runs the extractor over a list of files.
#[derive(Debug, Clone, Default)]
pub struct BatchRunner {
    extractor: NfeExtractor,
    separate_documents: bool,
}

impl BatchRunner {
    pub fn new(extractor: NfeExtractor) -> Self {
        Self {
            extractor,
            separate_documents: false,
        }
    }

    pub fn from_config(config: &NfexConfig) -> Self {
        Self::new(NfeExtractor::with_config(config.extraction.clone()))
            .with_separators(config.output.separate_documents)
    }

    /// Insert a blank row before each later document's first item.
    pub fn with_separators(mut self, separate: bool) -> Self {
        self.separate_documents = separate;
        self
    }

    pub fn extractor(&self) -> &NfeExtractor {
        &self.extractor
    }

    /// Process one file into `outcome`. Failures are logged and recorded,
    /// never propagated.
    pub fn process(&self, path: &Path, outcome: &mut BatchOutcome) -> DocumentStatus {
        debug!("Processing {}", path.display());

        match self.extractor.extract_file(path) {
            Ok(Extraction::Records(records)) => {
                let count = records.len();
                let separate = self.separate_documents && !outcome.rows.is_empty();
                for record in records {
                    if separate && record.item.position.as_deref() == Some("1") {
                        outcome.rows.push(Row::Separator);
                    }
                    outcome.rows.push(Row::Record(record));
                }
                outcome.processed += 1;
                DocumentStatus::Extracted(count)
            }
            Ok(Extraction::Skipped) => {
                warn!("{} is not an NF-e invoice, skipping", path.display());
                outcome.skipped.push(path.to_path_buf());
                DocumentStatus::Skipped
            }
            Err(e) => {
                error!("Failed to process {}: {}", path.display(), e);
                outcome.failures.push(DocumentFailure {
                    path: path.to_path_buf(),
                    error: e,
                });
                DocumentStatus::Failed
            }
        }
    }

    /// Process every path in order.
    pub fn run<P: AsRef<Path>>(&self, paths: &[P]) -> BatchOutcome {
        let start = Instant::now();
        let mut outcome = BatchOutcome::default();
        for path in paths {
            self.process(path.as_ref(), &mut outcome);
        }
        info!(
            "Processed {} of {} documents ({} skipped, {} failed) in {:?}",
            outcome.processed,
            paths.len(),
            outcome.skipped.len(),
            outcome.failures.len(),
            start.elapsed()
        );
        outcome
    }
}
