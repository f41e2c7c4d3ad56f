//! Core library for flattening NF-e invoices into spreadsheet rows.
//!
//! This crate provides:
//! - Namespace-qualified navigation over NF-e XML trees
//! - Tax block decoding (ICMS, PIS, COFINS, IPI, ICMSUFDest)
//! - One flat record per invoice line item, with a fixed column set
//! - File discovery, delimited output and a batch runner with per-document
//!   failure isolation

pub mod batch;
pub mod error;
pub mod invoice;
pub mod locate;
pub mod models;
pub mod output;
pub mod xml;

pub use batch::{BatchOutcome, BatchRunner, DocumentFailure, DocumentStatus};
pub use error::{ExtractionError, NfexError, Result};
pub use invoice::{Extraction, NfeExtractor, RecordExtractor};
pub use locate::find_documents;
pub use models::config::{Delimiter, ExtractionConfig, NfexConfig, OutputConfig};
pub use models::record::{COLUMN_COUNT, Record, Row, columns};
pub use output::RecordWriter;
