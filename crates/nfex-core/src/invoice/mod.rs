//! Invoice to record extraction module.

mod dates;
mod document;
mod extractor;
mod items;
pub mod numbers;
mod scope;
mod taxes;

pub use dates::is_valid_format;
pub use extractor::NfeExtractor;

use roxmltree::Document;

use crate::error::ExtractionError;
use crate::models::record::Record;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Outcome of extracting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The root is not an NF-e invoice; no records, not an error.
    Skipped,
    /// One record per line item, in document order.
    Records(Vec<Record>),
}

impl Extraction {
    pub fn records(&self) -> &[Record] {
        match self {
            Extraction::Skipped => &[],
            Extraction::Records(records) => records,
        }
    }
}

/// Trait for document to record extractors.
pub trait RecordExtractor {
    /// Extract records from a parsed document.
    fn extract(&self, document: &Document<'_>, source: &str) -> Result<Extraction>;

    /// Parse `xml` and extract records from it.
    fn extract_from_str(&self, xml: &str, source: &str) -> crate::Result<Extraction>;
}
