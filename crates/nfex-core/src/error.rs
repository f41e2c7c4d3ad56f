//! Error types for the nfex-core library.

use thiserror::Error;

/// Main error type for the nfex library.
#[derive(Error, Debug)]
pub enum NfexError {
    /// The document is not well-formed XML.
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Invoice extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited output error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid discovery pattern.
    #[error("invalid search pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while mapping one invoice tree into records.
///
/// Every variant aborts the current document only; the batch runner logs it
/// and moves on to the next file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// Required element is missing.
    #[error("missing required element <{element}> in {context}")]
    MissingElement { element: String, context: String },

    /// A container that must hold a single child holds several.
    #[error("multiple children in <{container}> at {path}: {}", .tags.join(", "))]
    MultipleChildren {
        container: String,
        path: String,
        tags: Vec<String>,
    },

    /// A whitelisted block contains a tag outside its allowed set.
    #[error("unknown element <{tag}> in <{container}> at {path}")]
    UnknownElement {
        container: String,
        path: String,
        tag: String,
    },

    /// The child of a tax container names no known regime.
    #[error("unknown variant <{tag}> for <{container}> at {path}")]
    UnknownVariant {
        container: String,
        path: String,
        tag: String,
    },

    /// A numeric field holds text that is not a decimal number.
    #[error("failed to parse number at {path}: '{value}'")]
    InvalidNumber { path: String, value: String },

    /// A timestamp field holds text in an unexpected format.
    #[error("failed to parse timestamp at {path}: '{value}'")]
    InvalidTimestamp { path: String, value: String },
}

/// Result type for the nfex library.
pub type Result<T> = std::result::Result<T, NfexError>;
