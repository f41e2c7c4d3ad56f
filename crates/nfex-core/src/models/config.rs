//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{NfexError, Result};
use crate::invoice::is_valid_format;

/// Main configuration for nfex.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NfexConfig {
    /// Record extraction configuration.
    pub extraction: ExtractionConfig,

    /// Tabular output configuration.
    pub output: OutputConfig,
}

/// Record extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Fractional digits of rounded numeric columns.
    pub digits: u32,

    /// Round item quantity, unit price and amount. When disabled the three
    /// pass through exactly as written in the document.
    pub round_item_values: bool,

    /// Prefix barcode-like codes with `'` so spreadsheets keep them as text.
    pub force_text_codes: bool,

    /// `chrono` format for date columns.
    pub date_format: String,

    /// `chrono` format for time columns.
    pub time_format: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            digits: 2,
            round_item_values: true,
            force_text_codes: true,
            date_format: "%d/%m/%Y".to_string(),
            time_format: "%H:%M:%S".to_string(),
        }
    }
}

impl ExtractionConfig {
    /// Reject settings that would fail on every document.
    pub fn validate(&self) -> Result<()> {
        // rust_decimal carries at most 28 fractional digits
        if self.digits > 28 {
            return Err(NfexError::Config(format!(
                "extraction.digits must be at most 28, got {}",
                self.digits
            )));
        }
        for (key, format) in [
            ("extraction.date_format", &self.date_format),
            ("extraction.time_format", &self.time_format),
        ] {
            if !is_valid_format(format) {
                return Err(NfexError::Config(format!("invalid {}: '{}'", key, format)));
            }
        }
        Ok(())
    }
}

/// Field delimiter of the output file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    Comma,
    #[default]
    Semicolon,
    Tab,
}

impl Delimiter {
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
        }
    }
}

/// Tabular output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Field delimiter.
    pub delimiter: Delimiter,

    /// Insert a blank row before the first item of every document after the
    /// first one.
    pub separate_documents: bool,

    /// Output file name used when none is given on the command line.
    pub file_name: String,

    /// Extension of the files picked up by discovery (case-insensitive).
    pub extension: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::Semicolon,
            separate_documents: false,
            file_name: "output.csv".to_string(),
            extension: "xml".to_string(),
        }
    }
}

impl NfexConfig {
    pub fn validate(&self) -> Result<()> {
        self.extraction.validate()?;
        if self.output.extension.is_empty() {
            return Err(NfexError::Config("output.extension must not be empty".to_string()));
        }
        Ok(())
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
