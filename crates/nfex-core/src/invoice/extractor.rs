//! NF-e document extractor.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use roxmltree::{Document, Node};
use tracing::debug;

use crate::models::config::ExtractionConfig;
use crate::models::record::Record;
use crate::xml::{find_by_path, find_child, is_nfe};

use super::document::read_document;
use super::items::read_item;
use super::scope::Scope;
use super::{Extraction, RecordExtractor, Result};

/// Extractor for NF-e documents (`NFe` or `nfeProc` root).
#[derive(Debug, Clone, Default)]
pub struct NfeExtractor {
    config: ExtractionConfig,
}

impl NfeExtractor {
    /// Create an extractor with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor from a full extraction configuration.
    pub fn with_config(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Set the fractional digits of rounded columns.
    pub fn with_digits(mut self, digits: u32) -> Self {
        self.config.digits = digits;
        self
    }

    /// Set rounding of item quantity, unit price and amount.
    pub fn with_item_rounding(mut self, round: bool) -> Self {
        self.config.round_item_values = round;
        self
    }

    /// Set the `'` prefix on barcode-like codes.
    pub fn with_text_codes(mut self, force: bool) -> Self {
        self.config.force_text_codes = force;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract records from the file at `path`.
    pub fn extract_file(&self, path: &Path) -> crate::Result<Extraction> {
        let content = std::fs::read_to_string(path)?;
        self.extract_from_str(&content, &path.display().to_string())
    }

    fn extract_inf(
        &self,
        inf: Scope<'_, '_>,
        protocol: Option<Scope<'_, '_>>,
        source: &str,
    ) -> Result<Vec<Record>> {
        let document = Arc::new(read_document(&inf, protocol.as_ref(), &self.config, source)?);

        inf.children("det")
            .map(|det| {
                let item = read_item(&det, &self.config)?;
                Ok(Record::new(Arc::clone(&document), item))
            })
            .collect()
    }
}

impl RecordExtractor for NfeExtractor {
    fn extract(&self, document: &Document<'_>, source: &str) -> Result<Extraction> {
        let start = Instant::now();
        let root = document.root_element();

        let Some((inf, protocol)) = locate_invoice(root) else {
            return Ok(Extraction::Skipped);
        };

        let records = self.extract_inf(inf, protocol, source)?;
        debug!(
            "Extracted {} records from {} in {:?}",
            records.len(),
            source,
            start.elapsed()
        );
        Ok(Extraction::Records(records))
    }

    fn extract_from_str(&self, xml: &str, source: &str) -> crate::Result<Extraction> {
        let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
        let document = Document::parse(xml)?;
        Ok(self.extract(&document, source)?)
    }
}

/// Find `infNFe` and, for authorized documents, `protNFe/infProt`.
fn locate_invoice<'a, 'input>(
    root: Node<'a, 'input>,
) -> Option<(Scope<'a, 'input>, Option<Scope<'a, 'input>>)> {
    if is_nfe(root, "NFe") {
        let inf = find_child(root, "infNFe")?;
        return Some((Scope::new(inf, "NFe/infNFe"), None));
    }
    if is_nfe(root, "nfeProc") {
        let inf = find_by_path(root, "NFe/infNFe")?;
        let protocol = find_by_path(root, "protNFe/infProt")
            .map(|node| Scope::new(node, "nfeProc/protNFe/infProt"));
        return Some((Scope::new(inf, "nfeProc/NFe/infNFe"), protocol));
    }
    None
}
