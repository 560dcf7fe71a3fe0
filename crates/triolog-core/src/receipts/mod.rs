//! Receipt field extraction
//!
//! Turns recognized receipt text into an [`ExtractedReceipt`]. OCR itself
//! happens elsewhere; this module only sees plain text. Extraction never
//! fails: every field independently degrades to `None`.

mod catalog;
mod extract;

pub use catalog::{ReceiptCatalog, CURRENCY_SYMBOLS, STORE_CATALOG, TOTAL_KEYWORDS};
pub use extract::{extract_date, extract_time, extract_total, extract_vendor};

use tracing::debug;

use crate::models::{Confidence, ExtractedReceipt};

/// Best-effort receipt parser
#[derive(Debug, Clone, Default)]
pub struct ReceiptExtractor {
    catalog: ReceiptCatalog,
    known_vendors: Vec<String>,
}

impl ReceiptExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: ReceiptCatalog) -> Self {
        Self {
            catalog,
            known_vendors: Vec::new(),
        }
    }

    /// Previously saved vendor names, checked before the catalog
    pub fn with_known_vendors(mut self, vendors: impl IntoIterator<Item = String>) -> Self {
        self.known_vendors = vendors.into_iter().collect();
        self
    }

    pub fn catalog(&self) -> &ReceiptCatalog {
        &self.catalog
    }

    pub fn extract(&self, text: &str) -> ExtractedReceipt {
        let lines = extract::normalized_lines(text);

        let date = extract_date(text);
        let time = extract_time(text);
        let vendor = extract_vendor(text, &lines, &self.known_vendors, &self.catalog);
        let total = extract_total(text, &lines, &self.catalog);
        let confidence = Confidence::from_fields(date.is_some(), total.is_some());

        debug!(
            date = ?date,
            time = ?time,
            store = ?vendor.as_ref().map(|(name, _)| name),
            total = ?total,
            confidence = confidence.as_str(),
            "receipt fields extracted"
        );

        let (store_name, matched_vendor) = match vendor {
            Some((name, matched)) => (Some(name), matched),
            None => (None, false),
        };

        ExtractedReceipt {
            date,
            time,
            store_name,
            matched_vendor,
            total,
            confidence,
            raw_text: text.to_string(),
        }
    }
}
