//! Receipt lookup tables
//!
//! Plain data consulted by the extractor. The built-in tables cover common
//! Finnish retail, fuel and food chains; configuration can append to them.

/// Known store chains, matched in this order
pub const STORE_CATALOG: &[&str] = &[
    "K-Market",
    "K-Supermarket",
    "K-Citymarket",
    "K-Rauta",
    "Prisma",
    "S-Market",
    "Sale",
    "Alepa",
    "Lidl",
    "Tokmanni",
    "Biltema",
    "Motonet",
    "Gigantti",
    "Power",
    "Clas Ohlson",
    "Stockmann",
    "Sokos",
    "R-kioski",
    "ABC",
    "Neste",
    "Shell",
    "Teboil",
    "St1",
    "Hesburger",
    "McDonald",
    "Subway",
    "Würth",
    "IKH",
    "Hong Kong",
    "Puuilo",
];

/// Words that mark the grand total line (lowercase)
pub const TOTAL_KEYWORDS: &[&str] = &[
    "yhteensä",
    "summa",
    "total",
    "maksettava",
    "kortilla",
    "pankkikortti",
    "debit",
    "credit",
];

pub const CURRENCY_SYMBOLS: &[&str] = &["€"];

/// Store names, total keywords and currency symbols used by the extractor
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptCatalog {
    stores: Vec<String>,
    total_keywords: Vec<String>,
    currency_symbols: Vec<String>,
}

impl Default for ReceiptCatalog {
    fn default() -> Self {
        Self {
            stores: STORE_CATALOG.iter().map(|s| s.to_string()).collect(),
            total_keywords: TOTAL_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            currency_symbols: CURRENCY_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ReceiptCatalog {
    /// Append stores after the built-in ones; duplicates are skipped
    pub fn with_stores(mut self, stores: impl IntoIterator<Item = String>) -> Self {
        for store in stores {
            let store = store.trim().to_string();
            if !store.is_empty() && !self.stores.iter().any(|s| s.eq_ignore_ascii_case(&store)) {
                self.stores.push(store);
            }
        }
        self
    }

    /// Append total keywords; stored lowercase
    pub fn with_total_keywords(mut self, keywords: impl IntoIterator<Item = String>) -> Self {
        for keyword in keywords {
            let keyword = keyword.trim().to_lowercase();
            if !keyword.is_empty() && !self.total_keywords.contains(&keyword) {
                self.total_keywords.push(keyword);
            }
        }
        self
    }

    pub fn with_currency_symbols(mut self, symbols: impl IntoIterator<Item = String>) -> Self {
        for symbol in symbols {
            if !symbol.is_empty() && !self.currency_symbols.contains(&symbol) {
                self.currency_symbols.push(symbol);
            }
        }
        self
    }

    pub fn stores(&self) -> &[String] {
        &self.stores
    }

    pub fn total_keywords(&self) -> &[String] {
        &self.total_keywords
    }

    pub fn currency_symbols(&self) -> &[String] {
        &self.currency_symbols
    }

    /// True when the (lowercased) line names a total
    pub(crate) fn is_total_line(&self, lower_line: &str) -> bool {
        self.total_keywords.iter().any(|k| lower_line.contains(k.as_str()))
    }

    pub(crate) fn has_currency(&self, line: &str) -> bool {
        self.currency_symbols.iter().any(|s| line.contains(s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables() {
        let catalog = ReceiptCatalog::default();
        assert_eq!(catalog.stores().len(), STORE_CATALOG.len());
        assert_eq!(catalog.stores()[0], "K-Market");
        assert!(catalog.total_keywords().iter().any(|k| k == "yhteensä"));
        assert_eq!(catalog.currency_symbols(), &["€".to_string()]);
    }

    #[test]
    fn test_extensions_append_and_dedupe() {
        let catalog = ReceiptCatalog::default()
            .with_stores(vec!["Kesko Kenkä".to_string(), "neste".to_string(), " ".to_string()])
            .with_total_keywords(vec!["LOPPUSUMMA".to_string(), "summa".to_string()]);

        assert_eq!(catalog.stores().last().unwrap(), "Kesko Kenkä");
        assert_eq!(catalog.stores().len(), STORE_CATALOG.len() + 1);
        assert_eq!(catalog.total_keywords().last().unwrap(), "loppusumma");
        assert_eq!(catalog.total_keywords().len(), TOTAL_KEYWORDS.len() + 1);
    }

    #[test]
    fn test_line_predicates() {
        let catalog = ReceiptCatalog::default().with_currency_symbols(vec!["EUR".to_string()]);
        assert!(catalog.is_total_line("yhteensä 45,90"));
        assert!(!catalog.is_total_line("maito 1,25"));
        assert!(catalog.has_currency("12,00 €"));
        assert!(catalog.has_currency("12,00 EUR"));
        assert!(!catalog.has_currency("12,00"));
    }
}
