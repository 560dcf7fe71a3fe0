//! Field extraction passes
//!
//! Each pass is independent and degrades to `None` on its own.

use std::sync::OnceLock;

use regex::Regex;

use super::catalog::ReceiptCatalog;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_date_long, r"(\d{1,2})\.(\d{1,2})\.(\d{4})");
// Two-digit year must not be followed by another digit
re!(re_date_short, r"(\d{1,2})\.(\d{1,2})\.(\d{2})(?:\D|$)");
re!(re_time, r"(\d{1,2}):(\d{2})(?::(\d{2}))?");
re!(re_amount, r"\d[\d ]*,\d{2}");

/// Trimmed, non-empty lines
pub(crate) fn normalized_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

/// First `dd.mm.yyyy` date, else first `dd.mm.yy` with "20" prefixed
///
/// The digits are not checked against the calendar.
pub fn extract_date(text: &str) -> Option<String> {
    let caps = re_date_long()
        .captures(text)
        .or_else(|| re_date_short().captures(text))?;

    let day = &caps[1];
    let month = &caps[2];
    let year = &caps[3];
    let year = if year.len() == 2 {
        format!("20{}", year)
    } else {
        year.to_string()
    };

    Some(format!("{:0>2}.{:0>2}.{}", day, month, year))
}

/// First `H:MM` or `H:MM:SS` time as `HH:MM`
pub fn extract_time(text: &str) -> Option<String> {
    let caps = re_time().captures(text)?;
    Some(format!("{:0>2}:{}", &caps[1], &caps[2]))
}

/// Store name and whether it came from the known vendor list
///
/// Known vendors win over the catalog; without any hit the first line is
/// taken, since receipts print the store name at the top.
pub fn extract_vendor(
    text: &str,
    lines: &[&str],
    known_vendors: &[String],
    catalog: &ReceiptCatalog,
) -> Option<(String, bool)> {
    let lower = text.to_lowercase();

    let known = known_vendors
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .find(|v| lower.contains(&v.to_lowercase()));
    if let Some(vendor) = known {
        return Some((vendor.to_string(), true));
    }

    let listed = catalog
        .stores()
        .iter()
        .find(|s| lower.contains(&s.to_lowercase()));
    if let Some(store) = listed {
        return Some((store.clone(), false));
    }

    lines.first().map(|line| (line.to_string(), false))
}

/// Grand total as a decimal-comma string with spaces removed
pub fn extract_total(text: &str, lines: &[&str], catalog: &ReceiptCatalog) -> Option<String> {
    // Tier 1: a line naming the total
    for line in lines {
        if catalog.is_total_line(&line.to_lowercase()) {
            if let Some(amount) = last_amount(line) {
                return Some(amount);
            }
        }
    }

    // Tier 2: a line with a currency symbol
    for line in lines {
        if catalog.has_currency(line) {
            if let Some(amount) = last_amount(line) {
                return Some(amount);
            }
        }
    }

    // Tier 3: the largest positive amount anywhere
    let mut best: Option<(f64, String)> = None;
    for m in re_amount().find_iter(text) {
        let amount = compact(m.as_str());
        let Some(value) = amount_value(&amount) else {
            continue;
        };
        if value <= 0.0 {
            continue;
        }
        if best.as_ref().map_or(true, |(v, _)| value > *v) {
            best = Some((value, amount));
        }
    }
    best.map(|(_, amount)| amount)
}

fn last_amount(line: &str) -> Option<String> {
    re_amount().find_iter(line).last().map(|m| compact(m.as_str()))
}

fn compact(amount: &str) -> String {
    amount.chars().filter(|c| !c.is_whitespace()).collect()
}

fn amount_value(amount: &str) -> Option<f64> {
    amount.replace(',', ".").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_long_form() {
        assert_eq!(extract_date("Pvm 21.03.2025 klo"), Some("21.03.2025".to_string()));
        assert_eq!(extract_date("1.3.2025"), Some("01.03.2025".to_string()));
    }

    #[test]
    fn test_date_short_form_expands_year() {
        assert_eq!(extract_date("5.1.25 12:00"), Some("05.01.2025".to_string()));
        assert_eq!(extract_date("ends 31.12.24"), Some("31.12.2024".to_string()));
    }

    #[test]
    fn test_date_long_form_preferred() {
        // The short form appears first but the long form wins
        let text = "Kuitti 1.2.24\nOstettu 21.03.2025";
        assert_eq!(extract_date(text), Some("21.03.2025".to_string()));
    }

    #[test]
    fn test_date_not_validated() {
        assert_eq!(extract_date("99.99.2025"), Some("99.99.2025".to_string()));
    }

    #[test]
    fn test_date_missing() {
        assert_eq!(extract_date("no date here 12,50"), None);
        assert_eq!(extract_date("1.2.345"), None);
    }

    #[test]
    fn test_time() {
        assert_eq!(extract_time("klo 14:32"), Some("14:32".to_string()));
        assert_eq!(extract_time("9:05:59"), Some("09:05".to_string()));
        assert_eq!(extract_time("08:15 then 09:00"), Some("08:15".to_string()));
        assert_eq!(extract_time("1430"), None);
    }

    #[test]
    fn test_vendor_from_catalog_case_insensitive() {
        let text = "NESTE JOENSUU\nDiesel 60,00";
        let lines = normalized_lines(text);
        let vendor = extract_vendor(text, &lines, &[], &ReceiptCatalog::default());
        assert_eq!(vendor, Some(("Neste".to_string(), false)));
    }

    #[test]
    fn test_vendor_catalog_order() {
        // Both entries occur; the earlier catalog entry wins
        let text = "Prisma\nK-Market lahjakortti";
        let lines = normalized_lines(text);
        let vendor = extract_vendor(text, &lines, &[], &ReceiptCatalog::default());
        assert_eq!(vendor.unwrap().0, "K-Market");
    }

    #[test]
    fn test_known_vendor_takes_priority() {
        let text = "Rautakauppa Nurmi\nNeste kaasupullo";
        let lines = normalized_lines(text);
        let known = vec!["rautakauppa nurmi".to_string()];
        let vendor = extract_vendor(text, &lines, &known, &ReceiptCatalog::default());
        assert_eq!(vendor, Some(("rautakauppa nurmi".to_string(), true)));
    }

    #[test]
    fn test_vendor_falls_back_to_first_line() {
        let text = "\n   Kahvila Kulma  \nLatte 4,50";
        let lines = normalized_lines(text);
        let vendor = extract_vendor(text, &lines, &[], &ReceiptCatalog::default());
        assert_eq!(vendor, Some(("Kahvila Kulma".to_string(), false)));

        assert_eq!(extract_vendor("", &[], &[], &ReceiptCatalog::default()), None);
    }

    #[test]
    fn test_total_keyword_line_last_amount() {
        let text = "Maito 1,25\nYHTEENSÄ 3 kpl 12,40 €\nKortilla 12,40";
        let lines = normalized_lines(text);
        assert_eq!(
            extract_total(text, &lines, &ReceiptCatalog::default()),
            Some("12,40".to_string())
        );
    }

    #[test]
    fn test_total_keyword_line_without_amount_is_skipped() {
        let text = "Yhteensä\nPankkikortti 45,90";
        let lines = normalized_lines(text);
        assert_eq!(
            extract_total(text, &lines, &ReceiptCatalog::default()),
            Some("45,90".to_string())
        );
    }

    #[test]
    fn test_total_currency_line() {
        let text = "Ruuvit 3,20\nMutterit 2,10 €\nKuitti 99,99";
        let lines = normalized_lines(text);
        assert_eq!(
            extract_total(text, &lines, &ReceiptCatalog::default()),
            Some("2,10".to_string())
        );
    }

    #[test]
    fn test_total_largest_amount() {
        let text = "Ruuvit 3,20\nPora 1 234,50\nAlv 0,00";
        let lines = normalized_lines(text);
        assert_eq!(
            extract_total(text, &lines, &ReceiptCatalog::default()),
            Some("1234,50".to_string())
        );
    }

    #[test]
    fn test_total_ignores_zero_amounts() {
        let text = "Alv 0,00";
        let lines = normalized_lines(text);
        assert_eq!(extract_total(text, &lines, &ReceiptCatalog::default()), None);
        assert_eq!(extract_total("", &[], &ReceiptCatalog::default()), None);
    }

    #[test]
    fn test_total_extra_keyword() {
        let catalog = ReceiptCatalog::default().with_total_keywords(vec!["loppusumma".to_string()]);
        let text = "Tuote 80,00\nLoppusumma 19,90";
        let lines = normalized_lines(text);
        assert_eq!(extract_total(text, &lines, &catalog), Some("19,90".to_string()));
    }
}
