/// Parse a vendor availability cell into units available now.
///
/// Known phrasings:
/// * `500` – plain count
/// * `8,045 - Immediate` – in stock, comma-grouped
/// * `1,200 - Factory Stock` and `Standard Lead Time ...` – nothing on hand
///
/// Anything else counts as zero and is reported.
pub fn parse_available_quantity(text: &str) -> u32 {
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(qty) = text.parse() {
            return qty;
        }
    } else if text.contains(" - Immediate") {
        let leading = text.split_whitespace().next().unwrap_or("").replace(',', "");
        if let Ok(qty) = leading.parse() {
            return qty;
        }
    } else if text.contains(" - Factory Stock") || text.contains("Standard Lead Time") {
        return 0;
    }

    log::warn!("Unknown availability format: {text:?}");
    0
}

/// Format a quantity with comma separators, as the vendor displays it
pub fn format_quantity(n: u32) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
