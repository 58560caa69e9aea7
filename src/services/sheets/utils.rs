use std::collections::HashSet;

use calamine::Data;
use once_cell::sync::Lazy;
use regex::Regex;

// Spreadsheet-formatted numbers: `$1,234.5`, `(12.0)`, `8.9x`, `45%`
static FORMATTED_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<open>\()?\s*(?P<sign>-)?\s*\$?\s*(?P<num>\d[\d,]*(?:\.\d+)?|\.\d+)\s*(?P<suffix>[xX%])?\s*(?P<close>\))?$")
        .expect("formatted number pattern is valid")
});

/// Trimmed text of a cell, `None` for blanks.
pub fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Numeric value of a cell. Text is accepted when it is a plain or
/// spreadsheet-formatted number.
pub fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => parse_numeric_text(s),
        _ => None,
    }
}

pub fn parse_numeric_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = trimmed.parse::<f64>() {
        return value.is_finite().then_some(value);
    }

    let caps = FORMATTED_NUMBER.captures(trimmed)?;
    // Unbalanced parentheses are not a number
    if caps.name("open").is_some() != caps.name("close").is_some() {
        return None;
    }

    let mut value: f64 = caps["num"].replace(',', "").parse().ok()?;
    if caps.name("suffix").map(|m| m.as_str()) == Some("%") {
        value /= 100.0;
    }
    if caps.name("open").is_some() || caps.name("sign").is_some() {
        value = -value;
    }
    Some(value)
}

pub fn is_empty_row(row: &[Data]) -> bool {
    row.iter().all(|cell| cell_text(cell).is_none())
}

/// Column name for a header cell, unique within `existing_names`.
pub fn header_name(raw: Option<&str>, idx: usize, existing_names: &mut HashSet<String>) -> String {
    let base_name = match raw {
        Some(name) => name.to_string(),
        None => format!("Unnamed: {}", idx),
    };

    // If the name already exists, add a numeric suffix
    let mut cleaned = base_name.clone();
    let mut counter = 1;
    while !existing_names.insert(cleaned.clone()) {
        cleaned = format!("{}.{}", base_name, counter);
        counter += 1;
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formatted_numbers() {
        assert_eq!(parse_numeric_text("8.99"), Some(8.99));
        assert_eq!(parse_numeric_text(" 8.9x "), Some(8.9));
        assert_eq!(parse_numeric_text("$1,234.5"), Some(1234.5));
        assert_eq!(parse_numeric_text("(12.0)"), Some(-12.0));
        assert_eq!(parse_numeric_text("-$3"), Some(-3.0));
        assert_eq!(parse_numeric_text("45%"), Some(0.45));
        assert_eq!(parse_numeric_text("1e3"), Some(1000.0));
    }

    #[test]
    fn rejects_non_numbers() {
        assert_eq!(parse_numeric_text("NM"), None);
        assert_eq!(parse_numeric_text("n/a"), None);
        assert_eq!(parse_numeric_text(""), None);
        assert_eq!(parse_numeric_text("(12"), None);
        assert_eq!(parse_numeric_text("NaN"), None);
    }

    #[test]
    fn cell_helpers() {
        assert_eq!(cell_number(&Data::Int(4)), Some(4.0));
        assert_eq!(cell_number(&Data::Bool(true)), None);
        assert_eq!(cell_text(&Data::String("  NVIDIA ".into())), Some("NVIDIA".into()));
        assert_eq!(cell_text(&Data::String("   ".into())), None);
        assert!(is_empty_row(&[Data::Empty, Data::String(" ".into())]));
        assert!(!is_empty_row(&[Data::Empty, Data::Float(1.0)]));
    }

    #[test]
    fn header_names_are_unique() {
        let mut seen = HashSet::new();
        assert_eq!(header_name(Some("Company"), 0, &mut seen), "Company");
        assert_eq!(header_name(None, 1, &mut seen), "Unnamed: 1");
        assert_eq!(header_name(Some("Company"), 2, &mut seen), "Company.1");
        assert_eq!(header_name(Some("Company"), 3, &mut seen), "Company.2");
    }
}
