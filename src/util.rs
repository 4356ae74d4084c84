// Parsing and formatting helpers.
//
// Cell cleanup lives here so the loader and the analyses only ever see typed
// values.
use num_format::{Locale, ToFormattedString};
use std::borrow::Cow;

/// Numeric value of a sheet cell. Blank cells, text markers such as `NA` or
/// `n/a` and non-finite results are all `None`; thousands separators are
/// ignored.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() || s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    s.replace(',', "").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a year label. Workbooks often store `2015` as the float `2015.0`.
pub fn parse_year(s: &str) -> Option<i32> {
    let s = s.trim();
    if let Ok(y) = s.parse::<i32>() {
        return Some(y);
    }
    let f = parse_f64_safe(Some(s))?;
    (f.fract() == 0.0 && f.abs() < i32::MAX as f64).then_some(f as i32)
}

/// Trimmed text, `None` when blank.
pub fn non_blank(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Arithmetic mean, `None` for an empty slice.
pub fn average(v: &[f64]) -> Option<f64> {
    (!v.is_empty()).then(|| v.iter().sum::<f64>() / v.len() as f64)
}

/// Fixed decimals with `en` thousands grouping, e.g. `1,234,567.89`.
pub fn format_number(n: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, n.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let grouped = int_part
        .parse::<i64>()
        .unwrap_or(0)
        .to_formatted_string(&Locale::en);
    // "-0.00" reads badly in tables
    let sign = if n < 0.0 && fixed.bytes().any(|b| (b'1'..=b'9').contains(&b)) {
        "-"
    } else {
        ""
    };
    if frac.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac}")
    }
}

/// Compact rendering of a possibly-missing measurement for tables and
/// annotations: no grouping, trailing zeros trimmed, blank when missing.
pub fn format_value(v: Option<f64>) -> String {
    match v {
        None => String::new(),
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        Some(v) => {
            let s = format!("{:.4}", v);
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
    }
}

/// Text with the characters XML 1.0 cannot carry removed: control codes
/// other than tab, newline and carriage return, and U+FFFE/U+FFFF.
/// Spreadsheet exports occasionally leave such codes in cells.
pub fn xml_text(s: &str) -> Cow<'_, str> {
    fn allowed(c: char) -> bool {
        matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
    }
    if s.chars().all(allowed) {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(s.chars().filter(|&c| allowed(c)).collect())
    }
}

/// Grouped integer for console counts.
pub fn format_int<T: ToFormattedString>(n: T) -> String {
    n.to_formatted_string(&Locale::en)
}
