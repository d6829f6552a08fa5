// Helpers for cleaning CSV cells, comparing weeks and formatting numbers.
//
// Everything that touches raw text lives here so the aggregation can work
// on typed values only.
use crate::types::{Cell, Metric, PercentChange};
use num_format::{Locale, ToFormattedString};

/// Apply the export's cleaning transform to one cell.
///
/// - Removes every thousands separator `","`.
/// - Removes the first `"%"` sign.
/// - Reads the longest numeric prefix after leading whitespace, so
///   `"12 (est)"` is 12 and `"2nd"` is 2.
/// - Keeps the original text when there is no finite numeric prefix.
pub fn clean_cell(raw: &str) -> Cell {
    let cleaned = raw.replace(',', "").replacen('%', "", 1);
    match numeric_prefix(cleaned.trim_start()) {
        Some(n) => Cell::Number(n),
        None => Cell::Text(raw.to_string()),
    }
}

/// Parse the longest prefix of `s` shaped like `[+-]?(d+.?d*|.d+)([eE][+-]?d+)?`.
fn numeric_prefix(s: &str) -> Option<f64> {
    let b = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = if matches!(b.first(), Some(b'+' | b'-')) { 1 } else { 0 };
    let int_end = digits_from(end);
    let mut has_digits = int_end > end;
    end = int_end;
    if b.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if has_digits || frac_end > end + 1 {
            has_digits = true;
            end = frac_end;
        }
    }
    if !has_digits {
        return None;
    }
    if matches!(b.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(b.get(end + 1), Some(b'+' | b'-')));
        let exp_end = digits_from(end + 1 + sign);
        if exp_end > end + 1 + sign {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Provider names carry a campaign tag in parentheses, e.g. `"Acme (Search)"`.
/// The identity is whatever precedes the first `(`, trimmed.
pub fn normalize_provider(raw: &str) -> String {
    raw.split('(').next().unwrap_or_default().trim().to_string()
}

/// CVR cells are parsed leniently: anything that is not a number counts as 0.
pub fn parse_cvr(cell: Option<&Cell>) -> f64 {
    cell.and_then(Cell::as_number).unwrap_or(0.0)
}

/// `(current - previous) / previous * 100`.
///
/// Not available when `previous` is zero or either side is unavailable.
pub fn percent_change(previous: Metric, current: Metric) -> PercentChange {
    match (previous.value(), current.value()) {
        (Some(prev), Some(cur)) if prev != 0.0 => PercentChange::Change((cur - prev) / prev * 100.0),
        _ => PercentChange::NotAvailable,
    }
}

/// `"50.0%"`, or plain `"N/A"` when there is nothing to compare.
pub fn format_change(change: PercentChange) -> String {
    match change {
        PercentChange::Change(_) => format!("{}%", change),
        PercentChange::NotAvailable => change.to_string(),
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus `en` thousands separators, e.g. `1,234,567.89`.
    let s = format!("{:.*}", decimals, n.abs());
    // Only signed if something nonzero survives rounding.
    let neg = n < 0.0 && s.bytes().any(|c| matches!(c, b'1'..=b'9'));
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let Ok(int_val) = int_part.parse::<u64>() else {
        return if neg { format!("-{}", s) } else { s };
    };
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Render a metric, `N/A` when unavailable.
pub fn format_metric(m: Metric, decimals: usize) -> String {
    match m.value() {
        Some(v) => format_number(v, decimals),
        None => "N/A".to_string(),
    }
}

/// Counts in the export are whole numbers but arrive as floats; show them
/// without decimals unless they actually carry a fraction.
pub fn format_count(m: Metric) -> String {
    match m.value() {
        Some(v) if v.fract() == 0.0 => format_number(v, 0),
        Some(v) => format_number(v, 2),
        None => "N/A".to_string(),
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
