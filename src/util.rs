// Utility helpers for parsing and basic statistics.
//
// This module centralizes all the "dirty" spreadsheet export handling
// (prices typed by hand, dates in several shapes) so the rest of the code
// can assume typed values or an explicit `None`.
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y", "%d.%m.%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Trim a field value and map blanks to `None`.
pub fn non_empty(s: Option<&str>) -> Option<String> {
    let s = s?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Parse a price into `f64` while being forgiving about the ways prices
/// end up typed into a spreadsheet.
///
/// - Trims whitespace and an optional `R$` currency prefix.
/// - Rejects values that contain alphabetic characters.
/// - Accepts both `1.234,56` and `1,234.56`: whichever separator comes
///   last is the decimal one. A lone comma is a decimal comma (`9,90`).
/// - A lone dot followed by exactly three digits, after a non-zero group
///   of one to three digits, groups thousands (`1.500` is 1500); any other
///   lone dot is a decimal point (`12.5`, `0.500`).
/// - Returns `None` for anything that cannot be parsed or is not finite.
pub fn parse_price_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    let s = s.strip_prefix("R$").unwrap_or(s);
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }
    if cleaned.chars().any(|c| c.is_alphabetic()) {
        return None;
    }

    let commas = cleaned.matches(',').count();
    let dots = cleaned.matches('.').count();
    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) if commas == 1 => cleaned.replace(',', "."),
        (Some(_), None) => cleaned.replace(',', ""),
        (None, Some(_)) if dots > 1 => cleaned.replace('.', ""),
        (None, Some(d)) if is_thousands_group(&cleaned, d) => cleaned.replace('.', ""),
        (None, _) => cleaned,
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn is_thousands_group(s: &str, dot: usize) -> bool {
    let int_part = s[..dot].trim_start_matches(['-', '+']);
    let frac_part = &s[dot + 1..];
    (1..=3).contains(&int_part.len())
        && !int_part.starts_with('0')
        && int_part.chars().all(|c| c.is_ascii_digit())
        && frac_part.len() == 3
        && frac_part.chars().all(|c| c.is_ascii_digit())
}

/// Parse a purchase date, accepting the shapes spreadsheet exports produce.
/// A time-of-day component is truncated away.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return Some(d);
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.date());
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// First day of the calendar month `d` falls in.
pub fn month_start(d: NaiveDate) -> NaiveDate {
    d.with_day(1).unwrap_or(d)
}

pub fn average(v: &[f64]) -> Option<f64> {
    // `None` for an empty slice so callers never see a NaN mean.
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - thousands separators (e.g., `1,234,567.89`).
    let s = format!("{:.*}", decimals, n.abs());
    // Sign from the rounded digits, so `-0.001` prints as `0.00`.
    let neg = n.is_sign_negative() && s.chars().any(|c| matches!(c, '1'..='9'));
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s.as_str(), None),
    };
    // Past i128 the digits are printed ungrouped rather than lost.
    let mut res = match int_part.parse::<i128>() {
        Ok(v) => v.to_formatted_string(&Locale::en),
        Err(_) => int_part.to_string(),
    };
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

/// Display form for prices: `.` groups thousands, `,` separates two
/// decimals (`1.234,56`). Never parsed back.
pub fn format_price(n: f64) -> String {
    format_number(n, 2)
        .chars()
        .map(|c| match c {
            ',' => '.',
            '.' => ',',
            c => c,
        })
        .collect()
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts in console messages (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_localized_prices() {
        assert_eq!(parse_price_safe(Some("100")), Some(100.0));
        assert_eq!(parse_price_safe(Some(" 12.5 ")), Some(12.5));
        assert_eq!(parse_price_safe(Some("1.234,56")), Some(1234.56));
        assert_eq!(parse_price_safe(Some("1,234.56")), Some(1234.56));
        assert_eq!(parse_price_safe(Some("R$ 2.500,00")), Some(2500.0));
        assert_eq!(parse_price_safe(Some("9,90")), Some(9.9));
        assert_eq!(parse_price_safe(Some("1.000.000")), Some(1_000_000.0));
    }

    #[test]
    fn lone_dot_with_three_digits_groups_thousands() {
        assert_eq!(parse_price_safe(Some("1.000")), Some(1000.0));
        assert_eq!(parse_price_safe(Some("1.500")), Some(1500.0));
        assert_eq!(parse_price_safe(Some("-2.750")), Some(-2750.0));
        assert_eq!(parse_price_safe(Some("0.500")), Some(0.5));
        assert_eq!(parse_price_safe(Some("1234.567")), Some(1234.567));
        assert_eq!(parse_price_safe(Some("1.25")), Some(1.25));
        assert_eq!(parse_price_safe(Some("1,000")), Some(1.0));
    }

    #[test]
    fn rejects_garbage_prices() {
        assert_eq!(parse_price_safe(None), None);
        assert_eq!(parse_price_safe(Some("")), None);
        assert_eq!(parse_price_safe(Some("a combinar")), None);
        assert_eq!(parse_price_safe(Some("NaN")), None);
        assert_eq!(parse_price_safe(Some("inf")), None);
        assert_eq!(parse_price_safe(Some("--")), None);
    }

    #[test]
    fn parses_date_shapes() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parse_date_safe(Some("2024-01-15")), Some(jan));
        assert_eq!(parse_date_safe(Some("15/01/2024")), Some(jan));
        assert_eq!(parse_date_safe(Some("2024-01-15 13:45:00")), Some(jan));
        assert_eq!(parse_date_safe(Some("2024-01-15T08:00:00")), Some(jan));
        assert_eq!(parse_date_safe(Some("2024-01-15T08:00:00-03:00")), Some(jan));
        assert_eq!(parse_date_safe(Some("sem data")), None);
        assert_eq!(parse_date_safe(Some("2024-13-01")), None);
    }

    #[test]
    fn month_start_truncates_day() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(month_start(d), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn average_of_empty_is_none() {
        assert_eq!(average(&[]), None);
        assert_eq!(average(&[100.0, 110.0]), Some(105.0));
    }

    #[test]
    fn formats_prices_with_brazilian_separators() {
        assert_eq!(format_price(1234567.891), "1.234.567,89");
        assert_eq!(format_price(0.5), "0,50");
        assert_eq!(format_price(-12.0), "-12,00");
        assert_eq!(format_number(1234.5, 2), "1,234.50");
    }

    #[test]
    fn sign_follows_rounded_value_and_huge_values_keep_digits() {
        assert_eq!(format_price(-0.001), "0,00");
        assert_eq!(format_price(-0.005001), "-0,01");
        // 2^130 is exact in f64 and beyond i128.
        assert_eq!(
            format_price(2f64.powi(130)),
            "1361129467683753853853498429727072845824,00"
        );
        assert_eq!(format_number(42.0, 0), "42");
    }
}
