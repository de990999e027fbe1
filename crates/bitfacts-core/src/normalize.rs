//! Value normalization shared by the encoders and the predicate compiler.
//!
//! Both sides must agree on how a raw cell is read, otherwise a row encoded
//! at ingestion would not match the condition compiled for the same literal.

use chrono::{NaiveDate, NaiveDateTime};

use crate::decimal::Decimal;

/// Trim and collapse internal runs of whitespace to a single space.
pub fn norm(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// [`norm`] followed by Unicode uppercasing (`México` → `MÉXICO`).
pub fn norm_upper(s: &str) -> String {
    norm(s).to_uppercase()
}

/// Base-10 integer, surrounding whitespace ignored. Integral decimals such
/// as `"3.0"` (how SQLite renders a REAL column holding a whole number) are
/// accepted; `"3.5"` is not.
pub fn parse_int(s: &str) -> Option<i64> {
    let st = norm(s);
    if st.is_empty() {
        return None;
    }
    if let Ok(v) = st.parse::<i64>() {
        return Some(v);
    }
    let d = Decimal::parse(&st)?;
    if d.scale() != 0 {
        return None;
    }
    i64::try_from(d.mantissa()).ok()
}

pub fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::parse(&norm(s))
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Calendar date from the formats Northwind exports use: `YYYY-MM-DD`,
/// `YYYY-MM-DD HH:MM:SS` and the ISO `T` variant, each with optional
/// fractional seconds.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let st = norm(s);
    if st.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(&st, "%Y-%m-%d") {
        return Some(d);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&st, fmt).ok())
        .map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn norm_collapses_whitespace() {
        assert_eq!(norm("  México \t D.F. "), "México D.F.");
        assert_eq!(norm_upper(" méxico d.f."), "MÉXICO D.F.");
        assert_eq!(norm(""), "");
    }

    #[test]
    fn parse_int_accepts_integral_forms() {
        assert_eq!(parse_int(" 12 "), Some(12));
        assert_eq!(parse_int("-4"), Some(-4));
        assert_eq!(parse_int("3.0"), Some(3));
        assert_eq!(parse_int("3.5"), None);
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("twelve"), None);
    }

    #[test]
    fn parse_date_formats() {
        for s in [
            "1996-07-04",
            "1996-07-04 00:00:00",
            "1996-07-04T00:00:00",
            "1996-07-04 00:00:00.000",
        ] {
            assert_eq!(parse_date(s).map(|d| d.year()), Some(1996), "{s}");
        }
        assert_eq!(parse_date("04/07/1996"), None);
        assert_eq!(parse_date("1996-13-01"), None);
    }
}
