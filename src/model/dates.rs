// File: ./src/model/dates.rs
// Date normalization shared by the extractor, storage and export.
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a numeric `a/b/yyyy` token is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    /// 04/10/2025 is April 10th.
    #[default]
    MonthFirst,
    /// 04/10/2025 is October 4th.
    DayFirst,
}

impl fmt::Display for DateOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateOrder::MonthFirst => write!(f, "month/day/year"),
            DateOrder::DayFirst => write!(f, "day/month/year"),
        }
    }
}

/// Renders a UTC instant as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn to_iso(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates.
pub fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

// Two-digit years pivot at 50: 25 -> 2025, 87 -> 1987.
fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    if raw.len() == 2 {
        Some(if year < 50 { 2000 + year } else { 1900 + year })
    } else {
        Some(year)
    }
}

/// Parses a numeric `D/D/YY[YY]` (or dash separated) token.
/// Returns `None` for tokens that are not a real calendar day (13/45/2025).
pub fn parse_numeric_date(token: &str, order: DateOrder) -> Option<NaiveDate> {
    let parts: Vec<&str> = token.split(['/', '-']).collect();
    let [first, second, third] = parts.as_slice() else {
        return None;
    };
    let first: u32 = first.parse().ok()?;
    let second: u32 = second.parse().ok()?;
    let year = expand_year(third)?;

    let (month, day) = match order {
        DateOrder::MonthFirst => (first, second),
        DateOrder::DayFirst => (second, first),
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Numeric token to normalized ISO-8601 at midnight UTC.
pub fn normalize_numeric_date(token: &str, order: DateOrder) -> Option<String> {
    parse_numeric_date(token, order).map(|d| to_iso(d.and_time(NaiveTime::MIN).and_utc()))
}

/// Replaces an unparseable date with the `now` sentinel.
/// Valid dates are re-rendered in the canonical form.
pub fn repair_date(s: &str, now: DateTime<Utc>) -> String {
    match parse_iso(s) {
        Some(dt) => to_iso(dt),
        None => {
            log::warn!("Replacing invalid event date '{}' with {}", s, to_iso(now));
            to_iso(now)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_numeric_date_orders() {
        assert_eq!(
            parse_numeric_date("04/10/2025", DateOrder::MonthFirst),
            NaiveDate::from_ymd_opt(2025, 4, 10)
        );
        assert_eq!(
            parse_numeric_date("04/10/2025", DateOrder::DayFirst),
            NaiveDate::from_ymd_opt(2025, 10, 4)
        );
        assert_eq!(
            parse_numeric_date("4-7-2026", DateOrder::MonthFirst),
            NaiveDate::from_ymd_opt(2026, 4, 7)
        );
    }

    #[test]
    fn test_two_digit_year_pivot() {
        assert_eq!(
            parse_numeric_date("1/2/25", DateOrder::MonthFirst),
            NaiveDate::from_ymd_opt(2025, 1, 2)
        );
        assert_eq!(
            parse_numeric_date("1/2/87", DateOrder::MonthFirst),
            NaiveDate::from_ymd_opt(1987, 1, 2)
        );
    }

    #[test]
    fn test_impossible_dates_rejected() {
        assert!(parse_numeric_date("13/45/2025", DateOrder::MonthFirst).is_none());
        assert!(parse_numeric_date("02/30/2024", DateOrder::MonthFirst).is_none());
        assert!(parse_numeric_date("02/29/2024", DateOrder::MonthFirst).is_some());
    }

    #[test]
    fn test_year_first_tokens_rejected() {
        assert_eq!(parse_numeric_date("2025-04-10", DateOrder::MonthFirst), None);
        assert_eq!(parse_numeric_date("2025-04-10", DateOrder::DayFirst), None);
    }

    #[test]
    fn test_normalized_form() {
        assert_eq!(
            normalize_numeric_date("04/10/2025", DateOrder::MonthFirst).as_deref(),
            Some("2025-04-10T00:00:00.000Z")
        );
    }

    #[test]
    fn test_parse_iso_variants() {
        let expected = Utc.with_ymd_and_hms(2025, 4, 10, 0, 0, 0).unwrap();
        assert_eq!(parse_iso("2025-04-10T00:00:00.000Z"), Some(expected));
        assert_eq!(parse_iso("2025-04-10"), Some(expected));
        assert_eq!(
            parse_iso("2025-04-10T02:00:00+02:00"),
            Some(expected),
            "Offsets are folded into UTC"
        );
        assert!(parse_iso("next tuesday").is_none());
    }

    #[test]
    fn test_repair_date() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 9, 30, 0).unwrap();
        assert_eq!(repair_date("garbage", now), "2026-01-05T09:30:00.000Z");
        assert_eq!(repair_date("2025-04-10", now), "2025-04-10T00:00:00.000Z");
    }
}
