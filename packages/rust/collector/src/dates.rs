//! Best-effort date extraction for collector output.
//!
//! Collectors copy dates straight out of scraped pages, so the text ranges
//! from ISO timestamps to "Monday, 14th July 2025". Anything unrecognized is
//! kept as raw text.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use newsdigest_shared::DocumentDate;

/// Formats that carry a time of day.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Calendar-only formats.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%A, %d %B %Y",
    "%A %d %B %Y",
    "%d/%m/%Y",
];

/// Matches ordinal suffixes such as `14th` or `1st`.
static ORDINAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)\b").expect("ordinal regex"));

/// Parse a date string, falling back to [`DocumentDate::Raw`].
///
/// Returns `None` only for blank input.
pub(crate) fn parse_date(raw: &str) -> Option<DocumentDate> {
    let trimmed = raw.trim().trim_end_matches(['.', ',', ';']).trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = ORDINAL_RE.replace_all(trimmed, "$1");
    let candidate = normalized.as_ref();

    if let Ok(dt) = DateTime::parse_from_rfc3339(candidate) {
        return Some(DocumentDate::DateTime {
            datetime: dt.naive_local(),
        });
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(candidate, format) {
            return Some(DocumentDate::DateTime { datetime });
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(candidate, format) {
            return Some(DocumentDate::Date { date });
        }
    }

    Some(DocumentDate::Raw {
        text: trimmed.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_generated_on_stamp() {
        let parsed = parse_date("2025-07-14 09:30").unwrap();
        assert_eq!(
            parsed,
            DocumentDate::DateTime {
                datetime: ymd(2025, 7, 14).and_hms_opt(9, 30, 0).unwrap()
            }
        );
    }

    #[test]
    fn parses_long_form_with_ordinal() {
        let parsed = parse_date("14th July 2025").unwrap();
        assert_eq!(parsed, DocumentDate::Date { date: ymd(2025, 7, 14) });

        let parsed = parse_date("Monday, 14 July 2025").unwrap();
        assert_eq!(parsed, DocumentDate::Date { date: ymd(2025, 7, 14) });
    }

    #[test]
    fn parses_us_style() {
        let parsed = parse_date("July 3, 2025").unwrap();
        assert_eq!(parsed, DocumentDate::Date { date: ymd(2025, 7, 3) });
    }

    #[test]
    fn parses_rfc3339() {
        let parsed = parse_date("2025-07-14T09:30:00+10:00").unwrap();
        assert!(parsed.is_parsed());
    }

    #[test]
    fn keeps_unrecognized_text() {
        let parsed = parse_date("  Published: sometime last week ").unwrap();
        assert_eq!(
            parsed,
            DocumentDate::Raw {
                text: "Published: sometime last week".into()
            }
        );
    }

    #[test]
    fn blank_is_none() {
        assert!(parse_date("   ").is_none());
    }
}
