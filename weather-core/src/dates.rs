//! Calendar date validation for request paths and bodies.

use chrono::{Local, NaiveDate};

/// chrono pattern for the canonical `YYYY-MM-DD` calendar date.
pub const ISO_DATE: &str = "%Y-%m-%d";

/// Parse a strict `YYYY-MM-DD` date.
///
/// chrono accepts unpadded fields and wider years, so the shape is checked
/// byte by byte before the calendar check.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let bytes = s.as_bytes();
    if bytes.len() != 10 {
        return None;
    }

    let shape_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }

    NaiveDate::parse_from_str(s, ISO_DATE).ok()
}

pub fn is_valid_date(s: &str) -> bool {
    parse_iso_date(s).is_some()
}

/// True iff `s` is a valid date strictly after today (local time).
/// Unparsable input is never in the future.
pub fn is_date_in_future(s: &str) -> bool {
    is_date_after(s, Local::now().date_naive())
}

pub fn is_date_after(s: &str, today: NaiveDate) -> bool {
    parse_iso_date(s).is_some_and(|date| date > today)
}
