//! ISO-8601 text form used for dates at the storage boundary.
//!
//! Dates are always written in UTC with nine fractional digits and a `Z`
//! suffix, e.g. `2017-02-09T18:30:00.123456789Z`, so that reading the text back
//! yields the identical instant. Parsing accepts any RFC 3339 timestamp that
//! carries an explicit offset; timezone-less text is rejected.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a date in the fixed storage format.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use docprops_core::date::format_date;
///
/// let d = Utc.with_ymd_and_hms(2017, 2, 9, 18, 30, 0).unwrap();
/// assert_eq!(format_date(&d), "2017-02-09T18:30:00.000000000Z");
/// ```
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse stored date text back into an instant.
///
/// Returns `None` when the text is not RFC 3339 or lacks an offset
/// (`"2017-02-09T18:30:00"` is rejected).
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}
