//! Time related utils.
//!
//! All functions here are stateless, there is no cached formatter.

use crate::{Error, Result};
use chrono::Utc;

/// DateTime is the alias for `chrono::DateTime<Utc>`.
pub type DateTime = chrono::DateTime<Utc>;

/// Create datetime of now.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format time into http date: `Sun, 06 Nov 1994 08:49:37 GMT`
///
/// ## Note
///
/// HTTP date is slightly different from RFC2822.
///
/// - Timezone is fixed to GMT.
/// - Day must be 2 digit.
pub fn format_http_date(t: DateTime) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Format time into RFC3339: `2022-03-13T07:20:04Z`
pub fn format_rfc3339(t: DateTime) -> String {
    t.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parse http date like `Sun, 06 Nov 1994 08:49:37 GMT` or RFC2822 dates.
pub fn parse_http_date(s: &str) -> Result<DateTime> {
    chrono::DateTime::parse_from_rfc2822(s.trim())
        .map(|v| v.with_timezone(&Utc))
        .map_err(|e| Error::unexpected(format!("parse http date {s:?} failed")).with_source(e))
}

/// Build a datetime from unix epoch seconds.
pub fn from_timestamp(secs: i64) -> Result<DateTime> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| Error::unexpected(format!("timestamp {secs} out of range")))
}
