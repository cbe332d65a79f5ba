//! Date helper functions

use chrono::{DateTime, Datelike, ParseError, TimeZone, Utc};

/// Abbreviated month names used by the pt-BR locale
const PT_BR_MONTHS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// Format a date as `dd MMM yyyy` in Brazilian Portuguese
///
/// # Examples
/// ```ignore
/// format_date_pt_br(&date, chrono_tz::UTC) // -> "25 mar 2021"
/// ```
pub fn format_date_pt_br<Tz: TimeZone>(date: &DateTime<Utc>, tz: &Tz) -> String {
    let local = date.with_timezone(tz);
    format!(
        "{:02} {} {:04}",
        local.day(),
        PT_BR_MONTHS[local.month0() as usize],
        local.year()
    )
}

/// Display string for an optional publication date; empty when unpublished
pub fn display_date<Tz: TimeZone>(date: Option<&DateTime<Utc>>, tz: &Tz) -> String {
    date.map(|d| format_date_pt_br(d, tz)).unwrap_or_default()
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
}

/// Parse a timestamp as returned by the content API.
///
/// Prismic emits `2021-03-25T19:25:28+0000`; plain RFC 3339 is accepted too.
pub fn parse_api_date(s: &str) -> Result<DateTime<Utc>, ParseError> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|d| d.with_timezone(&Utc))
}
