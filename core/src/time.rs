//! Time related utils.

use crate::Error;
use chrono::SecondsFormat;
use chrono::Utc;

/// DateTime in UTC, the only time zone we speak on the wire.
pub type DateTime = chrono::DateTime<Utc>;

/// Get the current time in UTC.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format time into HTTP date, aka RFC 1123: `Sun, 06 Nov 1994 08:49:37 GMT`.
///
/// This is the format required by the `x-ms-date` and `Date` headers.
pub fn format_http_date(t: DateTime) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Format time into RFC 3339: `1994-11-06T08:49:37Z`.
pub fn format_rfc3339(t: DateTime) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an HTTP date (RFC 1123) as returned in `Last-Modified` and queue
/// message timestamps.
pub fn parse_http_date(s: &str) -> crate::Result<DateTime> {
    let t = chrono::DateTime::parse_from_rfc2822(s)
        .map_err(|e| Error::parse(format!("invalid http date: {s}")).with_source(e))?;
    Ok(t.with_timezone(&Utc))
}

/// Parse an RFC 3339 timestamp as used by entity `Timestamp` properties.
pub fn parse_rfc3339(s: &str) -> crate::Result<DateTime> {
    let t = chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| Error::parse(format!("invalid rfc3339 timestamp: {s}")).with_source(e))?;
    Ok(t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_time() -> DateTime {
        Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap()
    }

    #[test]
    fn test_format_http_date() {
        assert_eq!(format_http_date(test_time()), "Tue, 01 Mar 2022 08:12:34 GMT");
    }

    #[test]
    fn test_parse_http_date_round_trip() {
        let t = parse_http_date("Tue, 01 Mar 2022 08:12:34 GMT").unwrap();
        assert_eq!(t, test_time());
    }

    #[test]
    fn test_parse_rfc3339() {
        let t = parse_rfc3339("2022-03-01T08:12:34Z").unwrap();
        assert_eq!(t, test_time());
        assert!(parse_rfc3339("yesterday").is_err());
    }
}
