use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::period::{Granularity, Period};

/// Parses the raw timestamps carried by review records. Upstream feeds mix
/// RFC 3339, bare ISO datetimes, and date-only strings; anything else is
/// treated as absent rather than failing the scan.
pub fn parse_instant(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts);
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(ts);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    None
}

/// Canonical bucket identifier for a date at a granularity. Keys sort
/// chronologically within one series.
pub fn bucket_key(date: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Day => date.format("%Y-%m-%d").to_string(),
        Granularity::Week => {
            // ISO-8601 week: the week containing the date's Thursday, so
            // year-boundary weeks land in the year that owns the Thursday.
            let iso = date.iso_week();
            format!("{}-W{:02}", iso.year(), iso.week())
        }
        Granularity::Month => date.format("%Y-%m").to_string(),
    }
}

/// Chart label for a bucket. Purely presentational; identity and order come
/// from the bucket key alone.
pub fn display_label(date: NaiveDate, period: Period) -> String {
    match period {
        Period::Days7 => date.format("%a").to_string(),
        Period::Days30 | Period::Months3 => date.format("%b %-d").to_string(),
        Period::Months12 => date.format("%b %Y").to_string(),
    }
}
