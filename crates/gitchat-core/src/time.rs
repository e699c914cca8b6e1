use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Fixed-width UTC timestamp, so string order is chronological order.
const ISO8601_MICROS: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
);

/// Current UTC time, e.g. `2026-02-25T10:00:00.123456Z`.
pub fn now_iso8601() -> String {
    format_iso8601(OffsetDateTime::now_utc())
}

pub fn format_iso8601(at: OffsetDateTime) -> String {
    // Every component of the description is infallible for a UTC date in range.
    at.format(ISO8601_MICROS)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

pub fn parse_iso8601(raw: &str) -> Option<OffsetDateTime> {
    PrimitiveDateTime::parse(raw, ISO8601_MICROS)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

/// Replace characters that are not portable in file names (`:`) with `-`.
pub fn filename_safe(timestamp: &str) -> String {
    timestamp.replace(':', "-")
}
