//! Wall-clock helpers. Every timestamp the service reports is UTC.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serializer;

/// Current UTC instant.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// ISO-8601 rendering with microsecond precision and a `Z` suffix.
pub fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `serialize_with` target so every boundary timestamp shares the [`iso`] format.
pub fn serialize_iso<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&iso(*ts))
}
