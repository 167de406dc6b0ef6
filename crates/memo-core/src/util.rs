//! Shared utility functions used across multiple modules.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp as RFC 3339 UTC with millisecond precision and a
/// trailing `Z`.
///
/// This is the single wire/storage format for every timestamp the engine
/// produces; the server's `updated_after` filter compares these strings
/// lexicographically, which is only sound because both sides stick to it.
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 timestamp into a UTC instant.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// Truncate diagnostic text to at most `max` characters.
pub fn truncate_error(value: &str, max: usize) -> String {
    value.trim().chars().take(max).collect()
}
