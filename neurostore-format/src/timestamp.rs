// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Timestamp codec for metadata attributes.

use chrono::{DateTime, NaiveDateTime};

use crate::error::FormatError;

/// Format written by [`format`].
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d,%H-%M-%S%.6f";

const ACCEPTED_FORMATS: &[&str] = &[
    "%Y-%m-%d,%H-%M-%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse a metadata timestamp.
///
/// Accepts the canonical format, `YYYY-MM-DD hh:mm:ss[.f]` and RFC 3339
/// (converted to UTC).
pub fn parse(value: &str) -> Result<NaiveDateTime, FormatError> {
    let value = value.trim();
    ACCEPTED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|t| t.naive_utc())
        })
        .ok_or_else(|| FormatError::InvalidTimestamp(value.to_string()))
}

/// Render a timestamp in the canonical format.
pub fn format(time: NaiveDateTime) -> String {
    time.format(CANONICAL_FORMAT).to_string()
}
