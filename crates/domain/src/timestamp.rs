// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Formats an instant as a UTC timestamp with second precision.
///
/// Timestamps in this format sort lexicographically in time order.
#[must_use]
pub fn format_timestamp(instant: OffsetDateTime) -> String {
    let utc = instant.to_offset(UtcOffset::UTC);
    utc.format(TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| utc.unix_timestamp().to_string())
}

/// Parses a timestamp produced by [`format_timestamp`].
///
/// # Errors
///
/// Returns `DomainError::DateParseError` if the string is not a UTC timestamp.
pub fn parse_timestamp(value: &str) -> Result<OffsetDateTime, DomainError> {
    PrimitiveDateTime::parse(value, TIMESTAMP_FORMAT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| DomainError::DateParseError {
            date_string: value.to_string(),
            error: e.to_string(),
        })
}

/// Formats a calendar date as `YYYY-MM-DD`.
#[must_use]
pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

/// Parses a `YYYY-MM-DD` calendar date.
///
/// # Errors
///
/// Returns `DomainError::DateParseError` if the string is not a valid date.
pub fn parse_date(value: &str) -> Result<Date, DomainError> {
    Date::parse(value.trim(), DATE_FORMAT).map_err(|e| DomainError::DateParseError {
        date_string: value.to_string(),
        error: e.to_string(),
    })
}
