// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use crate::timestamp::parse_date;
use sha2::{Digest, Sha256};
use time::Date;
use time::Time;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

const MAX_NAME_LENGTH: usize = 100;
const MIN_PHONE_LENGTH: usize = 5;
const MAX_PHONE_LENGTH: usize = 30;
const MAX_ADDRESS_LENGTH: usize = 200;
const MAX_ISSUE_LENGTH: usize = 500;
const MAX_EMAIL_LENGTH: usize = 254;

const TIME_SLOT_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");

/// A public booking exactly as submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub customer_name: String,
    pub customer_phone: String,
    pub address: String,
    pub appointment_date: String,
    pub appointment_time_slot: String,
    pub issue_description: String,
    pub center_id: Option<String>,
}

/// A booking whose fields passed validation.
///
/// The raw phone number has already been replaced by its hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBooking {
    pub customer_name: String,
    pub customer_phone_hash: String,
    pub address: String,
    pub appointment_date: Date,
    pub appointment_time_slot: String,
    pub issue_description: String,
    pub center_id: Option<String>,
}

/// Returns the lowercase hex SHA-256 digest of `data`.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Hashes a customer phone number for storage.
#[must_use]
pub fn hash_phone(phone: &str) -> String {
    sha256_hex(phone.trim().as_bytes())
}

fn trimmed_within(value: &str, min: usize, max: usize) -> Option<String> {
    let trimmed = value.trim();
    let length = trimmed.chars().count();
    (min..=max)
        .contains(&length)
        .then(|| trimmed.to_string())
}

/// Validates an `HH:MM` appointment slot and returns it normalized.
///
/// # Errors
///
/// Returns `DomainError::InvalidTimeSlot` if the value is not a valid time.
pub fn validate_time_slot(value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    let parsed = Time::parse(trimmed, TIME_SLOT_FORMAT)
        .map_err(|e| DomainError::InvalidTimeSlot(format!("'{trimmed}': {e}")))?;
    Ok(format!("{:02}:{:02}", parsed.hour(), parsed.minute()))
}

/// Validates every field of a public booking.
///
/// Text fields are trimmed before length checks.
///
/// # Errors
///
/// Returns the first field error encountered.
pub fn validate_booking(request: &BookingRequest) -> Result<ValidatedBooking, DomainError> {
    let customer_name = trimmed_within(&request.customer_name, 1, MAX_NAME_LENGTH).ok_or_else(
        || {
            DomainError::InvalidCustomerName(format!(
                "must be between 1 and {MAX_NAME_LENGTH} characters"
            ))
        },
    )?;

    let phone = trimmed_within(&request.customer_phone, MIN_PHONE_LENGTH, MAX_PHONE_LENGTH)
        .ok_or_else(|| {
            DomainError::InvalidPhone(format!(
                "must be between {MIN_PHONE_LENGTH} and {MAX_PHONE_LENGTH} characters"
            ))
        })?;
    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
    {
        return Err(DomainError::InvalidPhone(String::from(
            "may only contain digits, spaces and + - ( )",
        )));
    }

    let address = trimmed_within(&request.address, 1, MAX_ADDRESS_LENGTH).ok_or_else(|| {
        DomainError::InvalidAddress(format!(
            "must be between 1 and {MAX_ADDRESS_LENGTH} characters"
        ))
    })?;

    let issue_description = trimmed_within(&request.issue_description, 1, MAX_ISSUE_LENGTH)
        .ok_or_else(|| {
            DomainError::InvalidIssueDescription(format!(
                "must be between 1 and {MAX_ISSUE_LENGTH} characters"
            ))
        })?;

    let appointment_date = parse_date(&request.appointment_date)?;
    let appointment_time_slot = validate_time_slot(&request.appointment_time_slot)?;

    let center_id = request
        .center_id
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    Ok(ValidatedBooking {
        customer_name,
        customer_phone_hash: hash_phone(&phone),
        address,
        appointment_date,
        appointment_time_slot,
        issue_description,
        center_id,
    })
}

/// Normalizes and validates an email address.
///
/// # Errors
///
/// Returns `DomainError::InvalidEmail` if the address is empty, too long or
/// lacks a local part and a dotted domain.
pub fn validate_email(email: &str) -> Result<String, DomainError> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(DomainError::InvalidEmail(String::from(
            "Email cannot be empty",
        )));
    }
    if normalized.len() > MAX_EMAIL_LENGTH {
        return Err(DomainError::InvalidEmail(format!(
            "Email cannot exceed {MAX_EMAIL_LENGTH} characters"
        )));
    }
    match normalized.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@') =>
        {
            Ok(normalized)
        }
        _ => Err(DomainError::InvalidEmail(format!(
            "'{normalized}' is not a valid address"
        ))),
    }
}
