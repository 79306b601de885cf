// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::ticket_status::TicketStatus;

/// Why a ticket status change was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRejection {
    /// The target status is not reachable from the current status.
    NotPermitted,
    /// Completion requires at least one uploaded receipt image.
    ReceiptMissing,
}

impl TransitionRejection {
    /// Returns the stable identifier used in API responses.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotPermitted => "not_permitted",
            Self::ReceiptMissing => "receipt_missing",
        }
    }
}

/// Errors that can occur during domain validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A status string did not name a known ticket status.
    InvalidTicketStatus {
        /// The unrecognised value.
        status: String,
    },
    /// An image type string did not name a known image type.
    InvalidImageType {
        /// The unrecognised value.
        image_type: String,
    },
    /// A ticket status change was refused.
    InvalidStatusTransition {
        /// The ticket's current status.
        from: TicketStatus,
        /// The status that was attempted.
        to: TicketStatus,
        /// Why the change was refused.
        rejection: TransitionRejection,
    },
    /// The customer name is empty or too long.
    InvalidCustomerName(String),
    /// The customer phone is empty or malformed.
    InvalidPhone(String),
    /// The service address is empty or too long.
    InvalidAddress(String),
    /// The issue description is empty or too long.
    InvalidIssueDescription(String),
    /// The appointment time slot could not be parsed.
    InvalidTimeSlot(String),
    /// A permission code is not part of the catalog.
    UnknownPermission {
        /// The unknown code.
        code: String,
    },
    /// A role name is empty or malformed.
    InvalidRoleName(String),
    /// A built-in role would be renamed, stripped or deleted.
    ProtectedRole {
        /// The role name.
        role: String,
        /// What the caller tried to do.
        reason: String,
    },
    /// A role cannot be deleted while users still hold it.
    RoleInUse {
        /// The role name.
        role: String,
        /// How many users still hold the role.
        user_count: i64,
    },
    /// An email address is empty or malformed.
    InvalidEmail(String),
    /// A technician name is empty or too long.
    InvalidTechnicianName(String),
    /// The technician cannot take work.
    TechnicianInactive {
        /// The technician identifier.
        technician_id: i64,
    },
    /// An uploaded file was rejected.
    InvalidUpload(String),
    /// Failed to parse date from string.
    DateParseError {
        /// The invalid date string.
        date_string: String,
        /// The parsing error message.
        error: String,
    },
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTicketStatus { status } => write!(f, "Invalid ticket status: {status}"),
            Self::InvalidImageType { image_type } => {
                write!(f, "Invalid image type: {image_type}")
            }
            Self::InvalidStatusTransition {
                from,
                to,
                rejection,
            } => match rejection {
                TransitionRejection::NotPermitted => write!(
                    f,
                    "Cannot transition ticket from {} to {}",
                    from.as_str(),
                    to.as_str()
                ),
                TransitionRejection::ReceiptMissing => write!(
                    f,
                    "Cannot transition ticket from {} to {}: at least one receipt image is required",
                    from.as_str(),
                    to.as_str()
                ),
            },
            Self::InvalidCustomerName(msg) => write!(f, "Invalid customer name: {msg}"),
            Self::InvalidPhone(msg) => write!(f, "Invalid phone: {msg}"),
            Self::InvalidAddress(msg) => write!(f, "Invalid address: {msg}"),
            Self::InvalidIssueDescription(msg) => write!(f, "Invalid issue description: {msg}"),
            Self::InvalidTimeSlot(msg) => write!(f, "Invalid time slot: {msg}"),
            Self::UnknownPermission { code } => write!(f, "Unknown permission code: {code}"),
            Self::InvalidRoleName(msg) => write!(f, "Invalid role name: {msg}"),
            Self::ProtectedRole { role, reason } => {
                write!(f, "System role '{role}' is protected: {reason}")
            }
            Self::RoleInUse { role, user_count } => write!(
                f,
                "Role '{role}' cannot be deleted: it is assigned to {user_count} user(s)"
            ),
            Self::InvalidEmail(msg) => write!(f, "Invalid email: {msg}"),
            Self::InvalidTechnicianName(msg) => write!(f, "Invalid technician name: {msg}"),
            Self::TechnicianInactive { technician_id } => {
                write!(f, "Technician {technician_id} is not active")
            }
            Self::InvalidUpload(msg) => write!(f, "Invalid upload: {msg}"),
            Self::DateParseError { date_string, error } => {
                write!(f, "Failed to parse date '{date_string}': {error}")
            }
        }
    }
}

impl std::error::Error for DomainError {}
