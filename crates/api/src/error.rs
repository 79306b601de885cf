// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API error types.
//!
//! Lower layers never leak through the API boundary: every domain, core,
//! persistence and storage error is translated here into an `ApiError`.

use repairdesk::CoreError;
use repairdesk_domain::{DomainError, TicketStatus, TransitionRejection};
use repairdesk_persistence::{PersistenceError, TransitionError};

use crate::password_policy::PasswordPolicyError;
use crate::storage::StorageError;

/// API-level errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Credentials or session were not accepted.
    AuthenticationFailed {
        /// The reason authentication failed.
        reason: String,
    },
    /// The caller lacks one or more required permissions.
    PermissionDenied {
        /// The permission codes the caller is missing.
        missing: Vec<String>,
    },
    /// The ticket is not in a status that allows the operation.
    InvalidTransition {
        /// The ticket's current status.
        from: TicketStatus,
        /// The status that was attempted.
        to: TicketStatus,
        /// Why the change was refused.
        rejection: TransitionRejection,
    },
    /// The ticket changed since the caller last read it.
    VersionConflict {
        /// The ticket identifier.
        ticket_id: i64,
        /// The version the caller supplied.
        expected: i64,
        /// The version currently stored.
        actual: i64,
    },
    /// Auto-assignment found no active technician.
    NoTechnicianAvailable {
        /// The center that was searched, if any.
        center_id: Option<String>,
    },
    /// A system role would be renamed, stripped or deleted.
    ProtectedRole {
        /// The role name.
        role: String,
        /// What the caller tried to do.
        reason: String,
    },
    /// A role is still held by users.
    RoleInUse {
        /// The role name.
        role: String,
        /// How many users hold it.
        user_count: i64,
    },
    /// A domain rule rejected the request.
    DomainRuleViolation {
        /// The rule that was violated.
        rule: String,
        /// A description of the violation.
        message: String,
    },
    /// The request input is invalid.
    InvalidInput {
        /// The field that failed validation.
        field: String,
        /// A description of the validation failure.
        message: String,
    },
    /// A requested resource does not exist.
    ResourceNotFound {
        /// The type of resource.
        resource_type: String,
        /// A description of what was not found.
        message: String,
    },
    /// The request clashes with existing data.
    Conflict {
        /// A description of the clash.
        message: String,
    },
    /// Password does not meet policy requirements.
    PasswordPolicyViolation {
        /// The policy violation message.
        message: String,
    },
    /// An unexpected failure.
    Internal {
        /// A description of the failure.
        message: String,
    },
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationFailed { reason } => {
                write!(f, "Authentication failed: {reason}")
            }
            Self::PermissionDenied { missing } => {
                write!(f, "Permission denied: missing {}", missing.join(", "))
            }
            Self::InvalidTransition {
                from,
                to,
                rejection,
            } => match rejection {
                TransitionRejection::ReceiptMissing => write!(
                    f,
                    "Invalid transition from {from} to {to}: at least one receipt image is required"
                ),
                TransitionRejection::NotPermitted => {
                    write!(f, "Invalid transition from {from} to {to}")
                }
            },
            Self::VersionConflict {
                ticket_id,
                expected,
                actual,
            } => write!(
                f,
                "Version conflict on ticket {ticket_id}: expected version {expected}, current version {actual}"
            ),
            Self::NoTechnicianAvailable { center_id } => match center_id {
                Some(center) => write!(f, "No technician available in center '{center}'"),
                None => write!(f, "No technician available"),
            },
            Self::ProtectedRole { role, reason } => {
                write!(f, "Role '{role}' is protected: {reason}")
            }
            Self::RoleInUse { role, user_count } => write!(
                f,
                "Role '{role}' is still assigned to {user_count} user(s)"
            ),
            Self::DomainRuleViolation { rule, message } => {
                write!(f, "Domain rule violation ({rule}): {message}")
            }
            Self::InvalidInput { field, message } => {
                write!(f, "Invalid input for field '{field}': {message}")
            }
            Self::ResourceNotFound {
                resource_type,
                message,
            } => {
                write!(f, "{resource_type} not found: {message}")
            }
            Self::Conflict { message } => write!(f, "Conflict: {message}"),
            Self::PasswordPolicyViolation { message } => {
                write!(f, "Password policy violation: {message}")
            }
            Self::Internal { message } => write!(f, "Internal error: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Authentication errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Authentication failed.
    AuthenticationFailed {
        /// The reason authentication failed.
        reason: String,
    },
    /// The caller lacks one or more required permissions.
    PermissionDenied {
        /// The missing permission codes.
        missing: Vec<String>,
    },
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationFailed { reason } => {
                write!(f, "Authentication failed: {reason}")
            }
            Self::PermissionDenied { missing } => {
                write!(f, "Permission denied: missing {}", missing.join(", "))
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AuthenticationFailed { reason } => Self::AuthenticationFailed { reason },
            AuthError::PermissionDenied { missing } => Self::PermissionDenied { missing },
        }
    }
}

impl From<PasswordPolicyError> for ApiError {
    fn from(err: PasswordPolicyError) -> Self {
        Self::PasswordPolicyViolation {
            message: err.to_string(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Missing(_) => Self::ResourceNotFound {
                resource_type: String::from("Ticket image file"),
                message: err.to_string(),
            },
            other => Self::Internal {
                message: other.to_string(),
            },
        }
    }
}

/// Translates a domain error into an API error.
///
/// This translation is explicit and ensures domain errors are not leaked directly.
#[must_use]
pub fn translate_domain_error(err: DomainError) -> ApiError {
    match err {
        DomainError::InvalidStatusTransition {
            from,
            to,
            rejection,
        } => ApiError::InvalidTransition {
            from,
            to,
            rejection,
        },
        DomainError::ProtectedRole { role, reason } => ApiError::ProtectedRole { role, reason },
        DomainError::RoleInUse { role, user_count } => ApiError::RoleInUse { role, user_count },
        DomainError::TechnicianInactive { technician_id } => ApiError::DomainRuleViolation {
            rule: String::from("technician_active"),
            message: format!("Technician {technician_id} is not active"),
        },
        DomainError::InvalidTicketStatus { status } => ApiError::InvalidInput {
            field: String::from("status"),
            message: format!("Unknown ticket status '{status}'"),
        },
        DomainError::InvalidImageType { image_type } => ApiError::InvalidInput {
            field: String::from("image_type"),
            message: format!("Unknown image type '{image_type}'"),
        },
        DomainError::InvalidCustomerName(msg) => ApiError::InvalidInput {
            field: String::from("customer_name"),
            message: msg,
        },
        DomainError::InvalidPhone(msg) => ApiError::InvalidInput {
            field: String::from("customer_phone"),
            message: msg,
        },
        DomainError::InvalidAddress(msg) => ApiError::InvalidInput {
            field: String::from("address"),
            message: msg,
        },
        DomainError::InvalidIssueDescription(msg) => ApiError::InvalidInput {
            field: String::from("issue_description"),
            message: msg,
        },
        DomainError::InvalidTimeSlot(msg) => ApiError::InvalidInput {
            field: String::from("appointment_time_slot"),
            message: msg,
        },
        DomainError::UnknownPermission { code } => ApiError::InvalidInput {
            field: String::from("permissions"),
            message: format!("Unknown permission code '{code}'"),
        },
        DomainError::InvalidRoleName(msg) => ApiError::InvalidInput {
            field: String::from("name"),
            message: msg,
        },
        DomainError::InvalidEmail(msg) => ApiError::InvalidInput {
            field: String::from("email"),
            message: msg,
        },
        DomainError::InvalidTechnicianName(msg) => ApiError::InvalidInput {
            field: String::from("name"),
            message: msg,
        },
        DomainError::InvalidUpload(msg) => ApiError::InvalidInput {
            field: String::from("file"),
            message: msg,
        },
        DomainError::DateParseError { date_string, error } => ApiError::InvalidInput {
            field: String::from("date"),
            message: format!("Invalid date '{date_string}': {error}"),
        },
    }
}

/// Translates a core error into an API error.
///
/// This translation is explicit and ensures core errors are not leaked directly.
#[must_use]
pub fn translate_core_error(err: CoreError) -> ApiError {
    match err {
        CoreError::DomainViolation(domain_err) => translate_domain_error(domain_err),
        CoreError::VersionConflict {
            ticket_id,
            expected,
            actual,
        } => ApiError::VersionConflict {
            ticket_id,
            expected,
            actual,
        },
    }
}

/// Translates a persistence error into an API error.
///
/// Missing rows become `ResourceNotFound`, unique-key clashes become
/// `Conflict`, everything else is internal.
#[must_use]
pub fn translate_persistence_error(err: PersistenceError) -> ApiError {
    match err {
        PersistenceError::NotFound(message) => ApiError::ResourceNotFound {
            resource_type: String::from("Resource"),
            message,
        },
        PersistenceError::EventNotFound(event_id) => ApiError::ResourceNotFound {
            resource_type: String::from("Audit event"),
            message: format!("Event {event_id} does not exist"),
        },
        PersistenceError::Conflict(message) => ApiError::Conflict { message },
        PersistenceError::SessionNotFound(reason) | PersistenceError::SessionExpired(reason) => {
            ApiError::AuthenticationFailed { reason }
        }
        other => ApiError::Internal {
            message: other.to_string(),
        },
    }
}

/// Translates the outcome of a guarded write into an API error.
#[must_use]
pub fn translate_transition_error(err: TransitionError) -> ApiError {
    match err {
        TransitionError::Rejected(core_err) => translate_core_error(core_err),
        TransitionError::Persistence(persistence_err) => {
            translate_persistence_error(persistence_err)
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        translate_domain_error(err)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        translate_core_error(err)
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        translate_persistence_error(err)
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        translate_transition_error(err)
    }
}
