// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use repairdesk_domain::DomainError;

/// Errors that can occur during state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A domain rule was violated.
    DomainViolation(DomainError),
    /// The caller acted on a stale copy of the ticket.
    VersionConflict {
        /// The ticket identifier.
        ticket_id: i64,
        /// The version the caller last saw.
        expected: i64,
        /// The version currently stored.
        actual: i64,
    },
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DomainViolation(err) => write!(f, "Domain violation: {err}"),
            Self::VersionConflict {
                ticket_id,
                expected,
                actual,
            } => write!(
                f,
                "Ticket {ticket_id} was modified concurrently: expected version {expected}, found {actual}"
            ),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<DomainError> for CoreError {
    fn from(err: DomainError) -> Self {
        Self::DomainViolation(err)
    }
}
