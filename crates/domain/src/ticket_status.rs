// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Ticket status states and the transition table.
//!
//! Every status change is checked against [`TicketStatus::allowed_next`]
//! before any mutation happens. `Booked` is the only initial state;
//! `Completed` and `Canceled` are terminal.

use crate::error::{DomainError, TransitionRejection};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle states of a repair ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    /// Submitted by a customer, not yet reviewed.
    Booked,
    /// Reviewed and accepted by an agent.
    Confirmed,
    /// A technician has been assigned.
    Assigned,
    /// Work has started (first receipt uploaded).
    InProgress,
    /// Work finished and evidenced by a receipt.
    Completed,
    /// Withdrawn before work was committed.
    Canceled,
}

impl TicketStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Booked,
        Self::Confirmed,
        Self::Assigned,
        Self::InProgress,
        Self::Completed,
        Self::Canceled,
    ];

    /// Returns the string representation of the status.
    ///
    /// This is used for persistence and API serialization.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Booked => "BOOKED",
            Self::Confirmed => "CONFIRMED",
            Self::Assigned => "ASSIGNED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Canceled => "CANCELED",
        }
    }

    fn parse_str(s: &str) -> Result<Self, DomainError> {
        match s {
            "BOOKED" => Ok(Self::Booked),
            "CONFIRMED" => Ok(Self::Confirmed),
            "ASSIGNED" => Ok(Self::Assigned),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELED" => Ok(Self::Canceled),
            _ => Err(DomainError::InvalidTicketStatus {
                status: s.to_string(),
            }),
        }
    }

    /// The adjacency table: statuses reachable in one step from `self`.
    #[must_use]
    pub const fn allowed_next(&self) -> &'static [Self] {
        match self {
            Self::Booked => &[Self::Confirmed, Self::Canceled],
            Self::Confirmed => &[Self::Assigned, Self::Canceled],
            Self::Assigned => &[Self::InProgress, Self::Completed, Self::Canceled],
            Self::InProgress => &[Self::Completed],
            Self::Completed | Self::Canceled => &[],
        }
    }

    /// Returns true if no transition leaves this status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }

    /// Returns true if a ticket in this status may reference a technician.
    #[must_use]
    pub const fn holds_technician(&self) -> bool {
        matches!(self, Self::Assigned | Self::InProgress | Self::Completed)
    }

    /// Returns true if `next` is reachable from this status in one step.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        self.allowed_next().contains(&next)
    }

    /// Validates if a transition from this status to another is permitted.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStatusTransition` if `next` is not in the
    /// adjacency table for this status.
    pub fn validate_transition(&self, next: Self) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(DomainError::InvalidStatusTransition {
                from: *self,
                to: next,
                rejection: TransitionRejection::NotPermitted,
            })
        }
    }
}

impl FromStr for TicketStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
