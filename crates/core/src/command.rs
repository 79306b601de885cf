// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use repairdesk_domain::{AssignmentMethod, Technician, TicketImage};

/// A command represents user intent against a single ticket, as data only.
///
/// Every command except `UploadReceipt` carries the version the caller last
/// saw; a mismatch is rejected before anything else is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketCommand {
    /// Accept a booked ticket.
    Confirm {
        /// The version the caller last saw.
        expected_version: i64,
    },
    /// Put a confirmed ticket on a technician's schedule.
    Assign {
        /// The technician, already resolved by the caller.
        technician: Technician,
        /// Whether the technician was picked by hand or by the load policy.
        method: AssignmentMethod,
        /// Optional operator note recorded with the event.
        note: Option<String>,
        /// The version the caller last saw.
        expected_version: i64,
    },
    /// Attach an image. The first upload on an assigned ticket starts work.
    UploadReceipt {
        /// The stored image metadata.
        image: TicketImage,
    },
    /// Close out a ticket that has at least one receipt.
    Complete {
        /// The version the caller last saw.
        expected_version: i64,
    },
    /// Withdraw a ticket before work has started.
    Cancel {
        /// Optional reason recorded with the event.
        reason: Option<String>,
        /// The version the caller last saw.
        expected_version: i64,
    },
}

impl TicketCommand {
    /// The audit action name for this command.
    #[must_use]
    pub const fn action_name(&self) -> &'static str {
        match self {
            Self::Confirm { .. } => "CONFIRM",
            Self::Assign { .. } => "ASSIGN",
            Self::UploadReceipt { .. } => "UPLOAD",
            Self::Complete { .. } => "COMPLETE",
            Self::Cancel { .. } => "CANCEL",
        }
    }

    /// The version precondition, if the command has one.
    #[must_use]
    pub const fn expected_version(&self) -> Option<i64> {
        match self {
            Self::Confirm { expected_version }
            | Self::Assign {
                expected_version, ..
            }
            | Self::Complete { expected_version }
            | Self::Cancel {
                expected_version, ..
            } => Some(*expected_version),
            Self::UploadReceipt { .. } => None,
        }
    }
}

/// A change to an existing role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleCommand {
    /// Rename, re-describe or replace the permission set of a role.
    Update {
        name: Option<String>,
        description: Option<String>,
        permissions: Option<Vec<String>>,
    },
    /// Remove a role.
    Delete,
}

/// Field changes to an existing technician. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TechnicianUpdate {
    pub name: Option<String>,
    pub center_id: Option<String>,
    /// Detach the technician from any center. Takes precedence over `center_id`.
    pub clear_center: bool,
    pub is_active: Option<bool>,
}
