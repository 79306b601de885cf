// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use repairdesk_audit::{AuditEvent, StateSnapshot};
use repairdesk_domain::{Role, Technician, Ticket, TicketImage, format_date};
use serde_json::json;

/// A ticket as read inside its write transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketState {
    /// The stored ticket.
    pub ticket: Ticket,
    /// Number of `RECEIPT` images already attached.
    pub receipt_count: i64,
}

impl TicketState {
    /// Creates a new ticket state.
    #[must_use]
    pub const fn new(ticket: Ticket, receipt_count: i64) -> Self {
        Self {
            ticket,
            receipt_count,
        }
    }

    /// Converts the ticket to a snapshot for audit purposes.
    #[must_use]
    pub fn to_snapshot(&self) -> StateSnapshot {
        ticket_snapshot(&self.ticket)
    }
}

/// Renders the mutable part of a ticket for the audit trail.
///
/// Customer contact details are left out.
#[must_use]
pub fn ticket_snapshot(ticket: &Ticket) -> StateSnapshot {
    StateSnapshot::new(
        json!({
            "ticket_id": ticket.ticket_id,
            "status": ticket.status.as_str(),
            "technician_id": ticket.technician_id,
            "center_id": ticket.center_id,
            "appointment_date": format_date(ticket.appointment_date),
            "appointment_time_slot": ticket.appointment_time_slot,
            "version": ticket.version,
            "completed_at": ticket.completed_at,
        })
        .to_string(),
    )
}

/// The result of a successful ticket transition.
///
/// Transitions are atomic: they either succeed completely or fail without side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    /// The ticket after the transition.
    pub new_ticket: Ticket,
    /// The audit event recording this transition.
    pub audit_event: AuditEvent,
    /// An image to append alongside the ticket update.
    pub new_image: Option<TicketImage>,
}

impl TransitionResult {
    /// Returns true if the ticket's status or assignment changed.
    ///
    /// Only such transitions bump the version.
    #[must_use]
    pub fn changes_ticket(&self, before: &Ticket) -> bool {
        self.new_ticket.version != before.version
    }
}

/// A role as read inside its write transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleState {
    /// The stored role.
    pub role: Role,
    /// Number of users currently holding the role.
    pub user_count: i64,
}

impl RoleState {
    #[must_use]
    pub const fn new(role: Role, user_count: i64) -> Self {
        Self { role, user_count }
    }
}

/// Renders a role for the audit trail.
#[must_use]
pub fn role_snapshot(role: &Role) -> StateSnapshot {
    StateSnapshot::new(
        json!({
            "role_id": role.role_id,
            "name": role.name,
            "description": role.description,
            "is_system": role.is_system,
            "permissions": role.permissions,
        })
        .to_string(),
    )
}

/// The result of a role mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTransition {
    /// The role after the change, `None` once deleted.
    pub new_role: Option<Role>,
    /// The audit event recording this change.
    pub audit_event: AuditEvent,
}

/// Renders a technician for the audit trail.
#[must_use]
pub fn technician_snapshot(technician: &Technician) -> StateSnapshot {
    StateSnapshot::new(
        json!({
            "technician_id": technician.technician_id,
            "name": technician.name,
            "center_id": technician.center_id,
            "is_active": technician.is_active,
        })
        .to_string(),
    )
}

/// The result of a technician mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TechnicianTransition {
    /// The technician after the change.
    pub new_technician: Technician,
    /// The audit event recording this change.
    pub audit_event: AuditEvent,
}
