// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::ticket_status::TicketStatus;
use crate::validation::ValidatedBooking;
use serde::{Deserialize, Serialize};
use time::Date;

/// A repair work order.
///
/// Created by a public booking in `BOOKED` with version 0. Tickets are never
/// deleted; every state change bumps `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Database identifier, `None` until persisted.
    pub ticket_id: Option<i64>,
    pub customer_name: String,
    /// SHA-256 hex of the phone number. The raw number is never kept.
    pub customer_phone_hash: String,
    pub address: String,
    pub appointment_date: Date,
    /// `HH:MM`
    pub appointment_time_slot: String,
    pub issue_description: String,
    pub status: TicketStatus,
    /// Only set while the status is `ASSIGNED`, `IN_PROGRESS` or `COMPLETED`.
    pub technician_id: Option<i64>,
    /// Service center the ticket belongs to, used by auto-assignment.
    pub center_id: Option<String>,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

impl Ticket {
    /// Creates a fresh `BOOKED` ticket from a validated booking.
    #[must_use]
    pub fn book(booking: ValidatedBooking, now: &str) -> Self {
        Self {
            ticket_id: None,
            customer_name: booking.customer_name,
            customer_phone_hash: booking.customer_phone_hash,
            address: booking.address,
            appointment_date: booking.appointment_date,
            appointment_time_slot: booking.appointment_time_slot,
            issue_description: booking.issue_description,
            status: TicketStatus::Booked,
            technician_id: None,
            center_id: booking.center_id,
            version: 0,
            created_at: now.to_string(),
            updated_at: now.to_string(),
            completed_at: None,
        }
    }

    /// Short customer-facing reference, e.g. `TK00000042`.
    #[must_use]
    pub fn booking_reference(&self) -> Option<String> {
        self.ticket_id.map(|id| format!("TK{id:08}"))
    }

    /// Returns true if the technician reference agrees with the status.
    #[must_use]
    pub const fn technician_consistent(&self) -> bool {
        self.technician_id.is_none() || self.status.holds_technician()
    }
}
