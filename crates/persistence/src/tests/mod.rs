// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod rbac_tests;

use crate::{Persistence, SqlitePersistence, TicketWrite};
use repairdesk::{TechnicianTransition, apply, apply_booking, apply_technician_creation};
use repairdesk::{TicketCommand, TransitionResult};
use repairdesk_audit::{Actor, Cause};
use repairdesk_domain::{
    BookingRequest, ImageType, PermissionCatalog, Technician, Ticket, TicketImage,
    validate_booking,
};

pub const NOW: &str = "2026-03-02T09:00:00Z";
pub const LATER: &str = "2026-03-02T10:00:00Z";

/// A seeded in-memory database with one staff user.
pub fn setup() -> (SqlitePersistence, i64) {
    let mut persistence = Persistence::new_in_memory().unwrap();
    persistence
        .seed_catalog(&PermissionCatalog::standard(), NOW)
        .unwrap();
    let user_id = persistence
        .create_user("agent@example.com", "Agent", "password123", NOW)
        .unwrap();
    (persistence, user_id)
}

pub fn create_test_actor(user_id: i64) -> Actor {
    Actor::user(user_id, "agent@example.com")
}

pub fn create_test_cause() -> Cause {
    Cause::new(String::from("req-1"), String::from("Test request"))
}

pub fn booking_request(customer_name: &str, appointment_date: &str) -> BookingRequest {
    BookingRequest {
        customer_name: customer_name.to_string(),
        customer_phone: String::from("+1 555 0100"),
        address: String::from("1 Main Street"),
        appointment_date: appointment_date.to_string(),
        appointment_time_slot: String::from("09:30"),
        issue_description: String::from("Washing machine leaks"),
        center_id: Some(String::from("north")),
    }
}

pub fn book_ticket(persistence: &mut Persistence, customer_name: &str, date: &str) -> Ticket {
    let booking = validate_booking(&booking_request(customer_name, date)).unwrap();
    let result: TransitionResult = apply_booking(booking, Actor::public(), create_test_cause(), NOW);
    persistence.insert_booking(&result).unwrap().ticket
}

pub fn create_technician(persistence: &mut Persistence, name: &str, center: &str) -> Technician {
    let transition: TechnicianTransition = apply_technician_creation(
        name,
        Some(center.to_string()),
        Actor::system(),
        create_test_cause(),
        NOW,
    )
    .unwrap();
    persistence.persist_technician_creation(&transition).unwrap().0
}

pub fn test_image(image_type: ImageType, checksum: &str, user_id: i64) -> TicketImage {
    TicketImage {
        image_id: None,
        ticket_id: 0,
        image_type,
        file_name: String::from("receipt.jpg"),
        file_path: format!("tickets/1/{checksum}.jpg"),
        mime_type: String::from("image/jpeg"),
        size_bytes: 2048,
        checksum_sha256: checksum.to_string(),
        uploaded_by_user_id: Some(user_id),
        uploaded_at: NOW.to_string(),
    }
}

/// Runs one command against a stored ticket.
pub fn run(
    persistence: &mut Persistence,
    ticket_id: i64,
    user_id: i64,
    command: TicketCommand,
) -> Result<TicketWrite, crate::TransitionError> {
    persistence.run_ticket_transition(ticket_id, |state| {
        apply(
            state,
            command,
            create_test_actor(user_id),
            create_test_cause(),
            LATER,
        )
    })
}
