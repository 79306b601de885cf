// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{BookingRequest, Ticket, TicketStatus, hash_phone, validate_booking};

fn create_test_ticket() -> Ticket {
    let booking = validate_booking(&BookingRequest {
        customer_name: String::from("Zhang San"),
        customer_phone: String::from("13800138000"),
        address: String::from("1 Garden Road"),
        appointment_date: String::from("2026-05-01"),
        appointment_time_slot: String::from("09:30"),
        issue_description: String::from("Washer leaks"),
        center_id: None,
    })
    .unwrap();
    Ticket::book(booking, "2026-04-28T12:00:00Z")
}

#[test]
fn test_booked_ticket_starts_at_version_zero() {
    let ticket = create_test_ticket();
    assert_eq!(ticket.status, TicketStatus::Booked);
    assert_eq!(ticket.version, 0);
    assert_eq!(ticket.technician_id, None);
    assert_eq!(ticket.completed_at, None);
    assert_eq!(ticket.created_at, ticket.updated_at);
}

#[test]
fn test_booked_ticket_keeps_only_phone_hash() {
    let ticket = create_test_ticket();
    assert_eq!(ticket.customer_phone_hash, hash_phone("13800138000"));
    assert!(!ticket.customer_phone_hash.contains("13800138000"));
}

#[test]
fn test_booking_reference_requires_id() {
    let mut ticket = create_test_ticket();
    assert_eq!(ticket.booking_reference(), None);
    ticket.ticket_id = Some(42);
    assert_eq!(ticket.booking_reference().as_deref(), Some("TK00000042"));
}

#[test]
fn test_technician_consistency() {
    let mut ticket = create_test_ticket();
    assert!(ticket.technician_consistent());
    ticket.technician_id = Some(1);
    assert!(!ticket.technician_consistent());
    ticket.status = TicketStatus::Assigned;
    assert!(ticket.technician_consistent());
}
