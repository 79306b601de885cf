// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::TicketState;
use repairdesk_audit::{Actor, Cause};
use repairdesk_domain::{
    ImageType, Technician, Ticket, TicketImage, TicketStatus, hash_phone,
};
use time::macros::date;

pub const NOW: &str = "2026-03-02T09:00:00Z";

pub fn create_test_actor() -> Actor {
    Actor::user(1, "agent@example.com")
}

pub fn create_test_cause() -> Cause {
    Cause::new(String::from("req-456"), String::from("Agent request"))
}

pub fn create_test_ticket(status: TicketStatus, version: i64) -> Ticket {
    Ticket {
        ticket_id: Some(10),
        customer_name: String::from("Zhang San"),
        customer_phone_hash: hash_phone("13800138000"),
        address: String::from("1 Garden Road"),
        appointment_date: date!(2026 - 03 - 05),
        appointment_time_slot: String::from("10:00"),
        issue_description: String::from("Washer leaks"),
        status,
        technician_id: if status.holds_technician() {
            Some(5)
        } else {
            None
        },
        center_id: Some(String::from("north")),
        version,
        created_at: String::from("2026-03-01T08:00:00Z"),
        updated_at: String::from("2026-03-01T08:00:00Z"),
        completed_at: None,
    }
}

pub fn create_test_state(status: TicketStatus, version: i64) -> TicketState {
    TicketState::new(create_test_ticket(status, version), 0)
}

pub fn create_test_technician(technician_id: i64) -> Technician {
    Technician {
        technician_id: Some(technician_id),
        name: format!("Tech {technician_id}"),
        center_id: Some(String::from("north")),
        is_active: true,
    }
}

pub fn create_test_image(image_type: ImageType) -> TicketImage {
    TicketImage {
        image_id: None,
        ticket_id: 0,
        image_type,
        file_name: String::from("receipt.jpg"),
        file_path: String::from("tickets/10/abc.jpg"),
        mime_type: String::from("image/jpeg"),
        size_bytes: 2048,
        checksum_sha256: String::from("ab12"),
        uploaded_by_user_id: Some(1),
        uploaded_at: String::from(NOW),
    }
}
