// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Ticket writes.
//!
//! Every ticket change runs inside one `BEGIN IMMEDIATE` transaction: the
//! current row is read, the command is applied by the caller's closure, and
//! the new status is written with a compare-and-swap on `version` together
//! with the audit event and any new image. A failure at any step rolls the
//! whole transaction back.

use diesel::SqliteConnection;
use diesel::prelude::*;
use repairdesk::{CoreError, TicketState, TransitionResult};
use repairdesk_domain::{Ticket, TicketImage, format_date};
use tracing::{debug, info, warn};

use crate::backend::PersistenceBackend;
use crate::diesel_schema::{ticket_images, tickets};
use crate::error::{PersistenceError, TransitionError};
use crate::mutations::audit::persist_audit_event;
use crate::queries::tickets::{get_ticket_state, image_checksum_exists};

/// What a committed ticket write produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketWrite {
    /// The ticket as stored after the write.
    pub ticket: Ticket,
    /// The audit event ID.
    pub event_id: i64,
    /// The image ID, for uploads.
    pub image_id: Option<i64>,
}

/// Inserts a freshly booked ticket and its `BOOK` event.
///
/// # Errors
///
/// Returns an error if either insert fails. Nothing is written in that case.
pub fn insert_booking(
    conn: &mut SqliteConnection,
    result: &TransitionResult,
) -> Result<TicketWrite, PersistenceError> {
    conn.immediate_transaction::<_, PersistenceError, _>(|conn| {
        let ticket: &Ticket = &result.new_ticket;

        diesel::insert_into(tickets::table)
            .values((
                tickets::customer_name.eq(&ticket.customer_name),
                tickets::customer_phone_hash.eq(&ticket.customer_phone_hash),
                tickets::address.eq(&ticket.address),
                tickets::appointment_date.eq(format_date(ticket.appointment_date)),
                tickets::appointment_time_slot.eq(&ticket.appointment_time_slot),
                tickets::issue_description.eq(&ticket.issue_description),
                tickets::status.eq(ticket.status.as_str()),
                tickets::technician_id.eq(ticket.technician_id),
                tickets::center_id.eq(&ticket.center_id),
                tickets::version.eq(ticket.version),
                tickets::created_at.eq(&ticket.created_at),
                tickets::updated_at.eq(&ticket.updated_at),
                tickets::completed_at.eq(&ticket.completed_at),
            ))
            .execute(conn)?;

        let ticket_id: i64 = conn.get_last_insert_rowid()?;
        let event_id: i64 = persist_audit_event(
            conn,
            &result.audit_event.clone().with_subject_id(ticket_id),
        )?;

        let mut stored: Ticket = ticket.clone();
        stored.ticket_id = Some(ticket_id);

        info!(ticket_id, event_id, "Booked ticket");
        Ok(TicketWrite {
            ticket: stored,
            event_id,
            image_id: None,
        })
    })
}

/// Applies a change to a ticket atomically.
///
/// `transition` receives the ticket as read inside the transaction and
/// returns the new ticket plus the audit event. When the ticket changed, the
/// row is updated only if its version still equals the version that was
/// read; otherwise the write fails with `CoreError::VersionConflict`.
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `ticket_id` - The ticket to change
/// * `transition` - Applies the command to the loaded state
///
/// # Errors
///
/// Returns `TransitionError::Rejected` if the closure rejects the change or
/// the compare-and-swap loses, and `TransitionError::Persistence` if the
/// ticket is missing, the image is a duplicate or storage fails.
pub fn run_ticket_transition<F>(
    conn: &mut SqliteConnection,
    ticket_id: i64,
    transition: F,
) -> Result<TicketWrite, TransitionError>
where
    F: FnOnce(&TicketState) -> Result<TransitionResult, CoreError>,
{
    conn.immediate_transaction::<_, TransitionError, _>(|conn| {
        let state: TicketState = get_ticket_state(conn, ticket_id)?;
        let result: TransitionResult = transition(&state).inspect_err(|e| {
            warn!(ticket_id, error = %e, "Ticket transition rejected");
        })?;

        if result.changes_ticket(&state.ticket) {
            compare_and_swap(conn, ticket_id, state.ticket.version, &result.new_ticket)?;
        }

        let image_id: Option<i64> = match &result.new_image {
            Some(image) => Some(insert_image(conn, image)?),
            None => None,
        };

        let event_id: i64 = persist_audit_event(conn, &result.audit_event)?;

        info!(
            ticket_id,
            event_id,
            action = %result.audit_event.action.name,
            status = result.new_ticket.status.as_str(),
            version = result.new_ticket.version,
            "Applied ticket transition"
        );

        Ok(TicketWrite {
            ticket: result.new_ticket,
            event_id,
            image_id,
        })
    })
}

/// Writes the mutable ticket columns if the stored version still matches.
fn compare_and_swap(
    conn: &mut SqliteConnection,
    ticket_id: i64,
    expected_version: i64,
    ticket: &Ticket,
) -> Result<(), TransitionError> {
    let updated: usize = diesel::update(
        tickets::table
            .filter(tickets::ticket_id.eq(ticket_id))
            .filter(tickets::version.eq(expected_version)),
    )
    .set((
        tickets::status.eq(ticket.status.as_str()),
        tickets::technician_id.eq(ticket.technician_id),
        tickets::version.eq(ticket.version),
        tickets::updated_at.eq(&ticket.updated_at),
        tickets::completed_at.eq(&ticket.completed_at),
    ))
    .execute(conn)?;

    if updated == 0 {
        let actual: i64 = tickets::table
            .filter(tickets::ticket_id.eq(ticket_id))
            .select(tickets::version)
            .first(conn)?;
        warn!(ticket_id, expected_version, actual, "Ticket version moved");
        return Err(TransitionError::Rejected(CoreError::VersionConflict {
            ticket_id,
            expected: expected_version,
            actual,
        }));
    }

    debug!(ticket_id, version = ticket.version, "Ticket row updated");
    Ok(())
}

fn insert_image(conn: &mut SqliteConnection, image: &TicketImage) -> Result<i64, TransitionError> {
    if image_checksum_exists(conn, image.ticket_id, &image.checksum_sha256)? {
        return Err(TransitionError::Persistence(PersistenceError::Conflict(
            format!(
                "Image with checksum {} is already attached to ticket {}",
                image.checksum_sha256, image.ticket_id
            ),
        )));
    }

    diesel::insert_into(ticket_images::table)
        .values((
            ticket_images::ticket_id.eq(image.ticket_id),
            ticket_images::image_type.eq(image.image_type.as_str()),
            ticket_images::file_name.eq(&image.file_name),
            ticket_images::file_path.eq(&image.file_path),
            ticket_images::mime_type.eq(&image.mime_type),
            ticket_images::size_bytes.eq(image.size_bytes),
            ticket_images::checksum_sha256.eq(&image.checksum_sha256),
            ticket_images::uploaded_by_user_id.eq(image.uploaded_by_user_id),
            ticket_images::uploaded_at.eq(&image.uploaded_at),
        ))
        .execute(conn)?;

    let image_id: i64 = conn.get_last_insert_rowid()?;
    debug!(image_id, ticket_id = image.ticket_id, "Inserted ticket image");
    Ok(image_id)
}
