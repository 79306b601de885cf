// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Ticket and ticket image queries.

use std::str::FromStr;

use diesel::SqliteConnection;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use repairdesk::TicketState;
use repairdesk_domain::{ImageType, Ticket, TicketImage, TicketStatus, format_date, parse_date};

use crate::data_models::{Page, PageRequest, TicketFilter};
use crate::diesel_schema::{ticket_images, tickets};
use crate::error::PersistenceError;

/// Diesel Queryable struct for ticket rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = tickets)]
pub(crate) struct TicketRow {
    ticket_id: i64,
    customer_name: String,
    customer_phone_hash: String,
    address: String,
    appointment_date: String,
    appointment_time_slot: String,
    issue_description: String,
    status: String,
    technician_id: Option<i64>,
    center_id: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
    completed_at: Option<String>,
}

impl TicketRow {
    pub(crate) fn into_ticket(self) -> Result<Ticket, PersistenceError> {
        let status: TicketStatus = TicketStatus::from_str(&self.status)
            .map_err(|e| PersistenceError::ReconstructionError(e.to_string()))?;
        let appointment_date = parse_date(&self.appointment_date)
            .map_err(|e| PersistenceError::ReconstructionError(e.to_string()))?;

        Ok(Ticket {
            ticket_id: Some(self.ticket_id),
            customer_name: self.customer_name,
            customer_phone_hash: self.customer_phone_hash,
            address: self.address,
            appointment_date,
            appointment_time_slot: self.appointment_time_slot,
            issue_description: self.issue_description,
            status,
            technician_id: self.technician_id,
            center_id: self.center_id,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
        })
    }
}

/// Diesel Queryable struct for ticket image rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = ticket_images)]
struct TicketImageRow {
    image_id: i64,
    ticket_id: i64,
    image_type: String,
    file_name: String,
    file_path: String,
    mime_type: String,
    size_bytes: i64,
    checksum_sha256: String,
    uploaded_by_user_id: Option<i64>,
    uploaded_at: String,
}

impl TicketImageRow {
    fn into_image(self) -> Result<TicketImage, PersistenceError> {
        let image_type: ImageType = ImageType::from_str(&self.image_type)
            .map_err(|e| PersistenceError::ReconstructionError(e.to_string()))?;

        Ok(TicketImage {
            image_id: Some(self.image_id),
            ticket_id: self.ticket_id,
            image_type,
            file_name: self.file_name,
            file_path: self.file_path,
            mime_type: self.mime_type,
            size_bytes: self.size_bytes,
            checksum_sha256: self.checksum_sha256,
            uploaded_by_user_id: self.uploaded_by_user_id,
            uploaded_at: self.uploaded_at,
        })
    }
}

/// Retrieves a ticket by ID.
///
/// # Errors
///
/// Returns an error if the query fails or the row is malformed.
pub fn get_ticket(
    conn: &mut SqliteConnection,
    ticket_id: i64,
) -> Result<Option<Ticket>, PersistenceError> {
    let result = tickets::table
        .filter(tickets::ticket_id.eq(ticket_id))
        .select(TicketRow::as_select())
        .first::<TicketRow>(conn);

    match result {
        Ok(row) => row.into_ticket().map(Some),
        Err(diesel::result::Error::NotFound) => Ok(None),
        Err(e) => Err(PersistenceError::from(e)),
    }
}

/// Counts the `RECEIPT` images attached to a ticket.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count_receipts(conn: &mut SqliteConnection, ticket_id: i64) -> Result<i64, PersistenceError> {
    Ok(ticket_images::table
        .filter(ticket_images::ticket_id.eq(ticket_id))
        .filter(ticket_images::image_type.eq(ImageType::Receipt.as_str()))
        .count()
        .get_result(conn)?)
}

/// Loads everything a ticket command needs to validate against.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the ticket does not exist.
pub fn get_ticket_state(
    conn: &mut SqliteConnection,
    ticket_id: i64,
) -> Result<TicketState, PersistenceError> {
    let ticket: Ticket = get_ticket(conn, ticket_id)?
        .ok_or_else(|| PersistenceError::NotFound(format!("Ticket {ticket_id}")))?;
    let receipt_count: i64 = count_receipts(conn, ticket_id)?;
    Ok(TicketState::new(ticket, receipt_count))
}

fn filtered(filter: &TicketFilter) -> tickets::BoxedQuery<'_, Sqlite> {
    let mut query = tickets::table.into_boxed();
    if let Some(status) = filter.status {
        query = query.filter(tickets::status.eq(status.as_str()));
    }
    if let Some(technician_id) = filter.technician_id {
        query = query.filter(tickets::technician_id.eq(technician_id));
    }
    if let Some(center_id) = filter.center_id.as_deref() {
        query = query.filter(tickets::center_id.eq(center_id));
    }
    if let Some(from) = filter.date_from {
        query = query.filter(tickets::appointment_date.ge(format_date(from)));
    }
    if let Some(to) = filter.date_to {
        query = query.filter(tickets::appointment_date.le(format_date(to)));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern: String = format!("%{search}%");
        query = query.filter(
            tickets::customer_name
                .like(pattern.clone())
                .or(tickets::address.like(pattern.clone()))
                .or(tickets::issue_description.like(pattern)),
        );
    }
    query
}

/// Lists tickets matching `filter`, newest first.
///
/// # Errors
///
/// Returns an error if the query fails or a row is malformed.
pub fn list_tickets(
    conn: &mut SqliteConnection,
    filter: &TicketFilter,
    page: PageRequest,
) -> Result<Page<Ticket>, PersistenceError> {
    let total: i64 = filtered(filter).count().get_result(conn)?;

    let rows: Vec<TicketRow> = filtered(filter)
        .select(TicketRow::as_select())
        .order((tickets::created_at.desc(), tickets::ticket_id.desc()))
        .limit(page.limit())
        .offset(page.offset())
        .load(conn)?;

    let items: Vec<Ticket> = rows
        .into_iter()
        .map(TicketRow::into_ticket)
        .collect::<Result<_, _>>()?;

    Ok(Page {
        items,
        page: page.page,
        page_size: page.page_size,
        total,
    })
}

/// Lists the images attached to a ticket in upload order.
///
/// # Errors
///
/// Returns an error if the query fails or a row is malformed.
pub fn list_ticket_images(
    conn: &mut SqliteConnection,
    ticket_id: i64,
) -> Result<Vec<TicketImage>, PersistenceError> {
    let rows: Vec<TicketImageRow> = ticket_images::table
        .filter(ticket_images::ticket_id.eq(ticket_id))
        .order(ticket_images::image_id.asc())
        .select(TicketImageRow::as_select())
        .load(conn)?;

    rows.into_iter().map(TicketImageRow::into_image).collect()
}

/// Retrieves a single ticket image by ID.
///
/// # Errors
///
/// Returns an error if the query fails or the row is malformed.
pub fn get_ticket_image(
    conn: &mut SqliteConnection,
    image_id: i64,
) -> Result<Option<TicketImage>, PersistenceError> {
    let row: Option<TicketImageRow> = ticket_images::table
        .filter(ticket_images::image_id.eq(image_id))
        .select(TicketImageRow::as_select())
        .first(conn)
        .optional()?;

    row.map(TicketImageRow::into_image).transpose()
}

/// Returns true if an image with this checksum is already attached to the ticket.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn image_checksum_exists(
    conn: &mut SqliteConnection,
    ticket_id: i64,
    checksum_sha256: &str,
) -> Result<bool, PersistenceError> {
    let count: i64 = ticket_images::table
        .filter(ticket_images::ticket_id.eq(ticket_id))
        .filter(ticket_images::checksum_sha256.eq(checksum_sha256))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}
