// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Technician queries, including the load figures used by auto-assignment.

use std::collections::BTreeMap;

use diesel::SqliteConnection;
use diesel::dsl::count_star;
use diesel::prelude::*;
use repairdesk_domain::{Technician, TechnicianLoad, TicketStatus, format_date};
use time::Date;
use tracing::debug;

use crate::diesel_schema::{technicians, tickets};
use crate::error::PersistenceError;

/// Diesel Queryable struct for technician rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = technicians)]
struct TechnicianRow {
    technician_id: i64,
    name: String,
    center_id: Option<String>,
    is_active: i32,
}

impl From<TechnicianRow> for Technician {
    fn from(row: TechnicianRow) -> Self {
        Self {
            technician_id: Some(row.technician_id),
            name: row.name,
            center_id: row.center_id,
            is_active: row.is_active != 0,
        }
    }
}

/// Retrieves a technician by ID.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_technician(
    conn: &mut SqliteConnection,
    technician_id: i64,
) -> Result<Option<Technician>, PersistenceError> {
    let result = technicians::table
        .filter(technicians::technician_id.eq(technician_id))
        .select(TechnicianRow::as_select())
        .first::<TechnicianRow>(conn);

    match result {
        Ok(row) => Ok(Some(Technician::from(row))),
        Err(diesel::result::Error::NotFound) => Ok(None),
        Err(e) => Err(PersistenceError::from(e)),
    }
}

/// Lists technicians ordered by ID.
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `center_id` - Restrict to one center
/// * `include_inactive` - Whether deactivated technicians are returned
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_technicians(
    conn: &mut SqliteConnection,
    center_id: Option<&str>,
    include_inactive: bool,
) -> Result<Vec<Technician>, PersistenceError> {
    let mut query = technicians::table.into_boxed();
    if let Some(center_id) = center_id {
        query = query.filter(technicians::center_id.eq(center_id));
    }
    if !include_inactive {
        query = query.filter(technicians::is_active.eq(1));
    }

    let rows: Vec<TechnicianRow> = query
        .order(technicians::technician_id.asc())
        .select(TechnicianRow::as_select())
        .load(conn)?;

    Ok(rows.into_iter().map(Technician::from).collect())
}

/// Computes the load of every active candidate technician.
///
/// Load is the number of open (`ASSIGNED` or `IN_PROGRESS`) tickets held by
/// the technician whose appointment date lies in `[window_start, window_end]`.
/// Completed and canceled work does not count. Candidates are restricted to
/// `center_id` when one is given. Technicians with no tickets in the window
/// are returned with a load of zero.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn technician_loads(
    conn: &mut SqliteConnection,
    center_id: Option<&str>,
    window_start: Date,
    window_end: Date,
) -> Result<Vec<TechnicianLoad>, PersistenceError> {
    let candidates: Vec<Technician> = list_technicians(conn, center_id, false)?;

    let counts: Vec<(Option<i64>, i64)> = tickets::table
        .filter(tickets::technician_id.is_not_null())
        .filter(tickets::status.eq_any([
            TicketStatus::Assigned.as_str(),
            TicketStatus::InProgress.as_str(),
        ]))
        .filter(tickets::appointment_date.ge(format_date(window_start)))
        .filter(tickets::appointment_date.le(format_date(window_end)))
        .group_by(tickets::technician_id)
        .select((tickets::technician_id, count_star()))
        .load(conn)?;

    let by_technician: BTreeMap<i64, i64> = counts
        .into_iter()
        .filter_map(|(technician_id, count)| technician_id.map(|id| (id, count)))
        .collect();

    let loads: Vec<TechnicianLoad> = candidates
        .iter()
        .filter_map(|t| t.technician_id)
        .map(|technician_id| TechnicianLoad {
            technician_id,
            load: by_technician.get(&technician_id).copied().unwrap_or(0),
        })
        .collect();

    debug!(
        candidates = loads.len(),
        center_id = center_id.unwrap_or("*"),
        "Computed technician loads"
    );

    Ok(loads)
}
