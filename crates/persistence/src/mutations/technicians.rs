// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Technician writes.

use diesel::SqliteConnection;
use diesel::prelude::*;
use repairdesk::{CoreError, TechnicianTransition};
use repairdesk_domain::Technician;
use tracing::{info, warn};

use crate::backend::PersistenceBackend;
use crate::diesel_schema::technicians;
use crate::error::{PersistenceError, TransitionError};
use crate::mutations::audit::persist_audit_event;
use crate::queries::technicians::get_technician;

/// Persists a new technician and its `TECHNICIAN_CREATE` event.
///
/// # Returns
///
/// The stored technician, with its ID, and the event ID.
///
/// # Errors
///
/// Returns an error if either insert fails.
pub fn persist_technician_creation(
    conn: &mut SqliteConnection,
    transition: &TechnicianTransition,
) -> Result<(Technician, i64), PersistenceError> {
    conn.immediate_transaction::<_, PersistenceError, _>(|conn| {
        let technician: &Technician = &transition.new_technician;

        diesel::insert_into(technicians::table)
            .values((
                technicians::name.eq(&technician.name),
                technicians::center_id.eq(&technician.center_id),
                technicians::is_active.eq(i32::from(technician.is_active)),
                technicians::created_at.eq(&transition.audit_event.created_at),
            ))
            .execute(conn)?;

        let technician_id: i64 = conn.get_last_insert_rowid()?;
        let event_id: i64 = persist_audit_event(
            conn,
            &transition.audit_event.clone().with_subject_id(technician_id),
        )?;

        let mut stored: Technician = technician.clone();
        stored.technician_id = Some(technician_id);

        info!(technician_id, event_id, "Created technician");
        Ok((stored, event_id))
    })
}

/// Applies field changes to a technician atomically.
///
/// # Errors
///
/// Returns `TransitionError::Rejected` if the closure rejects the change and
/// `TransitionError::Persistence` if the technician is missing or storage fails.
pub fn run_technician_update<F>(
    conn: &mut SqliteConnection,
    technician_id: i64,
    transition: F,
) -> Result<(Technician, i64), TransitionError>
where
    F: FnOnce(&Technician) -> Result<TechnicianTransition, CoreError>,
{
    conn.immediate_transaction::<_, TransitionError, _>(|conn| {
        let current: Technician = get_technician(conn, technician_id)?.ok_or_else(|| {
            PersistenceError::NotFound(format!("Technician {technician_id}"))
        })?;
        let result: TechnicianTransition = transition(&current).inspect_err(|e| {
            warn!(technician_id, error = %e, "Technician update rejected");
        })?;

        let updated: &Technician = &result.new_technician;
        diesel::update(technicians::table.filter(technicians::technician_id.eq(technician_id)))
            .set((
                technicians::name.eq(&updated.name),
                technicians::center_id.eq(&updated.center_id),
                technicians::is_active.eq(i32::from(updated.is_active)),
            ))
            .execute(conn)?;

        let event_id: i64 = persist_audit_event(conn, &result.audit_event)?;
        info!(technician_id, event_id, is_active = updated.is_active, "Updated technician");

        Ok((result.new_technician, event_id))
    })
}
