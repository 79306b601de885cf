// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Role and role-membership writes.

use std::collections::BTreeSet;

use diesel::SqliteConnection;
use diesel::prelude::*;
use num_traits::ToPrimitive;
use repairdesk::{CoreError, RoleState, RoleTransition};
use repairdesk_audit::AuditEvent;
use repairdesk_domain::Role;
use tracing::{info, warn};

use crate::backend::PersistenceBackend;
use crate::diesel_schema::{role_permissions, roles, user_roles};
use crate::error::{PersistenceError, TransitionError};
use crate::mutations::audit::persist_audit_event;
use crate::queries::rbac::{count_existing_roles, get_role_state, user_roles as load_user_roles};
use crate::queries::users::get_user_by_id;

/// Inserts a role row and its permission grants, returning the role ID.
pub(crate) fn insert_role(
    conn: &mut SqliteConnection,
    role: &Role,
    now: &str,
) -> Result<i64, PersistenceError> {
    diesel::insert_into(roles::table)
        .values((
            roles::name.eq(&role.name),
            roles::description.eq(&role.description),
            roles::is_system.eq(i32::from(role.is_system)),
            roles::created_at.eq(now),
            roles::updated_at.eq(now),
        ))
        .execute(conn)?;
    let role_id: i64 = conn.get_last_insert_rowid()?;

    grant_permissions(conn, role_id, &role.permissions)?;
    Ok(role_id)
}

/// Adds permission grants to a role.
pub(crate) fn grant_permissions(
    conn: &mut SqliteConnection,
    role_id: i64,
    codes: &BTreeSet<String>,
) -> Result<(), PersistenceError> {
    let rows: Vec<_> = codes
        .iter()
        .map(|code| {
            (
                role_permissions::role_id.eq(role_id),
                role_permissions::permission_code.eq(code),
            )
        })
        .collect();
    if !rows.is_empty() {
        diesel::insert_into(role_permissions::table)
            .values(rows)
            .execute(conn)?;
    }
    Ok(())
}

/// Persists a newly created role and its `ROLE_CREATE` event.
///
/// # Returns
///
/// The stored role, with its ID, and the event ID.
///
/// # Errors
///
/// Returns `PersistenceError::Conflict` if the name is taken.
pub fn persist_role_creation(
    conn: &mut SqliteConnection,
    transition: &RoleTransition,
    now: &str,
) -> Result<(Role, i64), PersistenceError> {
    let Some(role) = transition.new_role.as_ref() else {
        return Err(PersistenceError::Other(String::from(
            "Role creation carries no role",
        )));
    };

    conn.immediate_transaction::<_, PersistenceError, _>(|conn| {
        let role_id: i64 = insert_role(conn, role, now)?;
        let event_id: i64 = persist_audit_event(
            conn,
            &transition.audit_event.clone().with_subject_id(role_id),
        )?;

        let mut stored: Role = role.clone();
        stored.role_id = Some(role_id);

        info!(role_id, event_id, name = %stored.name, "Created role");
        Ok((stored, event_id))
    })
}

/// Applies an update or deletion to a role atomically.
///
/// The closure receives the role and its current user count as read inside
/// the transaction.
///
/// # Returns
///
/// The role after the change (`None` once deleted) and the event ID.
///
/// # Errors
///
/// Returns `TransitionError::Rejected` if the closure rejects the change,
/// and `TransitionError::Persistence` if the role is missing, the new name
/// is taken or storage fails.
pub fn run_role_transition<F>(
    conn: &mut SqliteConnection,
    role_id: i64,
    transition: F,
) -> Result<(Option<Role>, i64), TransitionError>
where
    F: FnOnce(&RoleState) -> Result<RoleTransition, CoreError>,
{
    conn.immediate_transaction::<_, TransitionError, _>(|conn| {
        let state: RoleState = get_role_state(conn, role_id)?;
        let result: RoleTransition = transition(&state).inspect_err(|e| {
            warn!(role_id, error = %e, "Role change rejected");
        })?;

        match &result.new_role {
            Some(updated) => {
                diesel::update(roles::table.filter(roles::role_id.eq(role_id)))
                    .set((
                        roles::name.eq(&updated.name),
                        roles::description.eq(&updated.description),
                        roles::updated_at.eq(&result.audit_event.created_at),
                    ))
                    .execute(conn)?;

                if updated.permissions != state.role.permissions {
                    diesel::delete(
                        role_permissions::table.filter(role_permissions::role_id.eq(role_id)),
                    )
                    .execute(conn)?;
                    grant_permissions(conn, role_id, &updated.permissions)?;
                }
                info!(role_id, name = %updated.name, "Updated role");
            }
            None => {
                diesel::delete(roles::table.filter(roles::role_id.eq(role_id))).execute(conn)?;
                info!(role_id, name = %state.role.name, "Deleted role");
            }
        }

        let event_id: i64 = persist_audit_event(conn, &result.audit_event)?;

        Ok((result.new_role, event_id))
    })
}

/// Replaces the full role set of a user.
///
/// `record` receives the role names held before and after and returns the
/// audit event to store.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the user or any role does not exist.
pub fn replace_user_roles<F>(
    conn: &mut SqliteConnection,
    user_id: i64,
    role_ids: &[i64],
    record: F,
) -> Result<i64, PersistenceError>
where
    F: FnOnce(&BTreeSet<String>, &BTreeSet<String>) -> AuditEvent,
{
    let unique: BTreeSet<i64> = role_ids.iter().copied().collect();
    let role_ids: Vec<i64> = unique.into_iter().collect();

    conn.immediate_transaction::<_, PersistenceError, _>(|conn| {
        if get_user_by_id(conn, user_id)?.is_none() {
            return Err(PersistenceError::NotFound(format!("User {user_id}")));
        }
        let existing: i64 = count_existing_roles(conn, &role_ids)?;
        if existing.to_usize() != Some(role_ids.len()) {
            return Err(PersistenceError::NotFound(String::from(
                "One or more roles do not exist",
            )));
        }

        let before: BTreeSet<String> = load_user_roles(conn, user_id)?
            .into_iter()
            .map(|r| r.name)
            .collect();

        diesel::delete(user_roles::table.filter(user_roles::user_id.eq(user_id))).execute(conn)?;
        let rows: Vec<_> = role_ids
            .iter()
            .map(|role_id| {
                (
                    user_roles::user_id.eq(user_id),
                    user_roles::role_id.eq(*role_id),
                )
            })
            .collect();
        if !rows.is_empty() {
            diesel::insert_into(user_roles::table)
                .values(rows)
                .execute(conn)?;
        }

        let after: BTreeSet<String> = load_user_roles(conn, user_id)?
            .into_iter()
            .map(|r| r.name)
            .collect();

        let event_id: i64 = persist_audit_event(conn, &record(&before, &after))?;
        info!(user_id, event_id, roles = after.len(), "Replaced user roles");
        Ok(event_id)
    })
}
