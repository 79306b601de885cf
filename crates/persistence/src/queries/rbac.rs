// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Role, permission and role-membership queries.

use std::collections::{BTreeMap, BTreeSet};

use diesel::SqliteConnection;
use diesel::dsl::count_star;
use diesel::prelude::*;
use repairdesk::RoleState;
use repairdesk_domain::{Permission, Role};

use crate::data_models::RoleSummary;
use crate::diesel_schema::{permissions, role_permissions, roles, user_roles};
use crate::error::PersistenceError;

/// Diesel Queryable struct for role rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = roles)]
struct RoleRow {
    role_id: i64,
    name: String,
    description: String,
    is_system: i32,
}

impl RoleRow {
    fn into_role(self, permissions: BTreeSet<String>) -> Role {
        Role {
            role_id: Some(self.role_id),
            name: self.name,
            description: self.description,
            is_system: self.is_system != 0,
            permissions,
        }
    }
}

/// Diesel Queryable struct for permission rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = permissions)]
struct PermissionRow {
    code: String,
    category: String,
    description: String,
}

/// Lists the stored permission catalog ordered by category then code.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_permissions(conn: &mut SqliteConnection) -> Result<Vec<Permission>, PersistenceError> {
    let rows: Vec<PermissionRow> = permissions::table
        .order((permissions::category.asc(), permissions::code.asc()))
        .select(PermissionRow::as_select())
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|row| Permission {
            code: row.code,
            category: row.category,
            description: row.description,
        })
        .collect())
}

/// Loads the permission codes granted by one role.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn role_permission_codes(
    conn: &mut SqliteConnection,
    role_id: i64,
) -> Result<BTreeSet<String>, PersistenceError> {
    let codes: Vec<String> = role_permissions::table
        .filter(role_permissions::role_id.eq(role_id))
        .select(role_permissions::permission_code)
        .load(conn)?;
    Ok(codes.into_iter().collect())
}

/// Loads the permission codes for several roles in one query.
fn permissions_by_role(
    conn: &mut SqliteConnection,
    role_ids: &[i64],
) -> Result<BTreeMap<i64, BTreeSet<String>>, PersistenceError> {
    let pairs: Vec<(i64, String)> = role_permissions::table
        .filter(role_permissions::role_id.eq_any(role_ids))
        .select((role_permissions::role_id, role_permissions::permission_code))
        .load(conn)?;

    let mut grouped: BTreeMap<i64, BTreeSet<String>> = BTreeMap::new();
    for (role_id, code) in pairs {
        grouped.entry(role_id).or_default().insert(code);
    }
    Ok(grouped)
}

fn attach_permissions(
    conn: &mut SqliteConnection,
    rows: Vec<RoleRow>,
) -> Result<Vec<Role>, PersistenceError> {
    let role_ids: Vec<i64> = rows.iter().map(|r| r.role_id).collect();
    let mut grouped = permissions_by_role(conn, &role_ids)?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let codes = grouped.remove(&row.role_id).unwrap_or_default();
            row.into_role(codes)
        })
        .collect())
}

/// Retrieves a role with its permissions.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_role(conn: &mut SqliteConnection, role_id: i64) -> Result<Option<Role>, PersistenceError> {
    let result = roles::table
        .filter(roles::role_id.eq(role_id))
        .select(RoleRow::as_select())
        .first::<RoleRow>(conn);

    match result {
        Ok(row) => {
            let codes = role_permission_codes(conn, row.role_id)?;
            Ok(Some(row.into_role(codes)))
        }
        Err(diesel::result::Error::NotFound) => Ok(None),
        Err(e) => Err(PersistenceError::from(e)),
    }
}

/// Retrieves a role by its unique name.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_role_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<Role>, PersistenceError> {
    let result = roles::table
        .filter(roles::name.eq(name))
        .select(RoleRow::as_select())
        .first::<RoleRow>(conn);

    match result {
        Ok(row) => {
            let codes = role_permission_codes(conn, row.role_id)?;
            Ok(Some(row.into_role(codes)))
        }
        Err(diesel::result::Error::NotFound) => Ok(None),
        Err(e) => Err(PersistenceError::from(e)),
    }
}

/// Counts the users holding a role.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count_role_users(conn: &mut SqliteConnection, role_id: i64) -> Result<i64, PersistenceError> {
    Ok(user_roles::table
        .filter(user_roles::role_id.eq(role_id))
        .count()
        .get_result(conn)?)
}

/// Loads a role and its user count for a role mutation.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the role does not exist.
pub fn get_role_state(
    conn: &mut SqliteConnection,
    role_id: i64,
) -> Result<RoleState, PersistenceError> {
    let role: Role = get_role(conn, role_id)?
        .ok_or_else(|| PersistenceError::NotFound(format!("Role {role_id}")))?;
    let user_count: i64 = count_role_users(conn, role_id)?;
    Ok(RoleState::new(role, user_count))
}

/// Lists every role with its permissions and user count, ordered by ID.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_roles(conn: &mut SqliteConnection) -> Result<Vec<RoleSummary>, PersistenceError> {
    let rows: Vec<RoleRow> = roles::table
        .order(roles::role_id.asc())
        .select(RoleRow::as_select())
        .load(conn)?;
    let roles: Vec<Role> = attach_permissions(conn, rows)?;

    let counts: BTreeMap<i64, i64> = user_roles::table
        .group_by(user_roles::role_id)
        .select((user_roles::role_id, count_star()))
        .load::<(i64, i64)>(conn)?
        .into_iter()
        .collect();

    Ok(roles
        .into_iter()
        .map(|role| {
            let user_count = role
                .role_id
                .and_then(|id| counts.get(&id).copied())
                .unwrap_or(0);
            RoleSummary { role, user_count }
        })
        .collect())
}

/// Lists the roles held by a user, with their permissions.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn user_roles(conn: &mut SqliteConnection, user_id: i64) -> Result<Vec<Role>, PersistenceError> {
    let rows: Vec<RoleRow> = roles::table
        .inner_join(user_roles::table)
        .filter(user_roles::user_id.eq(user_id))
        .order(roles::role_id.asc())
        .select(RoleRow::as_select())
        .load(conn)?;
    attach_permissions(conn, rows)
}

/// Returns how many of `role_ids` exist.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count_existing_roles(
    conn: &mut SqliteConnection,
    role_ids: &[i64],
) -> Result<i64, PersistenceError> {
    Ok(roles::table
        .filter(roles::role_id.eq_any(role_ids))
        .count()
        .get_result(conn)?)
}
