// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Start-up seeding of the permission catalog, system roles and the
//! bootstrap administrator.
//!
//! Every step is idempotent: running it against an already seeded database
//! changes nothing.

use std::collections::BTreeSet;

use diesel::SqliteConnection;
use diesel::prelude::*;
use repairdesk_domain::{PermissionCatalog, Role, SystemRole};
use tracing::info;

use crate::diesel_schema::{permissions, user_roles};
use crate::error::PersistenceError;
use crate::mutations::rbac::{grant_permissions, insert_role};
use crate::mutations::users::create_user;
use crate::queries::rbac::{get_role_by_name, role_permission_codes};
use crate::queries::users::get_user_by_email;

/// Counts produced by a seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Permission codes inserted.
    pub permissions_added: usize,
    /// System roles created.
    pub roles_created: usize,
    /// Core grants restored on existing system roles.
    pub grants_restored: usize,
}

/// Seeds the permission catalog and the system roles.
///
/// Missing permission codes are inserted. Missing system roles are created
/// with their core permission set, and existing system roles regain any core
/// grant they lack.
///
/// # Errors
///
/// Returns an error if any write fails. Nothing is written in that case.
pub fn seed_catalog(
    conn: &mut SqliteConnection,
    catalog: &PermissionCatalog,
    now: &str,
) -> Result<SeedReport, PersistenceError> {
    conn.immediate_transaction::<_, PersistenceError, _>(|conn| {
        let mut report = SeedReport::default();

        for permission in catalog.permissions() {
            report.permissions_added += diesel::insert_or_ignore_into(permissions::table)
                .values((
                    permissions::code.eq(&permission.code),
                    permissions::category.eq(&permission.category),
                    permissions::description.eq(&permission.description),
                ))
                .execute(conn)?;
        }

        for system_role in SystemRole::ALL {
            let required: Role = Role::system(system_role, catalog);
            match get_role_by_name(conn, &required.name)? {
                None => {
                    insert_role(conn, &required, now)?;
                    report.roles_created += 1;
                }
                Some(existing) => {
                    let Some(role_id) = existing.role_id else {
                        continue;
                    };
                    let held: BTreeSet<String> = role_permission_codes(conn, role_id)?;
                    let missing: BTreeSet<String> =
                        required.permissions.difference(&held).cloned().collect();
                    report.grants_restored += missing.len();
                    grant_permissions(conn, role_id, &missing)?;
                }
            }
        }

        info!(
            permissions_added = report.permissions_added,
            roles_created = report.roles_created,
            grants_restored = report.grants_restored,
            "Seeded permission catalog"
        );
        Ok(report)
    })
}

/// Creates the bootstrap administrator if no user with that email exists.
///
/// The new user holds the `admin` system role. Seed the catalog first.
///
/// # Returns
///
/// The new user ID, or `None` if the user already existed.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the `admin` role has not been seeded.
pub fn ensure_admin_user(
    conn: &mut SqliteConnection,
    email: &str,
    password: &str,
    now: &str,
) -> Result<Option<i64>, PersistenceError> {
    conn.immediate_transaction::<_, PersistenceError, _>(|conn| {
        if get_user_by_email(conn, email)?.is_some() {
            return Ok(None);
        }

        let admin_role_id: i64 = get_role_by_name(conn, SystemRole::Admin.name())?
            .and_then(|r| r.role_id)
            .ok_or_else(|| PersistenceError::NotFound(String::from("System role admin")))?;

        let user_id: i64 = create_user(conn, email, "Administrator", password, now)?;
        diesel::insert_into(user_roles::table)
            .values((
                user_roles::user_id.eq(user_id),
                user_roles::role_id.eq(admin_role_id),
            ))
            .execute(conn)?;

        info!(user_id, "Created bootstrap administrator");
        Ok(Some(user_id))
    })
}
