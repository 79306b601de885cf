// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! User and session mutations.

use diesel::SqliteConnection;
use diesel::prelude::*;
use tracing::{debug, info};

use crate::backend::PersistenceBackend;
use crate::diesel_schema::{sessions, users};
use crate::error::PersistenceError;

/// Creates a new active user.
///
/// The email is normalized to lowercase for case-insensitive uniqueness.
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `email` - The login email (will be normalized)
/// * `display_name` - The display name
/// * `password` - The plain-text password (will be hashed)
/// * `now` - The creation timestamp
///
/// # Errors
///
/// Returns `PersistenceError::Conflict` if the email already exists.
pub fn create_user(
    conn: &mut SqliteConnection,
    email: &str,
    display_name: &str,
    password: &str,
    now: &str,
) -> Result<i64, PersistenceError> {
    let normalized_email: String = email.trim().to_lowercase();

    info!(email = %normalized_email, "Creating user");

    let password_hash: String = bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| PersistenceError::Other(format!("Failed to hash password: {e}")))?;

    diesel::insert_into(users::table)
        .values((
            users::email.eq(&normalized_email),
            users::display_name.eq(display_name.trim()),
            users::password_hash.eq(&password_hash),
            users::is_active.eq(1),
            users::created_at.eq(now),
        ))
        .execute(conn)?;

    let user_id: i64 = conn.get_last_insert_rowid()?;
    info!(user_id, "User created");

    Ok(user_id)
}

/// Records a successful login.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub fn update_last_login(
    conn: &mut SqliteConnection,
    user_id: i64,
    now: &str,
) -> Result<(), PersistenceError> {
    debug!(user_id, "Updating last_login_at");

    diesel::update(users::table.filter(users::user_id.eq(user_id)))
        .set(users::last_login_at.eq(Some(now)))
        .execute(conn)?;
    Ok(())
}

/// Activates or deactivates a user. Deactivation also ends their sessions.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the user does not exist.
pub fn set_user_active(
    conn: &mut SqliteConnection,
    user_id: i64,
    is_active: bool,
) -> Result<(), PersistenceError> {
    conn.immediate_transaction::<_, PersistenceError, _>(|conn| {
        let updated: usize = diesel::update(users::table.filter(users::user_id.eq(user_id)))
            .set(users::is_active.eq(i32::from(is_active)))
            .execute(conn)?;
        if updated == 0 {
            return Err(PersistenceError::NotFound(format!("User {user_id}")));
        }
        if !is_active {
            delete_sessions_for_user(conn, user_id)?;
        }
        info!(user_id, is_active, "Changed user active flag");
        Ok(())
    })
}

/// Creates a new session.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn create_session(
    conn: &mut SqliteConnection,
    session_token: &str,
    user_id: i64,
    now: &str,
    expires_at: &str,
) -> Result<i64, PersistenceError> {
    diesel::insert_into(sessions::table)
        .values((
            sessions::session_token.eq(session_token),
            sessions::user_id.eq(user_id),
            sessions::created_at.eq(now),
            sessions::last_activity_at.eq(now),
            sessions::expires_at.eq(expires_at),
        ))
        .execute(conn)?;

    let session_id: i64 = conn.get_last_insert_rowid()?;
    debug!(session_id, user_id, "Created session");
    Ok(session_id)
}

/// Records activity on a session.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn update_session_activity(
    conn: &mut SqliteConnection,
    session_id: i64,
    now: &str,
) -> Result<(), PersistenceError> {
    diesel::update(sessions::table.filter(sessions::session_id.eq(session_id)))
        .set(sessions::last_activity_at.eq(now))
        .execute(conn)?;
    Ok(())
}

/// Deletes a session by token. Deleting an unknown token is not an error.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_session(
    conn: &mut SqliteConnection,
    session_token: &str,
) -> Result<(), PersistenceError> {
    let deleted: usize =
        diesel::delete(sessions::table.filter(sessions::session_token.eq(session_token)))
            .execute(conn)?;
    debug!(deleted, "Deleted session");
    Ok(())
}

/// Deletes every session that expired at or before `now`.
///
/// # Returns
///
/// The number of sessions removed.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_expired_sessions(
    conn: &mut SqliteConnection,
    now: &str,
) -> Result<usize, PersistenceError> {
    let deleted: usize = diesel::delete(sessions::table.filter(sessions::expires_at.le(now)))
        .execute(conn)?;
    if deleted > 0 {
        info!(deleted, "Purged expired sessions");
    }
    Ok(deleted)
}

/// Deletes all sessions of a user.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_sessions_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<usize, PersistenceError> {
    Ok(diesel::delete(sessions::table.filter(sessions::user_id.eq(user_id))).execute(conn)?)
}
