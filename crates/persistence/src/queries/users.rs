// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! User and session queries.

use diesel::SqliteConnection;
use diesel::prelude::*;

use crate::data_models::{SessionData, UserData};
use crate::diesel_schema::{sessions, users};
use crate::error::PersistenceError;

/// Diesel Queryable struct for user rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = users)]
struct UserRow {
    user_id: i64,
    email: String,
    display_name: String,
    password_hash: String,
    is_active: i32,
    created_at: String,
    last_login_at: Option<String>,
}

impl From<UserRow> for UserData {
    fn from(row: UserRow) -> Self {
        Self {
            user_id: row.user_id,
            email: row.email,
            display_name: row.display_name,
            password_hash: row.password_hash,
            is_active: row.is_active != 0,
            created_at: row.created_at,
            last_login_at: row.last_login_at,
        }
    }
}

/// Diesel Queryable struct for session rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = sessions)]
struct SessionRow {
    session_id: i64,
    session_token: String,
    user_id: i64,
    created_at: String,
    last_activity_at: String,
    expires_at: String,
}

impl From<SessionRow> for SessionData {
    fn from(row: SessionRow) -> Self {
        Self {
            session_id: row.session_id,
            session_token: row.session_token,
            user_id: row.user_id,
            created_at: row.created_at,
            last_activity_at: row.last_activity_at,
            expires_at: row.expires_at,
        }
    }
}

/// Retrieves a user by email. Emails are stored lowercase.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_user_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<UserData>, PersistenceError> {
    let normalized: String = email.trim().to_lowercase();
    let result = users::table
        .filter(users::email.eq(&normalized))
        .select(UserRow::as_select())
        .first::<UserRow>(conn);

    match result {
        Ok(row) => Ok(Some(UserData::from(row))),
        Err(diesel::result::Error::NotFound) => Ok(None),
        Err(e) => Err(PersistenceError::from(e)),
    }
}

/// Retrieves a user by ID.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_user_by_id(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Option<UserData>, PersistenceError> {
    let result = users::table
        .filter(users::user_id.eq(user_id))
        .select(UserRow::as_select())
        .first::<UserRow>(conn);

    match result {
        Ok(row) => Ok(Some(UserData::from(row))),
        Err(diesel::result::Error::NotFound) => Ok(None),
        Err(e) => Err(PersistenceError::from(e)),
    }
}

/// Lists all users ordered by ID.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_users(conn: &mut SqliteConnection) -> Result<Vec<UserData>, PersistenceError> {
    let rows: Vec<UserRow> = users::table
        .order(users::user_id.asc())
        .select(UserRow::as_select())
        .load(conn)?;
    Ok(rows.into_iter().map(UserData::from).collect())
}

/// Retrieves a session by its token.
///
/// Expiry is not checked here.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_session_by_token(
    conn: &mut SqliteConnection,
    session_token: &str,
) -> Result<Option<SessionData>, PersistenceError> {
    let result = sessions::table
        .filter(sessions::session_token.eq(session_token))
        .select(SessionRow::as_select())
        .first::<SessionRow>(conn);

    match result {
        Ok(row) => Ok(Some(SessionData::from(row))),
        Err(diesel::result::Error::NotFound) => Ok(None),
        Err(e) => Err(PersistenceError::from(e)),
    }
}

/// Verifies a password against a stored bcrypt hash.
///
/// # Errors
///
/// Returns an error if the hash is malformed.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, PersistenceError> {
    bcrypt::verify(password, password_hash)
        .map_err(|e| PersistenceError::Other(format!("Failed to verify password: {e}")))
}
