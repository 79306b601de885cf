// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! `SQLite` initialization, migrations and the few helpers Diesel has no DSL for.

use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer};
use diesel::{Connection, RunQueryDsl, SqliteConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

use crate::error::PersistenceError;

/// Embedded schema migrations.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// How long a writer waits for the database lock before failing, in milliseconds.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Helper row struct for PRAGMA queries.
#[derive(QueryableByName)]
struct PragmaRow {
    #[diesel(sql_type = Integer)]
    foreign_keys: i32,
}

/// Returns the rowid of the most recent insert on this connection.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_last_insert_rowid(conn: &mut SqliteConnection) -> Result<i64, PersistenceError> {
    Ok(diesel::select(sql::<BigInt>("last_insert_rowid()")).get_result(conn)?)
}

/// Verifies that foreign key enforcement is enabled.
///
/// # Errors
///
/// Returns an error if foreign key enforcement is not enabled.
pub fn verify_foreign_key_enforcement(conn: &mut SqliteConnection) -> Result<(), PersistenceError> {
    // NOTE: Diesel has no PRAGMA DSL
    let foreign_keys_enabled: i32 = diesel::sql_query("PRAGMA foreign_keys")
        .get_result::<PragmaRow>(conn)?
        .foreign_keys;

    if foreign_keys_enabled == 0 {
        return Err(PersistenceError::ForeignKeyEnforcementNotEnabled);
    }

    info!("SQLite foreign key enforcement is enabled");
    Ok(())
}

/// Run pending migrations on the provided connection.
///
/// # Errors
///
/// Returns an error if migration execution fails.
pub fn run_migrations(
    conn: &mut SqliteConnection,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Running SQLite database migrations");
    conn.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

/// Opens a `SQLite` database at the given URL, configures it and runs migrations.
///
/// # Arguments
///
/// * `database_url` - A file path or `file:` URI
///
/// # Errors
///
/// Returns an error if connection or migration fails.
pub fn initialize_database(database_url: &str) -> Result<SqliteConnection, PersistenceError> {
    info!("Initializing SQLite database at: {}", database_url);

    let mut conn: SqliteConnection = SqliteConnection::establish(database_url)
        .map_err(|e| PersistenceError::DatabaseConnectionFailed(e.to_string()))?;

    diesel::sql_query("PRAGMA foreign_keys = ON")
        .execute(&mut conn)
        .map_err(|e| PersistenceError::QueryFailed(e.to_string()))?;

    diesel::sql_query(format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}"))
        .execute(&mut conn)
        .map_err(|e| PersistenceError::QueryFailed(e.to_string()))?;

    run_migrations(&mut conn).map_err(|e| PersistenceError::MigrationFailed(e.to_string()))?;

    Ok(conn)
}

/// Enables WAL journaling for file-based databases.
///
/// # Errors
///
/// Returns an error if the PRAGMA statement fails.
pub fn enable_wal_mode(conn: &mut SqliteConnection) -> Result<(), PersistenceError> {
    diesel::sql_query("PRAGMA journal_mode = WAL")
        .execute(conn)
        .map_err(|e| PersistenceError::QueryFailed(e.to_string()))?;
    Ok(())
}
