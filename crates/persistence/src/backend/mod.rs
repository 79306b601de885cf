// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Database backend-specific code.
//!
//! This module isolates backend-specific initialization, migration,
//! and helper functions that cannot be expressed in Diesel DSL.
//!
//! Everything else lives in `queries/` and `mutations/` and uses Diesel DSL
//! exclusively.

pub mod sqlite;

use diesel::{Connection, SqliteConnection};

use crate::error::PersistenceError;

/// Trait for backend-specific operations.
///
/// Query and mutation helpers call through this trait instead of reaching
/// for raw SQL themselves.
pub trait PersistenceBackend: Connection {
    /// Retrieves the last inserted row ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get_last_insert_rowid(&mut self) -> Result<i64, PersistenceError>;

    /// Verifies that foreign key enforcement is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if foreign key enforcement is not enabled.
    fn verify_foreign_key_enforcement(&mut self) -> Result<(), PersistenceError>;
}

impl PersistenceBackend for SqliteConnection {
    fn get_last_insert_rowid(&mut self) -> Result<i64, PersistenceError> {
        sqlite::get_last_insert_rowid(self)
    }

    fn verify_foreign_key_enforcement(&mut self) -> Result<(), PersistenceError> {
        sqlite::verify_foreign_key_enforcement(self)
    }
}
