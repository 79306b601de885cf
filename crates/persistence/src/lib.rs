// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Persistence layer for the repair desk back office.
//!
//! Built on Diesel over `SQLite`. Schema migrations are embedded and run
//! whenever a database is opened.
//!
//! ## Transactions
//!
//! Every state change is written together with its audit event in a single
//! `BEGIN IMMEDIATE` transaction. Ticket changes additionally update the row
//! with a compare-and-swap on `version`, so two writers that read the same
//! version cannot both commit.
//!
//! ## Testing
//!
//! Tests open isolated shared-cache in-memory databases through
//! [`Persistence::new_in_memory`]; no external infrastructure is needed.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

use diesel::SqliteConnection;
use repairdesk::{
    CoreError, RoleState, RoleTransition, TechnicianTransition, TicketState, TransitionResult,
};
use repairdesk_audit::{AuditEvent, SubjectKind};
use repairdesk_domain::{
    Permission, PermissionCatalog, Role, Technician, TechnicianLoad, Ticket, TicketImage,
};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use time::Date;

mod backend;
mod data_models;
mod diesel_schema;
mod error;
mod mutations;
mod queries;

#[cfg(test)]
mod tests;

pub use data_models::{
    AuditEventFilter, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page, PageRequest, RoleSummary,
    SessionData, TicketFilter, UserData,
};
pub use error::{PersistenceError, TransitionError};
pub use mutations::{SeedReport, TicketWrite};

use backend::PersistenceBackend;

/// Atomic counter for generating unique in-memory database names.
static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Type alias for the only supported backend.
pub type SqlitePersistence = Persistence;

/// Persistence adapter owning one database connection.
pub struct Persistence {
    pub(crate) conn: SqliteConnection,
}

impl Persistence {
    /// Creates a new persistence adapter with an in-memory `SQLite` database.
    ///
    /// Each call receives a unique shared-cache database, so tests are isolated.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new_in_memory() -> Result<Self, PersistenceError> {
        let db_id = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let db_name = format!("memdb_test_{db_id}");
        let shared_memory_url = format!("file:{db_name}?mode=memory&cache=shared");

        let mut conn: SqliteConnection = backend::sqlite::initialize_database(&shared_memory_url)?;
        backend::sqlite::verify_foreign_key_enforcement(&mut conn)?;

        Ok(Self { conn })
    }

    /// Creates a new persistence adapter with a file-based `SQLite` database.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the `SQLite` database file
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new_with_file<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path_str = path.as_ref().to_str().ok_or_else(|| {
            PersistenceError::InitializationError("Invalid database path".to_string())
        })?;

        let mut conn: SqliteConnection = backend::sqlite::initialize_database(path_str)?;
        backend::sqlite::enable_wal_mode(&mut conn)?;
        backend::sqlite::verify_foreign_key_enforcement(&mut conn)?;

        Ok(Self { conn })
    }

    /// Verifies that foreign key enforcement is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if foreign key enforcement is not enabled.
    pub fn verify_foreign_key_enforcement(&mut self) -> Result<(), PersistenceError> {
        self.conn.verify_foreign_key_enforcement()
    }

    // ========================================================================
    // Seeding
    // ========================================================================

    /// Seeds the permission catalog and the system roles.
    ///
    /// # Errors
    ///
    /// Returns an error if seeding fails.
    pub fn seed_catalog(
        &mut self,
        catalog: &PermissionCatalog,
        now: &str,
    ) -> Result<SeedReport, PersistenceError> {
        mutations::seed::seed_catalog(&mut self.conn, catalog, now)
    }

    /// Creates the bootstrap administrator if the email is not yet taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the `admin` role is missing or the insert fails.
    pub fn ensure_admin_user(
        &mut self,
        email: &str,
        password: &str,
        now: &str,
    ) -> Result<Option<i64>, PersistenceError> {
        mutations::seed::ensure_admin_user(&mut self.conn, email, password, now)
    }

    // ========================================================================
    // Tickets
    // ========================================================================

    /// Stores a booked ticket and its `BOOK` event.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn insert_booking(
        &mut self,
        result: &TransitionResult,
    ) -> Result<TicketWrite, PersistenceError> {
        mutations::tickets::insert_booking(&mut self.conn, result)
    }

    /// Applies a change to a ticket in one transaction with a version
    /// compare-and-swap.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::Rejected` if the change is refused and
    /// `TransitionError::Persistence` if storage fails.
    pub fn run_ticket_transition<F>(
        &mut self,
        ticket_id: i64,
        transition: F,
    ) -> Result<TicketWrite, TransitionError>
    where
        F: FnOnce(&TicketState) -> Result<TransitionResult, CoreError>,
    {
        mutations::tickets::run_ticket_transition(&mut self.conn, ticket_id, transition)
    }

    /// Retrieves a ticket by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_ticket(&mut self, ticket_id: i64) -> Result<Option<Ticket>, PersistenceError> {
        queries::tickets::get_ticket(&mut self.conn, ticket_id)
    }

    /// Loads a ticket with its receipt count.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the ticket does not exist.
    pub fn get_ticket_state(&mut self, ticket_id: i64) -> Result<TicketState, PersistenceError> {
        queries::tickets::get_ticket_state(&mut self.conn, ticket_id)
    }

    /// Lists tickets matching a filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_tickets(
        &mut self,
        filter: &TicketFilter,
        page: PageRequest,
    ) -> Result<Page<Ticket>, PersistenceError> {
        queries::tickets::list_tickets(&mut self.conn, filter, page)
    }

    /// Lists the images attached to a ticket.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_ticket_images(
        &mut self,
        ticket_id: i64,
    ) -> Result<Vec<TicketImage>, PersistenceError> {
        queries::tickets::list_ticket_images(&mut self.conn, ticket_id)
    }

    /// Retrieves a single ticket image by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_ticket_image(
        &mut self,
        image_id: i64,
    ) -> Result<Option<TicketImage>, PersistenceError> {
        queries::tickets::get_ticket_image(&mut self.conn, image_id)
    }

    /// Returns every event recorded for a ticket, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn ticket_events(&mut self, ticket_id: i64) -> Result<Vec<AuditEvent>, PersistenceError> {
        queries::audit::subject_timeline(&mut self.conn, SubjectKind::Ticket, ticket_id)
    }

    /// Returns true if the checksum is already attached to the ticket.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn image_checksum_exists(
        &mut self,
        ticket_id: i64,
        checksum_sha256: &str,
    ) -> Result<bool, PersistenceError> {
        queries::tickets::image_checksum_exists(&mut self.conn, ticket_id, checksum_sha256)
    }

    // ========================================================================
    // Technicians
    // ========================================================================

    /// Stores a new technician and its audit event.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn persist_technician_creation(
        &mut self,
        transition: &TechnicianTransition,
    ) -> Result<(Technician, i64), PersistenceError> {
        mutations::technicians::persist_technician_creation(&mut self.conn, transition)
    }

    /// Applies field changes to a technician in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::Rejected` if the change is refused and
    /// `TransitionError::Persistence` if storage fails.
    pub fn run_technician_update<F>(
        &mut self,
        technician_id: i64,
        transition: F,
    ) -> Result<(Technician, i64), TransitionError>
    where
        F: FnOnce(&Technician) -> Result<TechnicianTransition, CoreError>,
    {
        mutations::technicians::run_technician_update(&mut self.conn, technician_id, transition)
    }

    /// Retrieves a technician by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_technician(
        &mut self,
        technician_id: i64,
    ) -> Result<Option<Technician>, PersistenceError> {
        queries::technicians::get_technician(&mut self.conn, technician_id)
    }

    /// Lists technicians, optionally restricted to one center.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_technicians(
        &mut self,
        center_id: Option<&str>,
        include_inactive: bool,
    ) -> Result<Vec<Technician>, PersistenceError> {
        queries::technicians::list_technicians(&mut self.conn, center_id, include_inactive)
    }

    /// Computes the load of every active technician eligible for a center.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn technician_loads(
        &mut self,
        center_id: Option<&str>,
        window: (Date, Date),
    ) -> Result<Vec<TechnicianLoad>, PersistenceError> {
        queries::technicians::technician_loads(&mut self.conn, center_id, window.0, window.1)
    }

    // ========================================================================
    // Roles & Permissions
    // ========================================================================

    /// Lists the stored permission catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_permissions(&mut self) -> Result<Vec<Permission>, PersistenceError> {
        queries::rbac::list_permissions(&mut self.conn)
    }

    /// Lists all roles with user counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_roles(&mut self) -> Result<Vec<RoleSummary>, PersistenceError> {
        queries::rbac::list_roles(&mut self.conn)
    }

    /// Retrieves a role and its user count.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the role does not exist.
    pub fn get_role_state(&mut self, role_id: i64) -> Result<RoleState, PersistenceError> {
        queries::rbac::get_role_state(&mut self.conn, role_id)
    }

    /// Retrieves a role by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_role_by_name(&mut self, name: &str) -> Result<Option<Role>, PersistenceError> {
        queries::rbac::get_role_by_name(&mut self.conn, name)
    }

    /// Stores a new role and its audit event.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Conflict` if the name is taken.
    pub fn persist_role_creation(
        &mut self,
        transition: &RoleTransition,
        now: &str,
    ) -> Result<(Role, i64), PersistenceError> {
        mutations::rbac::persist_role_creation(&mut self.conn, transition, now)
    }

    /// Applies an update or deletion to a role in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::Rejected` if the change is refused and
    /// `TransitionError::Persistence` if storage fails.
    pub fn run_role_transition<F>(
        &mut self,
        role_id: i64,
        transition: F,
    ) -> Result<(Option<Role>, i64), TransitionError>
    where
        F: FnOnce(&RoleState) -> Result<RoleTransition, CoreError>,
    {
        mutations::rbac::run_role_transition(&mut self.conn, role_id, transition)
    }

    /// Lists the roles held by a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn user_roles(&mut self, user_id: i64) -> Result<Vec<Role>, PersistenceError> {
        queries::rbac::user_roles(&mut self.conn, user_id)
    }

    /// Replaces a user's role set and records the change.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the user or a role does not exist.
    pub fn replace_user_roles<F>(
        &mut self,
        user_id: i64,
        role_ids: &[i64],
        record: F,
    ) -> Result<i64, PersistenceError>
    where
        F: FnOnce(&BTreeSet<String>, &BTreeSet<String>) -> AuditEvent,
    {
        mutations::rbac::replace_user_roles(&mut self.conn, user_id, role_ids, record)
    }

    // ========================================================================
    // Users & Sessions
    // ========================================================================

    /// Creates a new active user with a bcrypt-hashed password.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Conflict` if the email is taken.
    pub fn create_user(
        &mut self,
        email: &str,
        display_name: &str,
        password: &str,
        now: &str,
    ) -> Result<i64, PersistenceError> {
        mutations::users::create_user(&mut self.conn, email, display_name, password, now)
    }

    /// Retrieves a user by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_user_by_email(&mut self, email: &str) -> Result<Option<UserData>, PersistenceError> {
        queries::users::get_user_by_email(&mut self.conn, email)
    }

    /// Retrieves a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_user_by_id(&mut self, user_id: i64) -> Result<Option<UserData>, PersistenceError> {
        queries::users::get_user_by_id(&mut self.conn, user_id)
    }

    /// Verifies a password against a stored hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the hash is malformed.
    pub fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, PersistenceError> {
        queries::users::verify_password(password, password_hash)
    }

    /// Lists all users.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_users(&mut self) -> Result<Vec<UserData>, PersistenceError> {
        queries::users::list_users(&mut self.conn)
    }

    /// Activates or deactivates a user.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the user does not exist.
    pub fn set_user_active(&mut self, user_id: i64, is_active: bool) -> Result<(), PersistenceError> {
        mutations::users::set_user_active(&mut self.conn, user_id, is_active)
    }

    /// Records a successful login.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn update_last_login(&mut self, user_id: i64, now: &str) -> Result<(), PersistenceError> {
        mutations::users::update_last_login(&mut self.conn, user_id, now)
    }

    /// Creates a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn create_session(
        &mut self,
        session_token: &str,
        user_id: i64,
        now: &str,
        expires_at: &str,
    ) -> Result<i64, PersistenceError> {
        mutations::users::create_session(&mut self.conn, session_token, user_id, now, expires_at)
    }

    /// Retrieves a session by token.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_session_by_token(
        &mut self,
        session_token: &str,
    ) -> Result<Option<SessionData>, PersistenceError> {
        queries::users::get_session_by_token(&mut self.conn, session_token)
    }

    /// Records activity on a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn update_session_activity(
        &mut self,
        session_id: i64,
        now: &str,
    ) -> Result<(), PersistenceError> {
        mutations::users::update_session_activity(&mut self.conn, session_id, now)
    }

    /// Deletes a session by token.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete_session(&mut self, session_token: &str) -> Result<(), PersistenceError> {
        mutations::users::delete_session(&mut self.conn, session_token)
    }

    /// Deletes expired sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete_expired_sessions(&mut self, now: &str) -> Result<usize, PersistenceError> {
        mutations::users::delete_expired_sessions(&mut self.conn, now)
    }

    // ========================================================================
    // Audit
    // ========================================================================

    /// Retrieves an audit event by ID.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::EventNotFound` if it does not exist.
    pub fn get_audit_event(&mut self, event_id: i64) -> Result<AuditEvent, PersistenceError> {
        queries::audit::get_audit_event(&mut self.conn, event_id)
    }

    /// Lists audit events matching a filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_audit_events(
        &mut self,
        filter: &AuditEventFilter,
        page: PageRequest,
    ) -> Result<Page<AuditEvent>, PersistenceError> {
        queries::audit::list_audit_events(&mut self.conn, filter, page)
    }
}
