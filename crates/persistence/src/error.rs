// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use repairdesk::CoreError;

/// Errors that can occur during persistence operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// A database error occurred.
    DatabaseError(String),
    /// Database connection failed.
    DatabaseConnectionFailed(String),
    /// Database migration failed.
    MigrationFailed(String),
    /// Query execution failed.
    QueryFailed(String),
    /// The requested event was not found.
    EventNotFound(i64),
    /// A stored row could not be turned back into a domain value.
    ReconstructionError(String),
    /// Serialization/deserialization error.
    SerializationError(String),
    /// Initialization error.
    InitializationError(String),
    /// Foreign key enforcement is not enabled.
    ForeignKeyEnforcementNotEnabled,
    /// The requested session was not found.
    SessionNotFound(String),
    /// Session has expired.
    SessionExpired(String),
    /// A uniqueness constraint was violated.
    Conflict(String),
    /// The requested resource was not found.
    NotFound(String),
    /// A general error occurred.
    Other(String),
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::DatabaseConnectionFailed(msg) => {
                write!(f, "Database connection failed: {msg}")
            }
            Self::MigrationFailed(msg) => write!(f, "Migration failed: {msg}"),
            Self::QueryFailed(msg) => write!(f, "Query failed: {msg}"),
            Self::EventNotFound(id) => write!(f, "Event not found: {id}"),
            Self::ReconstructionError(msg) => write!(f, "Reconstruction error: {msg}"),
            Self::SerializationError(msg) => write!(f, "Serialization error: {msg}"),
            Self::InitializationError(msg) => write!(f, "Initialization error: {msg}"),
            Self::ForeignKeyEnforcementNotEnabled => {
                write!(f, "Foreign key enforcement is not enabled")
            }
            Self::SessionNotFound(msg) => write!(f, "Session not found: {msg}"),
            Self::SessionExpired(msg) => write!(f, "Session expired: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<diesel::result::Error> for PersistenceError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => Self::NotFound("Record not found".to_string()),
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => Self::Conflict(info.message().to_string()),
            _ => Self::DatabaseError(err.to_string()),
        }
    }
}

impl From<diesel::ConnectionError> for PersistenceError {
    fn from(err: diesel::ConnectionError) -> Self {
        Self::DatabaseConnectionFailed(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Why a transactional mutation did not commit.
///
/// Either the core rules rejected the change, or the database did.
/// Nothing is written in both cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The state transition was rejected.
    Rejected(CoreError),
    /// Storage failed.
    Persistence(PersistenceError),
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for TransitionError {}

impl From<CoreError> for TransitionError {
    fn from(err: CoreError) -> Self {
        Self::Rejected(err)
    }
}

impl From<PersistenceError> for TransitionError {
    fn from(err: PersistenceError) -> Self {
        Self::Persistence(err)
    }
}

impl From<diesel::result::Error> for TransitionError {
    fn from(err: diesel::result::Error) -> Self {
        Self::Persistence(PersistenceError::from(err))
    }
}

impl From<serde_json::Error> for TransitionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(PersistenceError::from(err))
    }
}
