// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Authentication and authorization services.
//!
//! Staff authenticate with email and password and receive a random session
//! token. Every later call resolves the token to an [`AuthenticatedUser`]
//! carrying the effective permission set, which [`AuthorizationService`]
//! checks before any protected operation runs.

use std::collections::BTreeSet;

use repairdesk_audit::Actor;
use repairdesk_domain::{
    PermissionMode, Role, aggregate_permissions, format_timestamp, missing_permissions,
    parse_timestamp,
};
use repairdesk_persistence::{PersistenceError, SessionData, SqlitePersistence, UserData};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::error::AuthError;

/// A staff user resolved from a valid session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The user's ID.
    pub user_id: i64,
    /// The normalized email.
    pub email: String,
    /// The display name.
    pub display_name: String,
    /// Names of the roles the user holds.
    pub roles: Vec<String>,
    /// Union of the permissions of every held role.
    pub permissions: BTreeSet<String>,
}

impl AuthenticatedUser {
    /// Builds the user context from a stored account and its roles.
    #[must_use]
    pub fn from_roles(user: &UserData, roles: &[Role]) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            roles: roles.iter().map(|r| r.name.clone()).collect(),
            permissions: aggregate_permissions(roles),
        }
    }

    /// Returns true if the user holds `code`.
    #[must_use]
    pub fn has_permission(&self, code: &str) -> bool {
        self.permissions.contains(code)
    }

    /// Converts this user into the audit actor recorded on their changes.
    #[must_use]
    pub fn to_audit_actor(&self) -> Actor {
        Actor::user(self.user_id, &self.email)
    }
}

/// A freshly created session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    /// The bearer token to present on later calls.
    pub session_token: String,
    /// When the session stops being accepted.
    pub expires_at: String,
    /// The user the session belongs to.
    pub user: AuthenticatedUser,
}

/// Authentication service for session-based logins.
pub struct AuthenticationService;

impl AuthenticationService {
    /// Verifies credentials and opens a session.
    ///
    /// Unknown emails, wrong passwords and deactivated accounts all fail
    /// with the same message.
    ///
    /// # Arguments
    ///
    /// * `persistence` - The persistence layer
    /// * `email` - The login email, any case
    /// * `password` - The plain text password
    /// * `session_ttl` - How long the session stays valid
    /// * `now` - The current time
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AuthenticationFailed` if the credentials are not
    /// accepted or the session cannot be stored.
    pub fn login(
        persistence: &mut SqlitePersistence,
        email: &str,
        password: &str,
        session_ttl: Duration,
        now: OffsetDateTime,
    ) -> Result<LoginOutcome, AuthError> {
        let rejected = || AuthError::AuthenticationFailed {
            reason: String::from("Invalid email or password"),
        };

        let user: UserData = persistence
            .get_user_by_email(email)
            .map_err(Self::map_persistence_error)?
            .ok_or_else(|| {
                warn!("Login attempt for unknown email");
                rejected()
            })?;

        let verified: bool = persistence
            .verify_password(password, &user.password_hash)
            .map_err(Self::map_persistence_error)?;
        if !verified {
            warn!(user_id = user.user_id, "Login rejected: wrong password");
            return Err(rejected());
        }
        if !user.is_active {
            warn!(user_id = user.user_id, "Login rejected: account deactivated");
            return Err(rejected());
        }

        let now_str: String = format_timestamp(now);
        let expires_at: String = format_timestamp(now + session_ttl);
        let session_token: String = Self::generate_session_token();

        persistence
            .create_session(&session_token, user.user_id, &now_str, &expires_at)
            .map_err(Self::map_persistence_error)?;
        persistence
            .update_last_login(user.user_id, &now_str)
            .map_err(Self::map_persistence_error)?;

        let roles: Vec<Role> = persistence
            .user_roles(user.user_id)
            .map_err(Self::map_persistence_error)?;

        info!(user_id = user.user_id, %expires_at, "User logged in");
        Ok(LoginOutcome {
            session_token,
            expires_at,
            user: AuthenticatedUser::from_roles(&user, &roles),
        })
    }

    /// Resolves a session token to the user it belongs to.
    ///
    /// Role membership is read fresh on every call, so permission changes
    /// apply to open sessions immediately.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AuthenticationFailed` if the token is unknown or
    /// expired, or the user is missing or deactivated.
    pub fn validate_session(
        persistence: &mut SqlitePersistence,
        session_token: &str,
        now: OffsetDateTime,
    ) -> Result<AuthenticatedUser, AuthError> {
        let session: SessionData = persistence
            .get_session_by_token(session_token)
            .map_err(Self::map_persistence_error)?
            .ok_or_else(|| AuthError::AuthenticationFailed {
                reason: String::from("Invalid session token"),
            })?;

        let expires_at: OffsetDateTime =
            parse_timestamp(&session.expires_at).map_err(|e| AuthError::AuthenticationFailed {
                reason: format!("Failed to parse session expiration: {e}"),
            })?;
        if now >= expires_at {
            debug!(session_id = session.session_id, "Session expired");
            return Err(AuthError::AuthenticationFailed {
                reason: String::from("Session expired"),
            });
        }

        let user: UserData = persistence
            .get_user_by_id(session.user_id)
            .map_err(Self::map_persistence_error)?
            .ok_or_else(|| AuthError::AuthenticationFailed {
                reason: String::from("User not found"),
            })?;
        if !user.is_active {
            return Err(AuthError::AuthenticationFailed {
                reason: String::from("User is deactivated"),
            });
        }

        persistence
            .update_session_activity(session.session_id, &format_timestamp(now))
            .map_err(Self::map_persistence_error)?;

        let roles: Vec<Role> = persistence
            .user_roles(user.user_id)
            .map_err(Self::map_persistence_error)?;

        Ok(AuthenticatedUser::from_roles(&user, &roles))
    }

    /// Ends a session. Unknown tokens are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be deleted.
    pub fn logout(
        persistence: &mut SqlitePersistence,
        session_token: &str,
    ) -> Result<(), AuthError> {
        persistence
            .delete_session(session_token)
            .map_err(|e| AuthError::AuthenticationFailed {
                reason: format!("Failed to delete session: {e}"),
            })?;
        debug!("Session closed");
        Ok(())
    }

    /// 256 random bits as lowercase hex.
    fn generate_session_token() -> String {
        (0..4)
            .map(|_| format!("{:016x}", rand::random::<u64>()))
            .collect()
    }

    /// Maps persistence errors to authentication errors.
    fn map_persistence_error(err: PersistenceError) -> AuthError {
        match err {
            PersistenceError::SessionExpired(msg) | PersistenceError::SessionNotFound(msg) => {
                AuthError::AuthenticationFailed { reason: msg }
            }
            _ => AuthError::AuthenticationFailed {
                reason: format!("Database error: {err}"),
            },
        }
    }
}

/// Authorization service for permission checks.
pub struct AuthorizationService;

impl AuthorizationService {
    /// Checks that `user` holds the `required` permissions.
    ///
    /// With `PermissionMode::All` every code must be held; with
    /// `PermissionMode::Any` one is enough. An empty requirement always passes.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PermissionDenied` naming the missing codes.
    pub fn require_permissions(
        user: &AuthenticatedUser,
        required: &[&str],
        mode: PermissionMode,
    ) -> Result<(), AuthError> {
        let missing: Vec<String> = missing_permissions(&user.permissions, required, mode);
        if missing.is_empty() {
            return Ok(());
        }
        warn!(
            user_id = user.user_id,
            missing = %missing.join(","),
            "Permission denied"
        );
        Err(AuthError::PermissionDenied { missing })
    }

    /// Shorthand for requiring a single permission.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PermissionDenied` if the code is not held.
    pub fn require(user: &AuthenticatedUser, code: &str) -> Result<(), AuthError> {
        Self::require_permissions(user, &[code], PermissionMode::All)
    }
}
